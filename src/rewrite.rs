//! Entity-based text rewriting.
//!
//! Turns a post's raw text plus its annotated spans into safe markup. Every
//! span kind maps to a pre-built fragment (an anchor for mentions, hashtags
//! and links, nothing for media), and the fragments are spliced into the
//! text from the right end toward the left so that the offsets of spans not
//! yet applied stay valid.
//!
//! ## Escaping
//!
//! All text that does not come from a fragment is escaped, and so is every
//! piece of user data inside a fragment. Text escaping leaves existing
//! character references alone: export text usually arrives with
//! `&amp;`/`&lt;` already in place, and feeding rewritten output back in must
//! not produce `&amp;amp;`. Link targets are URLs, not markup, and go through
//! [`escape_attr`], which escapes every `&`.
//!
//! ## Malformed spans
//!
//! Spans that are empty, reversed or run past the end of the text are
//! skipped. A span overlapping one already applied is skipped too; since
//! spans are sorted by a total order first, the result does not depend on
//! the order the export listed them in.

use crate::config::LinkConfig;
use crate::types::EntitySet;
use crate::types::Span;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::debug;

/// Characters kept verbatim in handle and tag path segments.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'-').remove(b'.');

/// A span together with the markup that replaces it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Replacement {
    span: Span,
    fragment: String,
}

/// Rewrite `text` into markup, replacing every entity span with its fragment.
///
/// Line breaks become `<br>` once all spans have been applied.
pub fn rewrite_text(text: &str, entities: &EntitySet, links: &LinkConfig) -> String {
    let chars: Vec<char> = text.chars().collect();

    let mut replacements: Vec<Replacement> = collect_replacements(entities, links)
        .into_iter()
        .filter(|r| {
            let fits = r.span.fits(chars.len());
            if !fits {
                debug!(
                    start = r.span.start,
                    end = r.span.end,
                    len = chars.len(),
                    "skipping span outside text"
                );
            }
            fits
        })
        .collect();
    replacements.sort_by(|a, b| b.cmp(a));

    let mut pieces: Vec<String> = Vec::with_capacity(replacements.len() * 2 + 1);
    let mut cursor = chars.len();
    for replacement in &replacements {
        let Span { start, end } = replacement.span;
        if end > cursor {
            debug!(start, end, "skipping overlapping span");
            continue;
        }
        pieces.push(escape_html(&chars[end..cursor].iter().collect::<String>()));
        pieces.push(replacement.fragment.clone());
        cursor = start;
    }
    pieces.push(escape_html(&chars[..cursor].iter().collect::<String>()));
    pieces.reverse();

    convert_line_breaks(&pieces.concat())
}

fn collect_replacements(entities: &EntitySet, links: &LinkConfig) -> Vec<Replacement> {
    let mut out = Vec::new();

    for mention in &entities.mentions {
        out.push(Replacement {
            span: mention.span,
            fragment: mention_fragment(&mention.handle, links),
        });
    }
    for hashtag in &entities.hashtags {
        out.push(Replacement {
            span: hashtag.span,
            fragment: hashtag_fragment(&hashtag.tag, links),
        });
    }
    for link in &entities.links {
        let target = non_empty(link.expanded_url.as_deref()).unwrap_or(&link.url);
        let display = non_empty(link.display_url.as_deref()).unwrap_or(target);
        out.push(Replacement {
            span: link.span,
            fragment: link_fragment(target, display),
        });
    }
    for media in &entities.media {
        out.push(Replacement {
            span: media.span,
            fragment: String::new(),
        });
    }

    out
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Profile page of `handle`. Not escaped.
pub fn profile_url(links: &LinkConfig, handle: &str) -> String {
    format!(
        "{}/{}",
        links.profile_base.trim_end_matches('/'),
        utf8_percent_encode(handle, SEGMENT)
    )
}

/// Permalink of the post with identifier `id`. Not escaped.
pub fn status_url(links: &LinkConfig, id: &str) -> String {
    format!("{}{}", links.status_base, utf8_percent_encode(id, SEGMENT))
}

fn mention_fragment(handle: &str, links: &LinkConfig) -> String {
    format!(
        r#"<a class="mention" href="{}">@{}</a>"#,
        escape_attr(&profile_url(links, handle)),
        escape_html(handle)
    )
}

fn hashtag_fragment(tag: &str, links: &LinkConfig) -> String {
    let href = format!(
        "{}{}",
        links.hashtag_base,
        utf8_percent_encode(tag, SEGMENT)
    );
    format!(
        r#"<a class="hashtag" href="{}">#{}</a>"#,
        escape_attr(&href),
        escape_html(tag)
    )
}

fn link_fragment(target: &str, display: &str) -> String {
    if !is_web_url(target) {
        return escape_html(display);
    }
    format!(
        r#"<a class="link" href="{}" rel="noopener noreferrer" target="_blank">{}</a>"#,
        escape_attr(target),
        escape_html(display)
    )
}

/// Page-relative URL of a copied attachment, each path segment
/// percent-encoded. Not escaped.
pub fn media_url(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Only plain web links become anchors; `javascript:` and friends stay text.
pub fn is_web_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Escape an attribute value. Every `&` is escaped, so a URL keeps the
/// exact bytes it had.
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape the five HTML-significant characters in text content.
///
/// An `&` that already starts a well-formed character reference is kept, so
/// escaping is idempotent.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        match c {
            '&' if starts_char_ref(&text[i..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Whether `s` (starting at an `&`) begins `&name;`, `&#123;` or `&#x1f;`.
fn starts_char_ref(s: &str) -> bool {
    let Some(body) = s.strip_prefix('&') else {
        return false;
    };
    let Some(end) = body.find(';') else {
        return false;
    };
    let reference = &body[..end];
    if let Some(numeric) = reference.strip_prefix('#') {
        if let Some(hex) = numeric
            .strip_prefix('x')
            .or_else(|| numeric.strip_prefix('X'))
        {
            return !hex.is_empty() && hex.len() <= 6 && hex.bytes().all(|b| b.is_ascii_hexdigit());
        }
        return !numeric.is_empty() && numeric.len() <= 7 && numeric.bytes().all(|b| b.is_ascii_digit());
    }
    let mut bytes = reference.bytes();
    match bytes.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            reference.len() <= 32 && bytes.all(|b| b.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

fn convert_line_breaks(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "<br>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HashtagSpan, LinkSpan, MediaSpan, MentionSpan};

    fn links() -> LinkConfig {
        LinkConfig::default()
    }

    fn mention(start: usize, end: usize, handle: &str) -> MentionSpan {
        MentionSpan {
            span: Span::new(start, end),
            handle: handle.to_string(),
        }
    }

    fn hashtag(start: usize, end: usize, tag: &str) -> HashtagSpan {
        HashtagSpan {
            span: Span::new(start, end),
            tag: tag.to_string(),
        }
    }

    fn link(start: usize, end: usize, url: &str, expanded: &str, display: &str) -> LinkSpan {
        LinkSpan {
            span: Span::new(start, end),
            url: url.to_string(),
            expanded_url: Some(expanded.to_string()),
            display_url: Some(display.to_string()),
        }
    }

    /// Remove every `<a ...>` and `</a>` and `<br>` we inject.
    fn strip_injected(html: &str) -> String {
        let mut out = String::new();
        let mut rest = html;
        while let Some(pos) = rest.find('<') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            let close = tail.find('>').expect("unterminated tag in output");
            let tag = &tail[..=close];
            assert!(
                tag.starts_with("<a ") || tag == "</a>" || tag == "<br>",
                "unexpected tag {tag}"
            );
            rest = &tail[close + 1..];
        }
        out.push_str(rest);
        out
    }

    fn assert_fully_escaped(html: &str) {
        let text = strip_injected(html);
        for bad in ['<', '>', '"', '\''] {
            assert!(!text.contains(bad), "raw {bad:?} in {text:?}");
        }
        for (i, _) in text.match_indices('&') {
            assert!(starts_char_ref(&text[i..]), "bare & in {text:?}");
        }
    }

    #[test]
    fn zero_spans_only_escapes() {
        let out = rewrite_text("a < b & \"c\" 'd'", &EntitySet::default(), &links());
        assert_eq!(out, "a &lt; b &amp; &quot;c&quot; &#39;d&#39;");
    }

    #[test]
    fn newlines_become_breaks() {
        let out = rewrite_text("one\ntwo\r\nthree", &EntitySet::default(), &links());
        assert_eq!(out, "one<br>two<br>three");
    }

    #[test]
    fn mention_becomes_profile_link() {
        let entities = EntitySet {
            mentions: vec![mention(3, 9, "alice")],
            ..Default::default()
        };
        let out = rewrite_text("hi @alice!", &entities, &links());
        assert_eq!(
            out,
            r#"hi <a class="mention" href="https://twitter.com/alice">@alice</a>!"#
        );
    }

    #[test]
    fn hashtag_is_percent_encoded_in_href() {
        let entities = EntitySet {
            hashtags: vec![hashtag(0, 5, "café")],
            ..Default::default()
        };
        let out = rewrite_text("#café time", &entities, &links());
        assert!(out.starts_with(r#"<a class="hashtag" href="https://twitter.com/hashtag/caf%C3%A9">#café</a>"#));
        assert!(out.ends_with(" time"));
    }

    #[test]
    fn link_uses_expanded_target_and_display_text() {
        let entities = EntitySet {
            links: vec![link(5, 28, "https://t.co/abcdefghij", "https://example.com/a?b=1&c=2", "example.com/a…")],
            ..Default::default()
        };
        let out = rewrite_text("see: https://t.co/abcdefghij", &entities, &links());
        assert_eq!(
            out,
            r#"see: <a class="link" href="https://example.com/a?b=1&amp;c=2" rel="noopener noreferrer" target="_blank">example.com/a…</a>"#
        );
    }

    #[test]
    fn link_target_references_are_escaped_in_href() {
        let target = "https://e.com/?q=a&lt;b&copy;=1";
        let entities = EntitySet {
            links: vec![link(0, 23, "https://t.co/abcdefghij", target, "e.com")],
            ..Default::default()
        };
        let out = rewrite_text("https://t.co/abcdefghij", &entities, &links());
        assert!(
            out.contains(r#"href="https://e.com/?q=a&amp;lt;b&amp;copy;=1""#),
            "{out}"
        );
    }

    #[test]
    fn attribute_escaping_is_not_idempotent() {
        assert_eq!(escape_attr("a&amp;b"), "a&amp;amp;b");
        assert_eq!(escape_attr(r#"<"'>"#), "&lt;&quot;&#39;&gt;");
        assert_eq!(escape_html("a&amp;b"), "a&amp;b");
    }

    #[test]
    fn media_url_encodes_each_segment() {
        assert_eq!(media_url("media/1-a.jpg"), "media/1-a.jpg");
        assert_eq!(media_url("media/1-a#b?c%d e.jpg"), "media/1-a%23b%3Fc%25d%20e.jpg");
    }

    #[test]
    fn link_without_expansion_falls_back_to_raw_url() {
        let entities = EntitySet {
            links: vec![LinkSpan {
                span: Span::new(0, 8),
                url: "http://x".to_string(),
                expanded_url: None,
                display_url: Some(String::new()),
            }],
            ..Default::default()
        };
        let out = rewrite_text("http://x", &entities, &links());
        assert!(out.contains(r#"href="http://x""#));
        assert!(out.contains(">http://x</a>"));
    }

    #[test]
    fn script_urls_stay_plain_text() {
        let entities = EntitySet {
            links: vec![link(0, 3, "abc", "javascript:alert(1)", "click")],
            ..Default::default()
        };
        let out = rewrite_text("abc", &entities, &links());
        assert_eq!(out, "click");
    }

    #[test]
    fn media_span_is_removed() {
        let entities = EntitySet {
            media: vec![MediaSpan {
                span: Span::new(6, 29),
            }],
            ..Default::default()
        };
        let out = rewrite_text("photo https://t.co/media12345", &entities, &links());
        assert_eq!(out, "photo ");
    }

    #[test]
    fn user_data_inside_fragments_is_escaped() {
        let entities = EntitySet {
            mentions: vec![mention(0, 2, "<b>\"x'")],
            links: vec![link(3, 4, "u", "https://e.com/\"><script>", "<i>&")],
            ..Default::default()
        };
        let out = rewrite_text("@x u", &entities, &links());
        assert_fully_escaped(&out);
        assert!(out.contains("@&lt;b&gt;&quot;x&#39;"));
        assert!(out.contains("&lt;i&gt;&amp;"));
    }

    #[test]
    fn output_has_no_raw_specials_outside_markup() {
        let text = "RT @bob: <3 & \"quotes\" 'single' #tag\nhttps://t.co/zz > end";
        let entities = EntitySet {
            mentions: vec![mention(3, 7, "bob")],
            hashtags: vec![hashtag(32, 36, "tag")],
            links: vec![link(37, 52, "https://t.co/zz", "https://zz.example", "zz.example")],
            media: vec![],
        };
        let out = rewrite_text(text, &entities, &links());
        assert_fully_escaped(&out);
        assert!(out.contains(">@bob</a>"));
        assert!(out.contains(">#tag</a>"));
        assert!(out.contains(">zz.example</a>"));
        assert!(out.contains("<br>"));
    }

    #[test]
    fn span_order_does_not_matter() {
        let text = "@a #b @c #d";
        let forward = EntitySet {
            mentions: vec![mention(0, 2, "a"), mention(6, 8, "c")],
            hashtags: vec![hashtag(3, 5, "b"), hashtag(9, 11, "d")],
            ..Default::default()
        };
        let backward = EntitySet {
            mentions: vec![mention(6, 8, "c"), mention(0, 2, "a")],
            hashtags: vec![hashtag(9, 11, "d"), hashtag(3, 5, "b")],
            ..Default::default()
        };
        let a = rewrite_text(text, &forward, &links());
        let b = rewrite_text(text, &backward, &links());
        assert_eq!(a, b);

        let order: Vec<usize> = [">@a<", ">#b<", ">@c<", ">#d<"]
            .iter()
            .map(|needle| a.find(needle).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn shuffled_spans_of_one_kind_give_same_output() {
        let text = "@a @b @c";
        let spans = vec![mention(0, 2, "a"), mention(3, 5, "b"), mention(6, 8, "c")];
        let mut shuffled = spans.clone();
        shuffled.swap(0, 2);
        shuffled.swap(1, 2);
        let a = rewrite_text(text, &EntitySet { mentions: spans, ..Default::default() }, &links());
        let b = rewrite_text(text, &EntitySet { mentions: shuffled, ..Default::default() }, &links());
        assert_eq!(a, b);
    }

    #[test]
    fn out_of_range_and_reversed_spans_are_ignored() {
        let entities = EntitySet {
            mentions: vec![mention(2, 50, "far"), mention(4, 1, "back"), mention(1, 1, "empty")],
            ..Default::default()
        };
        let out = rewrite_text("hello & bye", &entities, &links());
        assert_eq!(out, "hello &amp; bye");
    }

    #[test]
    fn overlapping_spans_never_corrupt_text() {
        let entities = EntitySet {
            mentions: vec![mention(0, 6, "alice")],
            hashtags: vec![hashtag(3, 8, "cex")],
            ..Default::default()
        };
        let a = rewrite_text("@alice x!", &entities, &links());
        let b = rewrite_text("@alice x!", &entities, &links());
        assert_eq!(a, b);
        assert_fully_escaped(&a);
        assert!(a.ends_with('!'));
    }

    #[test]
    fn multibyte_text_uses_char_offsets() {
        let entities = EntitySet {
            mentions: vec![mention(2, 5, "bo")],
            ..Default::default()
        };
        let out = rewrite_text("😀 @bo ✓", &entities, &links());
        assert_eq!(
            out,
            r#"😀 <a class="mention" href="https://twitter.com/bo">@bo</a> ✓"#
        );
    }

    #[test]
    fn pre_escaped_export_text_is_not_double_escaped() {
        let out = rewrite_text("fish &amp; chips &lt;3", &EntitySet::default(), &links());
        assert_eq!(out, "fish &amp; chips &lt;3");
    }

    #[test]
    fn rewriting_own_output_is_stable() {
        let once = rewrite_text("<b> & \"q\" 'x' &#39; &#x27; &nbsp", &EntitySet::default(), &links());
        let twice = rewrite_text(&once, &EntitySet::default(), &links());
        assert_eq!(once, twice);
    }

    #[test]
    fn char_ref_detection() {
        assert!(starts_char_ref("&amp;"));
        assert!(starts_char_ref("&#39;"));
        assert!(starts_char_ref("&#x1F600;"));
        assert!(!starts_char_ref("&;"));
        assert!(!starts_char_ref("& amp;"));
        assert!(!starts_char_ref("&#;"));
        assert!(!starts_char_ref("&#xZZ;"));
        assert!(!starts_char_ref("&amp"));
    }

    #[test]
    fn web_url_check() {
        assert!(is_web_url("https://a.b"));
        assert!(is_web_url("HTTP://A.B"));
        assert!(!is_web_url("javascript:alert(1)"));
        assert!(!is_web_url("data:text/html,x"));
    }
}
