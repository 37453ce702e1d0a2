//! Tokenizer, stemmer and matcher used by the archive search box.
//!
//! `static/archive.js` carries a copy of these rules; the two must agree or
//! the initial page state and the live page disagree.
//!
//! Matching is containment in both directions between stemmed tokens, so a
//! query for `run` finds `running` (stem `runn`) and `runs` (stem `run`).
//! There is no ranking: an item either matches or it does not.

/// Token separators. This is exactly the set JavaScript's `\s` matches, so
/// the page script can split with an explicit character class and agree.
fn is_separator(c: char) -> bool {
    matches!(
        c,
        '\t'..='\r'
            | ' '
            | '\u{a0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200a}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202f}'
            | '\u{205f}'
            | '\u{3000}'
            | '\u{feff}'
    )
}

/// Split on separators, lowercase, keep only `[a-z0-9]`, drop empties.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(is_separator)
        .map(|word| {
            word.chars()
                .flat_map(char::to_lowercase)
                .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                .collect::<String>()
        })
        .filter(|token| !token.is_empty())
        .collect()
}

/// Strip one common English suffix. The first rule that applies wins.
///
/// A token that is nothing but a suffix (`s`, `ing`) stems to the empty
/// string, which the matcher treats as contained in every indexed stem.
pub fn stem(token: &str) -> &str {
    let cut = if token.ends_with("ing") {
        3
    } else if token.ends_with("ed") || token.ends_with("es") {
        2
    } else if token.ends_with('s') && !token.ends_with("ss") {
        1
    } else if token.ends_with("ly") {
        2
    } else {
        0
    };
    &token[..token.len() - cut]
}

/// Tokenize and stem in one pass.
pub fn stems(text: &str) -> Vec<String> {
    tokenize(text)
        .iter()
        .map(|token| stem(token).to_string())
        .collect()
}

/// Every query stem must overlap some indexed stem, in either direction.
///
/// An empty query matches everything.
pub fn matches<Q, T>(query: &[Q], indexed: &[T]) -> bool
where
    Q: AsRef<str>,
    T: AsRef<str>,
{
    query.iter().all(|q| {
        let q = q.as_ref();
        indexed.iter().any(|t| {
            let t = t.as_ref();
            t.contains(q) || q.contains(t)
        })
    })
}
