use clap::{Parser, Subcommand};
use simple_archive::export::{self, Export};
use simple_archive::index;
use simple_archive::media::MediaIndex;
use simple_archive::{config, generate, output};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "simple-archive")]
#[command(about = "Turn a Twitter data export into one searchable HTML page")]
#[command(long_about = "\
Turn a Twitter data export into one searchable HTML page

The export directory is the data source. Posts are read from the data
files without executing them, classified as posts, replies or retweets,
and rendered into a single index.html that filters, sorts and searches
entirely in the browser.

Export structure:

  export/
  ├── config.toml                  # Archive config (optional)
  └── data/
      ├── tweets.js                # window.YTD.tweets.part0 = [ ... ]
      ├── tweets-part1.js          # Further parts, read in order
      └── tweets_media/
          └── 1049003491234-a.jpg  # Attachment of post 1049003491234

Output structure:

  dist/
  ├── index.html                   # The whole archive
  └── media/                       # Attachments of retained posts

Posts whose date cannot be parsed are left out and counted.
Set SIMPLE_ARCHIVE_LOG (e.g. simple_archive=debug) for diagnostics.

Run 'simple-archive gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Export directory
    #[arg(long, default_value = "export", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Log skipped records and spans to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read the export and write the archive page
    Build,
    /// Read and index the export without writing anything
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Build => {
            println!("==> Stage 1: Reading {}", cli.source.display());
            let (site_config, loaded, media) = load(&cli.source)?;

            println!("==> Stage 2: Indexing {} records", loaded.records.len());
            let archive = index::build_archive(loaded.records, &media, &site_config.links);
            output::print_archive_output(&archive);

            println!("==> Stage 3: Generating HTML → {}", cli.output.display());
            let summary = generate::write_site(&archive, &site_config, &media, &cli.output)?;
            output::print_generate_output(&archive, &summary);

            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            println!("==> Checking {}", cli.source.display());
            let (site_config, loaded, media) = load(&cli.source)?;
            let archive = index::build_archive(loaded.records, &media, &site_config.links);
            output::print_archive_output(&archive);
            println!("==> Export is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Read config, data files and the media folder. Prints the load summary.
fn load(
    source: &Path,
) -> Result<(config::SiteConfig, Export, MediaIndex), Box<dyn std::error::Error>> {
    let loaded = export::load_export(source)?;
    let site_config = config::load_config(source)?;
    let media = MediaIndex::scan(&loaded.data_dir)?;
    output::print_load_output(&loaded, &media, source);
    Ok((site_config, loaded, media))
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("SIMPLE_ARCHIVE_LOG").unwrap_or_else(|_| {
        if verbose {
            "simple_archive=debug".to_string()
        } else {
            "simple_archive=warn".to_string()
        }
    });
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}
