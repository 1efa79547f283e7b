use anyhow::Result;
use clap::Parser;

use tl_cache::cli::commands::{feed, translate};
use tl_cache::cli::{Args, Command};
use tl_cache::output::{self, OutputConfig};
use tl_cache::translation::{print_languages, validate_language};

fn main() -> Result<()> {
    let args = Args::parse();

    output::init(OutputConfig {
        quiet: args.quiet,
        no_color: args.no_color || std::env::var("NO_COLOR").is_ok(),
    });
    output::init_logging(args.verbose);

    for lang in [&args.from, &args.to].into_iter().flatten() {
        validate_language(lang)?;
    }

    match args.command {
        Some(Command::Languages) => {
            print_languages();
        }
        Some(Command::Feed {
            original,
            translation,
            overwrite,
        }) => {
            feed::run_feed(feed::FeedOptions {
                original,
                translation,
                overwrite,
                from: args.from,
                to: args.to,
                cache_dir: args.cache_dir,
            })?;
        }
        None => {
            translate::run_translate(translate::TranslateOptions {
                file: args.file,
                from: args.from,
                to: args.to,
                provider: args.provider,
                model: args.model,
                cache_dir: args.cache_dir,
            })?;
        }
    }

    Ok(())
}
