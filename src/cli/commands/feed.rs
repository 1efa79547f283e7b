use anyhow::{Context, Result, bail};
use std::path::PathBuf;

use crate::config::{ConfigFile, ConfigManager};
use crate::paths;
use crate::registry::{Registry, RegistryConfig};
use crate::status;
use crate::ui::Style;

pub struct FeedOptions {
    pub original: String,
    pub translation: String,
    pub overwrite: bool,
    pub from: Option<String>,
    pub to: Option<String>,
    pub cache_dir: Option<PathBuf>,
}

/// Stores a known pair in the cache of the selected language pair.
///
/// No provider is involved, so only the languages and the cache directory
/// need to be configured.
pub fn run_feed(options: FeedOptions) -> Result<()> {
    let config_file = ConfigManager::new().load_or_default();
    run_feed_with_config(options, &config_file)
}

fn run_feed_with_config(options: FeedOptions, config_file: &ConfigFile) -> Result<()> {
    if options.original.trim().is_empty() || options.translation.trim().is_empty() {
        bail!("Error: Both the original and the translation must be non-empty");
    }

    let from = options
        .from
        .or_else(|| config_file.tl.from.clone())
        .context("Missing required configuration: 'from' (use --from <lang>)")?;
    let to = options
        .to
        .or_else(|| config_file.tl.to.clone())
        .context("Missing required configuration: 'to' (use --to <lang>)")?;
    let cache_dir = options
        .cache_dir
        .or_else(|| config_file.tl.cache_dir.clone())
        .unwrap_or_else(paths::cache_dir);

    let registry = Registry::new(RegistryConfig {
        max_in_flight: 1,
        ..RegistryConfig::default()
    })?;
    let handle = registry.next_handle_id();
    let instance = registry
        .acquire(&from, &to, &cache_dir, handle)
        .context("Failed to open the translation cache")?;

    let fed = instance
        .store()
        .feed(&options.original, &options.translation, options.overwrite);
    registry.release(&instance, handle)?;
    fed?;

    status!(
        "{} {}",
        Style::success("Stored"),
        Style::secondary(instance.store().path().display())
    );
    Ok(())
}
