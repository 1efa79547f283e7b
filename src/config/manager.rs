use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

use crate::dispatch::{DEFAULT_MAX_BATCH_CHARS, DEFAULT_MAX_IN_FLIGHT};
use crate::paths;
use crate::registry::RegistryConfig;
use crate::translator::TranslatorOptions;

/// Default application name used to derive the submitter identity.
pub const DEFAULT_APP_NAME: &str = "tl";

/// Default settings in the `[tl]` section of config.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlConfig {
    /// Default provider name.
    pub provider: Option<String>,
    /// Default model name.
    pub model: Option<String>,
    /// Default source language (ISO 639-1 code).
    pub from: Option<String>,
    /// Default target language (ISO 639-1 code).
    pub to: Option<String>,
    /// Application name, combined with the API key into the batch identity.
    pub app_name: Option<String>,
    /// Directory holding the `<SOURCE>_<TARGET>.cache` files.
    pub cache_dir: Option<PathBuf>,
    /// Characters accumulated before a batch is sent.
    pub max_batch_chars: Option<usize>,
    /// Maximum number of concurrent provider calls.
    pub max_in_flight: Option<usize>,
}

/// Configuration for a translation provider.
///
/// Each provider has an endpoint and optional API key settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// The OpenAI-compatible API endpoint URL.
    pub endpoint: String,
    /// API key stored directly in config (not recommended).
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable name containing the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// List of available models for this provider.
    #[serde(default)]
    pub models: Vec<String>,
}

impl ProviderConfig {
    /// Gets the API key, preferring environment variable over config file.
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(env_var) = &self.api_key_env
            && let Ok(key) = std::env::var(env_var)
            && !key.is_empty()
        {
            return Some(key);
        }
        self.api_key.clone()
    }

    /// Returns `true` if this provider requires an API key.
    pub const fn requires_api_key(&self) -> bool {
        self.api_key.is_some() || self.api_key_env.is_some()
    }
}

/// The complete configuration file structure.
///
/// Corresponds to `~/.config/tl/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Default settings.
    #[serde(default)]
    pub tl: TlConfig,
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Resolved configuration after merging CLI arguments and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The selected provider name.
    pub provider_name: String,
    /// The API endpoint URL.
    pub endpoint: String,
    /// The model to use for translation.
    pub model: String,
    /// The API key (if required).
    pub api_key: Option<String>,
    /// The source language code.
    pub source_language: String,
    /// The target language code.
    pub target_language: String,
    /// The application name.
    pub app_name: String,
    /// The cache directory.
    pub cache_dir: PathBuf,
    /// Batch character threshold.
    pub max_batch_chars: usize,
    /// Concurrent provider call limit.
    pub max_in_flight: usize,
}

impl ResolvedConfig {
    /// Registry settings derived from this configuration.
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            default_target: self.target_language.clone(),
            default_app_name: self.app_name.clone(),
            default_credential: self.api_key.clone(),
            default_cache_dir: Some(self.cache_dir.clone()),
            max_batch_chars: self.max_batch_chars,
            max_in_flight: self.max_in_flight,
        }
    }

    /// Translator options for the configured language pair.
    pub fn translator_options(&self) -> TranslatorOptions {
        TranslatorOptions::new(&self.source_language).to(&self.target_language)
    }
}

/// Options for resolving configuration.
///
/// Contains CLI overrides that take precedence over config file values.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Source language code override.
    pub from: Option<String>,
    /// Target language code override.
    pub to: Option<String>,
    /// Provider name override.
    pub provider: Option<String>,
    /// Model name override.
    pub model: Option<String>,
    /// Cache directory override.
    pub cache_dir: Option<PathBuf>,
}

fn missing(key: &str, flag: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Missing required configuration: '{key}'\n\n\
         Please provide it via:\n  \
         - CLI option: tl {flag}\n  \
         - Config file: ~/.config/tl/config.toml"
    )
}

/// Resolves configuration by merging CLI options with config file settings.
///
/// CLI options take precedence over config file values.
///
/// # Errors
///
/// Returns an error if required configuration (provider, model, source and
/// target language) is missing or if the specified provider is not found.
pub fn resolve_config(
    options: &ResolveOptions,
    config_file: &ConfigFile,
) -> Result<ResolvedConfig> {
    // Resolve provider
    let provider_name = options
        .provider
        .as_ref()
        .or(config_file.tl.provider.as_ref())
        .cloned()
        .ok_or_else(|| missing("provider", "--provider <name>"))?;

    // Get provider config
    let provider_config = config_file.providers.get(&provider_name).ok_or_else(|| {
        let mut available: Vec<_> = config_file.providers.keys().map(String::as_str).collect();
        available.sort_unstable();
        if available.is_empty() {
            anyhow::anyhow!(
                "Provider '{provider_name}' not found\n\n\
                 No providers configured. Add providers to ~/.config/tl/config.toml"
            )
        } else {
            anyhow::anyhow!(
                "Provider '{provider_name}' not found\n\n\
                 Available providers:\n  \
                 - {}\n\n\
                 Add providers to ~/.config/tl/config.toml",
                available.join("\n  - ")
            )
        }
    })?;

    // Resolve model
    let model = options
        .model
        .as_ref()
        .or(config_file.tl.model.as_ref())
        .cloned()
        .ok_or_else(|| missing("model", "--model <name>"))?;

    if !provider_config.models.is_empty() && !provider_config.models.contains(&model) {
        warn!(
            model = %model,
            provider = %provider_name,
            configured = %provider_config.models.join(", "),
            "Model is not in the provider's configured models list"
        );
    }

    let source_language = options
        .from
        .as_ref()
        .or(config_file.tl.from.as_ref())
        .cloned()
        .ok_or_else(|| missing("from", "--from <lang>"))?;

    let target_language = options
        .to
        .as_ref()
        .or(config_file.tl.to.as_ref())
        .cloned()
        .ok_or_else(|| missing("to", "--to <lang>"))?;

    // Get API key
    let api_key = provider_config.get_api_key();

    // Check if API key is required but missing
    if provider_config.requires_api_key() && api_key.is_none() {
        let env_var = provider_config.api_key_env.as_deref().unwrap_or("API_KEY");
        bail!(
            "Provider '{provider_name}' requires an API key\n\n\
             Set the {env_var} environment variable:\n  \
             export {env_var}=\"your-api-key\"\n\n\
             Or set api_key in ~/.config/tl/config.toml"
        );
    }

    let cache_dir = options
        .cache_dir
        .as_ref()
        .or(config_file.tl.cache_dir.as_ref())
        .cloned()
        .unwrap_or_else(paths::cache_dir);

    let max_batch_chars = config_file
        .tl
        .max_batch_chars
        .unwrap_or(DEFAULT_MAX_BATCH_CHARS);
    if max_batch_chars == 0 {
        bail!("Invalid configuration: 'max_batch_chars' must be greater than zero");
    }

    Ok(ResolvedConfig {
        provider_name,
        endpoint: provider_config.endpoint.clone(),
        model,
        api_key,
        source_language,
        target_language,
        app_name: config_file
            .tl
            .app_name
            .clone()
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
        cache_dir,
        max_batch_chars,
        max_in_flight: config_file
            .tl
            .max_in_flight
            .unwrap_or(DEFAULT_MAX_IN_FLIGHT),
    })
}

/// Manages loading configuration files.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a new config manager.
    ///
    /// Configuration is stored at `$XDG_CONFIG_HOME/tl/config.toml`
    /// or `~/.config/tl/config.toml` if `XDG_CONFIG_HOME` is not set.
    pub fn new() -> Self {
        Self::with_path(paths::config_dir().join("config.toml"))
    }

    pub const fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub const fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    pub fn load(&self) -> Result<ConfigFile> {
        let contents = fs::read_to_string(&self.config_path).with_context(|| {
            format!("Failed to read config file: {}", self.config_path.display())
        })?;

        let config_file: ConfigFile =
            toml::from_str(&contents).with_context(|| "Failed to parse config file")?;

        Ok(config_file)
    }

    pub fn load_or_default(&self) -> ConfigFile {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
