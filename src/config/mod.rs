mod manager;

pub use manager::{
    ConfigFile, ConfigManager, DEFAULT_APP_NAME, ProviderConfig, ResolveOptions, ResolvedConfig,
    TlConfig, resolve_config,
};
