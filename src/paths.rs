//! XDG-style locations of the config file and the translation cache files.
//!
//! XDG Base Directory conventions are preferred over OS-specific locations
//! on every platform.

use std::path::PathBuf;

/// Directory name under the XDG base directories.
const APP_DIR: &str = "tl";

/// Returns the configuration directory for tl.
///
/// Resolution order:
/// 1. `$XDG_CONFIG_HOME/tl` if `XDG_CONFIG_HOME` is set
/// 2. `~/.config/tl` otherwise
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// Returns the default directory of the `<SOURCE>_<TARGET>.cache` files.
///
/// Resolution order:
/// 1. `$XDG_CACHE_HOME/tl` if `XDG_CACHE_HOME` is set
/// 2. `~/.cache/tl` otherwise
pub fn cache_dir() -> PathBuf {
    xdg_dir("XDG_CACHE_HOME", ".cache")
}

/// Resolves `$<var>/tl`, or `~/<fallback>/tl` when the variable is unset or
/// empty. Without a home directory the path is relative to the working
/// directory.
fn xdg_dir(var: &str, fallback: &str) -> PathBuf {
    match std::env::var(var) {
        Ok(base) if !base.is_empty() => PathBuf::from(base).join(APP_DIR),
        _ => dirs::home_dir()
            .unwrap_or_default()
            .join(fallback)
            .join(APP_DIR),
    }
}
