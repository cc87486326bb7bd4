//! Application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | App data | `~/Library/Application Support/ecosmart/` | `~/.local/share/ecosmart/` |
//! | Config | `~/Library/Application Support/ecosmart/` | `~/.config/ecosmart/` |
//!
//! Overrides: `ECOSMART_DATA_DIR` for [`data_dir`], `ECOSMART_CONFIG_DIR`
//! for [`config_dir`].

use std::path::PathBuf;

/// Application data root: the persisted profile and log files.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("ECOSMART_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("ecosmart"))
        .unwrap_or_else(|| PathBuf::from("/tmp/ecosmart-data"))
}

/// Application config directory (holds `config.toml`).
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("ECOSMART_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("ecosmart"))
        .unwrap_or_else(|| PathBuf::from("/tmp/ecosmart-config"))
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Default config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}
