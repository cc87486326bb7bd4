//! Configuration types for the assistant.

use crate::error::{EcoError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variables consulted (in order) when no API key is configured.
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EcoConfig {
    /// Generative-AI service settings.
    pub gateway: GatewayConfig,
    /// Voice assistant settings.
    pub voice: VoiceConfig,
    /// Dashboard insight settings.
    pub insight: InsightConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Connection and model settings for the generative-AI service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Service base URL, without the API version path.
    pub base_url: String,
    /// API key. When unset, [`API_KEY_ENV_VARS`] are consulted.
    pub api_key: Option<String>,
    /// Model used for chat, weather and advice text.
    pub chat_model: String,
    /// Model used for speech synthesis.
    pub speech_model: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Prebuilt voice for male users.
    pub male_voice: String,
    /// Prebuilt voice for female users.
    pub female_voice: String,
    /// Maximum characters sent for synthesis before truncation.
    pub max_speech_chars: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_owned(),
            api_key: None,
            chat_model: "gemini-2.5-flash".to_owned(),
            speech_model: "gemini-2.5-flash-preview-tts".to_owned(),
            request_timeout_secs: 60,
            male_voice: "Fenrir".to_owned(),
            female_voice: "Zephyr".to_owned(),
            max_speech_chars: 500,
        }
    }
}

impl GatewayConfig {
    /// The configured API key, falling back to the environment.
    ///
    /// Empty strings count as unset.
    #[must_use]
    pub fn resolved_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_deref()
            && !key.trim().is_empty()
        {
            return Some(key.trim().to_owned());
        }
        API_KEY_ENV_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.trim().is_empty())
    }
}

/// Voice assistant configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Locale tag requested from the speech recognizer.
    pub locale: String,
    /// Sample rate assumed for raw PCM audio from the synthesizer.
    pub playback_sample_rate: u32,
    /// Output device name (None = system default).
    pub output_device: Option<String>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            locale: "ar-SA".to_owned(),
            playback_sample_rate: 24_000,
            output_device: None,
        }
    }
}

/// Dashboard insight configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    /// Interval between weather insight refreshes.
    pub weather_refresh_secs: u64,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            weather_refresh_secs: 3600,
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Also write daily-rolling log files under the data directory.
    pub file: bool,
}

impl EcoConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| EcoError::Config(e.to_string()))
    }

    /// Load `path` when given, else the default path if it exists, else defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly given or existing file cannot be parsed.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        let default_path = Self::default_config_path();
        if default_path.exists() {
            Self::from_file(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| EcoError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> PathBuf {
        crate::app_dirs::config_file()
    }
}
