//! Configuration file support

use qsolver_export::ExportOptions;
use qsolver_wire::Settings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for qsolver
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The settings record the backend would persist
    pub settings: Settings,
    /// Image export options
    pub export: ExportConfig,
}

/// `[export]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// HTML-to-image command line; `{input}`, `{output}`, `{width}` and
    /// `{zoom}` are substituted
    pub command: Option<String>,
    /// Footer branding
    pub brand: Option<String>,
    pub width: Option<u32>,
    pub padding: Option<u32>,
    pub scale: Option<f32>,
}

impl ExportConfig {
    pub fn options(&self) -> ExportOptions {
        let defaults = ExportOptions::default();
        ExportOptions {
            width: self.width.unwrap_or(defaults.width),
            padding: self.padding.unwrap_or(defaults.padding),
            scale: self.scale.unwrap_or(defaults.scale),
            brand: self.brand.clone().unwrap_or(defaults.brand),
        }
    }
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("qsolver")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("QSOLVER_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default path
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file");
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file");
                Self::default()
            }
        }
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Write the example config if no file exists yet
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, example_config())?;
        Ok(path)
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# qsolver configuration file
# Place at ~/.config/qsolver/config.toml (Linux), ~/Library/Application Support/qsolver/config.toml (Mac)
# or %APPDATA%\qsolver\config.toml (Windows). QSOLVER_CONFIG_PATH overrides the location.

[settings]
# API key for the OpenAI-compatible endpoint
# apiKey = "sk-..."
# Empty means https://api.openai.com/v1
baseURL = ""
model = "gemini-2.5-flash"
# Append follow-up answers to the same history item
keepContext = false
temperature = 1.0
maxTokens = 8192

[export]
# HTML-to-image program; {input}, {output}, {width} and {zoom} are substituted
# command = "wkhtmltoimage --quiet --format png --width {width} --zoom {zoom} {input} {output}"
brand = "Q-Solver"
"#
}
