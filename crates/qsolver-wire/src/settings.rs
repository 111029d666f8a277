//! The persisted settings record shared with the backend

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Model selected when the backend has none configured
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Which part of the screen a solve request captures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenshotMode {
    #[default]
    Window,
    Fullscreen,
}

/// A global shortcut binding
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyBinding {
    /// Platform key combination identifier (VK codes on Windows)
    pub combo_id: String,
    /// Human-readable label
    pub key_name: String,
}

impl KeyBinding {
    fn new(combo_id: &str, key_name: &str) -> Self {
        Self {
            combo_id: combo_id.to_string(),
            key_name: key_name.to_string(),
        }
    }
}

/// Settings as stored by the backend and exchanged as camelCase JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_key: String,
    pub provider: String,
    pub model: String,
    #[serde(rename = "baseURL")]
    pub base_url: String,
    /// System prompt
    pub prompt: String,
    /// Window opacity in [0, 1]
    pub opacity: f64,
    pub no_compression: bool,
    /// JPEG quality in [1, 100]
    pub compression_quality: u8,
    pub sharpening: f64,
    pub grayscale: bool,
    /// Append successive exchanges to the same history item
    pub keep_context: bool,
    /// Allow a new solve to interrupt a model that is still thinking
    pub interrupt_thinking: bool,
    pub screenshot_mode: ScreenshotMode,
    pub resume_path: String,
    pub resume_content: String,
    pub use_markdown_resume: bool,
    pub shortcuts: BTreeMap<String, KeyBinding>,

    // Generation parameters
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_tokens: u32,
    pub thinking_budget: u32,

    /// Secondary model used for summaries
    pub assistant_model: String,
    pub use_live_api: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            provider: "google".to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: String::new(),
            prompt: String::new(),
            opacity: 1.0,
            no_compression: false,
            compression_quality: 80,
            sharpening: 0.0,
            grayscale: false,
            keep_context: false,
            interrupt_thinking: false,
            screenshot_mode: ScreenshotMode::Window,
            resume_path: String::new(),
            resume_content: String::new(),
            use_markdown_resume: false,
            shortcuts: default_shortcuts(),
            temperature: 1.0,
            top_p: 0.95,
            top_k: 40,
            max_tokens: 8192,
            thinking_budget: 16000,
            assistant_model: String::new(),
            use_live_api: false,
        }
    }
}

impl Settings {
    /// Parse settings from the backend's JSON, filling gaps with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let mut settings: Settings = serde_json::from_str(json)?;
        if settings.model.is_empty() {
            settings.model = DEFAULT_MODEL.to_string();
        }
        Ok(settings)
    }

    /// Serialize to the camelCase JSON the backend expects
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(Error::invalid_settings(
                "opacity",
                "must be between 0 and 1",
            ));
        }
        if !(1..=100).contains(&self.compression_quality) {
            return Err(Error::invalid_settings(
                "compressionQuality",
                "must be between 1 and 100",
            ));
        }
        Ok(())
    }

    /// API key with the middle hidden, for display
    pub fn masked_api_key(&self) -> String {
        let key = &self.api_key;
        let chars: Vec<char> = key.chars().collect();
        if chars.len() < 8 {
            return key.clone();
        }
        let head: String = chars[..3].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}****{tail}")
    }
}

/// Default shortcuts for the current platform
pub fn default_shortcuts() -> BTreeMap<String, KeyBinding> {
    let bindings: &[(&str, &str, &str)] = if cfg!(target_os = "macos") {
        &[
            ("solve", "Cmd+1", "⌘1"),
            ("toggle", "Cmd+2", "⌘2"),
            ("clickthrough", "Cmd+3", "⌘3"),
            ("move_up", "Cmd+Option+Up", "⌘⌥↑"),
            ("move_down", "Cmd+Option+Down", "⌘⌥↓"),
            ("move_left", "Cmd+Option+Left", "⌘⌥←"),
            ("move_right", "Cmd+Option+Right", "⌘⌥→"),
            ("scroll_up", "Cmd+Option+Shift+Up", "⌘⌥⇧↑"),
            ("scroll_down", "Cmd+Option+Shift+Down", "⌘⌥⇧↓"),
        ]
    } else {
        &[
            ("solve", "119", "F8"),
            ("toggle", "120", "F9"),
            ("clickthrough", "121", "F10"),
            ("move_up", "38+164", "Alt+↑"),
            ("move_down", "40+164", "Alt+↓"),
            ("move_left", "37+164", "Alt+←"),
            ("move_right", "39+164", "Alt+→"),
            ("scroll_up", "33+164", "Alt+PgUp"),
            ("scroll_down", "34+164", "Alt+PgDn"),
        ]
    };

    bindings
        .iter()
        .map(|(action, combo, name)| (action.to_string(), KeyBinding::new(combo, name)))
        .collect()
}
