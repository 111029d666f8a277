//! Backend implementation backed by the config file and an OpenAI-compatible API

use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use qsolver_wire::{Backend, OpenAiCatalog, Result, Settings, decode_data_url};
use tracing::{debug, info};

use crate::config::Config;

/// Stands in for the desktop backend process.
///
/// Settings are persisted to the config file, models and connectivity go to
/// the configured endpoint, and saved images go to a fixed path. Without a
/// save target every save is treated as a cancelled dialog.
pub struct LocalBackend {
    config: Mutex<Config>,
    config_path: PathBuf,
    save_target: Option<PathBuf>,
}

impl LocalBackend {
    pub fn new(config: Config, config_path: PathBuf) -> Self {
        Self {
            config: Mutex::new(config),
            config_path,
            save_target: None,
        }
    }

    /// Write exported images to `path`
    pub fn with_save_target(mut self, path: PathBuf) -> Self {
        self.save_target = Some(path);
        self
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn get_settings(&self) -> Result<Settings> {
        Ok(self.config.lock().settings.clone())
    }

    async fn sync_settings(&self, json: &str) -> Result<()> {
        let settings = Settings::from_json(json)?;
        let mut config = self.config.lock();
        config.settings = settings;
        config.save_to(&self.config_path)?;
        debug!(path = %self.config_path.display(), "Persisted settings");
        Ok(())
    }

    async fn get_models(&self, api_key: &str, base_url: &str) -> Result<Vec<String>> {
        OpenAiCatalog::new(api_key, base_url)?.list_models().await
    }

    async fn test_connection(&self, api_key: &str, base_url: &str, model: &str) -> Result<()> {
        OpenAiCatalog::new(api_key, base_url)?.test_chat(model).await
    }

    async fn save_image(&self, data_url: &str) -> Result<bool> {
        let Some(path) = &self.save_target else {
            return Ok(false);
        };

        let bytes = decode_data_url(data_url)?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(path, &bytes).await?;
        info!(path = %path.display(), bytes = bytes.len(), "Saved image");
        Ok(true)
    }
}
