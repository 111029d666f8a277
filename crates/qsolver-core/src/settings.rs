//! Settings controller wrapping the backend's settings RPCs

use std::sync::Arc;

use qsolver_wire::{Backend, Settings, settings::DEFAULT_MODEL};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::events::{EventBus, NotificationLevel};

/// Outcome of a connectivity probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message", rename_all = "snake_case")]
pub enum ConnectionStatus {
    Success(String),
    Failure(String),
}

impl ConnectionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ConnectionStatus::Success(_))
    }

    pub fn icon(&self) -> &'static str {
        match self {
            ConnectionStatus::Success(_) => "✅",
            ConnectionStatus::Failure(_) => "❌",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ConnectionStatus::Success(m) | ConnectionStatus::Failure(m) => m,
        }
    }
}

/// Holds the active settings and talks to the backend about them.
///
/// Backend failures are reported as notifications on the event bus; the
/// in-memory settings only change after a successful call.
pub struct SettingsController {
    backend: Arc<dyn Backend>,
    events: EventBus,
    settings: Settings,
    available_models: Vec<String>,
    connection_status: Option<ConnectionStatus>,
}

impl SettingsController {
    pub fn new(backend: Arc<dyn Backend>, events: EventBus) -> Self {
        Self {
            backend,
            events,
            settings: Settings::default(),
            available_models: Vec::new(),
            connection_status: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn available_models(&self) -> &[String] {
        &self.available_models
    }

    pub fn connection_status(&self) -> Option<&ConnectionStatus> {
        self.connection_status.as_ref()
    }

    pub fn masked_api_key(&self) -> String {
        self.settings.masked_api_key()
    }

    /// Fetch settings from the backend, keeping defaults on failure
    pub async fn load(&mut self) -> &Settings {
        match self.backend.get_settings().await {
            Ok(mut settings) => {
                if settings.model.is_empty() {
                    settings.model = DEFAULT_MODEL.to_string();
                }
                debug!(model = %settings.model, "Loaded settings");
                self.settings = settings;
            }
            Err(e) => warn!(error = %e, "Failed to load settings, using defaults"),
        }
        &self.settings
    }

    /// Validate and persist new settings
    pub async fn save(&mut self, settings: Settings) -> Result<()> {
        match self.persist(&settings).await {
            Ok(()) => {
                self.settings = settings;
                info!("Settings saved");
                self.events.notify(NotificationLevel::Success, "Settings saved");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to save settings");
                self.events
                    .notify(NotificationLevel::Error, format!("Failed to save settings: {e}"));
                Err(e.into())
            }
        }
    }

    async fn persist(&self, settings: &Settings) -> qsolver_wire::Result<()> {
        settings.validate()?;
        let json = settings.to_json()?;
        self.backend.sync_settings(&json).await
    }

    /// Reload the model list for a key and endpoint.
    ///
    /// Returns the number of models loaded.
    pub async fn refresh_models(&mut self, api_key: &str, base_url: &str) -> Result<usize> {
        if api_key.is_empty() {
            self.events
                .notify(NotificationLevel::Warning, "Enter an API key first");
            return Ok(0);
        }

        let models = match self.backend.get_models(api_key, base_url).await {
            Ok(models) => models,
            Err(e) => {
                warn!(error = %e, "Failed to fetch models");
                self.events
                    .notify(NotificationLevel::Error, format!("Failed to load models: {e}"));
                return Err(e.into());
            }
        };

        if let Some(first) = models.first() {
            if self.settings.model.is_empty() || self.settings.model == "auto" {
                self.settings.model = first.clone();
            }
            self.available_models = models;
        }

        let count = self.available_models.len();
        self.events
            .notify(NotificationLevel::Success, format!("Loaded {count} models"));
        Ok(count)
    }

    /// Probe a key, endpoint and model; `None` when no model was given
    pub async fn test_connection(
        &mut self,
        api_key: &str,
        base_url: &str,
        model: &str,
    ) -> Option<ConnectionStatus> {
        if model.is_empty() {
            self.events
                .notify(NotificationLevel::Warning, "Select a model first");
            return None;
        }

        self.connection_status = None;
        let status = match self.backend.test_connection(api_key, base_url, model).await {
            Ok(()) => {
                self.events
                    .notify(NotificationLevel::Success, "Connection test succeeded");
                ConnectionStatus::Success(format!("Model {model} connected"))
            }
            Err(e) => {
                warn!(error = %e, model, "Connection test failed");
                self.events
                    .notify(NotificationLevel::Error, "Connection test failed");
                ConnectionStatus::Failure(e.to_string())
            }
        };

        self.connection_status = Some(status.clone());
        Some(status)
    }
}
