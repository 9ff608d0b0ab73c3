//! Endpoint settings: CLI > environment > settings file > defaults.

use crate::PathManager;
use serde::{Deserialize, Serialize};
use std::fs;

pub const CHAT_URL_ENV: &str = "SCHOLIA_CHAT_URL";
pub const INGEST_URL_ENV: &str = "SCHOLIA_INGEST_URL";

const DEFAULT_CHAT_URL: &str = "http://localhost:3000/api/chat";
const DEFAULT_INGEST_URL: &str = "http://localhost:3000/api/retrieval/ingest";

/// Persisted settings, stored in settings.toml under the config dir.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Chat endpoint URL override.
    pub chat_endpoint: Option<String>,
    /// Ingestion endpoint URL override.
    pub ingest_endpoint: Option<String>,
}

impl Settings {
    /// Load settings from the settings file, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = PathManager::settings_path() else {
            return Self::default();
        };

        let Ok(content) = fs::read_to_string(&path) else {
            return Self::default();
        };

        toml::from_str(&content).unwrap_or_default()
    }

    /// Save settings to the settings file
    pub fn save(&self) -> Result<(), String> {
        let path = PathManager::settings_path().ok_or("Could not determine settings path")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config dir: {}", e))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;
        fs::write(&path, content).map_err(|e| format!("Failed to write settings: {}", e))?;
        Ok(())
    }
}

/// The two backend URLs the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub chat: String,
    pub ingest: String,
}

impl Endpoints {
    /// Resolve endpoints from CLI overrides, the environment, and the
    /// settings file, in that order of precedence.
    pub fn resolve(
        cli_chat: Option<String>,
        cli_ingest: Option<String>,
        settings: &Settings,
    ) -> Self {
        Endpoints {
            chat: pick(
                cli_chat,
                std::env::var(CHAT_URL_ENV).ok(),
                settings.chat_endpoint.clone(),
                DEFAULT_CHAT_URL,
            ),
            ingest: pick(
                cli_ingest,
                std::env::var(INGEST_URL_ENV).ok(),
                settings.ingest_endpoint.clone(),
                DEFAULT_INGEST_URL,
            ),
        }
    }
}

fn pick(
    cli: Option<String>,
    env: Option<String>,
    stored: Option<String>,
    default: &str,
) -> String {
    cli.or(env)
        .or(stored)
        .unwrap_or_else(|| default.to_string())
}
