use std::{collections::HashMap, fs, path::PathBuf};

use anyhow::Context;
use approval_core::InMemoryRegistrationStore;
use serde::Deserialize;
use shared::protocol::RegistrationRecord;

#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    pub seed_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8000".into(),
            seed_path: None,
        }
    }
}

pub fn load_settings() -> Settings {
    let file_cfg = fs::read_to_string("registry.toml")
        .ok()
        .and_then(|raw| toml::from_str::<HashMap<String, String>>(&raw).ok())
        .unwrap_or_default();
    resolve_settings(&file_cfg, |key| std::env::var(key).ok())
}

/// Defaults, then `registry.toml` keys, then environment variables. The
/// `APP__` form of a variable wins over the plain one.
pub fn resolve_settings(
    file_cfg: &HashMap<String, String>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(v) = file_cfg.get("bind_addr") {
        settings.server_bind = v.clone();
    }
    if let Some(v) = file_cfg.get("seed_path") {
        settings.seed_path = Some(PathBuf::from(v));
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = env("SEED_PATH") {
        settings.seed_path = Some(PathBuf::from(v));
    }
    if let Some(v) = env("APP__SEED_PATH") {
        settings.seed_path = Some(PathBuf::from(v));
    }

    settings
}

/// Builds the registry collection, seeded from a JSON array of records when
/// a seed file is configured.
pub fn load_store(settings: &Settings) -> anyhow::Result<InMemoryRegistrationStore> {
    let Some(path) = &settings.seed_path else {
        return Ok(InMemoryRegistrationStore::default());
    };

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file '{}'", path.display()))?;
    let records: Vec<RegistrationRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("seed file '{}' is not a registration array", path.display()))?;
    InMemoryRegistrationStore::from_records(records)
        .with_context(|| format!("seed file '{}' contains an invalid record", path.display()))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
