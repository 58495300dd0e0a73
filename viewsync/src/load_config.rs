//! `load_config` module: Loads a static YAML config and injects secrets from the environment.
//!
//! This module is the only place where untrusted YAML is parsed and where the
//! process environment is read. Everything downstream receives the resulting
//! [`CliConfig`] by reference.
//!
//! # Responsibilities
//! - Parse the YAML file into typed sections (storage, conversion, index, sync)
//! - Inject secrets from the environment: `VIEWSYNC_ACCESS_TOKEN`,
//!   `VIEWSYNC_VIEW_API_KEY` and `VIEWSYNC_USER_ID`
//! - Fail with a message naming the offending file or variable
//!
//! # Errors
//! All errors use `anyhow::Error` and surface at the CLI boundary.
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};
use viewsync_core::config::SyncConfig;
use viewsync_core::contract::Credentials;

pub const ACCESS_TOKEN_VAR: &str = "VIEWSYNC_ACCESS_TOKEN";
pub const VIEW_API_KEY_VAR: &str = "VIEWSYNC_VIEW_API_KEY";
pub const USER_ID_VAR: &str = "VIEWSYNC_USER_ID";

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversionSection {
    pub api_base: String,
    /// Base of the storage content API the conversion service pulls files from.
    pub content_api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexSection {
    pub url: String,
    pub name: String,
}

/// The requesting user, as resolved from the environment.
#[derive(Debug, Clone)]
pub struct SessionSection {
    pub user_id: String,
    pub credentials: Credentials,
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub storage: StorageSection,
    pub conversion: ConversionSection,
    pub index: IndexSection,
    pub sync: SyncConfig,
    pub view_api_key: String,
    pub session: SessionSection,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    storage: StorageSection,
    conversion: ConversionSection,
    index: IndexSection,
    #[serde(default)]
    sync: SyncConfig,
}

fn required_env(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        Ok(_) => {
            error!(key, "Environment variable is empty");
            anyhow::bail!("{key} environment variable is empty")
        }
        Err(e) => {
            error!(error = ?e, key, "Environment variable not set");
            Err(anyhow::anyhow!("{key} environment variable not set: {e}"))
        }
    }
}

/// Loads a static YAML config file (no secrets) and injects required env vars for secrets.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = fs::read_to_string(path_ref)
        .with_context(|| format!("Failed to read config file {:?}", path_ref))?;

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let access_token = required_env(ACCESS_TOKEN_VAR)?;
    let view_api_key = required_env(VIEW_API_KEY_VAR)?;
    let user_id = required_env(USER_ID_VAR)?;
    info!(
        access_token_len = access_token.len(),
        view_api_key_len = view_api_key.len(),
        user_id = %user_id,
        "Secrets injected from environment"
    );

    raw.sync.trace_loaded();

    Ok(CliConfig {
        storage: raw.storage,
        conversion: raw.conversion,
        index: raw.index,
        sync: raw.sync,
        view_api_key,
        session: SessionSection {
            user_id,
            credentials: Credentials::new(access_token),
        },
    })
}
