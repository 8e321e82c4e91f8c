//! Configuration types and loading
//!
//! Secrets are read from NORDIGEN_SECRET_ID / NORDIGEN_SECRET_KEY or from the
//! files named in the config, never from the TOML body itself.

use common::Secret;
use nordigen_client::ClientConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SECRET_ID_ENV: &str = "NORDIGEN_SECRET_ID";
pub const SECRET_KEY_ENV: &str = "NORDIGEN_SECRET_KEY";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub nordigen: NordigenConfig,
}

/// API connection settings
#[derive(Debug, Deserialize)]
pub struct NordigenConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub secret_id_file: Option<PathBuf>,
    #[serde(default)]
    pub secret_key_file: Option<PathBuf>,
    #[serde(skip)]
    pub secret_id: Option<Secret<String>>,
    #[serde(skip)]
    pub secret_key: Option<Secret<String>>,
}

impl Default for NordigenConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            secret_id_file: None,
            secret_key_file: None,
            secret_id: None,
            secret_key: None,
        }
    }
}

fn default_base_url() -> String {
    nordigen_client::DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    nordigen_client::DEFAULT_TIMEOUT.as_secs()
}

impl Config {
    /// Load configuration from a TOML file, then resolve secrets.
    ///
    /// Each secret comes from its env var if set, else from its `*_file`.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        let nordigen = &mut config.nordigen;

        if !nordigen.base_url.starts_with("http://")
            && !nordigen.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                nordigen.base_url
            )));
        }

        if nordigen.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        nordigen.secret_id = Some(resolve_secret(
            SECRET_ID_ENV,
            nordigen.secret_id_file.as_deref(),
        )?);
        nordigen.secret_key = Some(resolve_secret(
            SECRET_KEY_ENV,
            nordigen.secret_key_file.as_deref(),
        )?);

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("nordigen.toml")
    }

    /// Settings for `nordigen_client::Client`. Fails if a secret is missing.
    pub fn client_config(&self) -> common::Result<ClientConfig> {
        let n = &self.nordigen;
        let secret_id = n
            .secret_id
            .clone()
            .ok_or(common::Error::MissingSecret(SECRET_ID_ENV))?;
        let secret_key = n
            .secret_key
            .clone()
            .ok_or(common::Error::MissingSecret(SECRET_KEY_ENV))?;

        Ok(ClientConfig {
            secret_id,
            secret_key,
            base_url: n.base_url.clone(),
            timeout: Duration::from_secs(n.timeout_secs),
        })
    }
}

fn resolve_secret(env: &'static str, file: Option<&Path>) -> common::Result<Secret<String>> {
    if let Ok(value) = std::env::var(env) {
        let secret = Secret::new(value);
        if !secret.is_blank() {
            return Ok(secret);
        }
    }
    let Some(file) = file else {
        return Err(common::Error::MissingSecret(env));
    };
    let value = std::fs::read_to_string(file).map_err(|e| {
        common::Error::Config(format!("failed to read {}: {e}", file.display()))
    })?;
    let secret = Secret::new(value.trim().to_owned());
    if secret.is_blank() {
        return Err(common::Error::MissingSecret(env));
    }
    Ok(secret)
}
