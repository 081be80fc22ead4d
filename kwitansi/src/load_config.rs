/// `load_config` module: loads the static YAML config and injects secrets from
/// the environment into a [`CliConfig`].
///
/// # Responsibilities
/// - Parse the user-supplied YAML into typed sections, filling defaults
/// - Read the URL signing key from `KWITANSI_SIGNING_KEY`; it never lives in YAML
/// - Fail with a clear diagnostic on any missing file, bad YAML or missing secret
///
/// # Errors
/// All errors use `anyhow::Error` and surface at the CLI boundary.
///
/// Accepted schema:
///
/// ```yaml
/// storage:
///   root: ./bucket
/// render:
///   city: Jakarta
///   timeout_secs: 30
/// link_ttl_secs: 900
/// ```
use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

pub const SIGNING_KEY_VAR: &str = "KWITANSI_SIGNING_KEY";

#[derive(Debug)]
pub struct CliConfig {
    pub storage: StorageSection,
    pub render: RenderSection,
    pub link_ttl: Duration,
    pub signing_key: String,
}

#[derive(Debug, Deserialize)]
pub struct StorageSection {
    /// Root directory of the filesystem bucket.
    pub root: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct RenderSection {
    #[serde(default = "default_city")]
    pub city: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            city: default_city(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_city() -> String {
    kwitansi_core::layout::DEFAULT_CITY.to_string()
}

fn default_timeout_secs() -> u64 {
    kwitansi_core::render::DEFAULT_RENDER_TIMEOUT.as_secs()
}

fn default_link_ttl_secs() -> u64 {
    kwitansi_core::publish::DEFAULT_LINK_TTL.as_secs()
}

/// Loads a static YAML config file (no secrets) and injects required env vars for secrets.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    #[derive(Debug, Deserialize)]
    struct RawConfig {
        storage: StorageSection,
        #[serde(default)]
        render: RenderSection,
        #[serde(default = "default_link_ttl_secs")]
        link_ttl_secs: u64,
    }

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

    if raw.link_ttl_secs == 0 {
        anyhow::bail!("link_ttl_secs must be greater than zero");
    }
    if raw.render.timeout_secs == 0 {
        anyhow::bail!("render.timeout_secs must be greater than zero");
    }

    let signing_key = match std::env::var(SIGNING_KEY_VAR) {
        Ok(key) if !key.is_empty() => {
            info!("{SIGNING_KEY_VAR} found in env");
            key
        }
        Ok(_) => {
            error!("{SIGNING_KEY_VAR} is empty");
            anyhow::bail!("{SIGNING_KEY_VAR} environment variable is empty");
        }
        Err(e) => {
            error!(error = ?e, "{SIGNING_KEY_VAR} environment variable not set");
            return Err(anyhow::anyhow!(
                "{SIGNING_KEY_VAR} environment variable not set: {e}"
            ));
        }
    };

    info!(
        storage_root = %raw.storage.root.display(),
        city = %raw.render.city,
        link_ttl_secs = raw.link_ttl_secs,
        "Config loaded and merged successfully"
    );

    Ok(CliConfig {
        storage: raw.storage,
        render: raw.render,
        link_ttl: Duration::from_secs(raw.link_ttl_secs),
        signing_key,
    })
}
