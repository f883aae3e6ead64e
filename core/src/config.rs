//! Connection parameters for an FMR instance, loaded from TOML.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading `ApiParams`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value `{key}`: {reason}")]
    Invalid { key: &'static str, reason: &'static str },
}

/// Everything needed to address one FMR instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiParams {
    /// Scheme, host and optional prefix, e.g. `https://fmr.example.org`.
    pub base_url: String,

    /// Path to the codelist structure resource, e.g. `sdmx/v2/structure/codelist`.
    pub structure_path: String,

    /// Appended verbatim to structure URLs, e.g. `?format=fusion-json`.
    #[serde(default = "default_format_suffix")]
    pub format_suffix: String,

    /// Maintenance agency used when reading codelists.
    #[serde(default = "default_agency")]
    pub agency: String,

    /// Codelist version used when reading codelists.
    #[serde(default = "default_version")]
    pub version: String,

    /// Named codelists, e.g. `ref_area = "CL_REF_AREA"`.
    #[serde(default)]
    pub codelists: BTreeMap<String, String>,

    pub endpoints: Endpoints,

    #[serde(default)]
    pub polling: PollConfig,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Root for batch validation; files live under `<data_dir>/<folder>/`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Endpoint paths relative to `base_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub add_items: String,
    pub load: String,
    pub load_status: String,
}

/// Bounded polling of the load-status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_format_suffix() -> String {
    "?format=fusion-json".to_string()
}

fn default_agency() -> String {
    "WB".to_string()
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data").join("03_primary")
}

fn default_interval_secs() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    12
}

impl ApiParams {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let params: Self = toml::from_str(raw)?;
        params.validate()?;
        Ok(params)
    }

    /// Reject values that would make every request or poll fail outright.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "request_timeout_secs",
                reason: "must be at least 1",
            });
        }
        if self.polling.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "polling.max_attempts",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parameters matching the mock server's routes, rooted at `base_url`.
    pub fn for_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            structure_path: "sdmx/v2/structure/codelist".to_string(),
            format_suffix: default_format_suffix(),
            agency: default_agency(),
            version: default_version(),
            codelists: BTreeMap::from([("ref_area".to_string(), "CL_REF_AREA".to_string())]),
            endpoints: Endpoints {
                add_items: "ws/secure/sdmxapi/rest".to_string(),
                load: "ws/public/data/load".to_string(),
                load_status: "ws/public/data/loadStatus".to_string(),
            },
            polling: PollConfig::default(),
            request_timeout_secs: default_request_timeout_secs(),
            data_dir: default_data_dir(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Look up a codelist id by its configured name.
    pub fn codelist_id(&self, name: &str) -> Option<&str> {
        self.codelists.get(name).map(String::as_str)
    }
}
