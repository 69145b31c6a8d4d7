//! Support for library configuration options

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::schedule::Schedule;

/// The User-Agent sent by the [`Client`](crate::client::Client).
/// Feel free to override it when initing this library.
pub static USER_AGENT: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new(format!("courtside/{}", env!("CARGO_PKG_VERSION")))));

const DEFAULT_MAX_RETRIES: u32 = 4;

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

/// Where to find the backend and the local snapshots
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// The base URL of the booking API, e.g. `https://api.example.com/prod/`
    pub api_url: Url,
    /// How many times a request is retried on timeouts and gateway errors
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// The folder of the local [`Cache`](crate::cache::Cache)
    pub cache_folder: PathBuf,
    #[serde(default)]
    pub schedule: Schedule,
}

impl ClientConfig {
    pub fn new(api_url: Url, cache_folder: PathBuf) -> Self {
        Self {
            api_url,
            max_retries: DEFAULT_MAX_RETRIES,
            cache_folder,
            schedule: Schedule::default(),
        }
    }

    /// Read a configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let config = match std::fs::File::open(path) {
            Err(err) => {
                return Err(format!("Unable to open file {:?}: {}", path, err).into());
            },
            Ok(file) => serde_json::from_reader(file)?,
        };
        Ok(config)
    }
}

pub(crate) fn user_agent() -> String {
    USER_AGENT.lock().map(|ua| ua.clone()).unwrap_or_else(|poisoned| poisoned.into_inner().clone())
}
