//! Runtime configuration read from the environment.

use std::path::PathBuf;

use crate::error::StoreError;
use crate::fund::DEFAULT_FUND_TARGET;
use crate::lenient::parse_amount_text;
use crate::store::{LocalStore, RestStore, Store, DATA_FILE};

const APP_DIR_NAME: &str = "UniformManager";
const DEFAULT_PASSPHRASE: &str = "uniform-manager";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Hosted store credentials; `None` selects the local encrypted file.
    pub remote: Option<RemoteConfig>,
    pub data_dir: PathBuf,
    pub passphrase: String,
    pub fund_target: f64,
}

fn first_set(lookup: &impl Fn(&str) -> Option<String>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| lookup(key))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let url = first_set(&lookup, &["UNIFORM_MANAGER_SUPABASE_URL", "SUPABASE_URL"]);
        let api_key = first_set(&lookup, &["UNIFORM_MANAGER_SUPABASE_KEY", "SUPABASE_ANON_KEY"]);
        let remote = match (url, api_key) {
            (Some(url), Some(api_key)) => Some(RemoteConfig { url, api_key }),
            (Some(_), None) | (None, Some(_)) => {
                log::warn!("hosted store needs both URL and key; using the local file");
                None
            }
            (None, None) => None,
        };

        let data_dir = first_set(&lookup, &["UNIFORM_MANAGER_DATA_DIR"])
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let passphrase = first_set(&lookup, &["UNIFORM_MANAGER_PASSPHRASE"]).unwrap_or_else(|| {
            if remote.is_none() {
                log::warn!(
                    "UNIFORM_MANAGER_PASSPHRASE not set; local data uses the default passphrase"
                );
            }
            DEFAULT_PASSPHRASE.to_string()
        });

        let fund_target = first_set(&lookup, &["UNIFORM_MANAGER_FUND_TARGET"])
            .and_then(|text| parse_amount_text(&text))
            .filter(|target| *target > 0.0)
            .unwrap_or(DEFAULT_FUND_TARGET);

        Self {
            remote,
            data_dir,
            passphrase,
            fund_target,
        }
    }

    pub fn data_file(&self) -> PathBuf {
        self.data_dir.join(DATA_FILE)
    }

    pub fn open_store(&self) -> Result<Box<dyn Store + Send>, StoreError> {
        match &self.remote {
            Some(remote) => {
                log::info!("using hosted store at {}", remote.url);
                Ok(Box::new(RestStore::new(&remote.url, &remote.api_key)?))
            }
            None => {
                let path = self.data_file();
                log::info!("using local store at {}", path.display());
                Ok(Box::new(LocalStore::open(path, &self.passphrase)?))
            }
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
