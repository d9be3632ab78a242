use std::fmt;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

const ENV_PREFIX: &str = "SHOPIFY_ANALYZER";
const DEFAULT_CONFIG_NAME: &str = "shopify-analyzer";
const DATA_DIR: &str = "data";

pub const DEFAULT_API_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Runtime settings, layered: defaults < config file < `SHOPIFY_ANALYZER_*` env vars.
#[derive(Clone, Deserialize)]
pub struct Settings {
    // Accepted for parity with server-backed stores; SQLite does not use them.
    #[serde(default)]
    pub db_user: Option<String>,
    #[serde(default)]
    pub db_password: Option<String>,
    #[serde(default)]
    pub db_host: Option<String>,

    #[serde(default = "default_db_name")]
    pub db_name: String,
    /// Explicit database file; overrides `data/<db_name>.sqlite`.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,

    /// A list, or one comma-separated string (the form env vars take).
    #[serde(default, deserialize_with = "url_list")]
    pub target_urls: Vec<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
}

fn url_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum UrlList {
        Joined(String),
        Items(Vec<String>),
    }

    let urls = match UrlList::deserialize(deserializer)? {
        UrlList::Joined(s) => s.split(',').map(str::to_string).collect(),
        UrlList::Items(items) => items,
    };
    Ok(urls
        .into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect())
}

fn default_db_name() -> String {
    "shopify_analyzer".to_string()
}

fn default_api_endpoint() -> String {
    DEFAULT_API_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_body_bytes() -> u64 {
    10 * 1024 * 1024
}

impl Settings {
    /// Load settings. An explicit `path` must exist; otherwise
    /// `shopify-analyzer.{toml,yaml,json}` is picked up if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings)
    }

    pub fn db_path(&self) -> PathBuf {
        match &self.db_path {
            Some(p) => p.clone(),
            None => Path::new(DATA_DIR).join(format!("{}.sqlite", self.db_name)),
        }
    }

    pub fn require_api_key(&self) -> Result<&str> {
        if self.api_key.trim().is_empty() {
            return Err(Error::MissingApiKey);
        }
        Ok(&self.api_key)
    }

    /// Names of server-only connection options that were set but have no effect.
    pub fn unused_db_options(&self) -> Vec<&'static str> {
        [
            ("db_user", self.db_user.is_some()),
            ("db_password", self.db_password.is_some()),
            ("db_host", self.db_host.is_some()),
        ]
        .into_iter()
        .filter(|(_, set)| *set)
        .map(|(name, _)| name)
        .collect()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            db_user: None,
            db_password: None,
            db_host: None,
            db_name: default_db_name(),
            db_path: None,
            api_key: String::new(),
            api_endpoint: default_api_endpoint(),
            model: default_model(),
            target_urls: Vec::new(),
            request_timeout_secs: default_request_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn redact<T>(value: &Option<T>) -> &'static str {
    match value {
        Some(_) => "<redacted>",
        None => "<unset>",
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_empty() { "<unset>" } else { "<redacted>" };
        f.debug_struct("Settings")
            .field("db_user", &self.db_user)
            .field("db_password", &redact(&self.db_password))
            .field("db_host", &self.db_host)
            .field("db_name", &self.db_name)
            .field("db_path", &self.db_path())
            .field("api_key", &api_key)
            .field("api_endpoint", &self.api_endpoint)
            .field("model", &self.model)
            .field("target_urls", &self.target_urls)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}
