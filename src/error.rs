use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure while GETting a store page (classification or content fetch).
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: BoxError,
    },

    /// Content fetch answered with something other than 200.
    #[error("failed to fetch website content from {url}, status code: {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("HTML parsing error: {0}")]
    Parse(String),

    /// Transport failure while talking to the chat-completion service.
    #[error("chat completion request failed: {0}")]
    Network(#[source] BoxError),

    #[error("no completion choices in chat response")]
    NoCompletion,

    #[error("malformed chat response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("api_key is not configured (set SHOPIFY_ANALYZER_API_KEY or api_key in the config file)")]
    MissingApiKey,
}

impl Error {
    pub fn fetch(url: &str, source: impl Into<BoxError>) -> Self {
        Self::Fetch {
            url: url.to_string(),
            source: source.into(),
        }
    }

    pub fn network(source: impl Into<BoxError>) -> Self {
        Self::Network(source.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
