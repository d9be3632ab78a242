use std::io::Read;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use thiserror::Error;

use crate::settings::Settings;

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("failed to read response body: {0}")]
    Read(#[from] std::io::Error),
    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: u64 },
}

/// Blocking client shared by every outbound call. Default redirect policy, no extra headers.
pub fn build_client(settings: &Settings) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(settings.request_timeout_secs))
        .build()
}

/// Read the whole body, refusing anything larger than `limit` bytes.
pub fn read_body(response: Response, limit: u64) -> Result<Vec<u8>, BodyError> {
    if let Some(len) = response.content_length() {
        if len > limit {
            return Err(BodyError::TooLarge { limit });
        }
    }

    let mut buf = Vec::new();
    response.take(limit.saturating_add(1)).read_to_end(&mut buf)?;
    if buf.len() as u64 > limit {
        return Err(BodyError::TooLarge { limit });
    }
    Ok(buf)
}
