use std::sync::OnceLock;

use regex::bytes::Regex;
use reqwest::blocking::Client;
use tracing::debug;

use crate::error::{Error, Result};
use crate::http;

/// Marker looked for in the raw page body. Case-sensitive.
pub const PLATFORM_TOKEN: &str = "shopify";

pub fn contains_platform_token(body: &[u8]) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(&regex::escape(PLATFORM_TOKEN)).unwrap());
    re.is_match(body)
}

/// GET `url` and report whether the body mentions the platform token.
/// The status code is not checked; only transport failures are errors.
pub fn is_shopify_store(client: &Client, url: &str, max_body_bytes: u64) -> Result<bool> {
    let response = client.get(url).send().map_err(|e| Error::fetch(url, e))?;
    let status = response.status();
    let body = http::read_body(response, max_body_bytes).map_err(|e| Error::fetch(url, e))?;

    let matched = contains_platform_token(&body);
    debug!(url, status = status.as_u16(), bytes = body.len(), matched, "classified store");
    Ok(matched)
}
