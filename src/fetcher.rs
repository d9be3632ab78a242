use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::error::{Error, Result};
use crate::http;

/// Fetch the page body as text. Unlike classification, anything but a 200 is an error.
pub fn fetch_website_content(client: &Client, url: &str, max_body_bytes: u64) -> Result<String> {
    let response = client.get(url).send().map_err(|e| Error::fetch(url, e))?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(Error::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = http::read_body(response, max_body_bytes).map_err(|e| Error::fetch(url, e))?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}
