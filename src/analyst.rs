//! Chat-completion client that turns extraction text into a written assessment.

use reqwest::blocking::Client;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::http;
use crate::settings::Settings;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const USER_PROMPT_PREFIX: &str = "Analyze the following Shopify store data and provide feedback: ";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
}

impl ChatRequest {
    pub fn for_store(model: &str, store_data: &str) -> Self {
        ChatRequest {
            model: model.to_string(),
            messages: vec![
                Message {
                    role: "system".into(),
                    content: SYSTEM_PROMPT.into(),
                },
                Message {
                    role: "user".into(),
                    content: format!("{}{}", USER_PROMPT_PREFIX, store_data),
                },
            ],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub object: String,
    #[serde(deserialize_with = "null_as_default")]
    pub created: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub model: String,
    #[serde(deserialize_with = "null_as_default")]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Choice {
    #[serde(deserialize_with = "null_as_default")]
    pub message: ChoiceMessage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChoiceMessage {
    #[serde(deserialize_with = "null_as_default")]
    pub role: String,
    pub content: Option<String>,
}

/// `null` decodes to the empty value, like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// What a response body decodes to.
#[derive(Debug)]
pub enum Completion {
    Success(String),
    EmptyChoices,
    MalformedBody(serde_json::Error),
}

impl Completion {
    pub fn from_body(body: &[u8]) -> Self {
        match serde_json::from_slice::<Option<ChatResponse>>(body) {
            Ok(resp) => {
                let resp = resp.unwrap_or_default();
                debug!(
                    id = %resp.id,
                    object = %resp.object,
                    created = resp.created,
                    model = %resp.model,
                    choices = resp.choices.len(),
                    "decoded chat response"
                );
                match resp.choices.into_iter().next() {
                    Some(choice) => {
                        debug!(role = %choice.message.role, "using first choice");
                        Completion::Success(choice.message.content.unwrap_or_default())
                    }
                    None => Completion::EmptyChoices,
                }
            }
            Err(e) => Completion::MalformedBody(e),
        }
    }

    pub fn into_result(self) -> Result<String> {
        match self {
            Completion::Success(content) => Ok(content),
            Completion::EmptyChoices => Err(Error::NoCompletion),
            Completion::MalformedBody(e) => Err(Error::Decode(e)),
        }
    }
}

pub struct ChatClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_body_bytes: u64,
}

impl ChatClient {
    pub fn new(http: Client, settings: &Settings) -> Result<Self> {
        Ok(ChatClient {
            http,
            endpoint: settings.api_endpoint.clone(),
            api_key: settings.require_api_key()?.to_string(),
            model: settings.model.clone(),
            max_body_bytes: settings.max_body_bytes,
        })
    }

    /// Single attempt; rate-limit and server errors are not retried.
    pub fn analyze_store(&self, store_data: &str) -> Result<String> {
        let request = ChatRequest::for_store(&self.model, store_data);

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(Error::network)?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), endpoint = %self.endpoint, "chat service returned non-success status");
        }

        let body = http::read_body(response, self.max_body_bytes).map_err(Error::network)?;
        debug!(bytes = body.len(), "received chat response");
        Completion::from_body(&body).into_result()
    }
}
