//! Chat-completions client for OpenAI-compatible endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Output length and sampling temperature for one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Anything that can turn a message sequence into generated text.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, messages: &[Message], sampling: Sampling) -> Result<String, Error>;
}

pub struct Client {
    api_key: String,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl Client {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            api_key,
            base_url,
            model,
            http: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Completer for Client {
    async fn complete(&self, messages: &[Message], sampling: Sampling) -> Result<String, Error> {
        let request = ApiRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| ApiMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: sampling.max_tokens,
            temperature: sampling.temperature,
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!("POST {url} model={} messages={}", self.model, messages.len());

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        first_text(api_response)
    }
}

fn first_text(response: ApiResponse) -> Result<String, Error> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|text| text.trim().to_string())
        .ok_or(Error::Empty)
}

#[derive(Debug)]
pub enum Error {
    Http(String),
    Api(String),
    Parse(String),
    Empty,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Api(e) => write!(f, "API error: {e}"),
            Error::Parse(e) => write!(f, "Parse error: {e}"),
            Error::Empty => write!(f, "Empty response"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let messages = [Message::system("be kind"), Message::user("hi")];
        let request = ApiRequest {
            model: "gpt-test",
            messages: messages
                .iter()
                .map(|m| ApiMessage { role: m.role.as_str(), content: &m.content })
                .collect(),
            max_tokens: 220,
            temperature: 0.5,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-test");
        assert_eq!(json["max_tokens"], 220);
        assert_eq!(json["temperature"], 0.5);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_first_text_trims() {
        let response: ApiResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  hello there \n"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_text(response).unwrap(), "hello there");
    }

    #[test]
    fn test_no_choices_is_empty() {
        let response: ApiResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(first_text(response), Err(Error::Empty)));

        let response: ApiResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(matches!(first_text(response), Err(Error::Empty)));
    }

    #[test]
    fn test_null_content_is_empty() {
        let response: ApiResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(matches!(first_text(response), Err(Error::Empty)));
    }
}
