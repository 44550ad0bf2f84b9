use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} responded with {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("invalid {endpoint} payload: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The bot answered but refused the action; carries its message.
    #[error("{0}")]
    Rejected(String),

    #[error("invalid API base URL {url}: {reason}")]
    BaseUrl { url: String, reason: String },
}

impl ApiError {
    /// Server-provided message where there is one, for operator alerts.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Rejected(message) => message.clone(),
            other => other.to_string(),
        }
    }
}
