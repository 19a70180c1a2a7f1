use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BreezyError {
    /// Malformed or missing input. Never reaches an upstream service.
    #[error("{0}")]
    InvalidInput(String),

    /// The CRM reported the referenced record absent.
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        details: Option<Value>,
    },

    /// A local credential is missing. Raised before any network call.
    #[error("{0}")]
    NotConfigured(String),

    /// Remote 4xx/5xx, transport failure, or a response we could not decode.
    #[error("Upstream error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Upstream {
        status: Option<u16>,
        message: String,
        details: Option<Value>,
    },

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BreezyError {
    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
            details: None,
        }
    }

    /// HTTP status to surface at the API boundary. Upstream statuses pass through.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::NotFound { .. } => 404,
            Self::Upstream {
                status: Some(code), ..
            } if (400..600).contains(code) => *code,
            Self::NotConfigured(_)
            | Self::Upstream { .. }
            | Self::Config(_)
            | Self::Serialization(_) => 500,
        }
    }

    /// Upstream body (parsed JSON or raw text) when one was captured.
    pub fn details(&self) -> Option<&Value> {
        match self {
            Self::NotFound { details, .. } | Self::Upstream { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    /// Whether the message is safe and useful to show the caller as-is.
    pub fn is_client_facing(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::NotConfigured(_))
    }
}

impl From<reqwest::Error> for BreezyError {
    fn from(e: reqwest::Error) -> Self {
        let status = e.status().map(|s| s.as_u16());
        let message = if e.is_decode() {
            format!("malformed response: {e}")
        } else {
            e.to_string()
        };
        Self::upstream(status, message)
    }
}
