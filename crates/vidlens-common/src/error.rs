use thiserror::Error;

pub type Result<T> = std::result::Result<T, VidlensError>;

#[derive(Debug, Error)]
pub enum VidlensError {
    /// Credential acquisition failed or the issued token was unusable.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A collaborator answered with a non-success status.
    #[error("{context}: {status} {status_text}")]
    Upstream {
        context: String,
        status: u16,
        status_text: String,
        body: String,
    },

    /// The request never produced a response.
    #[error("{context}: {message}")]
    Transport { context: String, message: String },

    /// A success response could not be parsed.
    #[error("{context}: unexpected response body: {message}")]
    Decode { context: String, message: String },

    /// Missing or malformed request payload.
    #[error("invalid input: {0}")]
    Input(String),
}

impl VidlensError {
    pub fn upstream(context: &str, status: u16, status_text: &str, body: impl Into<String>) -> Self {
        VidlensError::Upstream {
            context: context.to_string(),
            status,
            status_text: status_text.to_string(),
            body: body.into(),
        }
    }

    pub fn transport(context: &str, err: impl std::fmt::Display) -> Self {
        VidlensError::Transport {
            context: context.to_string(),
            message: err.to_string(),
        }
    }

    pub fn decode(context: &str, err: impl std::fmt::Display) -> Self {
        VidlensError::Decode {
            context: context.to_string(),
            message: err.to_string(),
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(self, VidlensError::Input(_))
    }

    /// Upstream response body, if any, for diagnostics.
    pub fn body(&self) -> Option<&str> {
        match self {
            VidlensError::Upstream { body, .. } => Some(body),
            _ => None,
        }
    }
}
