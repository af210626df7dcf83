//! Error types for postageapp.

use thiserror::Error;

/// Broad classification of a [`PostageError`].
///
/// Callers that only need to branch on "what went wrong" (bad setup, bad input,
/// network trouble, API refusal) can match on this instead of every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No project selected, unknown project, or bad credential configuration.
    Configuration,
    /// Malformed setter input or missing required fields before a send.
    Validation,
    /// Connection failure or a response that could not be understood.
    Transport,
    /// The API answered with a non-`ok` status.
    Remote,
    /// Attachment content could not be loaded.
    AttachmentFetch,
}

/// Errors that can occur when building or sending PostageApp messages.
#[derive(Debug, Clone, Error)]
pub enum PostageError {
    /// Project name is not present in the credential table.
    #[error("Unknown project: {0}")]
    UnknownProject(String),

    /// An API call was attempted before a project was selected.
    #[error("Project not set")]
    ProjectNotSet,

    /// Configuration error (missing env var, malformed project list, etc.)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Setter received input of the wrong shape.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing required field for a send (e.g., subject).
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Invalid email address format.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Remote attachment content could not be fetched.
    #[error("Failed to fetch attachment from {location}: {message}")]
    AttachmentFetch { location: String, message: String },

    /// Attachment file not found.
    #[error("Attachment file not found: {0}")]
    AttachmentFileNotFound(String),

    /// Failed to read attachment file.
    #[error("Failed to read attachment: {0}")]
    AttachmentReadError(String),

    /// The API could not be reached or its answer could not be parsed.
    #[error("Error accessing PostageApp API: {0}")]
    Transport(String),

    /// A successful response lacked the data an operation returns.
    #[error("Unexpected API response: missing {0}")]
    UnexpectedResponse(String),

    /// The API answered with a non-`ok` status.
    #[error("PostageApp API error ({status}): {message}")]
    Remote { status: String, message: String },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),
}

impl PostageError {
    /// Create an attachment fetch error.
    pub fn fetch(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AttachmentFetch {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownProject(_) | Self::ProjectNotSet | Self::Configuration(_) => {
                ErrorKind::Configuration
            }
            Self::Validation(_) | Self::MissingField(_) | Self::InvalidAddress(_) => {
                ErrorKind::Validation
            }
            Self::AttachmentFetch { .. }
            | Self::AttachmentFileNotFound(_)
            | Self::AttachmentReadError(_) => ErrorKind::AttachmentFetch,
            Self::Transport(_) | Self::UnexpectedResponse(_) | Self::Json(_) => {
                ErrorKind::Transport
            }
            Self::Remote { .. } => ErrorKind::Remote,
        }
    }

    /// The message text reported by the API, if this is a remote error.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            Self::Remote { message, .. } => Some(message),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PostageError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for PostageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
