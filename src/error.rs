/// Errors returned by this crate.
///
/// The first four variants are the user-facing kinds produced by
/// [`SessionStore`](crate::session::SessionStore). Their `Display` output is a
/// human-readable message meant to be shown as-is. The remaining variants come
/// from the transport and configuration layers.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Input rejected locally; no request was sent.
    #[error("{0}")]
    Validation(String),

    /// The server rejected the credentials, or the returned token could not be decoded.
    #[error("{0}")]
    Authentication(String),

    /// The server answered successfully but left out a required field.
    #[error("{0}")]
    Protocol(String),

    /// Transport-level failure or server fault.
    #[error("{0}")]
    Network(String),

    /// Non-2xx response from the backend.
    #[error("{operation} failed with status {status}")]
    Api {
        operation: &'static str,
        status: u16,
        /// `message` field of the JSON error body, when the server sent one.
        message: Option<String>,
    },

    #[cfg(feature = "client")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed payload (token claims, log records, channel packets).
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The realtime channel could not be opened.
    #[error("Channel error: {0}")]
    Channel(String),
}

impl Error {
    /// Server-supplied message carried by an [`Error::Api`], if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// HTTP status carried by an [`Error::Api`], if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
