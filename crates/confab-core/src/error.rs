//! Error types for confab.

use serde::Serialize;
use thiserror::Error;

/// The error type shared by every confab layer.
///
/// Gateway failures are normalised into the transport-independent variants
/// (`Network`, `NotAuthenticated`, `TokenExpired`, `Validation`, `Server`)
/// so the presentation layer can decide what to offer (retry, re-login, ...).
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum ConfabError {
    /// The message text was empty or whitespace only.
    #[error("Message text is empty")]
    EmptyMessage,

    /// A send is already awaiting its response.
    #[error("A message is already being sent")]
    SendInFlight,

    /// The operation needs an active conversation and there is none.
    #[error("No active conversation")]
    NoActiveConversation,

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Transport failure, including timeouts.
    #[error("Network error: {0}")]
    Network(String),

    /// The backend rejected the request credentials.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The backend reported that the session token has expired.
    #[error("Authentication token expired")]
    TokenExpired,

    /// The backend rejected the request payload.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backend failed while handling the request.
    #[error("Server error: {0}")]
    Server(String),

    /// The OAuth callback `state` does not match the one issued at start.
    #[error("OAuth state mismatch")]
    OAuthStateMismatch,

    /// Local durable storage failed (cache, state token store).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConfabError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a Server error
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server(message.into())
    }

    /// Creates a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Errors raised before any state was touched (bad input, missing context).
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::EmptyMessage | Self::SendInFlight | Self::NoActiveConversation
        )
    }

    /// Errors worth offering a plain retry for.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Server(_))
    }

    /// Errors that need the user to sign in again.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::TokenExpired)
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ConfabError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<serde_json::Error> for ConfabError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ConfabError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for ConfabError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for ConfabError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, ConfabError>`.
pub type Result<T> = std::result::Result<T, ConfabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(ConfabError::EmptyMessage.is_precondition());
        assert!(ConfabError::network("offline").is_transient());
        assert!(ConfabError::TokenExpired.is_auth());
        assert!(!ConfabError::OAuthStateMismatch.is_transient());
        assert!(!ConfabError::validation("bad").is_precondition());
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let err: ConfabError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        match err {
            ConfabError::Storage(message) => assert!(message.contains("PermissionDenied")),
            other => panic!("Expected Storage error, got {other:?}"),
        }
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ConfabError::server("boom").to_string(),
            "Server error: boom"
        );
        assert_eq!(
            ConfabError::not_found("conversation", "c-1").to_string(),
            "Entity not found: conversation 'c-1'"
        );
    }
}
