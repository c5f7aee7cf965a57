//! Error types for ModSync.

use thiserror::Error;

/// Errors that can occur when decoding a protocol line.
///
/// A decode error always means the line is dropped; there is no retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Line does not carry the protocol prefix (ordinary chat).
    #[error("not a protocol line")]
    MissingPrefix,

    /// Command token is not one we know.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A required field is absent.
    #[error("{command}: missing {field}")]
    MissingField {
        /// Command being decoded.
        command: &'static str,
        /// Name of the absent field.
        field: &'static str,
    },

    /// No roster name, own name or structural anchor located the sender name.
    #[error("{command}: could not anchor sender name in {remainder:?}")]
    Unanchored {
        /// Command being decoded.
        command: &'static str,
        /// Text following the command token.
        remainder: String,
    },

    /// `MODS_MATCH` carried a result other than `SUCCESS`.
    #[error("unexpected match result: {0}")]
    UnexpectedResult(String),
}

/// Errors from the chat transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Channel not yet initialized. Retried with a fixed backoff.
    #[error("chat channel unavailable")]
    Unavailable,

    /// Channel refused the line.
    #[error("chat channel rejected line: {0}")]
    Rejected(String),
}

/// Errors from the roster's eviction primitive.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvictError {
    /// Participant not (yet) resolvable to a transport-level identity.
    #[error("eviction target not found: {0}")]
    NotFound(String),
}

/// Errors from the local enforcement toggle.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ToggleError {
    /// Only the session owner may toggle enforcement.
    #[error("enforcement can only be toggled by the session owner")]
    NotOwner,

    /// Enforcement cannot be toggled while gameplay is active.
    #[error("enforcement cannot be toggled during gameplay")]
    GameplayActive,
}

/// Top-level ModSync errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Decode error.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Eviction error.
    #[error("eviction error: {0}")]
    Evict(#[from] EvictError),

    /// Toggle error.
    #[error("toggle error: {0}")]
    Toggle(#[from] ToggleError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DecodeError::MissingField {
            command: "CLIENT_MODS",
            field: "name",
        };
        assert_eq!(err.to_string(), "CLIENT_MODS: missing name");

        let err: SyncError = EvictError::NotFound("Bob".into()).into();
        assert_eq!(err.to_string(), "eviction error: eviction target not found: Bob");
    }
}
