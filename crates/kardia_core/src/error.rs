//! Failure taxonomy for the engine.
//!
//! Nothing here is fatal to the process: validation failures never reach the
//! network, transport failures feed the reconnect policy, backend failures
//! surface the server's own message, and persistence failures degrade to
//! defaults. Display output is the bare surfaced message; use [`KardiaError::kind`]
//! when logging needs the category.

/// Typed failure surfaced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum KardiaError {
    /// Malformed caller input, rejected synchronously before any I/O.
    #[error("{0}")]
    Validation(String),

    /// Connection refused, timeout, or malformed response body.
    #[error("{0}")]
    Transport(String),

    /// Well-formed error payload from the backend; the message is the
    /// payload's `detail` text verbatim.
    #[error("{0}")]
    Backend(String),

    /// Durable storage failed; the state survives in memory and the write is
    /// retried on the next mutation.
    #[error("{0}")]
    Persistence(String),
}

impl KardiaError {
    /// Stable category label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            KardiaError::Validation(_) => "validation",
            KardiaError::Transport(_) => "transport",
            KardiaError::Backend(_) => "backend",
            KardiaError::Persistence(_) => "persistence",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_bare_message() {
        let err = KardiaError::Backend("bad state".to_string());
        assert_eq!(err.to_string(), "bad state");
        assert_eq!(err.kind(), "backend");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(KardiaError::Validation(String::new()).kind(), "validation");
        assert_eq!(KardiaError::Transport(String::new()).kind(), "transport");
        assert_eq!(KardiaError::Persistence(String::new()).kind(), "persistence");
    }
}
