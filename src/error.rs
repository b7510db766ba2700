// =============================================================================
// Engine error kinds
// =============================================================================
//
// These are the kinds an internal caller may need to branch on (local
// recovery vs surfaced-to-scheduler). Most call sites use `anyhow::Result`
// with `.context(...)`; this type exists only where a caller needs to match
// on *what kind* of failure occurred, not just log it.
// =============================================================================

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    GatewayTransient,
    GatewayPermanent,
    Parse,
    Insufficient,
    PolicyBlocked,
    CircuitPaused,
    KillSwitch,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Config => "ConfigError",
            Self::GatewayTransient => "GatewayTransient",
            Self::GatewayPermanent => "GatewayPermanent",
            Self::Parse => "ParseError",
            Self::Insufficient => "Insufficient",
            Self::PolicyBlocked => "PolicyBlocked",
            Self::CircuitPaused => "CircuitPaused",
            Self::KillSwitch => "KillSwitch",
            Self::Internal => "Internal",
        };
        write!(f, "{s}")
    }
}

impl ErrorKind {
    /// Whether a cycle may absorb this error locally (substitute a safe
    /// default and continue) rather than abort and notify the breaker.
    pub fn is_locally_recoverable(&self) -> bool {
        matches!(
            self,
            Self::GatewayTransient | Self::Parse | Self::Insufficient
        )
    }
}

/// An engine-level error: a kind plus a human-readable message.
#[derive(Debug, Clone)]
pub struct EngineError {
    pub kind: ErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_is_locally_recoverable() {
        assert!(ErrorKind::GatewayTransient.is_locally_recoverable());
        assert!(ErrorKind::Parse.is_locally_recoverable());
        assert!(ErrorKind::Insufficient.is_locally_recoverable());
    }

    #[test]
    fn permanent_kinds_surface_to_scheduler() {
        assert!(!ErrorKind::GatewayPermanent.is_locally_recoverable());
        assert!(!ErrorKind::Internal.is_locally_recoverable());
        assert!(!ErrorKind::KillSwitch.is_locally_recoverable());
    }

    #[test]
    fn display_matches_kind_name() {
        let e = EngineError::new(ErrorKind::Parse, "bad chain record");
        assert_eq!(e.to_string(), "ParseError: bad chain record");
    }
}
