//! Conversation stance — the four states in the §4.3 state machine.

use serde::{Deserialize, Serialize};

/// The agent's stance toward the current user, per §4.3.
///
/// Ordered `normal < monitoring < honeypot < blocked` so threshold
/// comparisons (`mode >= Mode::Honeypot`) read naturally; `blocked` is
/// terminal within a session (§8 invariant 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// No elevated suspicion; turns flow through unmodified.
    Normal,
    /// Elevated suspicion; turns are still answered normally but logged.
    Monitoring,
    /// Deflecting; the Response Strategy substitutes a honeypot reply.
    Honeypot,
    /// Terminal; the user receives a fixed block reply and is not scanned.
    Blocked,
}

impl Mode {
    /// `true` once a mode is terminal — currently only `Blocked`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Blocked)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Monitoring => write!(f, "monitoring"),
            Self::Honeypot => write!(f, "honeypot"),
            Self::Blocked => write!(f, "blocked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_matches_escalation_order() {
        assert!(Mode::Normal < Mode::Monitoring);
        assert!(Mode::Monitoring < Mode::Honeypot);
        assert!(Mode::Honeypot < Mode::Blocked);
    }

    #[test]
    fn only_blocked_is_terminal() {
        assert!(!Mode::Normal.is_terminal());
        assert!(!Mode::Monitoring.is_terminal());
        assert!(!Mode::Honeypot.is_terminal());
        assert!(Mode::Blocked.is_terminal());
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Mode::Honeypot).unwrap(), "\"honeypot\"");
    }
}
