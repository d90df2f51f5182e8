//! Conflict resolution policy.
//!
//! The policy is unconditionally server-wins: deterministic and auditable
//! beats clever for a single-owner-per-record model where true concurrent
//! edits are rare. Every resolution that discards a value is recorded so
//! the user can see what happened.

use crate::models::Record;

/// Policy name written into the conflict audit log
pub const SERVER_WINS: &str = "server_wins";

/// Which side of a conflict keeps its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Local,
    Remote,
}

/// Outcome of resolving one conflicting pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub winner: Winner,
    /// Whether an audit entry must be appended
    pub record_conflict: bool,
}

/// Decide between a local row with an unresolved replication intent and an
/// incoming remote row for the same entity.
#[must_use]
pub fn resolve(_local: &Record, _remote: &Record) -> Resolution {
    Resolution {
        winner: Winner::Remote,
        record_conflict: true,
    }
}
