//! Closed set of synchronizable tables.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One synchronizable domain table.
///
/// The engine's "for each table" loops iterate [`SyncTable::ALL`]; free-form
/// table names from storage parse back via `FromStr` so an unknown name
/// surfaces as an error instead of a silent skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTable {
    Cameras,
    Lenses,
    Films,
    Rolls,
    Frames,
}

impl SyncTable {
    /// Every synchronizable table, in upload/download iteration order.
    pub const ALL: [Self; 5] = [
        Self::Cameras,
        Self::Lenses,
        Self::Films,
        Self::Rolls,
        Self::Frames,
    ];

    /// Physical table name in both the local and the remote store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cameras => "cameras",
            Self::Lenses => "lenses",
            Self::Films => "films",
            Self::Rolls => "rolls",
            Self::Frames => "frames",
        }
    }
}

impl fmt::Display for SyncTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncTable {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cameras" => Ok(Self::Cameras),
            "lenses" => Ok(Self::Lenses),
            "films" => Ok(Self::Films),
            "rolls" => Ok(Self::Rolls),
            "frames" => Ok(Self::Frames),
            other => Err(Error::UnknownTable(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_through_str() {
        for table in SyncTable::ALL {
            let parsed: SyncTable = table.as_str().parse().unwrap();
            assert_eq!(parsed, table);
        }
    }

    #[test]
    fn test_rejects_unknown_table() {
        assert!("notes".parse::<SyncTable>().is_err());
        assert!("".parse::<SyncTable>().is_err());
    }

    #[test]
    fn test_all_covers_every_variant() {
        assert_eq!(SyncTable::ALL.len(), 5);
    }
}
