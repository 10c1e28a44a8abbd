//! Enumeration types for the event counter.
//!
//! The event kind is a closed set. Its wire spelling (`created`, `updated`,
//! `deleted`) is shared by routing keys, serialized output and artifact
//! names, so it is defined exactly once here.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// The category of a domain event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// An entity was created.
    Created,
    /// An entity was updated.
    Updated,
    /// An entity was deleted.
    Deleted,
}

impl EventKind {
    /// Every event kind, in declaration order.
    pub const ALL: [Self; 3] = [Self::Created, Self::Updated, Self::Deleted];

    /// The wire spelling of this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the three known event kinds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event kind: {0:?}")]
pub struct ParseEventKindError(pub String);

impl FromStr for EventKind {
    type Err = ParseEventKindError;

    /// Parse the exact wire spelling. Matching is case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "deleted" => Ok(Self::Deleted),
            other => Err(ParseEventKindError(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_spelling() {
        assert_eq!("created".parse::<EventKind>(), Ok(EventKind::Created));
        assert_eq!("updated".parse::<EventKind>(), Ok(EventKind::Updated));
        assert_eq!("deleted".parse::<EventKind>(), Ok(EventKind::Deleted));
    }

    #[test]
    fn rejects_unknown_and_differently_cased_kinds() {
        assert!("archived".parse::<EventKind>().is_err());
        assert!("Created".parse::<EventKind>().is_err());
        assert!("".parse::<EventKind>().is_err());
    }

    #[test]
    fn display_matches_serde_spelling() {
        for kind in EventKind::ALL {
            let json = serde_json::to_string(&kind).unwrap_or_default();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }
}
