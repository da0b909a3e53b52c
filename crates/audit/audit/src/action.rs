use serde::{Deserialize, Serialize};

/// The kind of change a row trigger records, stored as a single-character code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    /// A row was inserted (`I`).
    Insert,
    /// A row was updated (`U`).
    Update,
    /// A row was deleted (`D`).
    Delete,
}

impl AuditAction {
    /// The single-character code the trigger writes.
    pub fn code(self) -> &'static str {
        match self {
            Self::Insert => "I",
            Self::Update => "U",
            Self::Delete => "D",
        }
    }

    /// Parse a stored action code. Returns `None` for unknown codes, which
    /// are representable in the log but carry no typed meaning.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "I" => Some(Self::Insert),
            "U" => Some(Self::Update),
            "D" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Action constraint carried by a filter. `All` disables the predicate.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionFilter {
    /// Match any action.
    #[default]
    All,
    /// Only insert records.
    Insert,
    /// Only update records.
    Update,
    /// Only delete records.
    Delete,
}

impl ActionFilter {
    /// The stored code this filter matches, or `None` when the predicate
    /// is disabled.
    pub fn code(self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::Insert => Some(AuditAction::Insert.code()),
            Self::Update => Some(AuditAction::Update.code()),
            Self::Delete => Some(AuditAction::Delete.code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ActionFilter, AuditAction};

    #[test]
    fn code_round_trip() {
        for action in [AuditAction::Insert, AuditAction::Update, AuditAction::Delete] {
            assert_eq!(AuditAction::from_code(action.code()), Some(action));
        }
    }

    #[test]
    fn unknown_code_is_none() {
        assert_eq!(AuditAction::from_code("X"), None);
        assert_eq!(AuditAction::from_code(""), None);
    }

    #[test]
    fn filter_codes() {
        assert_eq!(ActionFilter::All.code(), None);
        assert_eq!(ActionFilter::Update.code(), Some("U"));
        assert_eq!(ActionFilter::default(), ActionFilter::All);
    }
}
