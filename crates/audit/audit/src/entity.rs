use serde::{Deserialize, Serialize};

/// The tracked entity kinds whose changes are logged.
///
/// Each kind has its own trigger-populated audit table; a store instance is
/// scoped to exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Parts-catalog brands.
    Brand,
    /// Catalog parts.
    Part,
}

impl EntityKind {
    /// Unprefixed name of this kind's audit table.
    pub fn table_suffix(self) -> &'static str {
        match self {
            Self::Brand => "brand_audit",
            Self::Part => "part_audit",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Brand => f.write_str("brand"),
            Self::Part => f.write_str("part"),
        }
    }
}
