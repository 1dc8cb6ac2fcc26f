//! Enum types for document-store fields

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// FIELD TYPE
// ============================================================================

/// Storage type of a record field, as reported by the record itself.
///
/// The comparator dispatches on this tag, so the set is closed: anything the
/// store reports that has no ordering rule maps to [`FieldType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Plain text
    Text,
    /// Author names (text list)
    Authors,
    /// Hierarchical user/group names (text list)
    Names,
    /// Reader names (text list)
    Readers,
    /// Floating point numbers
    Numeric,
    /// Date-time values
    DateTime,
    /// Rich text, attachments, and everything else without an ordering rule
    Other,
}

impl FieldType {
    /// Whether values of this type are compared as strings.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            FieldType::Text | FieldType::Authors | FieldType::Names | FieldType::Readers
        )
    }

    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            FieldType::Text => "Text",
            FieldType::Authors => "Authors",
            FieldType::Names => "Names",
            FieldType::Readers => "Readers",
            FieldType::Numeric => "Numeric",
            FieldType::DateTime => "DateTime",
            FieldType::Other => "Other",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}
