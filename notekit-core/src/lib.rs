//! notekit Core - Value Types
//!
//! Pure data structures shared by the comparator and the view cache.
//! This crate contains ONLY data types - no store access.

pub mod config;
pub mod enums;
pub mod error;
pub mod value;

use chrono::{DateTime, Utc};

pub use config::{ComparatorConfig, TypeMismatchPolicy, ViewCacheConfig};
pub use enums::FieldType;
pub use error::{CacheError, ConfigError, NotesError, NotesResult, RecordError, ReleaseFailure};
pub use value::{ItemValue, StoreDateTime, UNSAVED_NOTE_ID};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;
