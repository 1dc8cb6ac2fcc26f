//! notekit Test Utilities
//!
//! Centralized test infrastructure for the notekit workspace:
//! - Proptest generators for field values and records
//! - Mock store implementations
//! - Test fixtures for common scenarios
//! - Custom assertions for notekit-specific validation

// Re-export mocks from their source crate
pub use notekit_storage::{MockContainer, MockRecord, MockRecordStore, MockResource};

// Re-export core types for convenience
pub use notekit_core::{
    CacheError, ComparatorConfig, ConfigError, FieldType, ItemValue, NotesError, NotesResult,
    RecordError, StoreDateTime, Timestamp, TypeMismatchPolicy, ViewCacheConfig, UNSAVED_NOTE_ID,
};
pub use notekit_storage::{Container, DocumentRecord, FieldComparator, Record, Resource, ViewCache};

use chrono::{NaiveDate, NaiveTime};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating notekit values.

    use super::*;
    use proptest::prelude::*;

    /// Generate any field type.
    pub fn arb_field_type() -> impl Strategy<Value = FieldType> {
        prop_oneof![
            Just(FieldType::Text),
            Just(FieldType::Authors),
            Just(FieldType::Names),
            Just(FieldType::Readers),
            Just(FieldType::Numeric),
            Just(FieldType::DateTime),
            Just(FieldType::Other),
        ]
    }

    /// Generate a calendar date (2020-2030).
    pub fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (2020i32..2030, 1u32..=12, 1u32..=28)
            .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default())
    }

    /// Generate a store date-time, with or without a time part.
    pub fn arb_store_datetime() -> impl Strategy<Value = StoreDateTime> {
        (arb_date(), proptest::option::of(0u32..86_400)).prop_map(|(date, secs)| match secs {
            Some(secs) => StoreDateTime::at(
                date,
                NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap_or_default(),
            ),
            None => StoreDateTime::date_only(date),
        })
    }

    /// Generate a Timestamp (DateTime<Utc>).
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        arb_store_datetime().prop_map(|dt| dt.to_timestamp())
    }

    /// Generate a finite number, including negatives and fractions.
    pub fn arb_number() -> impl Strategy<Value = f64> {
        (-1_000i32..1_000, 0u8..4).prop_map(|(n, frac)| f64::from(n) + f64::from(frac) * 0.25)
    }

    /// Generate a short text value over a small alphabet so ties are common.
    pub fn arb_text() -> impl Strategy<Value = String> {
        "[A-Ca-c ]{0,3}"
    }

    /// Generate an item value of any variant.
    pub fn arb_item_value() -> impl Strategy<Value = ItemValue> {
        prop_oneof![
            prop::collection::vec(arb_text(), 1..3).prop_map(ItemValue::Text),
            prop::collection::vec(arb_number(), 1..3).prop_map(ItemValue::Number),
            prop::collection::vec(arb_store_datetime(), 1..3).prop_map(ItemValue::DateTime),
        ]
    }

    /// Generate a record with a text `Subject`, numeric `Amount`, date-time
    /// `Due` and an unordered `Body`.
    pub fn arb_task_record() -> impl Strategy<Value = MockRecord> {
        (arb_text(), arb_number(), arb_store_datetime()).prop_map(|(subject, amount, due)| {
            MockRecord::new("NT00000001")
                .with_text("Subject", subject)
                .with_number("Amount", amount)
                .with_datetime("Due", due)
                .with_other("Body")
        })
    }

    /// Generate a non-empty ordering of the task record's sort fields.
    pub fn arb_task_fields() -> impl Strategy<Value = Vec<String>> {
        prop::sample::subsequence(vec!["Subject", "Amount", "Due", "Body"], 1..=4)
            .prop_shuffle()
            .prop_map(|fields| fields.into_iter().map(String::from).collect())
    }

    /// Generate a view name.
    pub fn arb_view_name() -> impl Strategy<Value = String> {
        "[A-Z][a-z]{2,8}"
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    /// A date with no time part.
    pub fn day(y: i32, m: u32, d: u32) -> StoreDateTime {
        StoreDateTime::date_only(NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default())
    }

    /// A task record with the fields used by [`task_comparator`].
    pub fn task(note_id: &str, category: &str, due: StoreDateTime, priority: f64) -> MockRecord {
        MockRecord::new(note_id)
            .with_text("Category", category)
            .with_datetime("Due", due)
            .with_number("Priority", priority)
    }

    /// Comparator: category ascending, then due date newest first, then
    /// priority ascending.
    pub fn task_comparator() -> FieldComparator {
        FieldComparator::new(["Category", "Due", "Priority"])
    }

    /// An open container with a typical set of views and aliases.
    pub fn mail_database() -> MockContainer {
        MockContainer::with_replica_id("85257A1B0049C9FE")
            .with_view("($Inbox)", &["Inbox"])
            .with_view("By Date", &["ByDate", "Date"])
            .with_view("($All)", &["All Documents", "All"])
    }

    /// A second replica-distinct container holding the same view names.
    pub fn mail_archive() -> MockContainer {
        MockContainer::with_replica_id("85257A1B0049CAFE")
            .with_view("($Inbox)", &["Inbox"])
            .with_view("By Date", &["ByDate", "Date"])
    }

    /// A fresh cache with default settings, independent of the global one.
    pub fn isolated_cache() -> ViewCache {
        ViewCache::new(ViewCacheConfig::default())
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for notekit-specific validation.

    use super::*;
    use std::cmp::Ordering;
    use std::sync::Arc;

    /// Assert that a NotesResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &NotesResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a NotesResult is Err.
    #[track_caller]
    pub fn assert_err<T: std::fmt::Debug>(result: &NotesResult<T>) {
        assert!(result.is_err(), "Expected Err, got Ok: {:?}", result);
    }

    /// Assert that a NotesResult is an OpenFailed cache error for `resource`.
    #[track_caller]
    pub fn assert_open_failed<T: std::fmt::Debug>(result: &NotesResult<T>, resource: &str) {
        match result {
            Err(NotesError::Cache(CacheError::OpenFailed { resource: r, .. })) => {
                assert_eq!(r, resource, "Wrong resource in OpenFailed error");
            }
            other => panic!("Expected OpenFailed for {}, got: {:?}", resource, other),
        }
    }

    /// Assert that two view handles are the same shared handle.
    #[track_caller]
    pub fn assert_same_view(a: &Arc<dyn Resource>, b: &Arc<dyn Resource>) {
        assert!(
            Arc::ptr_eq(a, b),
            "Expected the same handle, got {} and {}",
            a.canonical_name(),
            b.canonical_name()
        );
    }

    /// Assert that `records` are in non-decreasing order under `comparator`.
    #[track_caller]
    pub fn assert_sorted<R: Record>(comparator: &FieldComparator, records: &[R]) {
        for (i, pair) in records.windows(2).enumerate() {
            assert_ne!(
                comparator.compare(&pair[0], &pair[1]),
                Ordering::Greater,
                "Records {} and {} are out of order",
                i,
                i + 1
            );
        }
    }
}
