//! Item value types as the document store reports them.

use crate::{FieldType, Timestamp};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Note id the store assigns to a record that has never been saved.
pub const UNSAVED_NOTE_ID: &str = "NT00000000";

// ============================================================================
// STORE DATE-TIME
// ============================================================================

/// A date-time value as held by the store.
///
/// The store keeps date-only values without a time part. Converting one of
/// those naively yields the current wall-clock time, so [`to_timestamp`]
/// pins a missing time to midnight UTC.
///
/// [`to_timestamp`]: StoreDateTime::to_timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreDateTime {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
}

impl StoreDateTime {
    /// A value with only a date part.
    pub fn date_only(date: NaiveDate) -> Self {
        Self { date, time: None }
    }

    /// A value with both date and time parts.
    pub fn at(date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            date,
            time: Some(time),
        }
    }

    /// Split a UTC timestamp into date and time parts.
    pub fn from_timestamp(ts: Timestamp) -> Self {
        let naive = ts.naive_utc();
        Self::at(naive.date(), naive.time())
    }

    /// Convert to a UTC timestamp, treating a missing time as midnight.
    pub fn to_timestamp(&self) -> Timestamp {
        let time = self.time.unwrap_or_default();
        Utc.from_utc_datetime(&self.date.and_time(time))
    }
}

// ============================================================================
// ITEM VALUE
// ============================================================================

/// The values of a single item (field). Items are always multi-valued in the
/// store; scalar writes become one-element lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemValue {
    Text(Vec<String>),
    Number(Vec<f64>),
    DateTime(Vec<StoreDateTime>),
}

impl ItemValue {
    /// Single text value.
    pub fn text(value: impl Into<String>) -> Self {
        ItemValue::Text(vec![value.into()])
    }

    /// Single numeric value.
    pub fn number(value: f64) -> Self {
        ItemValue::Number(vec![value])
    }

    /// Single date-time value.
    pub fn datetime(value: StoreDateTime) -> Self {
        ItemValue::DateTime(vec![value])
    }

    /// The field type implied by the value variant.
    pub fn field_type(&self) -> FieldType {
        match self {
            ItemValue::Text(_) => FieldType::Text,
            ItemValue::Number(_) => FieldType::Numeric,
            ItemValue::DateTime(_) => FieldType::DateTime,
        }
    }

    /// Number of values held.
    pub fn len(&self) -> usize {
        match self {
            ItemValue::Text(v) => v.len(),
            ItemValue::Number(v) => v.len(),
            ItemValue::DateTime(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first_datetime(&self) -> Option<StoreDateTime> {
        match self {
            ItemValue::DateTime(v) => v.first().copied(),
            _ => None,
        }
    }

    /// Whether writing `other` over `self` would leave the stored value
    /// unchanged. Numbers compare bit-for-bit through `total_cmp`, so `NaN`
    /// equals `NaN` and `-0.0` differs from `0.0`.
    pub fn same_as(&self, other: &ItemValue) -> bool {
        match (self, other) {
            (ItemValue::Text(a), ItemValue::Text(b)) => a == b,
            (ItemValue::Number(a), ItemValue::Number(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(x, y)| x.total_cmp(y) == std::cmp::Ordering::Equal)
            }
            (ItemValue::DateTime(a), ItemValue::DateTime(b)) => a == b,
            _ => false,
        }
    }
}
