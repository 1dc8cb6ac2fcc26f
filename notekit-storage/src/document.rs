//! Small helpers over [`DocumentRecord`].

use notekit_core::{ItemValue, NotesResult, Timestamp, UNSAVED_NOTE_ID};

use crate::{DocumentRecord, RecordLookup};

/// First value of a date-time item as a timestamp.
///
/// Returns `None` for absent items and items of other types. Date-only values
/// come back at midnight UTC rather than at the current time of day.
pub fn item_value_date<R>(record: &R, name: &str) -> NotesResult<Option<Timestamp>>
where
    R: DocumentRecord + ?Sized,
{
    Ok(record
        .item_value(name)?
        .and_then(|value| value.first_datetime())
        .map(|dt| dt.to_timestamp()))
}

/// Write `value` to an item only if it differs from what is stored.
///
/// Returns `true` if the record was modified. Absent items are always
/// written. Unchanged writes are skipped so the record is not marked dirty.
pub fn update_item_value<R>(record: &mut R, name: &str, value: ItemValue) -> NotesResult<bool>
where
    R: DocumentRecord + ?Sized,
{
    if let Some(current) = record.item_value(name)? {
        if current.same_as(&value) {
            return Ok(false);
        }
    }
    record.replace_item_value(name, value)?;
    Ok(true)
}

/// Whether the record has never been saved.
pub fn is_new_record<R>(record: &R) -> bool
where
    R: DocumentRecord + ?Sized,
{
    record.note_id() == UNSAVED_NOTE_ID
}

/// The parent of a response record, or `None` for top-level records and
/// parents that no longer exist.
pub fn parent_record<L, R>(lookup: &L, record: &R) -> NotesResult<Option<L::Record>>
where
    L: RecordLookup + ?Sized,
    R: DocumentRecord + ?Sized,
{
    match record.parent_id() {
        Some(id) => lookup.record_by_id(&id),
        None => Ok(None),
    }
}
