//! notekit Storage - Store Capability Traits and Mock Implementation
//!
//! Defines the capabilities notekit needs from a handle-based document store
//! (records, containers, views) together with the two primitives built on
//! them: the [`FieldComparator`] and the [`ViewCache`].
//! The actual store bindings live outside this workspace.

pub mod cache;
pub mod comparator;
pub mod document;

pub use cache::{ReleaseSummary, ViewCache, ViewCacheStats, ViewKey};
pub use comparator::FieldComparator;
pub use document::{is_new_record, item_value_date, parent_record, update_item_value};

use notekit_core::{
    FieldType, ItemValue, NotesResult, RecordError, StoreDateTime, Timestamp, UNSAVED_NOTE_ID,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use uuid::Uuid;

// ============================================================================
// CAPABILITY TRAITS
// ============================================================================

/// Read access to the typed fields of a single record.
///
/// The field type is whatever the record's own storage says it is; callers
/// pick the accessor that matches it.
pub trait Record {
    /// Get the storage type of a field.
    fn field_type(&self, name: &str) -> NotesResult<FieldType>;

    /// Get the first value of a textual field.
    fn string_value(&self, name: &str) -> NotesResult<String>;

    /// Get the first value of a numeric field.
    fn number_value(&self, name: &str) -> NotesResult<f64>;

    /// Get the first value of a date-time field.
    fn datetime_value(&self, name: &str) -> NotesResult<Timestamp>;
}

/// Full item access on a stored document, used by the helpers in
/// [`document`].
pub trait DocumentRecord: Record {
    /// The store-assigned note id.
    fn note_id(&self) -> String;

    /// Id of the parent document, if this is a response document.
    fn parent_id(&self) -> Option<String>;

    /// All values of an item, or `None` if the item is absent or has no
    /// representable value.
    fn item_value(&self, name: &str) -> NotesResult<Option<ItemValue>>;

    /// Replace all values of an item, creating it if absent.
    fn replace_item_value(&mut self, name: &str, value: ItemValue) -> NotesResult<()>;
}

/// Lookup of records by id within one database.
pub trait RecordLookup {
    type Record: DocumentRecord;

    fn record_by_id(&self, id: &str) -> NotesResult<Option<Self::Record>>;
}

/// An opened view (or any expensive named handle) that must be released
/// explicitly.
pub trait Resource: Send + Sync {
    /// The authoritative name of the resource, which may differ from the
    /// alias it was opened by.
    fn canonical_name(&self) -> String;

    /// Release the underlying handle.
    fn release(&self) -> NotesResult<()>;
}

impl std::fmt::Debug for dyn Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("canonical_name", &self.canonical_name())
            .finish()
    }
}

/// The owner of views: a database-like unit with a stable identity.
pub trait Container {
    /// Whether the container can currently serve requests.
    fn is_open(&self) -> bool;

    /// Stable unique id (replica id), not the display title.
    fn identity(&self) -> String;

    /// Open a resource by name or alias.
    fn open_resource(&self, name: &str) -> NotesResult<Arc<dyn Resource>>;
}

// ============================================================================
// MOCK RECORDS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct MockItem {
    field_type: FieldType,
    value: Option<ItemValue>,
}

/// In-memory record for testing.
#[derive(Debug, Clone, PartialEq)]
pub struct MockRecord {
    note_id: String,
    parent_id: Option<String>,
    read_only: bool,
    items: BTreeMap<String, MockItem>,
}

impl Default for MockRecord {
    fn default() -> Self {
        Self::unsaved()
    }
}

impl MockRecord {
    /// Create a saved record with the given note id.
    pub fn new(note_id: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            parent_id: None,
            read_only: false,
            items: BTreeMap::new(),
        }
    }

    /// Create a record that has never been saved.
    pub fn unsaved() -> Self {
        Self::new(UNSAVED_NOTE_ID)
    }

    pub fn with_text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_item(name, FieldType::Text, Some(ItemValue::text(value)))
    }

    /// Add a name-list item (`Authors`, `Names` or `Readers`).
    pub fn with_names<I, S>(self, name: impl Into<String>, field_type: FieldType, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = names.into_iter().map(Into::into).collect();
        self.with_item(name, field_type, Some(ItemValue::Text(values)))
    }

    pub fn with_number(self, name: impl Into<String>, value: f64) -> Self {
        self.with_item(name, FieldType::Numeric, Some(ItemValue::number(value)))
    }

    pub fn with_datetime(self, name: impl Into<String>, value: StoreDateTime) -> Self {
        self.with_item(name, FieldType::DateTime, Some(ItemValue::datetime(value)))
    }

    pub fn with_timestamp(self, name: impl Into<String>, value: Timestamp) -> Self {
        self.with_datetime(name, StoreDateTime::from_timestamp(value))
    }

    /// Add an item whose type has no ordering rule (rich text, attachment).
    pub fn with_other(self, name: impl Into<String>) -> Self {
        self.with_item(name, FieldType::Other, None)
    }

    /// Add an item with an explicit type tag and value. The tag need not agree
    /// with the value, which lets tests model inconsistent stores.
    pub fn with_item(
        mut self,
        name: impl Into<String>,
        field_type: FieldType,
        value: Option<ItemValue>,
    ) -> Self {
        self.items.insert(name.into(), MockItem { field_type, value });
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Reject all writes with [`RecordError::ReadOnly`].
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    fn item(&self, name: &str) -> NotesResult<&MockItem> {
        self.items.get(name).ok_or_else(|| {
            RecordError::FieldMissing {
                field: name.to_string(),
            }
            .into()
        })
    }

    fn mismatch(name: &str, expected: FieldType, actual: FieldType) -> RecordError {
        RecordError::TypeMismatch {
            field: name.to_string(),
            expected,
            actual,
        }
    }
}

impl Record for MockRecord {
    fn field_type(&self, name: &str) -> NotesResult<FieldType> {
        Ok(self.item(name)?.field_type)
    }

    fn string_value(&self, name: &str) -> NotesResult<String> {
        let item = self.item(name)?;
        match (&item.value, item.field_type.is_textual()) {
            (Some(ItemValue::Text(values)), true) => {
                Ok(values.first().cloned().unwrap_or_default())
            }
            _ => Err(Self::mismatch(name, FieldType::Text, item.field_type).into()),
        }
    }

    fn number_value(&self, name: &str) -> NotesResult<f64> {
        let item = self.item(name)?;
        match (&item.value, item.field_type) {
            (Some(ItemValue::Number(values)), FieldType::Numeric) => {
                Ok(values.first().copied().unwrap_or(0.0))
            }
            _ => Err(Self::mismatch(name, FieldType::Numeric, item.field_type).into()),
        }
    }

    fn datetime_value(&self, name: &str) -> NotesResult<Timestamp> {
        let item = self.item(name)?;
        match (&item.value, item.field_type) {
            (Some(ItemValue::DateTime(values)), FieldType::DateTime) => values
                .first()
                .map(StoreDateTime::to_timestamp)
                .ok_or_else(|| {
                    RecordError::FieldMissing {
                        field: name.to_string(),
                    }
                    .into()
                }),
            _ => Err(Self::mismatch(name, FieldType::DateTime, item.field_type).into()),
        }
    }
}

impl DocumentRecord for MockRecord {
    fn note_id(&self) -> String {
        self.note_id.clone()
    }

    fn parent_id(&self) -> Option<String> {
        self.parent_id.clone()
    }

    fn item_value(&self, name: &str) -> NotesResult<Option<ItemValue>> {
        Ok(self.items.get(name).and_then(|item| item.value.clone()))
    }

    fn replace_item_value(&mut self, name: &str, value: ItemValue) -> NotesResult<()> {
        if self.read_only {
            return Err(RecordError::ReadOnly.into());
        }
        let field_type = value.field_type();
        self.items.insert(
            name.to_string(),
            MockItem {
                field_type,
                value: Some(value),
            },
        );
        Ok(())
    }
}

/// In-memory record lookup for testing.
#[derive(Debug, Default)]
pub struct MockRecordStore {
    records: RwLock<HashMap<String, MockRecord>>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record under its note id, replacing any previous one.
    pub fn insert(&self, record: MockRecord) {
        self.records.write().unwrap().insert(record.note_id.clone(), record);
    }

    pub fn record_count(&self) -> usize {
        self.records.read().unwrap().len()
    }
}

impl RecordLookup for MockRecordStore {
    type Record = MockRecord;

    fn record_by_id(&self, id: &str) -> NotesResult<Option<MockRecord>> {
        Ok(self.records.read().unwrap().get(id).cloned())
    }
}

// ============================================================================
// MOCK CONTAINER
// ============================================================================

/// In-memory view handle that counts its releases.
#[derive(Debug)]
pub struct MockResource {
    name: String,
    releases: AtomicUsize,
    fail_release: AtomicBool,
}

impl MockResource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            releases: AtomicUsize::new(0),
            fail_release: AtomicBool::new(false),
        }
    }

    /// Number of times `release` succeeded on this handle.
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn is_released(&self) -> bool {
        self.release_count() > 0
    }

    /// Make subsequent `release` calls fail.
    pub fn fail_releases(&self, fail: bool) {
        self.fail_release.store(fail, Ordering::SeqCst);
    }
}

impl Resource for MockResource {
    fn canonical_name(&self) -> String {
        self.name.clone()
    }

    fn release(&self) -> NotesResult<()> {
        if self.fail_release.load(Ordering::SeqCst) {
            return Err(RecordError::Store {
                reason: format!("view {} is still in use", self.name),
            }
            .into());
        }
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory database for testing the view cache.
///
/// Views are registered by canonical name with optional aliases. Lookup by
/// name or alias is case-insensitive, as in the store. Every successful open
/// returns a fresh [`MockResource`], and every call to `open_resource` is
/// counted.
#[derive(Debug)]
pub struct MockContainer {
    replica_id: String,
    open: AtomicBool,
    open_delay: Option<Duration>,
    /// lowercased name or alias -> canonical name
    views: HashMap<String, String>,
    open_calls: AtomicUsize,
    opened: Mutex<Vec<Arc<MockResource>>>,
    fail_release_of_new: AtomicBool,
}

impl Default for MockContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockContainer {
    /// Create an open container with a random 16-hex-digit replica id.
    pub fn new() -> Self {
        let simple = Uuid::now_v7().simple().to_string().to_uppercase();
        Self::with_replica_id(&simple[simple.len() - 16..])
    }

    pub fn with_replica_id(replica_id: impl Into<String>) -> Self {
        Self {
            replica_id: replica_id.into(),
            open: AtomicBool::new(true),
            open_delay: None,
            views: HashMap::new(),
            open_calls: AtomicUsize::new(0),
            opened: Mutex::new(Vec::new()),
            fail_release_of_new: AtomicBool::new(false),
        }
    }

    /// Register a view by canonical name and aliases.
    pub fn with_view(mut self, canonical: &str, aliases: &[&str]) -> Self {
        self.views.insert(canonical.to_lowercase(), canonical.to_string());
        for alias in aliases {
            self.views.insert(alias.to_lowercase(), canonical.to_string());
        }
        self
    }

    /// Sleep inside every `open_resource` call to widen race windows.
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }

    /// Make views opened from now on refuse to release.
    pub fn fail_releases(&self, fail: bool) {
        self.fail_release_of_new.store(fail, Ordering::SeqCst);
    }

    /// Number of `open_resource` calls, successful or not.
    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    /// All handles opened so far, in open order.
    pub fn opened(&self) -> Vec<Arc<MockResource>> {
        self.opened.lock().unwrap().clone()
    }
}

impl Container for MockContainer {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn identity(&self) -> String {
        self.replica_id.clone()
    }

    fn open_resource(&self, name: &str) -> NotesResult<Arc<dyn Resource>> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.open_delay {
            std::thread::sleep(delay);
        }
        let canonical = self.views.get(&name.to_lowercase()).ok_or_else(|| {
            RecordError::Store {
                reason: format!("view {} not found", name),
            }
        })?;
        let view = Arc::new(MockResource::new(canonical.clone()));
        view.fail_releases(self.fail_release_of_new.load(Ordering::SeqCst));
        self.opened.lock().unwrap().push(Arc::clone(&view));
        Ok(view)
    }
}

// ============================================================================
// TESTS
// ============================================================================
