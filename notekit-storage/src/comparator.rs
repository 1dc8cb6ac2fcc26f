//! Multi-field record ordering.
//!
//! Records are ordered by a prioritized list of fields. Each field is
//! compared by the rule for its storage type, and the first field that
//! differs decides the order.

use std::cmp::Ordering;

use notekit_core::{ComparatorConfig, ConfigError, FieldType, NotesResult, TypeMismatchPolicy};

use crate::Record;

/// Orders records by a fixed list of fields.
///
/// | field type                            | rule                        |
/// |---------------------------------------|-----------------------------|
/// | `Text`, `Authors`, `Names`, `Readers` | lexicographic, first value  |
/// | `Numeric`                             | numeric, `NaN` above all    |
/// | `DateTime`                            | **descending**: later first |
/// | `Other`                               | no signal                   |
///
/// Date-time fields sort newest first. This is the convention for document
/// lists and is not symmetric with the other types.
///
/// `compare` never fails. If any field of either record cannot be read, the
/// whole comparison reports `Equal` and a warning is logged, so a sort over
/// damaged records still completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldComparator {
    fields: Vec<String>,
    type_mismatch: TypeMismatchPolicy,
}

impl FieldComparator {
    /// Create a comparator over the given fields, highest priority first.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            type_mismatch: TypeMismatchPolicy::default(),
        }
    }

    /// Build a comparator from a validated config.
    pub fn from_config(config: &ComparatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            fields: config.fields.clone(),
            type_mismatch: config.type_mismatch,
        })
    }

    /// Set how fields whose type differs between the two records are handled.
    pub fn with_type_mismatch(mut self, policy: TypeMismatchPolicy) -> Self {
        self.type_mismatch = policy;
        self
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn type_mismatch(&self) -> TypeMismatchPolicy {
        self.type_mismatch
    }

    /// Compare two records. Read failures degrade to `Equal`.
    pub fn compare<R>(&self, a: &R, b: &R) -> Ordering
    where
        R: Record + ?Sized,
    {
        match self.try_compare(a, b) {
            Ok(ordering) => ordering,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Record comparison failed, treating records as equal"
                );
                Ordering::Equal
            }
        }
    }

    /// Compare two records, surfacing the first read failure.
    pub fn try_compare<R>(&self, a: &R, b: &R) -> NotesResult<Ordering>
    where
        R: Record + ?Sized,
    {
        for field in &self.fields {
            let ordering = self.compare_field(a, b, field)?;
            if ordering != Ordering::Equal {
                return Ok(ordering);
            }
        }
        Ok(Ordering::Equal)
    }

    fn compare_field<R>(&self, a: &R, b: &R, field: &str) -> NotesResult<Ordering>
    where
        R: Record + ?Sized,
    {
        let field_type = a.field_type(field)?;
        if field_type == FieldType::Other {
            return Ok(Ordering::Equal);
        }

        if self.type_mismatch == TypeMismatchPolicy::NoSignal {
            let other = b.field_type(field)?;
            if !same_rule(field_type, other) {
                tracing::debug!(
                    field,
                    first = %field_type,
                    second = %other,
                    "Field type differs between records, skipping field"
                );
                return Ok(Ordering::Equal);
            }
        }

        let ordering = match field_type {
            FieldType::Text | FieldType::Authors | FieldType::Names | FieldType::Readers => {
                a.string_value(field)?.cmp(&b.string_value(field)?)
            }
            FieldType::Numeric => {
                number_key(a.number_value(field)?).total_cmp(&number_key(b.number_value(field)?))
            }
            FieldType::DateTime => b.datetime_value(field)?.cmp(&a.datetime_value(field)?),
            FieldType::Other => Ordering::Equal,
        };
        Ok(ordering)
    }

    /// Stable-sort records in place.
    pub fn sort<R: Record>(&self, records: &mut [R]) {
        records.sort_by(|a, b| self.compare(a, b));
    }
}

/// Collapse every NaN to the positive quiet NaN so all of them sort above
/// every number, whatever their sign bit.
fn number_key(x: f64) -> f64 {
    if x.is_nan() {
        f64::NAN
    } else {
        x
    }
}

/// Whether two field types are compared by the same rule.
fn same_rule(a: FieldType, b: FieldType) -> bool {
    a == b || (a.is_textual() && b.is_textual())
}
