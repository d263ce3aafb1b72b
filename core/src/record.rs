//! Record types: the opaque, validated key-value bag the core edits.

use crate::{FieldName, RecordId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// The id carried by a record that has not been persisted yet.
///
/// A record with this id is a draft: it is owned by the active edit session
/// and is never present in more than one collection at a time.
pub const DRAFT_ID: RecordId = 0;

/// A typed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Choice(String),
}

impl FieldValue {
    /// Name of the value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "Text",
            FieldValue::Number(_) => "Number",
            FieldValue::Date(_) => "Date",
            FieldValue::Choice(_) => "Choice",
        }
    }

    /// Get the text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the numeric content, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the date content, if this is a date.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Get the choice content, if this is an enumerated value.
    pub fn as_choice(&self) -> Option<&str> {
        match self {
            FieldValue::Choice(s) => Some(s),
            _ => None,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            FieldValue::Text(_) => 0,
            FieldValue::Number(_) => 1,
            FieldValue::Date(_) => 2,
            FieldValue::Choice(_) => 3,
        }
    }

    /// Total ordering across values, used by the filter pipeline sort.
    ///
    /// Same-typed values compare naturally (numbers via `total_cmp`, so NaN
    /// does not poison the ordering); differently-typed values order by a
    /// fixed type rank. This keeps every sort comparison total and
    /// deterministic.
    pub fn compare(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            (FieldValue::Number(a), FieldValue::Number(b)) => a.total_cmp(b),
            (FieldValue::Date(a), FieldValue::Date(b)) => a.cmp(b),
            (FieldValue::Choice(a), FieldValue::Choice(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

/// A business status, one of the closed set declared by the descriptor.
///
/// Statuses are advanced only through explicit transitions checked against
/// the descriptor's transition table, never inferred.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Status(String);

impl Status {
    /// Create a status from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The status name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Status {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// An editable record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Identity: [`DRAFT_ID`] for an unsaved draft, positive once persisted
    pub id: RecordId,
    /// Field name to typed value
    pub fields: BTreeMap<FieldName, FieldValue>,
    /// Current business status
    pub status: Status,
}

impl Record {
    /// Create a record with no fields set.
    pub fn new(id: RecordId, status: Status) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
            status,
        }
    }

    /// Builder-style field assignment.
    pub fn with_field(mut self, name: impl Into<FieldName>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Whether this record is an unsaved draft.
    pub fn is_draft(&self) -> bool {
        self.id == DRAFT_ID
    }

    /// Get a field value by name.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Set a field value.
    pub fn set_field(&mut self, name: impl Into<FieldName>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }
}
