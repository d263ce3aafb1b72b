//! The filter pipeline: predicate, sort, and draft anchoring.
//!
//! [`FilterPipeline::apply`] is pure and synchronous; given the same
//! records, predicate, and sort it returns the identical ordered sequence
//! every time. The active draft is special-cased by contract: it is always
//! part of the displayed subset and always sits at the configured anchor,
//! whatever the predicate says — a draft must never be filtered out from
//! under the user mid-edit.

use crate::{descriptor::RecordDescriptor, FieldName, FieldValue, Record, Status};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        }
    }
}

/// A sortable aspect of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "field", rename_all = "camelCase")]
pub enum SortKey {
    /// The status's index in the descriptor's declared order
    StatusPriority,
    /// A named field's value
    Field(FieldName),
    /// The record id
    Id,
}

/// An ordered list of sort keys.
///
/// The comparison chains the declared keys and then always falls through to
/// identity descending, so the ordering is total and never leans on input
/// order as an implicit extra key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    keys: Vec<(SortKey, Direction)>,
}

impl SortSpec {
    /// An empty spec: records order by identity descending only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a spec with one key.
    pub fn by(key: SortKey, direction: Direction) -> Self {
        Self {
            keys: vec![(key, direction)],
        }
    }

    /// Builder-style method to chain a further key.
    pub fn then(mut self, key: SortKey, direction: Direction) -> Self {
        self.keys.push((key, direction));
        self
    }

    /// The declared keys, excluding the implicit identity tie-break.
    pub fn keys(&self) -> &[(SortKey, Direction)] {
        &self.keys
    }

    fn compare(&self, descriptor: &RecordDescriptor, a: &Record, b: &Record) -> Ordering {
        for (key, direction) in &self.keys {
            let ord = match key {
                SortKey::StatusPriority => descriptor
                    .status_priority(&a.status)
                    .cmp(&descriptor.status_priority(&b.status)),
                SortKey::Field(name) => compare_fields(a.field(name), b.field(name)),
                SortKey::Id => a.id.cmp(&b.id),
            };
            let ord = direction.apply(ord);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        // final tie-break: identity descending, always
        b.id.cmp(&a.id)
    }
}

/// Missing fields sort after present ones; two missing fields are equal.
fn compare_fields(a: Option<&FieldValue>, b: Option<&FieldValue>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.compare(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// An inclusive date range on a named date field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// The date field the range applies to
    pub field: FieldName,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    fn matches(&self, record: &Record) -> bool {
        match record.field(&self.field).and_then(FieldValue::as_date) {
            Some(date) => date >= self.from && date <= self.to,
            None => false,
        }
    }
}

/// User-chosen display predicate. All set conditions must match.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Predicate {
    /// Case-insensitive substring match over text and choice fields
    pub search: Option<String>,
    /// Exact status match
    pub status: Option<Status>,
    /// Inclusive date range on a named field
    pub date_range: Option<DateRange>,
}

impl Predicate {
    /// A predicate matching everything.
    pub fn any() -> Self {
        Self::default()
    }

    /// Builder-style search text.
    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    /// Builder-style status filter.
    pub fn with_status(mut self, status: impl Into<Status>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Builder-style date range.
    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    /// Whether a record matches every set condition.
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(status) = &self.status {
            if record.status != *status {
                return false;
            }
        }
        if let Some(range) = &self.date_range {
            if !range.matches(record) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = record.fields.values().any(|value| match value {
                FieldValue::Text(s) | FieldValue::Choice(s) => {
                    s.to_lowercase().contains(&needle)
                }
                _ => false,
            });
            if !hit {
                return false;
            }
        }
        true
    }
}

/// The fixed slot where the active draft is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Anchor {
    Start,
    End,
}

/// Derives the displayed subset and order from a record set plus the
/// active draft.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPipeline {
    pub predicate: Predicate,
    pub sort: SortSpec,
    pub anchor: Anchor,
}

impl FilterPipeline {
    /// Create a pipeline.
    pub fn new(predicate: Predicate, sort: SortSpec, anchor: Anchor) -> Self {
        Self {
            predicate,
            sort,
            anchor,
        }
    }

    /// Compute the displayed records.
    ///
    /// The draft, when present, shadows its cache echo (same id) and is
    /// placed at the anchor regardless of predicate or sort. Everything
    /// else is filtered by the predicate and ordered by the sort spec's
    /// total comparison.
    pub fn apply(
        &self,
        descriptor: &RecordDescriptor,
        records: &[Record],
        draft: Option<&Record>,
    ) -> Vec<Record> {
        let mut body: Vec<Record> = records
            .iter()
            .filter(|r| draft.map_or(true, |d| r.id != d.id))
            .filter(|r| self.predicate.matches(r))
            .cloned()
            .collect();

        body.sort_by(|a, b| self.sort.compare(descriptor, a, b));

        if let Some(draft) = draft {
            match self.anchor {
                Anchor::Start => body.insert(0, draft.clone()),
                Anchor::End => body.push(draft.clone()),
            }
        }
        body
    }
}
