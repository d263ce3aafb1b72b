//! Record descriptors: the shape of the entity being edited.
//!
//! A descriptor declares the fields a record may carry, the closed set of
//! business statuses in display-priority order, and the transitions that
//! may advance a status. The core is otherwise agnostic of any concrete
//! business schema; each editing surface supplies one descriptor.

use crate::{
    error::Result, Error, FieldName, FieldValue, Record, Status, DRAFT_ID,
};
use serde::{Deserialize, Serialize};

/// Field types a descriptor may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Choice,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Text => write!(f, "Text"),
            FieldType::Number => write!(f, "Number"),
            FieldType::Date => write!(f, "Date"),
            FieldType::Choice => write!(f, "Choice"),
        }
    }
}

impl FieldType {
    fn matches(&self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (FieldType::Text, FieldValue::Text(_))
                | (FieldType::Number, FieldValue::Number(_))
                | (FieldType::Date, FieldValue::Date(_))
                | (FieldType::Choice, FieldValue::Choice(_))
        )
    }
}

/// Definition of a field on a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    /// Field name
    pub name: FieldName,
    /// Field type
    pub field_type: FieldType,
    /// Whether the field must be present and non-empty to commit
    pub required: bool,
}

impl FieldDef {
    /// Create a new required field definition.
    pub fn required(name: impl Into<FieldName>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
        }
    }

    /// Create a new optional field definition.
    pub fn optional(name: impl Into<FieldName>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
        }
    }

    /// Check a value against this field's declared type.
    pub fn check(&self, value: &FieldValue) -> Result<()> {
        if self.field_type.matches(value) {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                field: self.name.clone(),
                expected: self.field_type.to_string(),
                got: value.type_name().to_string(),
            })
        }
    }
}

/// The descriptor of one editable entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDescriptor {
    /// Entity name, for messages and logs
    pub entity: String,
    /// Declared fields
    pub fields: Vec<FieldDef>,
    /// Closed status set in priority order (index = sort bucket)
    statuses: Vec<Status>,
    /// Status assigned to a freshly created draft
    initial_status: Status,
    /// Allowed (from, to) status transitions
    transitions: Vec<(Status, Status)>,
}

impl RecordDescriptor {
    /// Create a descriptor. The initial status must be a member of
    /// `statuses`; a descriptor with an unknown initial status would mint
    /// drafts that can never commit, so this is enforced here.
    pub fn new(
        entity: impl Into<String>,
        fields: Vec<FieldDef>,
        statuses: Vec<Status>,
        initial_status: Status,
    ) -> Result<Self> {
        if !statuses.contains(&initial_status) {
            return Err(Error::UnknownStatus(initial_status.to_string()));
        }
        Ok(Self {
            entity: entity.into(),
            fields,
            statuses,
            initial_status,
            transitions: Vec::new(),
        })
    }

    /// Builder-style method to allow a status transition.
    pub fn with_transition(mut self, from: impl Into<Status>, to: impl Into<Status>) -> Self {
        self.transitions.push((from.into(), to.into()));
        self
    }

    /// Get a field definition by name.
    pub fn field_def(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The declared statuses in priority order.
    pub fn statuses(&self) -> &[Status] {
        &self.statuses
    }

    /// Whether a status belongs to the closed set.
    pub fn is_known_status(&self, status: &Status) -> bool {
        self.statuses.contains(status)
    }

    /// Sort bucket for a status: its index in the declared order. Unknown
    /// statuses sort after all known ones.
    pub fn status_priority(&self, status: &Status) -> usize {
        self.statuses
            .iter()
            .position(|s| s == status)
            .unwrap_or(self.statuses.len())
    }

    /// Mint a new draft: [`DRAFT_ID`], initial status, no fields.
    pub fn new_draft(&self) -> Record {
        Record::new(DRAFT_ID, self.initial_status.clone())
    }

    /// Check a single field assignment.
    pub fn check_field(&self, name: &str, value: &FieldValue) -> Result<()> {
        let def = self
            .field_def(name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))?;
        def.check(value)
    }

    /// Check a status transition against the transition table.
    pub fn check_transition(&self, from: &Status, to: &Status) -> Result<()> {
        if !self.is_known_status(to) {
            return Err(Error::UnknownStatus(to.to_string()));
        }
        if self
            .transitions
            .iter()
            .any(|(f, t)| f == from && t == to)
        {
            Ok(())
        } else {
            Err(Error::IllegalTransition {
                from: from.to_string(),
                to: to.to_string(),
            })
        }
    }

    /// Structurally check a whole record: every field declared and typed,
    /// status in the closed set. Business validation is the job of
    /// [`crate::validate::ValidationRules`], not this check.
    pub fn check_record(&self, record: &Record) -> Result<()> {
        if !self.is_known_status(&record.status) {
            return Err(Error::UnknownStatus(record.status.to_string()));
        }
        for (name, value) in &record.fields {
            self.check_field(name, value)?;
        }
        Ok(())
    }
}
