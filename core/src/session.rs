//! The edit session state machine.
//!
//! Exactly one record may be created or edited at a time within a view.
//! The session owns a private copy of the draft, coordinates validation,
//! and produces persist plans for the host to execute; the core itself
//! performs no I/O. The host feeds the gateway outcome back through
//! [`EditSession::resolve_persist`], which either hands over the canonical
//! record for cache reconciliation or reverts to the prior editing state
//! with the draft intact.
//!
//! State machine:
//!
//! ```text
//! Idle -> Creating | Editing -> Validating -> Persisting -> Idle
//!                       ^            |             |
//!                       +------------+ (invalid)   |
//!                       +--------------------------+ (gateway failure)
//! ```
//!
//! Every transition happens on the caller's thread; `Persisting` is the
//! only state that spans a suspension, and while it is active the draft is
//! locked: no field updates, no second begin, no cancel.

use crate::{
    descriptor::RecordDescriptor,
    error::{Error, FieldError, GatewayError},
    validate::{filter_numeric_text, ValidationRules},
    FieldValue, Record, Status,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The session's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Idle,
    Creating,
    Editing,
    Validating,
    Persisting,
}

/// The edit state a suspended or validating session returns to on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditMode {
    Creating,
    Editing,
}

impl EditMode {
    fn state(self) -> SessionState {
        match self {
            EditMode::Creating => SessionState::Creating,
            EditMode::Editing => SessionState::Editing,
        }
    }
}

/// Which gateway operation a persist plan requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PersistAction {
    Create,
    Update,
}

/// A validated draft ready for the persistence gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistPlan {
    /// `Create` for a draft id, `Update` otherwise
    pub action: PersistAction,
    /// Snapshot of the validated draft
    pub record: Record,
}

/// Outcome of [`EditSession::commit`].
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Validation passed; the session is `Persisting` and the host must
    /// execute the plan and call `resolve_persist`
    Persist(PersistPlan),
    /// Validation failed; errors are attached and the session is back in
    /// its edit state
    Invalid(Vec<FieldError>),
    /// Commit was not legal in the current state
    Rejected(Error),
}

/// Outcome of [`EditSession::resolve_persist`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    /// The save succeeded; the canonical record should be upserted into
    /// the owning cache entry
    Committed(Record),
    /// The save failed; the session reverted to its edit state with the
    /// draft preserved
    Reverted(GatewayError),
    /// No save was in flight
    Rejected(Error),
}

/// Outcome of [`EditSession::cancel`]. Cancelling twice, or when idle, is
/// explicitly not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum CancelOutcome {
    Cancelled,
    AlreadyIdle,
    /// Cancel during `Persisting` must wait for the in-flight result
    Rejected(Error),
}

/// Read-only snapshot of the session for the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub draft: Option<Record>,
    pub errors: Vec<FieldError>,
    /// Last benign rejection, e.g. "finish the current edit first"
    pub notice: Option<String>,
    /// Last gateway failure, cleared on the next successful commit
    pub gateway_error: Option<GatewayError>,
}

/// The single in-flight inline-edit session of one view.
#[derive(Debug, Clone)]
pub struct EditSession {
    descriptor: Arc<RecordDescriptor>,
    rules: ValidationRules,
    state: SessionState,
    resume: Option<EditMode>,
    draft: Option<Record>,
    errors: Vec<FieldError>,
    notice: Option<Error>,
    gateway_error: Option<GatewayError>,
}

impl EditSession {
    /// Create an idle session for one entity.
    pub fn new(descriptor: Arc<RecordDescriptor>, rules: ValidationRules) -> Self {
        Self {
            descriptor,
            rules,
            state: SessionState::Idle,
            resume: None,
            draft: None,
            errors: Vec::new(),
            notice: None,
            gateway_error: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether no edit is active.
    pub fn is_idle(&self) -> bool {
        self.state == SessionState::Idle
    }

    /// The active draft, if any. Visible through `Persisting` so the view
    /// can keep rendering the locked row.
    pub fn draft(&self) -> Option<&Record> {
        self.draft.as_ref()
    }

    /// The descriptor this session edits against.
    pub fn descriptor(&self) -> &RecordDescriptor {
        &self.descriptor
    }

    /// Read-only snapshot for rendering.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            draft: self.draft.clone(),
            errors: self.errors.clone(),
            notice: self.notice.as_ref().map(|n| n.to_string()),
            gateway_error: self.gateway_error.clone(),
        }
    }

    /// Record a rejection so `snapshot()` surfaces it, then return it.
    fn reject(&mut self, err: Error) -> Error {
        self.notice = Some(err.clone());
        err
    }

    fn busy_rejection(&self) -> Error {
        match self.state {
            SessionState::Persisting => Error::SaveInFlight,
            _ => Error::EditInProgress {
                active: self.draft.as_ref().map(|d| d.id).unwrap_or_default(),
            },
        }
    }

    /// Start creating a new record. Allowed only from `Idle`; otherwise the
    /// rejection carries the active draft's id so the caller can focus it
    /// instead of silently failing.
    pub fn begin_create(&mut self) -> Result<(), Error> {
        if self.state != SessionState::Idle {
            let err = self.busy_rejection();
            return Err(self.reject(err));
        }
        self.draft = Some(self.descriptor.new_draft());
        self.state = SessionState::Creating;
        self.errors.clear();
        self.notice = None;
        self.gateway_error = None;
        Ok(())
    }

    /// Start editing an existing record. The session clones the seed; the
    /// cache's copy is never touched until a commit succeeds.
    pub fn begin_edit(&mut self, seed: &Record) -> Result<(), Error> {
        if self.state != SessionState::Idle {
            // covers the double-click-while-persisting echo: a second begin
            // for the identity already being saved is rejected, not queued
            let err = self.busy_rejection();
            return Err(self.reject(err));
        }
        self.descriptor.check_record(seed).map_err(|e| self.reject(e))?;
        self.draft = Some(seed.clone());
        self.state = SessionState::Editing;
        self.errors.clear();
        self.notice = None;
        self.gateway_error = None;
        Ok(())
    }

    fn require_editable(&mut self) -> Result<(), Error> {
        match self.state {
            SessionState::Creating | SessionState::Editing => Ok(()),
            SessionState::Persisting => {
                let err = Error::SaveInFlight;
                Err(self.reject(err))
            }
            _ => {
                let err = Error::NoActiveEdit;
                Err(self.reject(err))
            }
        }
    }

    /// Set a field on the private draft copy. Legal only while `Creating`
    /// or `Editing`; the value must match the descriptor's declared type.
    pub fn update_field(&mut self, name: &str, value: FieldValue) -> Result<(), Error> {
        self.require_editable()?;
        self.descriptor
            .check_field(name, &value)
            .map_err(|e| self.reject(e))?;
        if let Some(draft) = self.draft.as_mut() {
            draft.set_field(name, value);
        }
        Ok(())
    }

    /// Apply raw typed text to a field, filtering at the character level.
    ///
    /// For number fields every disallowed character is dropped before the
    /// value is parsed; when nothing survives the previous value stands, so
    /// a clearly-invalid amount never lands in the draft even transiently.
    /// Returns the text that was effectively applied.
    pub fn input_text(&mut self, name: &str, raw: &str) -> Result<String, Error> {
        self.require_editable()?;
        let def = match self.descriptor.field_def(name) {
            Some(def) => def.clone(),
            None => {
                let err = Error::UnknownField(name.to_string());
                return Err(self.reject(err));
            }
        };

        use crate::descriptor::FieldType;
        let Some(draft) = self.draft.as_mut() else {
            return Err(self.reject(Error::NoActiveEdit));
        };
        match def.field_type {
            FieldType::Number => {
                let filtered = filter_numeric_text(raw);
                match filtered.parse::<f64>() {
                    Ok(n) => {
                        draft.set_field(name, FieldValue::Number(n));
                        Ok(filtered)
                    }
                    // nothing usable survived the filter; keep previous value
                    Err(_) => Ok(String::new()),
                }
            }
            FieldType::Date => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => {
                    draft.set_field(name, FieldValue::Date(date));
                    Ok(raw.to_string())
                }
                Err(_) => {
                    self.errors
                        .push(FieldError::new(name, "not a valid date (yyyy-mm-dd)"));
                    Ok(String::new())
                }
            },
            FieldType::Text => {
                draft.set_field(name, FieldValue::Text(raw.to_string()));
                Ok(raw.to_string())
            }
            FieldType::Choice => {
                draft.set_field(name, FieldValue::Choice(raw.to_string()));
                Ok(raw.to_string())
            }
        }
    }

    /// Advance the draft's status through a declared transition. Statuses
    /// move only this way, never as a side effect of anything else.
    pub fn advance_status(&mut self, to: Status) -> Result<(), Error> {
        self.require_editable()?;
        let Some(draft) = self.draft.as_mut() else {
            return Err(self.reject(Error::NoActiveEdit));
        };
        let from = draft.status.clone();
        match self.descriptor.check_transition(&from, &to) {
            Ok(()) => {
                draft.status = to;
                Ok(())
            }
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Validate the draft and, if it passes, move to `Persisting` and hand
    /// back the plan for the gateway call. Validation failure attaches
    /// field errors and returns to the edit state without any gateway
    /// involvement.
    pub fn commit(&mut self) -> CommitOutcome {
        let mode = match self.state {
            SessionState::Creating => EditMode::Creating,
            SessionState::Editing => EditMode::Editing,
            SessionState::Persisting => {
                return CommitOutcome::Rejected(self.reject(Error::SaveInFlight))
            }
            _ => return CommitOutcome::Rejected(self.reject(Error::NoActiveEdit)),
        };

        self.state = SessionState::Validating;
        let Some(draft) = self.draft.as_ref() else {
            self.state = mode.state();
            return CommitOutcome::Rejected(self.reject(Error::NoActiveEdit));
        };
        let errors = self.rules.validate(draft);
        if !errors.is_empty() {
            self.errors = errors.clone();
            self.state = mode.state();
            return CommitOutcome::Invalid(errors);
        }

        self.errors.clear();
        self.state = SessionState::Persisting;
        self.resume = Some(mode);

        let record = draft.clone();
        let action = if record.is_draft() {
            PersistAction::Create
        } else {
            PersistAction::Update
        };
        CommitOutcome::Persist(PersistPlan { action, record })
    }

    /// Feed the gateway outcome back into the session.
    ///
    /// Success clears the draft and returns the canonical record for cache
    /// reconciliation; failure (including a caller-mapped timeout) reverts
    /// to the prior edit state with the draft preserved. The session never
    /// stays in `Persisting` after this call.
    pub fn resolve_persist(&mut self, result: Result<Record, GatewayError>) -> ResolveOutcome {
        if self.state != SessionState::Persisting {
            return ResolveOutcome::Rejected(self.reject(Error::NoActiveEdit));
        }
        match result {
            Ok(canonical) => {
                self.state = SessionState::Idle;
                self.resume = None;
                self.draft = None;
                self.errors.clear();
                self.notice = None;
                self.gateway_error = None;
                ResolveOutcome::Committed(canonical)
            }
            Err(err) => {
                let mode = self.resume.take().unwrap_or(EditMode::Editing);
                self.state = mode.state();
                self.gateway_error = Some(err.clone());
                ResolveOutcome::Reverted(err)
            }
        }
    }

    /// Discard the draft and return to `Idle`. Idempotent; rejected only
    /// while a save is in flight, because acting before the outcome is
    /// known could orphan a saved row.
    pub fn cancel(&mut self) -> CancelOutcome {
        match self.state {
            SessionState::Idle => CancelOutcome::AlreadyIdle,
            SessionState::Persisting => CancelOutcome::Rejected(self.reject(Error::SaveInFlight)),
            _ => {
                self.state = SessionState::Idle;
                self.resume = None;
                self.draft = None;
                self.errors.clear();
                self.notice = None;
                self.gateway_error = None;
                CancelOutcome::Cancelled
            }
        }
    }
}
