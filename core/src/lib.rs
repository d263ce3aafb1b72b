//! # Tabula Core
//!
//! The deterministic core of an inline-editing data grid: one in-flight
//! edit session per view, a keyed read-through record cache, and a pure
//! filter pipeline over both.
//!
//! This crate is the part of a desktop business application with real
//! invariants to violate: concurrent edit collisions, stale cached
//! collections, partial saves, validation ordering, and reconciliation
//! after a round trip to a remote store. Window chrome, layout, and
//! formatting are external collaborators.
//!
//! ## Design Principles
//!
//! - **No IO**: the core never touches files or the network; the single
//!   suspension point (the persistence round trip) is driven by the host
//!   through [`EditSession::commit`] / [`EditSession::resolve_persist`]
//! - **Deterministic**: same records, predicate, and sort always produce
//!   the same displayed sequence
//! - **One draft**: at most one record is being created or edited at a
//!   time; a second begin is rejected, never queued
//! - **Point reconciliation**: a successful save is an O(1) cache upsert,
//!   never a refetch
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`Record`] is an opaque, validated key-value bag with an identity
//! field: id `0` marks an unsaved draft, a positive id a persisted row.
//! Fields are typed ([`FieldValue`]); the business [`Status`] belongs to a
//! closed set and advances only through declared transitions.
//!
//! ### Descriptors
//!
//! A [`RecordDescriptor`] declares the entity's fields, statuses, and
//! status transitions. Each editing surface supplies one; the core never
//! hard-codes a business schema.
//!
//! ### The cache
//!
//! [`RecordCache`] partitions records by cache key (a date, a parent id).
//! Reads are read-through: a [`cache::Lookup::Miss`] tells the caller to
//! fetch and [`RecordCache::populate`]. Saves reconcile through
//! [`RecordCache::upsert`], deletes through [`RecordCache::remove`].
//!
//! ### The session
//!
//! [`EditSession`] is the state machine governing the single draft:
//! `Idle -> Creating | Editing -> Validating -> Persisting -> Idle`, with
//! validation failure and gateway failure both returning to the edit
//! state with the draft preserved.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use tabula_core::{
//!     CommitOutcome, EditSession, FieldDef, FieldType, FieldValue, Record,
//!     RecordDescriptor, Status, ValidationRules,
//! };
//!
//! let descriptor = Arc::new(
//!     RecordDescriptor::new(
//!         "expense",
//!         vec![
//!             FieldDef::required("label", FieldType::Text),
//!             FieldDef::required("amount", FieldType::Number),
//!         ],
//!         vec![Status::new("PENDING"), Status::new("PAID")],
//!         Status::new("PENDING"),
//!     )
//!     .unwrap(),
//! );
//! let rules = ValidationRules::for_descriptor(&descriptor);
//! let mut session = EditSession::new(descriptor, rules);
//!
//! session.begin_create().unwrap();
//! session.update_field("label", FieldValue::Text("Team lunch".into())).unwrap();
//! session.update_field("amount", FieldValue::Number(64.0)).unwrap();
//!
//! let plan = match session.commit() {
//!     CommitOutcome::Persist(plan) => plan,
//!     other => panic!("draft should validate: {other:?}"),
//! };
//!
//! // the host runs the gateway call, then feeds the outcome back:
//! let canonical = Record { id: 42, ..plan.record };
//! session.resolve_persist(Ok(canonical));
//! assert!(session.is_idle());
//! ```

pub mod cache;
pub mod descriptor;
pub mod error;
pub mod filter;
pub mod record;
pub mod session;
pub mod validate;

// Re-export main types at crate root
pub use cache::{CacheEntry, InsertPosition, Lookup, RecordCache, RemoveOutcome, UpsertOutcome};
pub use descriptor::{FieldDef, FieldType, RecordDescriptor};
pub use error::{Error, FieldError, GatewayError};
pub use filter::{Anchor, DateRange, Direction, FilterPipeline, Predicate, SortKey, SortSpec};
pub use record::{FieldValue, Record, Status, DRAFT_ID};
pub use session::{
    CancelOutcome, CommitOutcome, EditSession, PersistAction, PersistPlan, ResolveOutcome,
    SessionSnapshot, SessionState,
};
pub use validate::{amount_char_allowed, filter_numeric_text, Rule, ValidationRules};

/// Type aliases for clarity
pub type RecordId = i64;
pub type FieldName = String;
pub type CacheKey = String;
pub type Timestamp = u64;
