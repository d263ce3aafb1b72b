//! The view coordinator: glue between the core and a rendering surface.
//!
//! One coordinator backs one editing screen. It owns the screen's
//! [`EditSession`] and [`FilterPipeline`] settings and drives the
//! persistence gateway; the keyed [`RecordCache`] arrives as a
//! [`SharedCache`] handle, so every coordinator reading the same keys sees
//! the same entries and one view's post-save reconciliation is immediately
//! visible to the others. Every command the rendering layer can issue
//! (keyboard, button, timer) goes through the methods here, so the
//! session's concurrency contract is enforced in one place regardless of
//! the input transport.
//!
//! The gateway round trip is the only suspension point. Cache
//! reconciliation after a successful save happens synchronously before
//! `commit` returns, so the next `visible_records` call always sees it.

use crate::config::CoordinatorConfig;
use crate::gateway::{PersistenceGateway, RecordSource};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tabula_core::{
    CacheKey, CancelOutcome, CommitOutcome, EditSession, Error, FieldError, FieldValue,
    FilterPipeline, GatewayError, PersistAction, PersistPlan, Predicate, Record, RecordCache,
    RecordDescriptor, RecordId, RemoveOutcome, ResolveOutcome, SessionSnapshot, SortSpec,
    Status, Timestamp, UpsertOutcome, ValidationRules,
};
use tokio::time::timeout;

/// The record cache handle shared by every coordinator over the same
/// backend. The lock is held only for synchronous cache operations, never
/// across a gateway call.
pub type SharedCache = Arc<Mutex<RecordCache>>;

/// Outcome of a coordinated commit.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Persisted and reconciled into the cache
    Saved(Record),
    /// Validation failed; errors are in `state()`, the gateway was never
    /// called
    Invalid(Vec<FieldError>),
    /// The gateway failed or timed out; the session reverted with the
    /// draft preserved
    Failed(GatewayError),
    /// Commit was not legal in the current session state
    Rejected(Error),
}

/// A session rejection or a gateway failure, for commands that can hit
/// both (delete, refresh-while-editing).
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Session(#[from] Error),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Coordinates one editing screen over one cache key.
pub struct ViewCoordinator<G, S> {
    descriptor: Arc<RecordDescriptor>,
    session: EditSession,
    cache: SharedCache,
    predicate: Predicate,
    sort: SortSpec,
    key: CacheKey,
    gateway: Arc<G>,
    source: Arc<S>,
    config: CoordinatorConfig,
}

impl<G, S> ViewCoordinator<G, S>
where
    G: PersistenceGateway,
    S: RecordSource,
{
    /// Create a coordinator for one entity and cache key. All coordinators
    /// reading the same backend should receive the same `cache` handle
    /// (see [`CoordinatorConfig::new_shared_cache`]).
    pub fn new(
        descriptor: Arc<RecordDescriptor>,
        rules: ValidationRules,
        key: impl Into<CacheKey>,
        cache: SharedCache,
        gateway: Arc<G>,
        source: Arc<S>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            session: EditSession::new(descriptor.clone(), rules),
            descriptor,
            cache,
            predicate: Predicate::any(),
            sort: SortSpec::new(),
            key: key.into(),
            gateway,
            source,
            config,
        }
    }

    fn now() -> Timestamp {
        Utc::now().timestamp_millis() as u64
    }

    // every cache operation leaves the map consistent, so a poisoned lock
    // still holds usable data
    fn cache(&self) -> MutexGuard<'_, RecordCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pipeline(&self) -> FilterPipeline {
        FilterPipeline::new(
            self.predicate.clone(),
            self.sort.clone(),
            self.config.anchor,
        )
    }

    /// The active cache key.
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Read-only session snapshot for rendering.
    pub fn state(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// The displayed records: cache content (last-known values while a
    /// refetch is pending) through the filter pipeline, draft anchored.
    pub fn visible_records(&self) -> Vec<Record> {
        let cache = self.cache();
        let records = match cache.get(&self.key, Self::now()).hit() {
            Some(entry) => entry.records(),
            None => cache.last_known(&self.key).unwrap_or(&[]),
        };
        self.pipeline()
            .apply(&self.descriptor, records, self.session.draft())
    }

    /// Replace the display predicate. Takes effect on the next render.
    pub fn set_filter(&mut self, predicate: Predicate) {
        self.predicate = predicate;
    }

    /// Replace the sort spec. Takes effect on the next render.
    pub fn set_sort(&mut self, sort: SortSpec) {
        self.sort = sort;
    }

    /// Switch to a cache key, fetching through the record source when the
    /// cache has no fresh entry for it.
    pub async fn refresh(&mut self, key: impl Into<CacheKey>) -> Result<(), GatewayError> {
        self.key = key.into();
        if self.cache().get(&self.key, Self::now()).is_miss() {
            self.fetch_and_populate().await?;
        }
        Ok(())
    }

    /// Force a refetch of the active key. The entry is soft-invalidated
    /// first so the view keeps rendering last-known values if the caller
    /// renders while the fetch is in flight.
    pub async fn reload(&mut self) -> Result<(), GatewayError> {
        self.cache().invalidate_soft(&self.key);
        self.fetch_and_populate().await
    }

    async fn fetch_and_populate(&mut self) -> Result<(), GatewayError> {
        let records = match timeout(self.config.gateway_timeout, self.source.fetch(&self.key)).await
        {
            Ok(result) => result?,
            Err(_) => return Err(GatewayError::Timeout),
        };
        tracing::debug!(key = %self.key, count = records.len(), "populated cache entry");
        self.cache().populate(self.key.clone(), records, Self::now());
        Ok(())
    }

    /// Start creating a new record.
    pub fn begin_create(&mut self) -> Result<(), Error> {
        self.session.begin_create().inspect_err(|err| {
            tracing::debug!(%err, "begin create rejected");
        })
    }

    /// Start editing the cached record with the given id.
    pub fn begin_edit(&mut self, id: RecordId) -> Result<(), Error> {
        let seed = self
            .cache()
            .last_known(&self.key)
            .and_then(|records| records.iter().find(|r| r.id == id))
            .cloned()
            .ok_or(Error::RecordNotFound(id))?;
        self.session.begin_edit(&seed).inspect_err(|err| {
            tracing::debug!(id, %err, "begin edit rejected");
        })
    }

    /// Set a field on the draft.
    pub fn update_field(&mut self, name: &str, value: FieldValue) -> Result<(), Error> {
        self.session.update_field(name, value)
    }

    /// Apply raw typed text to a draft field, character-filtered for
    /// numeric fields. Returns the text that was effectively applied.
    pub fn input_text(&mut self, name: &str, raw: &str) -> Result<String, Error> {
        self.session.input_text(name, raw)
    }

    /// Advance the draft's status through a declared transition.
    pub fn advance_status(&mut self, to: Status) -> Result<(), Error> {
        self.session.advance_status(to)
    }

    /// Discard the draft. Idempotent; rejected while a save is in flight.
    pub fn cancel(&mut self) -> CancelOutcome {
        let outcome = self.session.cancel();
        if let CancelOutcome::Rejected(err) = &outcome {
            tracing::debug!(%err, "cancel rejected");
        }
        outcome
    }

    /// Validate, persist, and reconcile the draft.
    ///
    /// Validation failure never reaches the gateway. A gateway failure or
    /// timeout reverts the session with the draft preserved. On success
    /// the canonical record is upserted into the cache entry before this
    /// method returns.
    pub async fn commit(&mut self) -> SaveOutcome {
        let plan = match self.session.commit() {
            CommitOutcome::Persist(plan) => plan,
            CommitOutcome::Invalid(errors) => {
                tracing::debug!(count = errors.len(), "commit blocked by validation");
                return SaveOutcome::Invalid(errors);
            }
            CommitOutcome::Rejected(err) => {
                tracing::debug!(%err, "commit rejected");
                return SaveOutcome::Rejected(err);
            }
        };

        let result = self.execute_plan(&plan).await;
        match self.session.resolve_persist(result) {
            ResolveOutcome::Committed(canonical) => {
                let outcome =
                    self.cache()
                        .upsert(&self.key, canonical.clone(), self.config.insert_position);
                match outcome {
                    UpsertOutcome::Inserted | UpsertOutcome::Replaced => {}
                    other => {
                        // a concurrent invalidation may have cleared the
                        // entry; the next refresh will pick the row up
                        tracing::warn!(key = %self.key, ?other, "post-save upsert was a no-op");
                    }
                }
                tracing::info!(id = canonical.id, key = %self.key, "record saved");
                SaveOutcome::Saved(canonical)
            }
            ResolveOutcome::Reverted(err) => {
                tracing::warn!(%err, "save failed, draft preserved");
                SaveOutcome::Failed(err)
            }
            ResolveOutcome::Rejected(err) => SaveOutcome::Rejected(err),
        }
    }

    async fn execute_plan(&self, plan: &PersistPlan) -> Result<Record, GatewayError> {
        let call = async {
            match plan.action {
                PersistAction::Create => self.gateway.create(&plan.record).await,
                PersistAction::Update => self.gateway.update(&plan.record).await,
            }
        };
        match timeout(self.config.gateway_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        }
    }

    /// Delete a persisted record and reconcile the cache by point removal.
    /// Rejected while an edit session is active.
    pub async fn delete(&mut self, id: RecordId) -> Result<(), CommandError> {
        if !self.session.is_idle() {
            return Err(Error::EditInProgress {
                active: self.session.draft().map(|d| d.id).unwrap_or_default(),
            }
            .into());
        }

        match timeout(self.config.gateway_timeout, self.gateway.delete(id)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => return Err(GatewayError::Timeout.into()),
        }

        if self.cache().remove(&self.key, id) != RemoveOutcome::Removed {
            tracing::debug!(id, key = %self.key, "deleted record was not cached");
        }
        tracing::info!(id, key = %self.key, "record deleted");
        Ok(())
    }
}
