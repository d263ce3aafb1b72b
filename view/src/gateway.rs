//! The persistence boundary.
//!
//! The coordinator is format-agnostic over whatever these traits wrap: a
//! database client, an HTTP API, an in-memory fixture in tests. Both are
//! asynchronous and may fail with a [`GatewayError`] from the remote side.

use async_trait::async_trait;
use tabula_core::{CacheKey, GatewayError, Record, RecordId};

/// Create, update, and delete operations against the remote store.
///
/// `create` and `update` return the canonical record as the backend now
/// holds it (ids assigned, server-side fields filled in); the coordinator
/// reconciles that record into the cache by point upsert.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn create(&self, record: &Record) -> Result<Record, GatewayError>;
    async fn update(&self, record: &Record) -> Result<Record, GatewayError>;
    async fn delete(&self, id: RecordId) -> Result<(), GatewayError>;
}

/// Bulk fetch for one cache key, used only on a cache miss or after a hard
/// invalidation.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch(&self, key: &CacheKey) -> Result<Vec<Record>, GatewayError>;
}
