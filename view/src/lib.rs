//! Async view layer for the Tabula editing core.
//!
//! `tabula-core` is pure and synchronous; this crate supplies the parts
//! that touch the outside world:
//!
//! - [`PersistenceGateway`] and [`RecordSource`]: the async boundary to
//!   whatever backend actually stores records
//! - [`ViewCoordinator`]: one instance per editing screen, routing every
//!   command through the core session and reconciling the shared cache
//!   after each save
//! - [`CoordinatorConfig`]: timeouts, cache freshness, and display
//!   placement, overridable from the environment
//!
//! The coordinator never blocks rendering on the network: reads come from
//! the cache (including soft-stale last-known values), and only commits,
//! deletes, and explicit refreshes await the gateway.

pub mod config;
pub mod coordinator;
pub mod gateway;

pub use config::{ConfigError, CoordinatorConfig};
pub use coordinator::{CommandError, SaveOutcome, SharedCache, ViewCoordinator};
pub use gateway::{PersistenceGateway, RecordSource};
