//! Polling coordinator and measurement entities for Pool Math pools.
//!
//! This crate sits between `poolmath-api` and hosts such as the CLI:
//!
//! - **[`Coordinator`]**: Owns one pool's lifecycle:
//!   [`start()`](Coordinator::start) restores persisted entity state, runs the
//!   first refresh, then spawns a background timer that refreshes on the
//!   configured interval. Refreshes are single flight; failures clear the
//!   available flag instead of propagating.
//!
//! - **[`EntityRegistry`]**: Lazily materialized measurement entities
//!   (`DashMap` + `tokio::sync::watch`). Raw entities mirror a code from the
//!   latest snapshot; derived entities (total chlorine) are computed from it.
//!
//! - **[`MeasurementStream`]**: Subscription handle over the registry's
//!   entity views, exposing `current()` / `latest()` / `changed()`.
//!
//! - **Domain model** ([`model`]): [`PoolSource`], the measurement catalog,
//!   temperature units and target profiles.
//!
//! - **[`migrate_source`]** and **[`Diagnostics`]** for legacy share ids and
//!   redacted health reports.

pub mod coordinator;
pub mod diagnostics;
pub mod entity;
pub mod error;
pub mod migration;
pub mod model;
pub mod store;
pub mod stream;
pub mod targets;

// ── Primary re-exports ──────────────────────────────────────────────
pub use coordinator::{
    Coordinator, CoordinatorState, FailureRecord, RefreshOutcome, SnapshotSource,
};
pub use diagnostics::{Diagnostics, redact};
pub use entity::{EntityKind, EntityView, EntityViews, MeasurementEntity};
pub use error::CoreError;
pub use migration::{migrate_all, migrate_source};
pub use model::{
    DEFAULT_POLL_INTERVAL, DEFAULT_POOL_NAME, MIN_POLL_INTERVAL, MeasurementDefinition,
    PoolIdentity, PoolSource, TargetProfile, TemperatureUnit,
};
pub use store::{
    ApplyReport, EntityRegistry, JsonFileStore, MemoryRestoreStore, RestoreStore,
    StoredPoolState, StoredState,
};
pub use stream::{MeasurementStream, MeasurementWatchStream};
pub use targets::{TargetCheck, TargetRange, TargetSource};
