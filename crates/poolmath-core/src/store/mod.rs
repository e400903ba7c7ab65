// ── Entity registry ──
//
// Lazily materialized measurement entities for one pool, with push-based
// change notification via `watch` channels. Every mutation bumps a version
// counter and rebuilds the view snapshot that subscribers receive.

mod restore;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use poolmath_api::{MeasurementCode, Snapshot, TargetOverride};
use tokio::sync::watch;
use tracing::debug;

pub use restore::{JsonFileStore, MemoryRestoreStore, RestoreStore, StoredPoolState, StoredState};

use crate::entity::{EntityView, EntityViews, MeasurementEntity, ViewContext};
use crate::model::{PoolSource, measurement};
use crate::stream::MeasurementStream;
use crate::targets;

/// Codes created or updated by one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub created: Vec<MeasurementCode>,
    pub updated: Vec<MeasurementCode>,
}

/// Entities of one pool, keyed by code.
pub struct EntityRegistry {
    source: PoolSource,
    entities: DashMap<MeasurementCode, MeasurementEntity>,
    /// Target ranges published by the pool in the last snapshot.
    published_targets: ArcSwap<BTreeMap<MeasurementCode, TargetOverride>>,
    available: AtomicBool,
    version: watch::Sender<u64>,
    views: watch::Sender<EntityViews>,
}

impl EntityRegistry {
    pub fn new(source: PoolSource) -> Self {
        let (version, _) = watch::channel(0u64);
        let (views, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            source,
            entities: DashMap::new(),
            published_targets: ArcSwap::from_pointee(BTreeMap::new()),
            available: AtomicBool::new(false),
            version,
            views,
        }
    }

    pub fn source(&self) -> &PoolSource {
        &self.source
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Push a snapshot to every entity, materializing new ones on first sight.
    pub fn apply_snapshot(&self, snapshot: &Snapshot) -> ApplyReport {
        let mut report = ApplyReport::default();

        for code in snapshot.codes() {
            self.materialize(code, &mut report);
        }
        // Derived entities appear once all their operands have been observed.
        for def in measurement::derived_definitions() {
            let ready = def
                .derivation
                .is_some_and(|d| d.operands().iter().all(|op| self.entities.contains_key(op)));
            if ready {
                self.materialize(def.code, &mut report);
            }
        }

        for mut entry in self.entities.iter_mut() {
            if entry.value_mut().apply(snapshot) {
                report.updated.push(*entry.key());
            }
        }
        report.updated.sort_unstable();

        self.published_targets.store(Arc::new(snapshot.targets.clone()));

        if !report.created.is_empty() {
            debug!(pool = %self.source.name, created = ?report.created, "materialized entities");
        }
        self.rebuild_views();
        self.bump_version();
        report
    }

    /// Seed entities from persisted state. Existing entities are left alone.
    pub fn restore(&self, state: &StoredPoolState) -> usize {
        let mut restored = 0;
        for (code, stored) in &state.entities {
            if self.entities.contains_key(code) {
                continue;
            }
            self.entities
                .insert(*code, MeasurementEntity::restored(*code, stored.clone()));
            restored += 1;
        }
        if restored > 0 {
            self.rebuild_views();
            self.bump_version();
        }
        restored
    }

    /// Flip the availability flag shown on every view.
    pub fn set_available(&self, available: bool) {
        if self.available.swap(available, Ordering::AcqRel) != available {
            self.rebuild_views();
            self.bump_version();
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    pub fn get(&self, code: MeasurementCode) -> Option<MeasurementEntity> {
        self.entities.get(&code).map(|e| e.value().clone())
    }

    pub fn codes(&self) -> Vec<MeasurementCode> {
        let mut codes: Vec<_> = self.entities.iter().map(|e| *e.key()).collect();
        codes.sort_unstable();
        codes
    }

    /// Current views (cheap `Arc` clone).
    pub fn views(&self) -> EntityViews {
        self.views.borrow().clone()
    }

    pub fn view(&self, code: MeasurementCode) -> Option<Arc<EntityView>> {
        self.views().iter().find(|v| v.code == code).cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<EntityViews> {
        self.views.subscribe()
    }

    pub fn stream(&self) -> MeasurementStream {
        MeasurementStream::new(self.subscribe())
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Everything worth persisting.
    pub fn stored_state(&self) -> StoredPoolState {
        StoredPoolState {
            entities: self
                .entities
                .iter()
                .filter_map(|e| e.value().stored_state().map(|s| (*e.key(), s)))
                .collect(),
        }
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn materialize(&self, code: MeasurementCode, report: &mut ApplyReport) {
        if !self.entities.contains_key(&code) {
            self.entities.insert(code, MeasurementEntity::new(code));
            report.created.push(code);
        }
    }

    fn rebuild_views(&self) {
        let published = self.published_targets.load();
        let available = self.is_available();

        let mut views: Vec<Arc<EntityView>> = self
            .entities
            .iter()
            .map(|e| {
                let code = *e.key();
                let ctx = ViewContext {
                    source: &self.source,
                    pool_name: &self.source.name,
                    available,
                    target: targets::effective_target(self.source.target, code, published.get(&code)),
                };
                Arc::new(e.value().view(&ctx))
            })
            .collect();
        views.sort_by_key(|v| v.code);
        // `send_modify` updates unconditionally, even with zero receivers.
        self.views.send_modify(|snap| *snap = Arc::new(views));
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}
