// ── Measurement entities ──
//
// One entity per measurement code. Raw entities copy their value straight
// from a snapshot; derived entities compute it from sibling readings in the
// same snapshot. Both keep their last value when a snapshot does not carry
// what they need.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use poolmath_api::{MeasurementCode, MeasurementValue, Snapshot};
use serde::Serialize;

use crate::model::{Derivation, DeviceClass, MeasurementDefinition, PoolSource, definition};
use crate::store::StoredState;
use crate::targets::{TargetCheck, TargetRange};

/// How an entity obtains its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Raw,
    Derived(Derivation),
}

/// A single measurement's state.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementEntity {
    pub code: MeasurementCode,
    pub kind: EntityKind,
    pub definition: &'static MeasurementDefinition,
    value: Option<MeasurementValue>,
    last_updated: Option<DateTime<Utc>>,
    restored: bool,
}

impl MeasurementEntity {
    /// A fresh entity with unknown state.
    pub fn new(code: MeasurementCode) -> Self {
        let definition = definition(code);
        let kind = definition
            .derivation
            .map_or(EntityKind::Raw, EntityKind::Derived);
        Self {
            code,
            kind,
            definition,
            value: None,
            last_updated: None,
            restored: false,
        }
    }

    /// An entity seeded from persisted state.
    pub fn restored(code: MeasurementCode, stored: StoredState) -> Self {
        let mut entity = Self::new(code);
        entity.value = Some(stored.value);
        entity.last_updated = stored.last_updated;
        entity.restored = true;
        entity
    }

    pub fn value(&self) -> Option<&MeasurementValue> {
        self.value.as_ref()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// `true` until the first snapshot updates a restored entity.
    pub fn is_restored(&self) -> bool {
        self.restored
    }

    pub fn is_unknown(&self) -> bool {
        self.value.is_none()
    }

    /// Update from `snapshot`. Returns `true` if value or timestamp changed.
    pub fn apply(&mut self, snapshot: &Snapshot) -> bool {
        let update = match self.kind {
            EntityKind::Raw => snapshot
                .reading(self.code)
                .map(|r| (r.value.clone(), r.timestamp)),
            EntityKind::Derived(derivation) => derivation
                .compute(|code| snapshot.number(code))
                .map(|value| (MeasurementValue::Number(value), operand_timestamp(derivation, snapshot))),
        };

        let Some((value, timestamp)) = update else {
            return false;
        };
        let changed = self.value.as_ref() != Some(&value) || self.last_updated != Some(timestamp);
        self.value = Some(value);
        self.last_updated = Some(timestamp);
        self.restored = false;
        changed
    }

    /// State to persist, if the entity has a value.
    pub fn stored_state(&self) -> Option<StoredState> {
        self.value.clone().map(|value| StoredState {
            value,
            last_updated: self.last_updated,
        })
    }

    /// Build the host-facing view.
    pub fn view(&self, ctx: &ViewContext<'_>) -> EntityView {
        let def = self.definition;
        let unit = (self.code == MeasurementCode::WaterTemperature)
            .then_some(ctx.source.temperature_unit.symbol());
        let value = match (&self.value, self.code) {
            (Some(MeasurementValue::Number(f)), MeasurementCode::WaterTemperature) => Some(
                MeasurementValue::Number(ctx.source.temperature_unit.from_fahrenheit(*f)),
            ),
            (value, _) => value.clone(),
        };
        let target = ctx
            .target
            .zip(self.value.as_ref().and_then(MeasurementValue::as_number))
            .and_then(|(range, n)| range.check(n));

        EntityView {
            unique_id: ctx.source.unique_id(self.code).unwrap_or_default(),
            name: format!("{} {}", ctx.pool_name, def.name),
            code: self.code,
            derived: matches!(self.kind, EntityKind::Derived(_)),
            value,
            unit: unit.or(def.unit).map(str::to_owned),
            icon: def.icon,
            device_class: def.device_class,
            precision: def.precision,
            available: ctx.available,
            last_updated: self.last_updated,
            restored: self.restored,
            target,
        }
    }
}

/// Newest timestamp among the operands of a derivation.
fn operand_timestamp(derivation: Derivation, snapshot: &Snapshot) -> DateTime<Utc> {
    derivation
        .operands()
        .iter()
        .filter_map(|code| snapshot.reading(*code).map(|r| r.timestamp))
        .max()
        .unwrap_or(snapshot.timestamp)
}

/// Pool-level inputs needed to render a view.
pub struct ViewContext<'a> {
    pub source: &'a PoolSource,
    pub pool_name: &'a str,
    pub available: bool,
    pub target: Option<TargetRange>,
}

/// What a host exposes for one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityView {
    pub unique_id: String,
    pub name: String,
    pub code: MeasurementCode,
    pub derived: bool,
    pub value: Option<MeasurementValue>,
    pub unit: Option<String>,
    pub icon: &'static str,
    pub device_class: Option<DeviceClass>,
    pub precision: u8,
    pub available: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub restored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetCheck>,
}

impl EntityView {
    /// Value formatted with the definition's precision, or `unknown`.
    pub fn display_value(&self) -> String {
        match &self.value {
            Some(MeasurementValue::Number(n)) => {
                format!("{n:.prec$}", prec = usize::from(self.precision))
            }
            Some(MeasurementValue::Text(s)) => s.clone(),
            None => "unknown".to_owned(),
        }
    }
}

/// Shared snapshot of all views, ordered by code.
pub type EntityViews = Arc<Vec<Arc<EntityView>>>;
