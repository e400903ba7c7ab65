// ── Domain model ──
//
// Pool sources and the static measurement catalog.

pub mod measurement;
pub mod pool;

pub use measurement::{Derivation, DeviceClass, MeasurementDefinition, definition};
pub use pool::{
    DEFAULT_POLL_INTERVAL, DEFAULT_POOL_NAME, MIN_POLL_INTERVAL, PoolIdentity, PoolSource, TargetProfile,
    TemperatureUnit, validate_poll_interval,
};
