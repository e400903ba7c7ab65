// ── Pool sources ──
//
// A `PoolSource` is one monitored pool as configured by the user. It is
// immutable once built; the coordinator only accepts a new poll interval at
// runtime.

use std::fmt;
use std::time::Duration;

use poolmath_api::{DEFAULT_TIMEOUT_SECS, MeasurementCode, PoolIds, ShareId};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default poll interval (8 minutes).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(480);

/// Shortest poll interval accepted.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(60);

pub const DEFAULT_POOL_NAME: &str = "Pool";

/// Where a pool's data comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolIdentity {
    /// Canonical user/pool pair.
    Ids(PoolIds),
    /// Legacy single-token share id, awaiting migration.
    Legacy(ShareId),
}

impl fmt::Display for PoolIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ids(ids) => write!(f, "{ids}"),
            Self::Legacy(share_id) => write!(f, "share_id={share_id}"),
        }
    }
}

/// Unit temperatures are reported in. Pool Math always logs °F.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum TemperatureUnit {
    #[default]
    #[serde(rename = "F")]
    #[strum(to_string = "F")]
    Fahrenheit,
    #[serde(rename = "C")]
    #[strum(to_string = "C")]
    Celsius,
}

impl TemperatureUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Fahrenheit => "°F",
            Self::Celsius => "°C",
        }
    }

    /// Convert a Fahrenheit reading into this unit.
    pub fn from_fahrenheit(self, value: f64) -> f64 {
        match self {
            Self::Fahrenheit => value,
            Self::Celsius => (value - 32.0) * 5.0 / 9.0,
        }
    }
}

/// Chemistry target profile.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TargetProfile {
    /// Trouble Free Pool recommended levels.
    #[default]
    Tfp,
}

/// One monitored pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSource {
    pub name: String,
    pub identity: PoolIdentity,
    #[serde(with = "duration_secs")]
    pub poll_interval: Duration,
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    pub temperature_unit: TemperatureUnit,
    pub target: TargetProfile,
}

impl PoolSource {
    /// A source with default interval, timeout, unit and profile.
    pub fn new(name: impl Into<String>, identity: PoolIdentity) -> Self {
        Self {
            name: name.into(),
            identity,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            temperature_unit: TemperatureUnit::default(),
            target: TargetProfile::default(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Result<Self, CoreError> {
        validate_poll_interval(interval)?;
        self.poll_interval = interval;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, CoreError> {
        if timeout.is_zero() {
            return Err(CoreError::configuration("timeout must be positive"));
        }
        self.timeout = timeout;
        Ok(self)
    }

    pub fn with_temperature_unit(mut self, unit: TemperatureUnit) -> Self {
        self.temperature_unit = unit;
        self
    }

    pub fn with_target(mut self, target: TargetProfile) -> Self {
        self.target = target;
        self
    }

    /// Replace a legacy identity with resolved ids.
    pub fn with_ids(mut self, ids: PoolIds) -> Self {
        self.identity = PoolIdentity::Ids(ids);
        self
    }

    pub fn ids(&self) -> Option<&PoolIds> {
        match &self.identity {
            PoolIdentity::Ids(ids) => Some(ids),
            PoolIdentity::Legacy(_) => None,
        }
    }

    pub fn legacy_share_id(&self) -> Option<&ShareId> {
        match &self.identity {
            PoolIdentity::Legacy(id) => Some(id),
            PoolIdentity::Ids(_) => None,
        }
    }

    pub fn needs_migration(&self) -> bool {
        self.legacy_share_id().is_some()
    }

    /// Ids, or `MigrationRequired` for a legacy source.
    pub fn require_ids(&self) -> Result<&PoolIds, CoreError> {
        match &self.identity {
            PoolIdentity::Ids(ids) => Ok(ids),
            PoolIdentity::Legacy(share_id) => Err(CoreError::MigrationRequired {
                pool: self.name.clone(),
                share_id: share_id.to_string(),
            }),
        }
    }

    /// `poolmath_{user}_{pool}_{code}`
    pub fn unique_id(&self, code: MeasurementCode) -> Option<String> {
        self.ids()
            .map(|ids| format!("poolmath_{}_{code}", ids.key()))
    }
}

/// Reject intervals below [`MIN_POLL_INTERVAL`].
pub fn validate_poll_interval(interval: Duration) -> Result<(), CoreError> {
    if interval < MIN_POLL_INTERVAL {
        return Err(CoreError::configuration(format!(
            "poll interval {}s is below the {}s minimum",
            interval.as_secs(),
            MIN_POLL_INTERVAL.as_secs()
        )));
    }
    Ok(())
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ids() -> PoolIds {
        PoolIds::new("user-1", "pool-1").unwrap()
    }

    #[test]
    fn defaults_match_integration_defaults() {
        let source = PoolSource::new("Backyard", PoolIdentity::Ids(ids()));
        assert_eq!(source.poll_interval, Duration::from_secs(480));
        assert_eq!(source.timeout, Duration::from_secs(15));
        assert_eq!(source.temperature_unit, TemperatureUnit::Fahrenheit);
        assert_eq!(source.target, TargetProfile::Tfp);
    }

    #[test]
    fn rejects_short_poll_interval() {
        let source = PoolSource::new("Backyard", PoolIdentity::Ids(ids()));
        assert!(source.clone().with_poll_interval(Duration::from_secs(59)).is_err());
        assert!(source.with_poll_interval(Duration::from_secs(60)).is_ok());
    }

    #[test]
    fn unique_id_includes_user_and_pool() {
        let source = PoolSource::new("Backyard", PoolIdentity::Ids(ids()));
        assert_eq!(
            source.unique_id(MeasurementCode::FreeChlorine).as_deref(),
            Some("poolmath_user-1_pool-1_fc")
        );
    }

    #[test]
    fn legacy_source_requires_migration() {
        let source = PoolSource::new(
            "Spa",
            PoolIdentity::Legacy(ShareId::new("6WPG8yL").unwrap()),
        );
        assert!(source.needs_migration());
        assert!(source.unique_id(MeasurementCode::Ph).is_none());
        assert!(matches!(
            source.require_ids(),
            Err(CoreError::MigrationRequired { .. })
        ));
        let migrated = source.with_ids(ids());
        assert!(!migrated.needs_migration());
    }

    #[test]
    fn celsius_conversion() {
        assert!((TemperatureUnit::Celsius.from_fahrenheit(212.0) - 100.0).abs() < f64::EPSILON);
        assert!((TemperatureUnit::Fahrenheit.from_fahrenheit(82.0) - 82.0).abs() < f64::EPSILON);
        assert_eq!("c".parse::<TemperatureUnit>().unwrap(), TemperatureUnit::Celsius);
        assert!("kelvin".parse::<TemperatureUnit>().is_err());
    }
}
