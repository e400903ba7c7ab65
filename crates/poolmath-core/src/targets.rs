// ── Chemistry targets ──
//
// Recommended ranges per target profile, overridable by the ranges a pool
// publishes in Pool Math. Used to flag out-of-range readings.

use poolmath_api::{MeasurementCode, TargetOverride};
use serde::Serialize;

use crate::model::TargetProfile;

/// Where an effective range came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TargetSource {
    Profile,
    Pool,
}

/// A recommended range for one code. `min`/`max` may be open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TargetRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub target: Option<f64>,
    pub source: TargetSource,
}

/// Result of checking a value against its range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TargetCheck {
    #[serde(flatten)]
    pub range: TargetRange,
    pub out_of_range: bool,
    /// Distance outside the range, rounded to 2 decimals; 0 inside.
    pub deviation: f64,
}

const fn profile_range(min: f64, max: f64, target: Option<f64>) -> TargetRange {
    TargetRange {
        min: Some(min),
        max: Some(max),
        target,
        source: TargetSource::Profile,
    }
}

/// Recommended range for `code` under `profile`.
pub fn profile_target(profile: TargetProfile, code: MeasurementCode) -> Option<TargetRange> {
    match profile {
        TargetProfile::Tfp => match code {
            MeasurementCode::CombinedChlorine => Some(profile_range(0.0, 0.1, None)),
            MeasurementCode::Ph => Some(profile_range(7.2, 7.8, Some(7.4))),
            MeasurementCode::TotalAlkalinity => Some(profile_range(50.0, 90.0, None)),
            MeasurementCode::Salt => Some(profile_range(3000.0, 3200.0, Some(3100.0))),
            _ => None,
        },
    }
}

/// Profile range with any pool-published fields layered on top.
pub fn effective_target(
    profile: TargetProfile,
    code: MeasurementCode,
    published: Option<&TargetOverride>,
) -> Option<TargetRange> {
    let base = profile_target(profile, code);
    let Some(published) = published.filter(|p| !p.is_empty()) else {
        return base;
    };
    Some(TargetRange {
        min: published.min.or(base.and_then(|b| b.min)),
        max: published.max.or(base.and_then(|b| b.max)),
        target: published.target.or(base.and_then(|b| b.target)),
        source: TargetSource::Pool,
    })
}

impl TargetRange {
    /// Check `value`; `None` unless both bounds are known.
    pub fn check(self, value: f64) -> Option<TargetCheck> {
        let (min, max) = (self.min?, self.max?);
        let deviation = if value < min {
            min - value
        } else if value > max {
            value - max
        } else {
            0.0
        };
        Some(TargetCheck {
            range: self,
            out_of_range: deviation > 0.0,
            deviation: (deviation * 100.0).round() / 100.0,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tfp_ph_range() {
        let range = profile_target(TargetProfile::Tfp, MeasurementCode::Ph).unwrap();
        assert_eq!(range.min, Some(7.2));
        assert_eq!(range.max, Some(7.8));
        assert_eq!(range.target, Some(7.4));
        assert!(profile_target(TargetProfile::Tfp, MeasurementCode::FreeChlorine).is_none());
    }

    #[test]
    fn check_reports_deviation() {
        let range = profile_target(TargetProfile::Tfp, MeasurementCode::Ph).unwrap();
        let inside = range.check(7.5).unwrap();
        assert!(!inside.out_of_range);
        assert!(inside.deviation.abs() < f64::EPSILON);

        let high = range.check(8.05).unwrap();
        assert!(high.out_of_range);
        assert!((high.deviation - 0.25).abs() < 1e-9);

        let low = profile_target(TargetProfile::Tfp, MeasurementCode::Salt)
            .unwrap()
            .check(2800.0)
            .unwrap();
        assert!((low.deviation - 200.0).abs() < 1e-9);
    }

    #[test]
    fn published_range_overrides_profile() {
        let published = TargetOverride {
            target: None,
            min: Some(7.4),
            max: None,
        };
        let range =
            effective_target(TargetProfile::Tfp, MeasurementCode::Ph, Some(&published)).unwrap();
        assert_eq!(range.source, TargetSource::Pool);
        assert_eq!(range.min, Some(7.4));
        assert_eq!(range.max, Some(7.8));
        assert_eq!(range.target, Some(7.4));
    }

    #[test]
    fn open_range_has_no_check() {
        let published = TargetOverride {
            target: Some(4.0),
            min: None,
            max: None,
        };
        let range = effective_target(
            TargetProfile::Tfp,
            MeasurementCode::FreeChlorine,
            Some(&published),
        )
        .unwrap();
        assert!(range.check(3.0).is_none());
    }
}
