// ── Measurement codes ──
//
// The closed vocabulary of measurement codes. Wire names match the keys
// Pool Math uses in log entries and in the pool overview; a few codes have
// historical aliases that are accepted on input.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// A supported chemistry or equipment measurement.
///
/// `Display` / `FromStr` use the canonical wire name (`"fc"`, `"waterTemp"`);
/// `FromStr` also accepts the aliases listed in [`wire_names`](Self::wire_names).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum MeasurementCode {
    #[serde(rename = "fc")]
    #[strum(to_string = "fc")]
    FreeChlorine,
    #[serde(rename = "cc")]
    #[strum(to_string = "cc")]
    CombinedChlorine,
    /// Computed as FC + CC; never read from the payload.
    #[serde(rename = "tc")]
    #[strum(to_string = "tc")]
    TotalChlorine,
    #[serde(rename = "ph")]
    #[strum(to_string = "ph")]
    Ph,
    #[serde(rename = "ta")]
    #[strum(to_string = "ta")]
    TotalAlkalinity,
    #[serde(rename = "ch")]
    #[strum(to_string = "ch")]
    CalciumHardness,
    #[serde(rename = "cya")]
    #[strum(to_string = "cya")]
    CyanuricAcid,
    #[serde(rename = "salt")]
    #[strum(to_string = "salt")]
    Salt,
    #[serde(rename = "bor", alias = "borate")]
    #[strum(to_string = "bor", serialize = "borate")]
    Borate,
    #[serde(rename = "tds")]
    #[strum(to_string = "tds")]
    TotalDissolvedSolids,
    #[serde(rename = "csi")]
    #[strum(to_string = "csi")]
    CalciteSaturationIndex,
    #[serde(rename = "waterTemp", alias = "temp")]
    #[strum(to_string = "waterTemp", serialize = "temp")]
    WaterTemperature,
    #[serde(rename = "flowRate")]
    #[strum(to_string = "flowRate")]
    FlowRate,
    #[serde(rename = "pressure")]
    #[strum(to_string = "pressure")]
    Pressure,
    #[serde(rename = "swgCellPercent", alias = "swgCellPercentage")]
    #[strum(to_string = "swgCellPercent", serialize = "swgCellPercentage")]
    SwgCellPercent,
}

impl MeasurementCode {
    /// Canonical wire name.
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Every key this code may appear under in a payload, canonical first.
    pub fn wire_names(self) -> &'static [&'static str] {
        match self {
            Self::Borate => &["bor", "borate"],
            Self::WaterTemperature => &["waterTemp", "temp"],
            Self::SwgCellPercent => &["swgCellPercent", "swgCellPercentage"],
            Self::FreeChlorine => &["fc"],
            Self::CombinedChlorine => &["cc"],
            Self::TotalChlorine => &["tc"],
            Self::Ph => &["ph"],
            Self::TotalAlkalinity => &["ta"],
            Self::CalciumHardness => &["ch"],
            Self::CyanuricAcid => &["cya"],
            Self::Salt => &["salt"],
            Self::TotalDissolvedSolids => &["tds"],
            Self::CalciteSaturationIndex => &["csi"],
            Self::FlowRate => &["flowRate"],
            Self::Pressure => &["pressure"],
        }
    }

    /// Whether this code is computed from sibling readings.
    pub fn is_derived(self) -> bool {
        matches!(self, Self::TotalChlorine)
    }

    /// Pool-level flag that disables this measurement when explicitly `false`.
    pub fn tracking_flag(self) -> Option<&'static str> {
        match self {
            Self::Salt => Some("trackSalt"),
            Self::Borate => Some("trackBor"),
            Self::CombinedChlorine => Some("trackCC"),
            Self::CalciteSaturationIndex => Some("trackCSI"),
            _ => None,
        }
    }

    /// Codes that are read directly from the payload.
    pub fn observed() -> impl Iterator<Item = Self> {
        Self::iter().filter(|c| !c.is_derived())
    }
}
