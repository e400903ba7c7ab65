// ── Measurement catalog ──
//
// Static metadata for every supported code. Shared read-only by entities
// and views.

use poolmath_api::MeasurementCode;
use serde::Serialize;

const ICON_GAUGE: &str = "mdi:gauge";

/// Host-facing sensor classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceClass {
    Temperature,
    Pressure,
    VolumeFlowRate,
}

/// How a derived measurement is computed from its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    /// Sum of the operand readings.
    Sum(&'static [MeasurementCode]),
}

impl Derivation {
    pub fn operands(self) -> &'static [MeasurementCode] {
        match self {
            Self::Sum(codes) => codes,
        }
    }

    /// Compute the derived value; `None` unless every operand is present.
    pub fn compute(self, mut operand: impl FnMut(MeasurementCode) -> Option<f64>) -> Option<f64> {
        match self {
            Self::Sum(codes) => codes
                .iter()
                .try_fold(0.0, |acc, code| operand(*code).map(|v| acc + v)),
        }
    }
}

/// Static per-code metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementDefinition {
    pub code: MeasurementCode,
    /// Short display name ("FC", "pH").
    pub name: &'static str,
    pub description: &'static str,
    pub unit: Option<&'static str>,
    pub icon: &'static str,
    /// Suggested decimal places for display.
    pub precision: u8,
    pub device_class: Option<DeviceClass>,
    pub derivation: Option<Derivation>,
}

impl MeasurementDefinition {
    pub fn is_derived(&self) -> bool {
        self.derivation.is_some()
    }
}

macro_rules! def {
    ($code:ident, $name:expr, $desc:expr, $unit:expr, $icon:expr, $precision:expr) => {
        def!($code, $name, $desc, $unit, $icon, $precision, None, None)
    };
    ($code:ident, $name:expr, $desc:expr, $unit:expr, $icon:expr, $precision:expr, $class:expr, $derivation:expr) => {
        MeasurementDefinition {
            code: MeasurementCode::$code,
            name: $name,
            description: $desc,
            unit: $unit,
            icon: $icon,
            precision: $precision,
            device_class: $class,
            derivation: $derivation,
        }
    };
}

const TOTAL_CHLORINE_OPERANDS: &[MeasurementCode] =
    &[MeasurementCode::FreeChlorine, MeasurementCode::CombinedChlorine];

static FREE_CHLORINE: MeasurementDefinition =
    def!(FreeChlorine, "FC", "Free Chlorine", Some("mg/L"), ICON_GAUGE, 1);
static COMBINED_CHLORINE: MeasurementDefinition =
    def!(CombinedChlorine, "CC", "Combined Chlorine", Some("mg/L"), ICON_GAUGE, 1);
static TOTAL_CHLORINE: MeasurementDefinition = def!(
    TotalChlorine,
    "TC",
    "Total Chlorine (FC + CC)",
    Some("mg/L"),
    ICON_GAUGE,
    1,
    None,
    Some(Derivation::Sum(TOTAL_CHLORINE_OPERANDS))
);
static PH: MeasurementDefinition = def!(Ph, "pH", "Acidity/Basicity", Some("pH"), ICON_GAUGE, 1);
static TOTAL_ALKALINITY: MeasurementDefinition =
    def!(TotalAlkalinity, "TA", "Total Alkalinity", Some("ppm"), ICON_GAUGE, 0);
static CALCIUM_HARDNESS: MeasurementDefinition =
    def!(CalciumHardness, "CH", "Calcium Hardness", Some("ppm"), ICON_GAUGE, 0);
static CYANURIC_ACID: MeasurementDefinition =
    def!(CyanuricAcid, "CYA", "Cyanuric Acid", Some("ppm"), ICON_GAUGE, 0);
static SALT: MeasurementDefinition = def!(Salt, "Salt", "Salt", Some("ppm"), ICON_GAUGE, 0);
static BORATE: MeasurementDefinition = def!(Borate, "Borate", "Borate", Some("ppm"), ICON_GAUGE, 0);
static TDS: MeasurementDefinition = def!(
    TotalDissolvedSolids,
    "TDS",
    "Total Dissolved Solids",
    Some("ppm"),
    ICON_GAUGE,
    0
);
static CSI: MeasurementDefinition = def!(
    CalciteSaturationIndex,
    "CSI",
    "Calcite Saturation Index",
    Some("CSI"),
    ICON_GAUGE,
    2
);
static WATER_TEMPERATURE: MeasurementDefinition = def!(
    WaterTemperature,
    "Temp",
    "Temperature",
    Some("°F"),
    "mdi:coolant-temperature",
    1,
    Some(DeviceClass::Temperature),
    None
);
static FLOW_RATE: MeasurementDefinition = def!(
    FlowRate,
    "Flow Rate",
    "Flow Rate",
    Some("gpm"),
    "mdi:water-pump",
    1,
    Some(DeviceClass::VolumeFlowRate),
    None
);
static PRESSURE: MeasurementDefinition = def!(
    Pressure,
    "Pressure",
    "Filter Pressure",
    Some("psi"),
    ICON_GAUGE,
    1,
    Some(DeviceClass::Pressure),
    None
);
static SWG_CELL: MeasurementDefinition = def!(
    SwgCellPercent,
    "SWG Cell",
    "SWG Cell Percentage",
    Some("%"),
    "mdi:battery-charging",
    0
);

/// Metadata for `code`.
pub fn definition(code: MeasurementCode) -> &'static MeasurementDefinition {
    match code {
        MeasurementCode::FreeChlorine => &FREE_CHLORINE,
        MeasurementCode::CombinedChlorine => &COMBINED_CHLORINE,
        MeasurementCode::TotalChlorine => &TOTAL_CHLORINE,
        MeasurementCode::Ph => &PH,
        MeasurementCode::TotalAlkalinity => &TOTAL_ALKALINITY,
        MeasurementCode::CalciumHardness => &CALCIUM_HARDNESS,
        MeasurementCode::CyanuricAcid => &CYANURIC_ACID,
        MeasurementCode::Salt => &SALT,
        MeasurementCode::Borate => &BORATE,
        MeasurementCode::TotalDissolvedSolids => &TDS,
        MeasurementCode::CalciteSaturationIndex => &CSI,
        MeasurementCode::WaterTemperature => &WATER_TEMPERATURE,
        MeasurementCode::FlowRate => &FLOW_RATE,
        MeasurementCode::Pressure => &PRESSURE,
        MeasurementCode::SwgCellPercent => &SWG_CELL,
    }
}

/// Definitions of all derived measurements.
pub fn derived_definitions() -> impl Iterator<Item = &'static MeasurementDefinition> {
    [&TOTAL_CHLORINE].into_iter()
}
