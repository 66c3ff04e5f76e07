//! Length units and the scale factors derived from them

use serde::{Deserialize, Serialize};

/// Length unit of a CAD document or of the generated description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LengthUnit {
    #[serde(rename = "mm")]
    Millimeters,
    #[serde(rename = "cm")]
    Centimeters,
    #[default]
    #[serde(rename = "m")]
    Meters,
}

impl LengthUnit {
    /// Size of the unit in micrometers (exact, so ratios stay exact)
    fn micrometers(&self) -> u32 {
        match self {
            LengthUnit::Millimeters => 1_000,
            LengthUnit::Centimeters => 10_000,
            LengthUnit::Meters => 1_000_000,
        }
    }

    /// Size of the unit in meters
    pub fn meters(&self) -> f64 {
        self.micrometers() as f64 / 1_000_000.0
    }

    /// Short symbol used in documents and on the command line
    pub fn symbol(&self) -> &'static str {
        match self {
            LengthUnit::Millimeters => "mm",
            LengthUnit::Centimeters => "cm",
            LengthUnit::Meters => "m",
        }
    }

    /// Parse a unit symbol
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "mm" => Some(LengthUnit::Millimeters),
            "cm" => Some(LengthUnit::Centimeters),
            "m" => Some(LengthUnit::Meters),
            _ => None,
        }
    }
}

impl std::fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Conversion factors between the document, the host's physical-property
/// convention (centimeters) and the target description
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitScale {
    pub document: LengthUnit,
    pub target: LengthUnit,
    /// Document length -> target length
    pub scale: f64,
    /// Centimeters -> target length (slide limits, moments of inertia)
    pub cm: f64,
    /// Document length -> centimeters
    pub doc_to_cm: f64,
}

impl UnitScale {
    pub fn new(document: LengthUnit, target: LengthUnit) -> Self {
        let cm = LengthUnit::Centimeters.micrometers() as f64;
        Self {
            document,
            target,
            scale: document.micrometers() as f64 / target.micrometers() as f64,
            cm: cm / target.micrometers() as f64,
            doc_to_cm: document.micrometers() as f64 / cm,
        }
    }

    /// Factor applied to moments of inertia reported in kg·cm²
    pub fn inertia(&self) -> f64 {
        self.cm * self.cm
    }

    /// Per-axis coincidence tolerance in document units for a tolerance
    /// given in target units
    pub fn tolerance(&self, target_tolerance: f64) -> f64 {
        target_tolerance / self.scale
    }
}

impl Default for UnitScale {
    fn default() -> Self {
        Self::new(LengthUnit::Centimeters, LengthUnit::Meters)
    }
}
