//! Display formatting of lengths, areas and volumes in scene units.
//!
//! Values are stored in scene units; `scale_length` converts one scene unit
//! to meters, and the chosen [`LengthUnit`] decides the printed symbol.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unit system of the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum UnitSystem {
    /// Raw scene values, no symbol.
    None,
    #[default]
    Metric,
    Imperial,
}

/// Display unit for lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LengthUnit {
    /// No explicit choice; the system's fallback unit is used.
    #[default]
    Adaptive,
    Kilometers,
    Meters,
    Centimeters,
    Millimeters,
    Micrometers,
    Miles,
    Feet,
    Inches,
    Thou,
}

impl LengthUnit {
    /// Size in meters and symbol, if the unit belongs to `system`.
    pub fn in_system(self, system: UnitSystem) -> Option<(f64, &'static str)> {
        let entry = match (system, self) {
            (UnitSystem::Metric, LengthUnit::Kilometers) => (1000.0, "km"),
            (UnitSystem::Metric, LengthUnit::Meters) => (1.0, "m"),
            (UnitSystem::Metric, LengthUnit::Centimeters) => (0.01, "cm"),
            (UnitSystem::Metric, LengthUnit::Millimeters) => (0.001, "mm"),
            (UnitSystem::Metric, LengthUnit::Micrometers) => (0.000001, "µm"),
            (UnitSystem::Imperial, LengthUnit::Miles) => (1609.344, "mi"),
            (UnitSystem::Imperial, LengthUnit::Feet) => (0.3048, "'"),
            (UnitSystem::Imperial, LengthUnit::Inches) => (0.0254, "\""),
            (UnitSystem::Imperial, LengthUnit::Thou) => (0.0000254, "thou"),
            _ => return None,
        };
        Some(entry)
    }
}

/// Error for an unrecognised unit name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown unit '{0}'")]
pub struct UnknownUnit(pub String);

impl FromStr for UnitSystem {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(UnitSystem::None),
            "metric" => Ok(UnitSystem::Metric),
            "imperial" => Ok(UnitSystem::Imperial),
            _ => Err(UnknownUnit(s.to_string())),
        }
    }
}

impl FromStr for LengthUnit {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.to_ascii_lowercase().as_str() {
            "adaptive" => LengthUnit::Adaptive,
            "km" | "kilometers" => LengthUnit::Kilometers,
            "m" | "meters" => LengthUnit::Meters,
            "cm" | "centimeters" => LengthUnit::Centimeters,
            "mm" | "millimeters" => LengthUnit::Millimeters,
            "um" | "µm" | "micrometers" => LengthUnit::Micrometers,
            "mi" | "miles" => LengthUnit::Miles,
            "ft" | "feet" => LengthUnit::Feet,
            "in" | "inches" => LengthUnit::Inches,
            "thou" => LengthUnit::Thou,
            _ => return Err(UnknownUnit(s.to_string())),
        };
        Ok(unit)
    }
}

/// Scene unit settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct UnitSettings {
    pub system: UnitSystem,
    pub length_unit: LengthUnit,
    /// Meters per scene unit.
    pub scale_length: f64,
}

impl Default for UnitSettings {
    fn default() -> Self {
        Self {
            system: UnitSystem::Metric,
            length_unit: LengthUnit::Adaptive,
            scale_length: 1.0,
        }
    }
}

impl UnitSettings {
    /// Metric settings with one scene unit per millimeter.
    pub fn millimeters() -> Self {
        Self {
            system: UnitSystem::Metric,
            length_unit: LengthUnit::Millimeters,
            scale_length: 0.001,
        }
    }

    /// Size in meters and symbol of the display unit.
    ///
    /// A unit outside the current system falls back to centimeters (metric)
    /// or inches (imperial). `None` for [`UnitSystem::None`].
    pub fn unit(&self) -> Option<(f64, &'static str)> {
        let fallback = match self.system {
            UnitSystem::None => return None,
            UnitSystem::Metric => LengthUnit::Centimeters,
            UnitSystem::Imperial => LengthUnit::Inches,
        };
        self.length_unit
            .in_system(self.system)
            .or_else(|| fallback.in_system(self.system))
    }

    /// Convert a scene value of the given dimension (1 length, 2 area,
    /// 3 volume) to display units.
    fn convert(&self, value: f64, power: i32) -> Option<(f64, &'static str)> {
        let (unit, symbol) = self.unit()?;
        Some((value * (self.scale_length / unit).powi(power), symbol))
    }
}

/// Format with `precision` decimals, then drop trailing zeros while keeping
/// at least one decimal.
///
/// ```
/// use mesh_printcheck::units::clean_float;
///
/// assert_eq!(clean_float(1.25, 4), "1.25");
/// assert_eq!(clean_float(3.0, 4), "3.0");
/// assert_eq!(clean_float(0.000001, 2), "0.0");
/// ```
pub fn clean_float(value: f64, precision: usize) -> String {
    let text = format!("{:.*}", precision, value);
    match text.find('.') {
        Some(dot) => {
            let keep = dot + 2;
            let (head, tail) = text.split_at(keep.min(text.len()));
            format!("{}{}", head, tail.trim_end_matches('0'))
        }
        None => text,
    }
}

/// Volume in display units, e.g. `"12.5 cm³"`.
pub fn format_volume(volume: f64, units: &UnitSettings) -> String {
    match units.convert(volume, 3) {
        Some((value, symbol)) => format!("{} {}³", clean_float(value, 4), symbol),
        None => clean_float(volume, 8),
    }
}

/// Area in display units, e.g. `"6.0 cm²"`.
pub fn format_area(area: f64, units: &UnitSettings) -> String {
    match units.convert(area, 2) {
        Some((value, symbol)) => format!("{} {}²", clean_float(value, 4), symbol),
        None => clean_float(area, 8),
    }
}

/// Length in display units, e.g. `"2.0 mm"`.
pub fn format_length(length: f64, units: &UnitSettings) -> String {
    match units.convert(length, 1) {
        Some((value, symbol)) => format!("{} {}", clean_float(value, 4), symbol),
        None => clean_float(length, 8),
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnitSystem::None => "none",
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_float() {
        assert_eq!(clean_float(1.0, 0), "1");
        assert_eq!(clean_float(1.5, 4), "1.5");
        assert_eq!(clean_float(2.0, 8), "2.0");
        assert_eq!(clean_float(0.123456789, 4), "0.1235");
        assert_eq!(clean_float(-4.2, 3), "-4.2");
    }

    #[test]
    fn test_metric_volume() {
        // 1 scene unit = 1 mm, displayed in mm
        let units = UnitSettings::millimeters();
        assert_eq!(format_volume(1000.0, &units), "1000.0 mm³");
        assert_eq!(format_area(6.0, &units), "6.0 mm²");
        assert_eq!(format_length(2.5, &units), "2.5 mm");
    }

    #[test]
    fn test_adaptive_falls_back_to_centimeters() {
        let units = UnitSettings::default();
        assert_eq!(units.unit(), Some((0.01, "cm")));
        // 1 m³ scene volume is 1e6 cm³
        assert_eq!(format_volume(1.0, &units), "1000000.0 cm³");
    }

    #[test]
    fn test_imperial_fallback() {
        let units = UnitSettings {
            system: UnitSystem::Imperial,
            length_unit: LengthUnit::Millimeters,
            scale_length: 0.0254,
        };
        assert_eq!(units.unit(), Some((0.0254, "\"")));
        assert_eq!(format_length(3.0, &units), "3.0 \"");

        let feet = UnitSettings {
            length_unit: LengthUnit::Feet,
            ..units
        };
        assert_eq!(feet.unit(), Some((0.3048, "'")));
    }

    #[test]
    fn test_no_unit_system() {
        let units = UnitSettings {
            system: UnitSystem::None,
            ..UnitSettings::default()
        };
        assert_eq!(units.unit(), None);
        assert_eq!(format_volume(0.125, &units), "0.125");
        assert_eq!(format_length(3.0, &units), "3.0");
    }

    #[test]
    fn test_parse_units() {
        assert_eq!("mm".parse::<LengthUnit>(), Ok(LengthUnit::Millimeters));
        assert_eq!("Inches".parse::<LengthUnit>(), Ok(LengthUnit::Inches));
        assert_eq!("imperial".parse::<UnitSystem>(), Ok(UnitSystem::Imperial));
        assert!("furlong".parse::<LengthUnit>().is_err());
    }
}
