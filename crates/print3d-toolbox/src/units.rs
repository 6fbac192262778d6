//! Number formatting and scene units.

use serde::{Deserialize, Serialize};

/// Format `value` with `precision` decimals, then strip trailing zeros while
/// keeping at least one digit after the decimal point.
///
/// ```
/// use print3d_toolbox::units::clean_float;
///
/// assert_eq!(clean_float(0.0, 3), "0.0");
/// assert_eq!(clean_float(1.5, 4), "1.5");
/// assert_eq!(clean_float(3.0, 0), "3");
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

/// Scene unit system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UnitSystem {
    #[default]
    None,
    Metric,
    Imperial,
}

/// Length units of the metric and imperial systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LengthUnit {
    Kilometers,
    Meters,
    #[default]
    Centimeters,
    Millimeters,
    Micrometers,
    Miles,
    Feet,
    Inches,
    Thou,
}

impl LengthUnit {
    /// Size of one unit in meters.
    pub fn meters(self) -> f64 {
        match self {
            LengthUnit::Kilometers => 1000.0,
            LengthUnit::Meters => 1.0,
            LengthUnit::Centimeters => 0.01,
            LengthUnit::Millimeters => 0.001,
            LengthUnit::Micrometers => 0.000001,
            LengthUnit::Miles => 1609.344,
            LengthUnit::Feet => 0.3048,
            LengthUnit::Inches => 0.0254,
            LengthUnit::Thou => 0.0000254,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            LengthUnit::Kilometers => "km",
            LengthUnit::Meters => "m",
            LengthUnit::Centimeters => "cm",
            LengthUnit::Millimeters => "mm",
            LengthUnit::Micrometers => "µm",
            LengthUnit::Miles => "mi",
            LengthUnit::Feet => "'",
            LengthUnit::Inches => "\"",
            LengthUnit::Thou => "thou",
        }
    }

    fn is_metric(self) -> bool {
        matches!(
            self,
            LengthUnit::Kilometers
                | LengthUnit::Meters
                | LengthUnit::Centimeters
                | LengthUnit::Millimeters
                | LengthUnit::Micrometers
        )
    }
}

/// Unit settings of the scene the meshes come from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnitSettings {
    pub system: UnitSystem,
    /// Meters per scene unit.
    pub scale_length: f64,
    pub length_unit: LengthUnit,
}

impl Default for UnitSettings {
    fn default() -> Self {
        Self {
            system: UnitSystem::None,
            scale_length: 1.0,
            length_unit: LengthUnit::Centimeters,
        }
    }
}

impl UnitSettings {
    /// The display unit, or `None` for a unitless scene.
    ///
    /// A unit from the other system falls back to centimeters (metric) or
    /// inches (imperial).
    pub fn display_unit(&self) -> Option<LengthUnit> {
        match self.system {
            UnitSystem::None => None,
            UnitSystem::Metric if self.length_unit.is_metric() => Some(self.length_unit),
            UnitSystem::Metric => Some(LengthUnit::Centimeters),
            UnitSystem::Imperial if !self.length_unit.is_metric() => Some(self.length_unit),
            UnitSystem::Imperial => Some(LengthUnit::Inches),
        }
    }

    /// Format a volume in display units, e.g. `"1.5 cm"` (the caller adds `³`).
    pub fn format_volume(&self, volume: f64) -> String {
        self.format_power(volume, 3)
    }

    /// Format an area in display units (the caller adds `²`).
    pub fn format_area(&self, area: f64) -> String {
        self.format_power(area, 2)
    }

    fn format_power(&self, value: f64, power: i32) -> String {
        match self.display_unit() {
            None => clean_float(value, 8),
            Some(unit) => {
                let scaled =
                    value * self.scale_length.powi(power) / unit.meters().powi(power);
                format!("{} {}", clean_float(scaled, 4), unit.symbol())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_float() {
        assert_eq!(clean_float(0.0, 1), "0.0");
        assert_eq!(clean_float(0.0, 3), "0.0");
        assert_eq!(clean_float(1.5, 4), "1.5");
        assert_eq!(clean_float(2.25, 4), "2.25");
        assert_eq!(clean_float(3.0, 0), "3");
        assert_eq!(clean_float(1.2599210498948732, 6), "1.259921");
        assert_eq!(clean_float(-0.5, 2), "-0.5");
    }

    #[test]
    fn test_unitless_formatting() {
        let units = UnitSettings::default();
        assert_eq!(units.format_volume(1.0), "1.0");
        assert_eq!(units.format_area(0.123456789), "0.12345679");
    }

    #[test]
    fn test_metric_formatting() {
        let units = UnitSettings {
            system: UnitSystem::Metric,
            scale_length: 1.0,
            length_unit: LengthUnit::Centimeters,
        };
        // 1 m³ = 1e6 cm³
        assert_eq!(units.format_volume(1.0), "1000000.0 cm");
        // 1 m² = 1e4 cm²
        assert_eq!(units.format_area(1.0), "10000.0 cm");

        let mm = UnitSettings {
            scale_length: 0.001,
            length_unit: LengthUnit::Millimeters,
            ..units
        };
        assert_eq!(mm.format_volume(8.0), "8.0 mm");
    }

    #[test]
    fn test_mismatched_unit_falls_back() {
        let units = UnitSettings {
            system: UnitSystem::Imperial,
            scale_length: 0.0254,
            length_unit: LengthUnit::Millimeters,
        };
        assert_eq!(units.display_unit(), Some(LengthUnit::Inches));
        assert_eq!(units.format_area(2.0), "2.0 \"");

        let metric = UnitSettings {
            system: UnitSystem::Metric,
            length_unit: LengthUnit::Feet,
            ..UnitSettings::default()
        };
        assert_eq!(metric.display_unit(), Some(LengthUnit::Centimeters));
    }
}
