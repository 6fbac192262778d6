//! Check thresholds and export options.
//!
//! Settings are plain data with serde support so they can live in a TOML
//! file next to the models:
//!
//! ```toml
//! thickness_min = 0.8
//! angle_overhang = 50.0
//! export_format = "OBJ"
//!
//! [units]
//! system = "METRIC"
//! scale_length = 0.001
//! length_unit = "MILLIMETERS"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PrintError, PrintResult};
use crate::io::ExportFormat;
use crate::units::UnitSettings;

/// Toolbox settings. Angles are stored in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrintSettings {
    /// Minimum wall thickness.
    pub thickness_min: f64,
    /// Area and length below which faces and edges count as degenerate.
    pub threshold_zero: f64,
    /// Limit for polygon distortion, in degrees.
    pub angle_distort: f64,
    /// Minimum angle between faces for an edge to count as sharp, in degrees.
    pub angle_sharp: f64,
    /// Maximum printable overhang, in degrees from vertical.
    pub angle_overhang: f64,
    /// Weight face normals by area when aligning to the XY plane.
    pub use_alignxy_face_area: bool,
    pub export_format: ExportFormat,
    /// Export directory; a leading `//` is relative to the base directory.
    pub export_path: String,
    /// Apply the scene unit scale on export.
    pub use_apply_scale: bool,
    /// Export normals and vertex colors.
    pub use_data_layers: bool,
    /// Copy textures next to the export. Meshes here carry no textures.
    pub use_export_texture: bool,
    /// Distance for the shrink/fatten operator.
    pub thinning_amount: f64,
    /// Wall thickness of generated bases; values above 0.05 override the
    /// default.
    pub bottom_thickness: f64,
    pub units: UnitSettings,
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            thickness_min: 0.001,
            threshold_zero: 0.0001,
            angle_distort: 45.0,
            angle_sharp: 160.0,
            angle_overhang: 45.0,
            use_alignxy_face_area: false,
            export_format: ExportFormat::Stl,
            export_path: "//".into(),
            use_apply_scale: false,
            use_data_layers: false,
            use_export_texture: false,
            thinning_amount: 0.0,
            bottom_thickness: 0.0,
            units: UnitSettings::default(),
        }
    }
}

impl PrintSettings {
    /// Read settings from a TOML file; missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> PrintResult<Self> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| PrintError::io_read(path, e))?;
        let settings = Self::from_toml_str(&text).map_err(|e| match e {
            PrintError::ConfigParse { details, .. } => PrintError::ConfigParse {
                path: path.to_path_buf(),
                details,
            },
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(text: &str) -> PrintResult<Self> {
        let settings: Self = toml::from_str(text).map_err(|e| PrintError::ConfigParse {
            path: "<inline>".into(),
            details: e.message().to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_toml_string(&self) -> PrintResult<String> {
        toml::to_string_pretty(self).map_err(|e| PrintError::ConfigParse {
            path: "<inline>".into(),
            details: e.to_string(),
        })
    }

    /// Reject values outside the allowed ranges.
    pub fn validate(&self) -> PrintResult<()> {
        let ranges: [(&'static str, f64, f64, f64); 6] = [
            ("thickness_min", self.thickness_min, 0.0, 10.0),
            ("threshold_zero", self.threshold_zero, 0.0, 0.2),
            ("angle_distort", self.angle_distort, 0.0, 180.0),
            ("angle_sharp", self.angle_sharp, 0.0, 180.0),
            ("angle_overhang", self.angle_overhang, 0.0, 90.0),
            ("bottom_thickness", self.bottom_thickness, 0.0, f64::MAX),
        ];
        for (name, value, min, max) in ranges {
            if !(min..=max).contains(&value) {
                return Err(PrintError::InvalidSetting {
                    name,
                    value,
                    min,
                    max,
                });
            }
        }
        if !self.thinning_amount.is_finite() {
            return Err(PrintError::InvalidSetting {
                name: "thinning_amount",
                value: self.thinning_amount,
                min: f64::MIN,
                max: f64::MAX,
            });
        }
        if !(self.units.scale_length > 0.0 && self.units.scale_length.is_finite()) {
            return Err(PrintError::InvalidSetting {
                name: "units.scale_length",
                value: self.units.scale_length,
                min: f64::MIN_POSITIVE,
                max: f64::MAX,
            });
        }
        Ok(())
    }

    pub fn angle_distort_rad(&self) -> f64 {
        self.angle_distort.to_radians()
    }

    pub fn angle_sharp_rad(&self) -> f64 {
        self.angle_sharp.to_radians()
    }

    pub fn angle_overhang_rad(&self) -> f64 {
        self.angle_overhang.to_radians()
    }
}
