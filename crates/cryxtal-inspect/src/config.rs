use std::path::Path;

use cryxtal_base::{Error, LengthUnit, Result, ensure_positive};
use cryxtal_scene::{Color, Vector3};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementDisplayConfig {
    pub scale_factor: f64,
    /// Model units per displayed unit. Must match `unit` when it is mm, cm
    /// or m.
    pub display_scale: f64,
    pub unit: String,
    pub snap_radius: f64,
    pub endpoint_scale: [f64; 3],
    pub bounding_size: f64,
    pub endpoint_height: f64,
    pub endpoint_radius: f64,
    pub line_color: Color,
    pub endpoint_color: Color,
    pub line_width: f64,
    pub dash_size: f64,
    pub gap_size: f64,
    pub label_class: String,
    pub preview_class: String,
}

impl Default for MeasurementDisplayConfig {
    fn default() -> Self {
        Self {
            scale_factor: 0.1,
            display_scale: 1.0,
            unit: LengthUnit::Meter.symbol().to_string(),
            snap_radius: 0.25,
            endpoint_scale: [1.0, 1.0, 1.0],
            bounding_size: 0.05,
            endpoint_height: 0.1,
            endpoint_radius: 0.03,
            line_color: Color::BLACK,
            endpoint_color: Color::BLACK,
            line_width: 2.0,
            dash_size: 0.2,
            gap_size: 0.2,
            label_class: "ifcjs-dimension-label".to_string(),
            preview_class: "ifcjs-dimension-preview".to_string(),
        }
    }
}

impl MeasurementDisplayConfig {
    pub fn with_unit(mut self, unit: LengthUnit) -> Self {
        self.unit = unit.symbol().to_string();
        self.display_scale = unit.display_scale();
        self
    }

    pub fn endpoint_scale(&self) -> Vector3 {
        let [x, y, z] = self.endpoint_scale;
        Vector3::new(x, y, z)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("scale_factor", self.scale_factor)?;
        ensure_positive("display_scale", self.display_scale)?;
        ensure_positive("snap_radius", self.snap_radius)?;
        ensure_positive("bounding_size", self.bounding_size)?;
        ensure_positive("endpoint_height", self.endpoint_height)?;
        ensure_positive("endpoint_radius", self.endpoint_radius)?;
        ensure_positive("line_width", self.line_width)?;
        for value in self.endpoint_scale {
            ensure_positive("endpoint_scale", value)?;
        }
        if self.unit.trim().is_empty() {
            return Err(Error::InvalidParameter("unit label is empty".to_string()));
        }
        // Known symbols must carry their own scale; other labels are free.
        if let Ok(unit) = self.unit.parse::<LengthUnit>() {
            if (self.display_scale - unit.display_scale()).abs() > 1.0e-12 {
                return Err(Error::InvalidParameter(format!(
                    "unit {} needs display_scale {}, got {}",
                    unit.symbol(),
                    unit.display_scale(),
                    self.display_scale
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub color: Color,
    pub opacity: f64,
    pub depth_test: bool,
    pub render_order: i32,
    /// Hide previous highlights before tearing them down. Set for hover
    /// pre-selection.
    pub fast_remove_previous: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            color: Color(0xff00ff),
            opacity: 0.3,
            depth_test: false,
            render_order: 0,
            fast_remove_previous: false,
        }
    }
}

impl SelectionConfig {
    pub fn preselection() -> Self {
        Self {
            color: Color(0xffccff),
            opacity: 0.5,
            fast_remove_previous: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(Error::InvalidParameter(format!(
                "opacity must be within 0..=1, got {}",
                self.opacity
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectConfig {
    pub selection: SelectionConfig,
    pub preselection: SelectionConfig,
    pub dimensions: MeasurementDisplayConfig,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            selection: SelectionConfig::default(),
            preselection: SelectionConfig::preselection(),
            dimensions: MeasurementDisplayConfig::default(),
        }
    }
}

impl InspectConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.selection.validate()?;
        self.preselection.validate()?;
        self.dimensions.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            InspectConfig::from_json_str(
                r#"{ "dimensions": { "unit": "mm", "display_scale": 0.001, "snap_radius": 0.5 } }"#,
            )
            .unwrap();
        assert_eq!(config.dimensions.unit, "mm");
        assert_eq!(config.dimensions.snap_radius, 0.5);
        assert_eq!(config.dimensions.scale_factor, 0.1);
        assert!(config.preselection.fast_remove_previous);
    }

    #[test]
    fn known_unit_needs_its_display_scale() {
        let result = InspectConfig::from_json_str(r#"{ "dimensions": { "unit": "mm" } }"#);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));

        let feet =
            InspectConfig::from_json_str(r#"{ "dimensions": { "unit": "ft", "display_scale": 0.3048 } }"#)
                .unwrap();
        assert_eq!(feet.dimensions.unit, "ft");
    }

    #[test]
    fn rejects_non_positive_snap_radius() {
        let result = InspectConfig::from_json_str(r#"{ "dimensions": { "snap_radius": 0.0 } }"#);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn rejects_bad_json() {
        assert!(matches!(
            InspectConfig::from_json_str("{ nope"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn unit_sets_display_scale() {
        let config = MeasurementDisplayConfig::default().with_unit(LengthUnit::Millimeter);
        assert_eq!(config.unit, "mm");
        assert_eq!(config.display_scale, 0.001);
    }
}
