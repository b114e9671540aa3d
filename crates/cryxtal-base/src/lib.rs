use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct ModelId(pub u32);

/// Identifies one element inside a model. Unique per model only.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct ElementId(pub u32);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct GeometryId(pub u64);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct MaterialId(pub u64);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub u64);

macro_rules! impl_display {
    ($($ty:ident => $prefix:literal),* $(,)?) => {
        $(
            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, concat!($prefix, "{}"), self.0)
                }
            }
        )*
    };
}

impl_display! {
    ModelId => "model#",
    ElementId => "#",
    NodeId => "node#",
    GeometryId => "geometry#",
    MaterialId => "material#",
    SegmentId => "dimension#",
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum LengthUnit {
    Millimeter,
    Centimeter,
    Meter,
}

impl LengthUnit {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Millimeter => "mm",
            Self::Centimeter => "cm",
            Self::Meter => "m",
        }
    }

    pub const fn display_scale(self) -> f64 {
        match self {
            Self::Millimeter => 0.001,
            Self::Centimeter => 0.01,
            Self::Meter => 1.0,
        }
    }
}

impl Default for LengthUnit {
    fn default() -> Self {
        Self::Meter
    }
}

impl std::str::FromStr for LengthUnit {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        match text.trim() {
            "mm" => Ok(Self::Millimeter),
            "cm" => Ok(Self::Centimeter),
            "m" => Ok(Self::Meter),
            other => Err(Error::InvalidParameter(format!("unknown length unit: {other}"))),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!(
            "{name} must be a positive finite number, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_with_prefix() {
        assert_eq!(ModelId(3).to_string(), "model#3");
        assert_eq!(ElementId(128).to_string(), "#128");
        assert_eq!(SegmentId(0).to_string(), "dimension#0");
    }

    #[test]
    fn positive_check_rejects_nan_and_zero() {
        assert!(ensure_positive("scale", 1.0).is_ok());
        assert!(ensure_positive("scale", 0.0).is_err());
        assert!(ensure_positive("scale", f64::NAN).is_err());
        assert!(ensure_positive("scale", f64::INFINITY).is_err());
    }

    #[test]
    fn unit_symbols() {
        assert_eq!(LengthUnit::default().symbol(), "m");
        assert_eq!(LengthUnit::Millimeter.symbol(), "mm");
        assert_eq!("cm".parse::<LengthUnit>().ok(), Some(LengthUnit::Centimeter));
        assert!("yd".parse::<LengthUnit>().is_err());
    }
}
