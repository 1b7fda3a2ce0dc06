use crate::georef::GeoTransform;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Statistic value used for regions that received no valid pixels.
pub const MISSING_STAT: f64 = -9999.0;

/// Offset between Kelvin and Celsius.
pub const KELVIN_OFFSET: f64 = 273.15;

#[derive(Debug, Clone)]
pub struct RasterGrid {
    /// Scalar values indexed `[row, col]`.
    pub data: Array2<f64>,
    pub transform: GeoTransform,
}

impl RasterGrid {
    pub fn new(data: Array2<f64>, transform: GeoTransform) -> Self {
        Self { data, transform }
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }
}

/// Longitude and latitude of every pixel, same shape as the raster they came from.
#[derive(Debug, Clone)]
pub struct CoordinateGrid {
    pub lon: Array2<f64>,
    pub lat: Array2<f64>,
}

impl CoordinateGrid {
    pub fn shape(&self) -> (usize, usize) {
        self.lon.dim()
    }
}

/// Inclusive bounds on plausible pixel values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidityRange {
    pub valid_min: f64,
    pub valid_max: f64,
}

impl ValidityRange {
    pub fn new(valid_min: f64, valid_max: f64) -> Result<Self, ZonalError> {
        if valid_min.is_nan() || valid_max.is_nan() || valid_min > valid_max {
            return Err(ZonalError::Config(format!(
                "invalid validity range [{}, {}]",
                valid_min, valid_max
            )));
        }
        Ok(Self {
            valid_min,
            valid_max,
        })
    }

    /// NaN never passes.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.valid_min && value <= self.valid_max
    }
}

impl Default for ValidityRange {
    fn default() -> Self {
        Self {
            valid_min: 227.0,
            valid_max: 330.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatType {
    Mean,
    Median,
    Max,
    Min,
}

impl StatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatType::Mean => "mean",
            StatType::Median => "median",
            StatType::Max => "max",
            StatType::Min => "min",
        }
    }
}

impl fmt::Display for StatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatType {
    type Err = ZonalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(StatType::Mean),
            "median" => Ok(StatType::Median),
            "max" => Ok(StatType::Max),
            "min" => Ok(StatType::Min),
            other => Err(ZonalError::Config(format!("unknown stat type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionStats {
    pub mean: f64,
    pub median: f64,
    pub max: f64,
    pub min: f64,
    pub count: usize,
}

impl RegionStats {
    pub fn empty() -> Self {
        Self {
            mean: MISSING_STAT,
            median: MISSING_STAT,
            max: MISSING_STAT,
            min: MISSING_STAT,
            count: 0,
        }
    }

    pub fn get(&self, stat: StatType) -> f64 {
        match stat {
            StatType::Mean => self.mean,
            StatType::Median => self.median,
            StatType::Max => self.max,
            StatType::Min => self.min,
        }
    }
}

/// One time-series value in the shape the surveillance system ingests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
    pub data_element: String,
    pub period: String,
    pub org_unit: String,
    pub value: f64,
}

/// Data element ids for the two output channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataElements {
    pub day: String,
    pub night: String,
}

impl DataElements {
    pub fn select(&self, daytime: bool) -> &str {
        if daytime {
            &self.day
        } else {
            &self.night
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ZonalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),
    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Region {id} has unsupported geometry type '{kind}'")]
    UnsupportedGeometry { id: String, kind: String },
    #[error("Cannot parse capture time from '{name}': {reason}")]
    FilenameParse { name: String, reason: String },
    #[error("Shape mismatch: raster is {raster:?}, coordinates are {coords:?}")]
    ShapeMismatch {
        raster: (usize, usize),
        coords: (usize, usize),
    },
    #[error("Raster error: {0}")]
    Raster(String),
    #[error("Processing exceeded deadline of {0:?}")]
    DeadlineExceeded(std::time::Duration),
}

impl ZonalError {
    /// Errors that should abort a whole run rather than skip one file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ZonalError::Config(_))
    }
}
