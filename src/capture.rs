//! Capture time extraction from ECOSTRESS-style file names, e.g.
//! `ECOSTRESS_L2_LSTE_09009_009_20200206T214458_0601_01_LST_GEO.tif`.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::Path;

use crate::types::ZonalError;

const CLIPPED_MARKER: &str = "clipped_";
const TIMESTAMP_LEN: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub timestamp: DateTime<Utc>,
    /// `YYYYMMDD`
    pub period: String,
}

impl Capture {
    pub fn from_timestamp(timestamp: DateTime<Utc>) -> Self {
        Self {
            period: timestamp.format("%Y%m%d").to_string(),
            timestamp,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ZonalError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ZonalError::FilenameParse {
                name: path.display().to_string(),
                reason: "not a valid UTF-8 file name".to_string(),
            })?;
        Self::parse(name)
    }

    pub fn parse(file_name: &str) -> Result<Self, ZonalError> {
        let fail = |reason: String| ZonalError::FilenameParse {
            name: file_name.to_string(),
            reason,
        };

        let field = if file_name.to_lowercase().contains(CLIPPED_MARKER) {
            6
        } else {
            5
        };

        let token = file_name
            .split('_')
            .nth(field)
            .ok_or_else(|| fail(format!("missing underscore field {}", field + 1)))?;

        let stamp = token
            .get(..TIMESTAMP_LEN)
            .ok_or_else(|| fail(format!("token '{}' too short", token)))?;

        let naive = NaiveDateTime::parse_from_str(stamp, "%Y%m%dT%H%M%S")
            .map_err(|e| fail(format!("bad timestamp '{}': {}", stamp, e)))?;

        Ok(Self::from_timestamp(naive.and_utc()))
    }
}
