//! Zonal land-surface-temperature aggregation over administrative boundaries.
//!
//! A raster capture is georeferenced, its valid pixels are assigned to the
//! first containing boundary region, per-region statistics are reduced and
//! the selected statistic is emitted as day or night time-series records.

pub mod batch;
pub mod capture;
pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod georef;
pub mod raster_io;
pub mod records;
pub mod regions;
pub mod stats;
pub mod sun_position;
pub mod types;
pub mod zonal;

pub use batch::{BatchRunner, BatchSummary, ChannelAccumulator, UploadPayload};
pub use capture::Capture;
pub use config::Config;
pub use engine::{FileResult, ZonalEngine};
pub use georef::GeoTransform;
pub use types::*;
