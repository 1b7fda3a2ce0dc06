use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::capture::Capture;
use crate::config::Config;
use crate::records::RecordEmitter;
use crate::regions::RegionIndex;
use crate::stats::StatsTable;
use crate::sun_position::SunCalculator;
use crate::types::{OutputRecord, RasterGrid, ZonalError};
use crate::zonal::ZonalAccumulator;

/// Outcome for one raster: its day/night flag and the records it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileResult {
    pub daytime: bool,
    pub records: Vec<OutputRecord>,
}

/// Runs georeferencing, accumulation, reduction and emission for single captures.
pub struct ZonalEngine {
    index: RegionIndex,
    accumulator: ZonalAccumulator,
    sun_calculator: SunCalculator,
    emitter: RecordEmitter,
}

impl ZonalEngine {
    pub fn new(
        index: RegionIndex,
        accumulator: ZonalAccumulator,
        sun_calculator: SunCalculator,
        emitter: RecordEmitter,
    ) -> Self {
        Self {
            index,
            accumulator,
            sun_calculator,
            emitter,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ZonalError> {
        let index = RegionIndex::build(&config.boundaries)?;
        info!(
            regions = index.len(),
            rings = index.ring_count(),
            "Built region index"
        );

        let accumulator = ZonalAccumulator::new(config.validity()?)
            .with_parallel(config.parallel)
            .with_deadline(config.file_timeout());

        Ok(Self::new(
            index,
            accumulator,
            SunCalculator::new(config.observer_lat, config.observer_lon),
            RecordEmitter::new(config.stat_type, config.data_elements()),
        ))
    }

    pub fn index(&self) -> &RegionIndex {
        &self.index
    }

    pub fn is_daytime(&self, capture: &Capture) -> bool {
        self.sun_calculator.is_daytime(&capture.timestamp)
    }

    pub fn process(&self, raster: &RasterGrid, capture: &Capture) -> Result<FileResult, ZonalError> {
        let (rows, cols) = raster.shape();
        let coords = raster.transform.coordinate_grid(rows, cols);
        debug!(
            rows,
            cols,
            lon = coords.lon.first().copied(),
            lat = coords.lat.first().copied(),
            "Georeferenced raster"
        );

        let accumulated = self.accumulator.accumulate(&coords, raster, &self.index)?;
        let stats = StatsTable::from_accumulator(&accumulated);

        for (id, region) in stats.iter() {
            debug!(
                region = id,
                mean = region.mean,
                median = region.median,
                max = region.max,
                min = region.min,
                count = region.count,
                "Region statistics"
            );
        }

        let daytime = self.is_daytime(capture);
        let records = self.emitter.emit(&stats, daytime, &capture.period);

        info!(
            period = %capture.period,
            daytime,
            pixels = accumulated.total_count(),
            records = records.len(),
            "Aggregated capture"
        );

        Ok(FileResult { daytime, records })
    }
}
