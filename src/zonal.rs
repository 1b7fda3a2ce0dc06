use ndarray::ArrayView1;
use rayon::prelude::*;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::regions::{Region, RegionIndex};
use crate::types::{CoordinateGrid, RasterGrid, ValidityRange, ZonalError};

/// Valid pixel values collected per region id, iterated in the order ids were
/// first registered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionAccumulator {
    order: Vec<String>,
    values: HashMap<String, Vec<f64>>,
}

impl RegionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `id` with an empty list if it is not known yet.
    pub fn ensure(&mut self, id: &str) {
        if !self.values.contains_key(id) {
            self.order.push(id.to_string());
            self.values.insert(id.to_string(), Vec::new());
        }
    }

    pub fn push(&mut self, id: &str, value: f64) {
        self.ensure(id);
        if let Some(list) = self.values.get_mut(id) {
            list.push(value);
        }
    }

    pub fn get(&self, id: &str) -> Option<&[f64]> {
        self.values.get(id).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.values.get(id).map(|v| (id.as_str(), v.as_slice())))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn total_count(&self) -> usize {
        self.values.values().map(Vec::len).sum()
    }
}

/// Assigns each valid pixel to the first region whose rings contain it.
#[derive(Debug, Clone)]
pub struct ZonalAccumulator {
    validity: ValidityRange,
    parallel: bool,
    deadline: Option<Duration>,
}

impl ZonalAccumulator {
    pub fn new(validity: ValidityRange) -> Self {
        Self {
            validity,
            parallel: false,
            deadline: None,
        }
    }

    /// Scan rows on the rayon pool. Results are merged in row order, so the
    /// collected lists are identical to a sequential scan.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn accumulate(
        &self,
        coords: &CoordinateGrid,
        raster: &RasterGrid,
        index: &RegionIndex,
    ) -> Result<RegionAccumulator, ZonalError> {
        if coords.shape() != raster.shape() {
            return Err(ZonalError::ShapeMismatch {
                raster: raster.shape(),
                coords: coords.shape(),
            });
        }

        let regions = index.regions();
        let mut accumulator = RegionAccumulator::new();
        for region in regions.iter().filter(|r| !r.rings.is_empty()) {
            accumulator.ensure(&region.id);
        }

        let started = Instant::now();
        let (rows, _) = raster.shape();

        let hits: Vec<Vec<(usize, f64)>> = if self.parallel {
            (0..rows)
                .into_par_iter()
                .map(|row| self.scan_row(row, coords, raster, regions, started))
                .collect::<Result<_, _>>()?
        } else {
            (0..rows)
                .map(|row| self.scan_row(row, coords, raster, regions, started))
                .collect::<Result<_, _>>()?
        };

        for (region_idx, value) in hits.into_iter().flatten() {
            accumulator.push(&regions[region_idx].id, value);
        }

        Ok(accumulator)
    }

    fn scan_row(
        &self,
        row: usize,
        coords: &CoordinateGrid,
        raster: &RasterGrid,
        regions: &[Region],
        started: Instant,
    ) -> Result<Vec<(usize, f64)>, ZonalError> {
        if let Some(deadline) = self.deadline {
            if started.elapsed() >= deadline {
                return Err(ZonalError::DeadlineExceeded(deadline));
            }
        }

        let lon_row = coords.lon.row(row);
        let lat_row = coords.lat.row(row);
        let value_row = raster.data.row(row);

        Ok(self.scan(lon_row, lat_row, value_row, regions))
    }

    fn scan(
        &self,
        lon_row: ArrayView1<f64>,
        lat_row: ArrayView1<f64>,
        value_row: ArrayView1<f64>,
        regions: &[Region],
    ) -> Vec<(usize, f64)> {
        let mut hits = Vec::new();

        for ((&lon, &lat), &value) in lon_row.iter().zip(lat_row.iter()).zip(value_row.iter()) {
            if !self.validity.contains(value) {
                continue;
            }
            let owner = regions
                .iter()
                .position(|region| region.may_contain(lon, lat) && region.contains(lon, lat));
            if let Some(region_idx) = owner {
                hits.push((region_idx, value));
            }
        }

        hits
    }
}
