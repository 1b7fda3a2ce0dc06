use tracing::debug;

use crate::stats::StatsTable;
use crate::types::{DataElements, OutputRecord, StatType, KELVIN_OFFSET};

/// Turns per-region statistics into Celsius time-series records for one capture.
#[derive(Debug, Clone)]
pub struct RecordEmitter {
    stat: StatType,
    data_elements: DataElements,
}

impl RecordEmitter {
    pub fn new(stat: StatType, data_elements: DataElements) -> Self {
        Self {
            stat,
            data_elements,
        }
    }

    /// Regions whose selected statistic is not a positive Kelvin value
    /// (including the empty-region sentinel) are left out.
    pub fn emit(&self, stats: &StatsTable, daytime: bool, period: &str) -> Vec<OutputRecord> {
        let data_element = self.data_elements.select(daytime);

        stats
            .iter()
            .filter_map(|(org_unit, region)| {
                let value = region.get(self.stat);
                if value <= 0.0 {
                    debug!(org_unit, stat = %self.stat, value, "No usable value for region");
                    return None;
                }
                Some(OutputRecord {
                    data_element: data_element.to_string(),
                    period: period.to_string(),
                    org_unit: org_unit.to_string(),
                    value: kelvin_to_celsius(value),
                })
            })
            .collect()
    }
}

pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - KELVIN_OFFSET
}
