use crate::types::RegionStats;
use crate::zonal::RegionAccumulator;

/// Reduced statistics per region id, in accumulator order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsTable {
    entries: Vec<(String, RegionStats)>,
}

impl StatsTable {
    pub fn from_accumulator(accumulator: &RegionAccumulator) -> Self {
        let entries = accumulator
            .iter()
            .map(|(id, values)| (id.to_string(), reduce(values)))
            .collect();
        Self { entries }
    }

    pub fn get(&self, id: &str) -> Option<&RegionStats> {
        self.entries
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, stats)| stats)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegionStats)> + '_ {
        self.entries.iter().map(|(id, stats)| (id.as_str(), stats))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn reduce(values: &[f64]) -> RegionStats {
    if values.is_empty() {
        return RegionStats::empty();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len();
    let mean = sorted.iter().sum::<f64>() / count as f64;
    let median = if count % 2 == 1 {
        sorted[count / 2]
    } else {
        (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
    };

    RegionStats {
        mean,
        median,
        max: sorted[count - 1],
        min: sorted[0],
        count,
    }
}
