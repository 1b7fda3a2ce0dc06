use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::regions::Boundary;
use crate::types::{DataElements, StatType, ValidityRange, ZonalError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub boundaries: Vec<Boundary>,
    pub data_element_id_day: String,
    pub data_element_id_night: String,
    pub stat_type: StatType,
    #[serde(default = "default_valid_min")]
    pub valid_min: f64,
    #[serde(default = "default_valid_max")]
    pub valid_max: f64,
    /// Observer used for day/night classification (Sierra Leone centre by default).
    #[serde(default = "default_observer_lat")]
    pub observer_lat: f64,
    #[serde(default = "default_observer_lon")]
    pub observer_lon: f64,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default)]
    pub cpu_cores: Option<usize>,
    #[serde(default)]
    pub file_timeout_secs: Option<u64>,
}

fn default_valid_min() -> f64 {
    227.0
}

fn default_valid_max() -> f64 {
    330.0
}

fn default_observer_lat() -> f64 {
    8.5
}

fn default_observer_lon() -> f64 {
    -11.75
}

fn default_parallel() -> bool {
    true
}

impl Config {
    /// Any failure here is a configuration error and should end the run.
    pub fn from_file(path: &Path) -> Result<Self, ZonalError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ZonalError::Config(format!("could not read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
            .map_err(|e| ZonalError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json(text: &str) -> Result<Self, ZonalError> {
        let config: Config =
            serde_json::from_str(text).map_err(|e| ZonalError::Config(e.to_string()))?;
        config.validity()?;
        if !(-90.0..=90.0).contains(&config.observer_lat) {
            return Err(ZonalError::Config(format!(
                "observer latitude {} out of range",
                config.observer_lat
            )));
        }
        Ok(config)
    }

    pub fn validity(&self) -> Result<ValidityRange, ZonalError> {
        ValidityRange::new(self.valid_min, self.valid_max)
    }

    pub fn data_elements(&self) -> DataElements {
        DataElements {
            day: self.data_element_id_day.clone(),
            night: self.data_element_id_night.clone(),
        }
    }

    pub fn get_cpu_cores(&self) -> usize {
        let available = num_cpus::get();
        self.cpu_cores
            .map(|n| n.clamp(1, available))
            .unwrap_or(available)
    }

    pub fn file_timeout(&self) -> Option<Duration> {
        self.file_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "boundaries": [
            {"id": "O6uvpzGd5pu", "name": "Bo", "geometry": {"type": "Polygon", "coordinates": [[[-12.0, 7.5], [-11.5, 7.5], [-11.5, 8.0], [-12.0, 7.5]]]}}
        ],
        "data_element_id_day": "dayDE",
        "data_element_id_night": "nightDE",
        "stat_type": "median"
    }"#;

    #[test]
    fn test_defaults_follow_lst_conventions() {
        let config = Config::from_json(MINIMAL).unwrap();
        assert_eq!(config.stat_type, StatType::Median);
        assert_eq!(config.validity().unwrap(), ValidityRange::new(227.0, 330.0).unwrap());
        assert_eq!((config.observer_lat, config.observer_lon), (8.5, -11.75));
        assert!(config.parallel);
        assert_eq!(config.file_timeout(), None);
        assert_eq!(config.data_elements().select(true), "dayDE");
        assert_eq!(config.data_elements().select(false), "nightDE");
        assert!(config.get_cpu_cores() >= 1);
    }

    #[test]
    fn test_unknown_stat_type_is_config_error() {
        let text = MINIMAL.replace("\"median\"", "\"stddev\"");
        assert!(matches!(Config::from_json(&text), Err(ZonalError::Config(_))));
    }

    #[test]
    fn test_inverted_validity_is_config_error() {
        let text = MINIMAL.replace(
            "\"stat_type\": \"median\"",
            "\"stat_type\": \"mean\", \"valid_min\": 400.0, \"valid_max\": 200.0",
        );
        assert!(matches!(Config::from_json(&text), Err(ZonalError::Config(_))));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::from_file(Path::new("/nonexistent/lst_config.json")).unwrap_err();
        assert!(err.is_fatal());
    }
}
