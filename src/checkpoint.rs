use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::engine::FileResult;
use crate::types::ZonalError;

/// Per-file results cache so an interrupted batch can resume.
pub trait CheckpointStore {
    fn get(&self, key: &str) -> Result<Option<FileResult>, ZonalError>;
    fn put(&self, key: &str, result: &FileResult) -> Result<(), ZonalError>;
}

/// Stores each result as `<dir>/<key>.json`, e.g. `ECO..._GEO.tif.json`.
#[derive(Debug, Clone)]
pub struct JsonCheckpointStore {
    dir: PathBuf,
}

impl JsonCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl CheckpointStore for JsonCheckpointStore {
    fn get(&self, key: &str) -> Result<Option<FileResult>, ZonalError> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        let result = serde_json::from_str(&text)?;
        debug!(path = %path.display(), "Loaded checkpoint");
        Ok(Some(result))
    }

    fn put(&self, key: &str, result: &FileResult) -> Result<(), ZonalError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        fs::write(&path, serde_json::to_string(result)?)?;
        debug!(path = %path.display(), "Wrote checkpoint");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutputRecord;

    #[test]
    fn test_round_trip_and_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path().join("out"));
        let key = "ECOSTRESS_L2_LSTE_09009_009_20200206T214458_0601_01_LST_GEO.tif";

        assert!(store.get(key).unwrap().is_none());

        let result = FileResult {
            daytime: false,
            records: vec![OutputRecord {
                data_element: "night".to_string(),
                period: "20200206".to_string(),
                org_unit: "ou".to_string(),
                value: 24.5,
            }],
        };
        store.put(key, &result).unwrap();

        assert!(store.path_for(key).ends_with(format!("{}.json", key)));
        assert_eq!(store.get(key).unwrap(), Some(result));
    }

    #[test]
    fn test_reads_checkpoint_layout() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.tif.json"),
            r#"{"daytime": true, "records": [{"dataElement": "d", "period": "20210101", "orgUnit": "x", "value": 30.1}]}"#,
        )
        .unwrap();

        let store = JsonCheckpointStore::new(dir.path());
        let loaded = store.get("a.tif").unwrap().unwrap();
        assert!(loaded.daytime);
        assert_eq!(loaded.records[0].org_unit, "x");
    }

    #[test]
    fn test_corrupt_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.tif.json"), "{").unwrap();
        let store = JsonCheckpointStore::new(dir.path());
        assert!(matches!(store.get("bad.tif"), Err(ZonalError::Json(_))));
    }
}
