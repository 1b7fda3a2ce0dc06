use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::capture::Capture;
use crate::checkpoint::CheckpointStore;
use crate::engine::{FileResult, ZonalEngine};
use crate::raster_io::{is_raster_file, RasterSource};
use crate::types::{DataElements, OutputRecord, ZonalError};

pub const DAY_UPLOAD_FILE: &str = "ecostress_lst_day_upload.json";
pub const NIGHT_UPLOAD_FILE: &str = "ecostress_lst_night_upload.json";

/// Upload document for one channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadPayload {
    #[serde(rename = "dataValues")]
    pub data_values: Vec<OutputRecord>,
}

/// Day and night records gathered across a run.
#[derive(Debug, Clone, Default)]
pub struct ChannelAccumulator {
    day: Vec<OutputRecord>,
    night: Vec<OutputRecord>,
}

impl ChannelAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Data element ids are taken from the current configuration, not from the
    /// stored records, and only positive Celsius values are kept.
    pub fn append(&mut self, result: &FileResult, elements: &DataElements) {
        let data_element = elements.select(result.daytime);
        let channel = if result.daytime {
            &mut self.day
        } else {
            &mut self.night
        };

        channel.extend(
            result
                .records
                .iter()
                .filter(|record| record.value > 0.0)
                .map(|record| OutputRecord {
                    data_element: data_element.to_string(),
                    ..record.clone()
                }),
        );
    }

    pub fn day(&self) -> &[OutputRecord] {
        &self.day
    }

    pub fn night(&self) -> &[OutputRecord] {
        &self.night
    }

    /// Empties both channels into (day, night) payloads.
    pub fn drain(&mut self) -> (UploadPayload, UploadPayload) {
        (
            UploadPayload {
                data_values: std::mem::take(&mut self.day),
            },
            UploadPayload {
                data_values: std::mem::take(&mut self.night),
            },
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub reused: usize,
    pub skipped: usize,
}

pub struct BatchRunner<'a, S: RasterSource, C: CheckpointStore> {
    engine: &'a ZonalEngine,
    source: &'a S,
    checkpoints: &'a C,
    data_elements: DataElements,
    reuse_checkpoints: bool,
    show_progress: bool,
}

impl<'a, S: RasterSource, C: CheckpointStore> BatchRunner<'a, S, C> {
    pub fn new(
        engine: &'a ZonalEngine,
        source: &'a S,
        checkpoints: &'a C,
        data_elements: DataElements,
    ) -> Self {
        Self {
            engine,
            source,
            checkpoints,
            data_elements,
            reuse_checkpoints: true,
            show_progress: false,
        }
    }

    pub fn reuse_checkpoints(mut self, reuse: bool) -> Self {
        self.reuse_checkpoints = reuse;
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Processes every file, appending to `channels`. Per-file failures are
    /// logged and skipped; configuration errors abort the run.
    pub fn run(
        &self,
        files: &[PathBuf],
        channels: &mut ChannelAccumulator,
    ) -> Result<BatchSummary, ZonalError> {
        let mut summary = BatchSummary::default();

        let pb = if self.show_progress {
            let pb = ProgressBar::new(files.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            ) {
                pb.set_style(style);
            }
            pb
        } else {
            ProgressBar::hidden()
        };

        for path in files {
            match self.process_file(path) {
                Ok((result, reused)) => {
                    if reused {
                        summary.reused += 1;
                    } else {
                        summary.processed += 1;
                    }
                    channels.append(&result, &self.data_elements);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(file = %path.display(), "Skipping file: {}", e);
                    summary.skipped += 1;
                }
            }
            pb.inc(1);
        }

        pb.finish_with_message("Aggregation complete");
        info!(
            processed = summary.processed,
            reused = summary.reused,
            skipped = summary.skipped,
            "Batch finished"
        );
        Ok(summary)
    }

    /// Returns the file's result and whether it came from a checkpoint.
    pub fn process_file(&self, path: &Path) -> Result<(FileResult, bool), ZonalError> {
        let key = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ZonalError::Raster(format!("bad file name {}", path.display())))?;

        if self.reuse_checkpoints {
            if let Some(result) = self.checkpoints.get(key)? {
                info!(file = key, daytime = result.daytime, "Reusing checkpoint");
                return Ok((result, true));
            }
        }

        info!(file = key, "Processing");
        let capture = Capture::from_path(path)?;
        let raster = self.source.read(path)?;
        let result = self.engine.process(&raster, &capture)?;

        if let Err(e) = self.checkpoints.put(key, &result) {
            warn!(file = key, "Could not write checkpoint: {}", e);
        }

        Ok((result, false))
    }
}

/// All `.tif` / `.tif.gz` files below `dir`, sorted by path. Symlinks are
/// not followed, so each file is listed once.
pub fn discover_rasters(dir: &Path) -> Result<Vec<PathBuf>, ZonalError> {
    let mut found = Vec::new();

    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| {
            let message = e.to_string();
            match e.into_io_error() {
                Some(io) => ZonalError::Io(io),
                None => ZonalError::Raster(message),
            }
        })?;

        if entry.file_type().is_file() && is_raster_file(entry.path()) {
            found.push(entry.into_path());
        }
    }

    found.sort();
    Ok(found)
}

/// Writes the day and night upload files into `out_dir`.
pub fn write_uploads(
    out_dir: &Path,
    channels: &mut ChannelAccumulator,
) -> Result<(PathBuf, PathBuf), ZonalError> {
    fs::create_dir_all(out_dir)?;
    let (day, night) = channels.drain();

    let day_path = out_dir.join(DAY_UPLOAD_FILE);
    let night_path = out_dir.join(NIGHT_UPLOAD_FILE);
    fs::write(&day_path, serde_json::to_string(&day)?)?;
    fs::write(&night_path, serde_json::to_string(&night)?)?;

    info!(
        day = day.data_values.len(),
        night = night.data_values.len(),
        "Wrote upload files"
    );
    Ok((day_path, night_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(org_unit: &str, value: f64) -> OutputRecord {
        OutputRecord {
            data_element: "stale".to_string(),
            period: "20200206".to_string(),
            org_unit: org_unit.to_string(),
            value,
        }
    }

    fn elements() -> DataElements {
        DataElements {
            day: "D".to_string(),
            night: "N".to_string(),
        }
    }

    #[test]
    fn test_channels_route_and_relabel() {
        let mut channels = ChannelAccumulator::new();
        channels.append(
            &FileResult {
                daytime: true,
                records: vec![record("a", 30.0), record("b", -2.0)],
            },
            &elements(),
        );
        channels.append(
            &FileResult {
                daytime: false,
                records: vec![record("c", 21.0)],
            },
            &elements(),
        );

        assert_eq!(channels.day().len(), 1);
        assert_eq!(channels.day()[0].org_unit, "a");
        assert_eq!(channels.day()[0].data_element, "D");
        assert_eq!(channels.night()[0].data_element, "N");

        let (day, night) = channels.drain();
        assert_eq!(day.data_values.len(), 1);
        assert_eq!(night.data_values.len(), 1);
        assert!(channels.day().is_empty() && channels.night().is_empty());
    }

    #[test]
    fn test_discover_is_recursive_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("2020/02")).unwrap();
        fs::write(dir.path().join("b.tif"), b"").unwrap();
        fs::write(dir.path().join("2020/02/a.tif.gz"), b"").unwrap();
        fs::write(dir.path().join("2020/readme.txt"), b"").unwrap();
        fs::write(dir.path().join("b.tif.json"), b"").unwrap();

        let files = discover_rasters(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("2020/02/a.tif.gz"), dir.path().join("b.tif")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_ignores_symlink_cycles() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.tif"), b"").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("a.tif"), dir.path().join("alias.tif")).unwrap();

        let files = discover_rasters(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("a.tif")]);
    }

    #[test]
    fn test_upload_payload_shape() {
        let dir = tempfile::tempdir().unwrap();
        let mut channels = ChannelAccumulator::new();
        channels.append(
            &FileResult {
                daytime: true,
                records: vec![record("a", 30.0)],
            },
            &elements(),
        );

        let (day_path, night_path) = write_uploads(dir.path(), &mut channels).unwrap();
        let day: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(day_path).unwrap()).unwrap();
        let night: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(night_path).unwrap()).unwrap();

        assert_eq!(day["dataValues"][0]["orgUnit"], "a");
        assert_eq!(day["dataValues"][0]["dataElement"], "D");
        assert_eq!(night["dataValues"].as_array().unwrap().len(), 0);
    }
}
