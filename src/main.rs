use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use lst_zonal::batch::{discover_rasters, write_uploads};
use lst_zonal::checkpoint::JsonCheckpointStore;
use lst_zonal::raster_io::{RasterSource, TiffRasterSource};
use lst_zonal::{BatchRunner, ChannelAccumulator, Config, ZonalEngine};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Reader {
    Tiff,
    #[cfg(feature = "gdal")]
    Gdal,
}

#[derive(Parser, Debug)]
#[command(name = "lst-zonal")]
#[command(about = "Aggregate land-surface-temperature rasters into per-region day/night time series")]
struct Args {
    /// Boundary and data element configuration (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Directory searched recursively for .tif / .tif.gz captures
    #[arg(short, long)]
    data_dir: PathBuf,

    /// Directory for per-file checkpoints and the day/night upload files
    #[arg(short, long)]
    out_dir: PathBuf,

    /// Recompute every file even if a checkpoint exists
    #[arg(long)]
    no_cache: bool,

    /// Raster decoder
    #[arg(long, value_enum, default_value = "tiff")]
    reader: Reader,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::from_file(&args.config)?;
    info!(
        regions = config.boundaries.len(),
        stat = %config.stat_type,
        "Loaded configuration"
    );

    let cpu_cores = config.get_cpu_cores();
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(cpu_cores)
        .build_global()
    {
        warn!("Failed to configure thread pool: {}", e);
    }

    match args.reader {
        Reader::Tiff => run(&args, &config, &TiffRasterSource),
        #[cfg(feature = "gdal")]
        Reader::Gdal => run(&args, &config, &lst_zonal::raster_io::GdalRasterSource),
    }
}

fn run<S: RasterSource>(args: &Args, config: &Config, source: &S) -> Result<()> {
    let engine = ZonalEngine::from_config(config)?;
    let checkpoints = JsonCheckpointStore::new(&args.out_dir);

    let files = discover_rasters(&args.data_dir)
        .with_context(|| format!("Failed to scan {}", args.data_dir.display()))?;
    info!(files = files.len(), "Discovered rasters");

    let mut channels = ChannelAccumulator::new();
    let summary = BatchRunner::new(&engine, source, &checkpoints, config.data_elements())
        .reuse_checkpoints(!args.no_cache)
        .show_progress(true)
        .run(&files, &mut channels)?;

    let (day_path, night_path) = write_uploads(&args.out_dir, &mut channels)?;
    info!(
        processed = summary.processed,
        reused = summary.reused,
        skipped = summary.skipped,
        day = %day_path.display(),
        night = %night_path.display(),
        "Done"
    );

    Ok(())
}
