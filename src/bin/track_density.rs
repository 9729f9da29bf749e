//! track-density CLI - aggregate a folder of GPX tracks into a density network
//!
//! Usage:
//!   track-density <folder> [--precision <P>] [--max-density <N>] [--randomize]
//!                 [--seed <S>] [--format snapshot|geojson] [--output <file>]
//!
//! Every `<trkseg>` of every `.gpx` file becomes one track. Files that fail to
//! parse are reported and skipped.

use clap::{Parser, ValueEnum};
use gpx::{read, Gpx};
use log::{debug, error, info, warn};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use track_density::{
    to_geojson, DensityConfig, DensityEngine, DensityError, GpsPoint, NetworkSnapshot, Result,
    Track,
};

#[derive(Parser)]
#[command(name = "track-density")]
#[command(about = "Aggregate GPS tracks into a density-weighted line network", long_about = None)]
struct Cli {
    /// Folder containing GPX files
    folder: PathBuf,

    /// Rounding multiplier (10000 = 4 decimal places)
    #[arg(short, long, default_value = "10000")]
    precision: f64,

    /// Intensity cap
    #[arg(short, long, default_value = "10")]
    max_density: u32,

    /// Use randomized, overlap-aware intensities
    #[arg(short, long)]
    randomize: bool,

    /// Jitter half-width for randomized intensities
    #[arg(long, default_value = "0.2")]
    jitter: f64,

    /// Seed for randomized intensities
    #[arg(long)]
    seed: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Snapshot)]
    format: OutputFormat,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of busiest buckets to log
    #[arg(long, default_value = "5")]
    top: usize,

    /// Enable verbose debug output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// `[lon1, lat1, lon2, lat2, intensity]` tuples plus metadata
    Snapshot,
    /// GeoJSON FeatureCollection of LineStrings
    Geojson,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    if let Err(e) = run(&cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = DensityConfig {
        precision: cli.precision,
        max_density: cli.max_density,
        randomize: cli.randomize,
        jitter: cli.jitter,
        seed: cli.seed,
    };
    config.validate()?;

    let tracks = load_gpx_folder(&cli.folder)?;
    let mut engine = DensityEngine::with_tracks(tracks, config)?;
    let network = engine.network()?;

    info!(
        "Aggregated {} segments from {} tracks into {} buckets (max density {}, {:.1} km)",
        network.segment_count,
        network.track_count,
        network.bucket_count,
        network.max_observed_density,
        network.total_length_meters / 1000.0
    );

    if cli.top > 0 {
        for (key, count) in network.density_map.busiest(cli.top) {
            let (a, b) = key.endpoints(cli.precision);
            info!(
                "  {:>4}x  ({}, {}) - ({}, {})",
                count, a.latitude, a.longitude, b.latitude, b.longitude
            );
        }
    }

    let json = match cli.format {
        OutputFormat::Snapshot => NetworkSnapshot::from_network(network).to_json()?,
        OutputFormat::Geojson => serde_json::to_string(&to_geojson(network))?,
    };

    match &cli.output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            writer.write_all(json.as_bytes())?;
            writer.flush()?;
            info!("Wrote {} bytes to {}", json.len(), path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(json.as_bytes())?;
            handle.write_all(b"\n")?;
        }
    }

    Ok(())
}

/// Load every `.gpx` file in `folder`, sorted by file name.
fn load_gpx_folder(folder: &Path) -> Result<Vec<Track>> {
    info!("Loading GPX files from: {}", folder.display());

    let mut paths: Vec<PathBuf> = fs::read_dir(folder)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("gpx")))
        .collect();
    paths.sort();

    let mut tracks = Vec::new();
    for path in &paths {
        match parse_gpx_file(path) {
            Ok(mut parsed) => {
                for track in &parsed {
                    debug!(
                        "  [OK] {} - {} points, {:.1}km",
                        track.id,
                        track.points.len(),
                        track.length_meters() / 1000.0
                    );
                }
                tracks.append(&mut parsed);
            }
            Err(e) => warn!("  [ERR] Failed to parse {}: {}", path.display(), e),
        }
    }

    info!("Loaded {} tracks from {} files", tracks.len(), paths.len());
    Ok(tracks)
}

/// Parse one GPX file into one track per track segment.
fn parse_gpx_file(path: &Path) -> Result<Vec<Track>> {
    let reader = BufReader::new(File::open(path)?);
    let gpx: Gpx = read(reader).map_err(|e| DensityError::Gpx(e.to_string()))?;

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");

    let segments: Vec<Vec<GpsPoint>> = gpx
        .tracks
        .iter()
        .flat_map(|track| track.segments.iter())
        .map(|segment| {
            segment
                .points
                .iter()
                .map(|pt| GpsPoint::new(pt.point().y(), pt.point().x()))
                .filter(GpsPoint::is_valid)
                .collect::<Vec<_>>()
        })
        .filter(|points| !points.is_empty())
        .collect();

    if segments.is_empty() {
        return Err(DensityError::Gpx("no track points found".to_string()));
    }

    let single = segments.len() == 1;
    Ok(segments
        .into_iter()
        .enumerate()
        .map(|(i, points)| {
            let id = if single {
                stem.to_string()
            } else {
                format!("{}#{}", stem, i + 1)
            };
            Track::new(id, points)
        })
        .collect())
}
