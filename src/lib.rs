//! # Track Density
//!
//! Segment-density aggregation for GPS track collections.
//!
//! This library provides:
//! - Segmentation of tracks into atomic two-point segments
//! - Density aggregation: segments bucketed by rounded, direction-independent endpoints
//! - Intensity mapping: capped density, or overlap-aware randomized intensity
//! - A caching engine that re-aggregates on configuration change without resegmenting
//! - An interchange snapshot and GeoJSON export for rendering layers
//!
//! ## Features
//!
//! - **`parallel`** - Segment large track sets with rayon
//! - **`cli`** - Build the `track-density` command line tool (GPX folder in, snapshot out)
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use track_density::{aggregate, DensityConfig, GpsPoint, Track};
//!
//! let tracks = vec![
//!     Track::new("a", vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(0.0, 1.0), GpsPoint::new(0.0, 2.0)]),
//!     Track::new("b", vec![GpsPoint::new(0.0, 1.0), GpsPoint::new(0.0, 2.0), GpsPoint::new(0.0, 3.0)]),
//! ];
//!
//! let network = aggregate(&tracks, &DensityConfig::default()).unwrap();
//! for record in &network.records {
//!     println!("{} #{}: intensity {}", record.track_id, record.segment_index, record.intensity);
//! }
//! assert_eq!(network.max_observed_density, 2);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{DensityError, Result};

// Geographic utilities (distance, bounds)
pub mod geo_utils;

// Track -> segment decomposition
pub mod segments;
pub use segments::{segment_track, segment_tracks, Segment};
#[cfg(feature = "parallel")]
pub use segments::segment_tracks_parallel;

// Bucket keys and density counting
pub mod density;
pub use density::{aggregate_density, bucket_key, BucketKey, DensityMap, GridPoint};

// Density -> intensity policies
pub mod intensity;
pub use intensity::{
    assign_intensities, direct_intensities, randomized_intensities, IntensityPolicy,
    RouteSubSegment, RouteTopology,
};

// Full pipeline and its output
pub mod network;
pub use network::{aggregate, aggregate_segments, DensityNetwork, DensityRecord};

// Cached engine for interactive re-aggregation
pub mod engine;
pub use engine::{DensityEngine, EngineStats};

// Interchange snapshot and GeoJSON export
pub mod snapshot;
pub use snapshot::{to_geojson, NetworkSnapshot, SnapshotFeature, SnapshotMetadata};

// Spatial lookup of aggregated segments
pub mod query;
pub use query::{SegmentIndex, SegmentQueryResult};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("TrackDensityRust")
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use track_density::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box of a set of points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// A named, ordered sequence of GPS points.
///
/// Point order defines segment adjacency. Tracks with fewer than two points
/// are accepted and simply produce no segments.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Track {
    /// Stable identifier (file name, activity ID, ...)
    pub id: String,
    /// Points in recording order
    pub points: Vec<GpsPoint>,
}

impl Track {
    /// Create a track from an identifier and its points.
    pub fn new(id: impl Into<String>, points: Vec<GpsPoint>) -> Self {
        Self { id: id.into(), points }
    }

    /// Number of segments this track decomposes into.
    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    /// Total track length in meters.
    pub fn length_meters(&self) -> f64 {
        geo_utils::polyline_length(&self.points)
    }
}

/// Largest accepted precision. Grid coordinates of any valid longitude stay
/// below 2^53, so they are exact in both `f64` and `i64`.
pub const MAX_PRECISION: f64 = 9_007_199_254_740_992.0 / 180.0;

/// Configuration for density aggregation and intensity mapping.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct DensityConfig {
    /// Rounding multiplier: coordinates snap to `round(v * precision) / precision`.
    /// Higher values distinguish closer points. Must not exceed
    /// [`MAX_PRECISION`]. Default: 10000.0 (~11 meters)
    pub precision: f64,

    /// Upper bound for intensity values.
    /// Default: 10
    pub max_density: u32,

    /// Use the randomized, overlap-aware policy instead of capped density.
    /// Default: false
    pub randomize: bool,

    /// Half-width of the uniform variation added per route sub-segment in
    /// randomized mode. At most `max_density`. Default: 0.2
    pub jitter: f64,

    /// Seed for the randomized policy. `None` gives different results per run.
    /// Default: None
    pub seed: Option<u64>,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            precision: 10_000.0,
            max_density: 10,
            randomize: false,
            jitter: 0.2,
            seed: None,
        }
    }
}

impl DensityConfig {
    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !self.precision.is_finite() || self.precision <= 0.0 || self.precision > MAX_PRECISION {
            return Err(DensityError::InvalidPrecision(self.precision));
        }
        if self.max_density == 0 {
            return Err(DensityError::InvalidMaxDensity(self.max_density));
        }
        if !self.jitter.is_finite() || self.jitter < 0.0 || self.jitter > self.max_density as f64 {
            return Err(DensityError::InvalidJitter(self.jitter));
        }
        Ok(())
    }

    /// Selected intensity policy.
    pub fn policy(&self) -> IntensityPolicy {
        IntensityPolicy::from_config(self)
    }
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    use super::*;
    use log::{info, warn};

    /// Aggregate tracks and return render records.
    ///
    /// Returns an empty list when the configuration is rejected.
    #[uniffi::export]
    pub fn ffi_aggregate_tracks(tracks: Vec<Track>, config: DensityConfig) -> Vec<DensityRecord> {
        init_logging();
        info!("[TrackDensityRust] aggregate called with {} tracks", tracks.len());

        let start = std::time::Instant::now();
        match aggregate(&tracks, &config) {
            Ok(network) => {
                info!(
                    "[TrackDensityRust] {} records, max density {} in {:?}",
                    network.records.len(),
                    network.max_observed_density,
                    start.elapsed()
                );
                network.records
            }
            Err(e) => {
                warn!("[TrackDensityRust] aggregate failed: {}", e);
                vec![]
            }
        }
    }

    /// Aggregate tracks and return the interchange snapshot as JSON.
    #[uniffi::export]
    pub fn ffi_snapshot_json(tracks: Vec<Track>, config: DensityConfig) -> Option<String> {
        init_logging();
        let network = aggregate(&tracks, &config)
            .map_err(|e| warn!("[TrackDensityRust] snapshot failed: {}", e))
            .ok()?;
        NetworkSnapshot::from_network(&network)
            .to_json()
            .map_err(|e| warn!("[TrackDensityRust] snapshot encoding failed: {}", e))
            .ok()
    }
}

// ============================================================================
// Tests
// ============================================================================
