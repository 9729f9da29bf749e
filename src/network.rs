//! The aggregation pipeline: tracks in, intensity-weighted records out.
//!
//! ```text
//! tracks -> segments -> density map -> intensities -> records
//! ```
//!
//! Every call recomputes the density map and intensities from scratch; the
//! only reusable intermediate is the segment list (see [`aggregate_segments`]).

use log::debug;

use crate::density::{aggregate_density, DensityMap};
use crate::geo_utils::compute_bounds_iter;
use crate::intensity::{assign_intensities, IntensityPolicy};
use crate::segments::{segment_tracks, Segment};
use crate::{Bounds, DensityConfig, GpsPoint, Result, Track};

/// One segment of the network, ready for a rendering layer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct DensityRecord {
    /// Segment start, as recorded in the source track
    pub start: GpsPoint,
    /// Segment end, as recorded in the source track
    pub end: GpsPoint,
    /// Segments sharing this segment's bucket (across all tracks)
    pub density: u32,
    /// Display value in [1, max_density]
    pub intensity: u32,
    /// Source track identifier
    pub track_id: String,
    /// Position of the segment within its track
    pub segment_index: u32,
}

/// Aggregated network for one configuration.
#[derive(Debug, Clone)]
pub struct DensityNetwork {
    /// One record per segment, in track order then segment order
    pub records: Vec<DensityRecord>,
    /// Tracks in the input (including ones too short to produce segments)
    pub track_count: u32,
    pub segment_count: u32,
    /// Distinct buckets at `precision`
    pub bucket_count: u32,
    /// Highest bucket density before capping
    pub max_observed_density: u32,
    /// Sum of all segment lengths in meters
    pub total_length_meters: f64,
    /// Bounds of all segment endpoints, `None` when there are no segments
    pub bounds: Option<Bounds>,
    pub precision: f64,
    pub max_density: u32,
    pub policy: IntensityPolicy,
    /// Bucket counts the intensities were derived from
    pub density_map: DensityMap,
}

impl DensityNetwork {
    /// True when no segments were produced.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct tracks that contributed at least one segment.
    pub fn contributing_tracks(&self) -> usize {
        let mut ids: Vec<&str> = self.records.iter().map(|r| r.track_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    /// Records whose intensity reached the cap.
    pub fn capped_records(&self) -> impl Iterator<Item = &DensityRecord> {
        self.records.iter().filter(move |r| r.intensity >= self.max_density)
    }
}

/// Segment `tracks` and aggregate them under `config`.
pub fn aggregate(tracks: &[Track], config: &DensityConfig) -> Result<DensityNetwork> {
    let segments = segment_tracks(tracks);
    aggregate_segments(tracks, &segments, config)
}

/// Aggregate pre-computed segments of `tracks` under `config`.
///
/// `segments` must have been produced from `tracks` (their `track_index`
/// refers into it). Segments pointing outside `tracks` are kept with an
/// empty track ID.
pub fn aggregate_segments(
    tracks: &[Track],
    segments: &[Segment],
    config: &DensityConfig,
) -> Result<DensityNetwork> {
    config.validate()?;

    let density = aggregate_density(segments, config.precision);
    let intensities = assign_intensities(segments, &density, config);

    let records: Vec<DensityRecord> = segments
        .iter()
        .zip(&intensities)
        .map(|(segment, &intensity)| DensityRecord {
            start: segment.start,
            end: segment.end,
            density: density.density_for_segment(segment),
            intensity,
            track_id: tracks
                .get(segment.track_index)
                .map(|t| t.id.clone())
                .unwrap_or_default(),
            segment_index: segment.segment_index as u32,
        })
        .collect();

    let total_length_meters: f64 = segments.iter().map(Segment::length_meters).sum();
    let bounds = compute_bounds_iter(segments.iter().flat_map(|s| [&s.start, &s.end]));

    debug!(
        "[Network] {} records, {} buckets, max density {}, policy {:?}",
        records.len(),
        density.len(),
        density.max_density(),
        config.policy()
    );

    Ok(DensityNetwork {
        records,
        track_count: tracks.len() as u32,
        segment_count: segments.len() as u32,
        bucket_count: density.len() as u32,
        max_observed_density: density.max_density(),
        total_length_meters,
        bounds,
        precision: config.precision,
        max_density: config.max_density,
        policy: config.policy(),
        density_map: density,
    })
}
