//! Track segmentation.
//!
//! Breaks every track into atomic two-point segments. Each segment remembers
//! which track it came from and where in that track it sits, so the
//! aggregated output can be attributed back to its source.

use log::debug;

use crate::geo_utils::haversine_distance;
use crate::{GpsPoint, Track};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Two consecutive points of one track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Point at `segment_index` in the source track
    pub start: GpsPoint,
    /// Point at `segment_index + 1` in the source track
    pub end: GpsPoint,
    /// Index of the source track in the input slice
    pub track_index: usize,
    /// Position of this segment within its track
    pub segment_index: usize,
}

impl Segment {
    /// Great-circle length of the segment in meters.
    pub fn length_meters(&self) -> f64 {
        haversine_distance(&self.start, &self.end)
    }

    /// True when both endpoints are the same raw point.
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }
}

/// Split one track into `max(N - 1, 0)` segments, in point order.
///
/// # Example
/// ```
/// use track_density::{GpsPoint, Track, segments::segment_track};
///
/// let track = Track::new("a", vec![
///     GpsPoint::new(0.0, 0.0),
///     GpsPoint::new(0.0, 1.0),
///     GpsPoint::new(0.0, 2.0),
/// ]);
/// let segments = segment_track(0, &track);
/// assert_eq!(segments.len(), 2);
/// assert_eq!(segments[1].start, GpsPoint::new(0.0, 1.0));
/// ```
pub fn segment_track(track_index: usize, track: &Track) -> Vec<Segment> {
    track
        .points
        .windows(2)
        .enumerate()
        .map(|(segment_index, pair)| Segment {
            start: pair[0],
            end: pair[1],
            track_index,
            segment_index,
        })
        .collect()
}

/// Segment every track, concatenating results in track order.
pub fn segment_tracks(tracks: &[Track]) -> Vec<Segment> {
    let segments: Vec<Segment> = tracks
        .iter()
        .enumerate()
        .flat_map(|(i, track)| segment_track(i, track))
        .collect();

    debug!(
        "[Segmenter] {} tracks -> {} segments",
        tracks.len(),
        segments.len()
    );

    segments
}

/// Parallel version of [`segment_tracks`]. Produces identical output.
#[cfg(feature = "parallel")]
pub fn segment_tracks_parallel(tracks: &[Track]) -> Vec<Segment> {
    let per_track: Vec<Vec<Segment>> = tracks
        .par_iter()
        .enumerate()
        .map(|(i, track)| segment_track(i, track))
        .collect();

    let segments: Vec<Segment> = per_track.into_iter().flatten().collect();

    debug!(
        "[Segmenter] {} tracks -> {} segments (parallel)",
        tracks.len(),
        segments.len()
    );

    segments
}
