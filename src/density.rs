//! Segment density aggregation.
//!
//! Buckets segments by their rounded endpoints and counts how many segments
//! (across all tracks) land in each bucket:
//! - Endpoints are snapped with `round(value * precision) / precision`
//! - The two snapped endpoints are ordered (latitude, then longitude) so a
//!   segment and its reverse share a bucket
//! - Every segment counts once, degenerate ones included
//!
//! Higher precision separates nearby points; lower precision merges them.

use std::collections::HashMap;

use log::debug;

use crate::segments::Segment;
use crate::GpsPoint;

/// Round a coordinate to the grid implied by `precision`.
///
/// ```
/// use track_density::density::round_coordinate;
/// assert_eq!(round_coordinate(51.507_46, 1000.0), 51.507);
/// ```
#[inline]
pub fn round_coordinate(value: f64, precision: f64) -> f64 {
    (value * precision).round() / precision
}

/// A point snapped to the rounding grid.
///
/// Stored as the integer grid index `round(value * precision)` rather than the
/// rounded float, so it can be hashed and ordered exactly. Ordering by
/// `(lat, lng)` matches ordering the rounded degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPoint {
    pub lat: i64,
    pub lng: i64,
}

impl GridPoint {
    /// Snap a GPS point to the grid at `precision`.
    #[inline]
    pub fn from_point(point: &GpsPoint, precision: f64) -> Self {
        Self {
            lat: (point.latitude * precision).round() as i64,
            lng: (point.longitude * precision).round() as i64,
        }
    }

    /// The rounded GPS point this grid point stands for.
    pub fn to_point(&self, precision: f64) -> GpsPoint {
        GpsPoint::new(self.lat as f64 / precision, self.lng as f64 / precision)
    }
}

/// Canonical identifier of a geographic segment at one precision.
///
/// `first <= second` always holds, so both traversal directions of a segment
/// produce the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    pub first: GridPoint,
    pub second: GridPoint,
}

impl BucketKey {
    /// Build a key from two grid points in either order.
    pub fn new(a: GridPoint, b: GridPoint) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    /// Key for a segment at `precision`.
    pub fn for_segment(segment: &Segment, precision: f64) -> Self {
        bucket_key(&segment.start, &segment.end, precision)
    }

    /// Rounded endpoints in canonical order.
    pub fn endpoints(&self, precision: f64) -> (GpsPoint, GpsPoint) {
        (self.first.to_point(precision), self.second.to_point(precision))
    }

    /// True when both endpoints snap to the same grid point.
    pub fn is_degenerate(&self) -> bool {
        self.first == self.second
    }
}

/// Canonical bucket key for the segment `a`-`b` at `precision`.
///
/// ```
/// use track_density::{GpsPoint, density::bucket_key};
///
/// let a = GpsPoint::new(51.5074, -0.1278);
/// let b = GpsPoint::new(51.5080, -0.1290);
/// assert_eq!(bucket_key(&a, &b, 10_000.0), bucket_key(&b, &a, 10_000.0));
/// ```
pub fn bucket_key(a: &GpsPoint, b: &GpsPoint, precision: f64) -> BucketKey {
    BucketKey::new(
        GridPoint::from_point(a, precision),
        GridPoint::from_point(b, precision),
    )
}

/// Density per bucket for one precision.
#[derive(Debug, Clone, Default)]
pub struct DensityMap {
    counts: HashMap<BucketKey, u32>,
    precision: f64,
}

impl DensityMap {
    /// Precision the keys were computed at.
    pub fn precision(&self) -> f64 {
        self.precision
    }

    /// Density of a bucket. A bucket that was never counted reports 1: a
    /// segment is always present at least once.
    pub fn density_of(&self, key: &BucketKey) -> u32 {
        self.counts.get(key).copied().unwrap_or(1)
    }

    /// Raw lookup without the fallback.
    pub fn get(&self, key: &BucketKey) -> Option<u32> {
        self.counts.get(key).copied()
    }

    /// Density of the bucket a segment falls in.
    pub fn density_for_segment(&self, segment: &Segment) -> u32 {
        self.density_of(&BucketKey::for_segment(segment, self.precision))
    }

    /// Number of distinct buckets.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Highest density of any bucket, 0 when empty.
    pub fn max_density(&self) -> u32 {
        self.counts.values().copied().max().unwrap_or(0)
    }

    /// Iterate over `(key, density)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&BucketKey, &u32)> {
        self.counts.iter()
    }

    /// Buckets sorted by density (descending), ties broken by key.
    pub fn busiest(&self, limit: usize) -> Vec<(BucketKey, u32)> {
        let mut entries: Vec<(BucketKey, u32)> =
            self.counts.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        entries.truncate(limit);
        entries
    }
}

/// Count every segment into its canonical bucket at `precision`.
pub fn aggregate_density(segments: &[Segment], precision: f64) -> DensityMap {
    let mut counts: HashMap<BucketKey, u32> = HashMap::with_capacity(segments.len());

    for segment in segments {
        *counts
            .entry(BucketKey::for_segment(segment, precision))
            .or_insert(0) += 1;
    }

    debug!(
        "[Density] {} segments -> {} buckets at precision {}",
        segments.len(),
        counts.len(),
        precision
    );

    DensityMap { counts, precision }
}
