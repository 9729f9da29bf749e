//! Intensity mapping.
//!
//! Turns overlap counts into the bounded display value handed to renderers.
//! Two policies:
//!
//! - **Direct**: `min(density, max_density)` per segment.
//! - **Randomized**: tracks are cut into route sub-segments at points shared
//!   with other tracks; each sub-segment gets one jittered value derived from
//!   how many distinct tracks touch it.
//!
//! Both policies keep every intensity in `[1, max_density]`.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::density::{DensityMap, GridPoint};
use crate::segments::Segment;
use crate::DensityConfig;

/// How intensities are derived from overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum IntensityPolicy {
    /// Bucket density capped at `max_density`
    Direct,
    /// Overlap-aware jitter per route sub-segment
    Randomized,
}

impl IntensityPolicy {
    pub fn from_config(config: &DensityConfig) -> Self {
        if config.randomize {
            Self::Randomized
        } else {
            Self::Direct
        }
    }
}

// =============================================================================
// Direct Policy
// =============================================================================

/// Cap each segment's bucket density at `max_density`.
///
/// Keys are recomputed at the map's precision, so the map must come from the
/// same precision the caller is rendering at.
pub fn direct_intensities(segments: &[Segment], density: &DensityMap, max_density: u32) -> Vec<u32> {
    let cap = max_density.max(1);
    segments
        .iter()
        .map(|segment| density.density_for_segment(segment).clamp(1, cap))
        .collect()
}

// =============================================================================
// Randomized Policy
// =============================================================================

/// A maximal run of one track's segments between intersection points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSubSegment {
    pub track_index: usize,
    /// Positions in the segment slice the topology was built from, in track order
    pub segments: Vec<usize>,
    /// Most distinct tracks touching any endpoint of the run (at least 1)
    pub overlap_count: u32,
}

/// Which tracks touch which rounded points.
#[derive(Debug, Clone, Default)]
pub struct RouteTopology {
    touches: HashMap<GridPoint, HashSet<usize>>,
    precision: f64,
}

impl RouteTopology {
    /// Record every segment endpoint against its track at `precision`.
    pub fn build(segments: &[Segment], precision: f64) -> Self {
        let mut touches: HashMap<GridPoint, HashSet<usize>> = HashMap::new();
        for segment in segments {
            for point in [&segment.start, &segment.end] {
                touches
                    .entry(GridPoint::from_point(point, precision))
                    .or_default()
                    .insert(segment.track_index);
            }
        }
        Self { touches, precision }
    }

    /// Number of distinct tracks touching a rounded point.
    pub fn tracks_at(&self, point: &GridPoint) -> usize {
        self.touches.get(point).map_or(0, HashSet::len)
    }

    /// True when two or more distinct tracks touch the point.
    pub fn is_intersection(&self, point: &GridPoint) -> bool {
        self.tracks_at(point) >= 2
    }

    /// All intersection points.
    pub fn intersection_points(&self) -> HashSet<GridPoint> {
        self.touches
            .iter()
            .filter(|(_, tracks)| tracks.len() >= 2)
            .map(|(point, _)| *point)
            .collect()
    }

    /// Split each track's segments into route sub-segments.
    ///
    /// A run closes after any segment whose end point is an intersection, and
    /// at the end of the track. Tracks are visited in index order.
    pub fn subsegments(&self, segments: &[Segment]) -> Vec<RouteSubSegment> {
        let mut by_track: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, segment) in segments.iter().enumerate() {
            by_track.entry(segment.track_index).or_default().push(i);
        }

        let mut result = Vec::new();
        for (track_index, mut positions) in by_track {
            positions.sort_by_key(|&i| segments[i].segment_index);

            let mut current: Vec<usize> = Vec::new();
            for i in positions {
                current.push(i);
                let end = GridPoint::from_point(&segments[i].end, self.precision);
                if self.is_intersection(&end) {
                    result.push(self.close_run(track_index, std::mem::take(&mut current), segments));
                }
            }
            if !current.is_empty() {
                result.push(self.close_run(track_index, current, segments));
            }
        }
        result
    }

    fn close_run(&self, track_index: usize, run: Vec<usize>, segments: &[Segment]) -> RouteSubSegment {
        let overlap_count = run
            .iter()
            .flat_map(|&i| [&segments[i].start, &segments[i].end])
            .map(|p| self.tracks_at(&GridPoint::from_point(p, self.precision)))
            .max()
            .unwrap_or(1)
            .max(1) as u32;

        RouteSubSegment {
            track_index,
            segments: run,
            overlap_count,
        }
    }
}

/// Overlap-aware randomized intensities.
///
/// One value is drawn from `U[-jitter, +jitter]` per route sub-segment and
/// added to `min(overlap_count, max_density)`; the rounded result is clamped
/// to `[1, max_density]` and shared by every segment of the sub-segment.
/// Segments not covered by any sub-segment keep intensity 1.
pub fn randomized_intensities<R: Rng + ?Sized>(
    segments: &[Segment],
    precision: f64,
    max_density: u32,
    jitter: f64,
    rng: &mut R,
) -> Vec<u32> {
    let cap = max_density.max(1);
    let jitter = if jitter.is_finite() { jitter.abs() } else { 0.0 };

    let topology = RouteTopology::build(segments, precision);
    let subsegments = topology.subsegments(segments);

    let mut intensities = vec![1u32; segments.len()];
    for sub in &subsegments {
        let base = sub.overlap_count.min(cap) as f64;
        let variation: f64 = rng.gen_range(-jitter..=jitter);
        let value = (base + variation).round().clamp(1.0, cap as f64) as u32;
        for &i in &sub.segments {
            intensities[i] = value;
        }
    }

    debug!(
        "[Intensity] randomized: {} segments in {} sub-segments",
        segments.len(),
        subsegments.len()
    );

    intensities
}

/// Assign intensities with the policy selected by `config`.
///
/// The randomized policy is seeded from `config.seed` when set; otherwise it
/// draws from the thread-local generator and results differ between calls.
pub fn assign_intensities(segments: &[Segment], density: &DensityMap, config: &DensityConfig) -> Vec<u32> {
    match IntensityPolicy::from_config(config) {
        IntensityPolicy::Direct => direct_intensities(segments, density, config.max_density),
        IntensityPolicy::Randomized => match config.seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                randomized_intensities(segments, density.precision(), config.max_density, config.jitter, &mut rng)
            }
            None => {
                let mut rng = rand::thread_rng();
                randomized_intensities(segments, density.precision(), config.max_density, config.jitter, &mut rng)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::aggregate_density;
    use crate::segments::segment_tracks;
    use crate::{GpsPoint, Track};

    const PRECISION: f64 = 10_000.0;

    fn track(id: &str, points: &[(f64, f64)]) -> Track {
        Track::new(
            id,
            points.iter().map(|(lat, lng)| GpsPoint::new(*lat, *lng)).collect(),
        )
    }

    /// Track "a" runs east along lat 0; track "b" crosses it at (0, 2).
    fn crossing_tracks() -> Vec<Track> {
        vec![
            track("a", &[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0), (0.0, 3.0), (0.0, 4.0)]),
            track("b", &[(-1.0, 2.0), (0.0, 2.0), (1.0, 2.0)]),
        ]
    }

    #[test]
    fn test_policy_from_config() {
        let mut config = DensityConfig::default();
        assert_eq!(IntensityPolicy::from_config(&config), IntensityPolicy::Direct);
        config.randomize = true;
        assert_eq!(IntensityPolicy::from_config(&config), IntensityPolicy::Randomized);
    }

    #[test]
    fn test_direct_caps_density() {
        let tracks: Vec<Track> = (0..6)
            .map(|i| track(&format!("t{}", i), &[(0.0, 0.0), (0.0, 1.0)]))
            .collect();
        let segments = segment_tracks(&tracks);
        let density = aggregate_density(&segments, PRECISION);

        assert!(direct_intensities(&segments, &density, 10).iter().all(|&v| v == 6));
        assert!(direct_intensities(&segments, &density, 4).iter().all(|&v| v == 4));
    }

    #[test]
    fn test_direct_zero_cap_still_at_least_one() {
        let segments = segment_tracks(&[track("a", &[(0.0, 0.0), (0.0, 1.0)])]);
        let density = aggregate_density(&segments, PRECISION);
        assert_eq!(direct_intensities(&segments, &density, 0), vec![1]);
    }

    #[test]
    fn test_direct_with_foreign_map_falls_back_to_one() {
        let segments = segment_tracks(&[track("a", &[(0.0, 0.0), (0.0, 1.0)])]);
        let empty = aggregate_density(&[], PRECISION);
        assert_eq!(direct_intensities(&segments, &empty, 10), vec![1]);
    }

    #[test]
    fn test_topology_intersections() {
        let segments = segment_tracks(&crossing_tracks());
        let topology = RouteTopology::build(&segments, PRECISION);

        let crossing = GridPoint::from_point(&GpsPoint::new(0.0, 2.0), PRECISION);
        assert!(topology.is_intersection(&crossing));
        assert_eq!(topology.tracks_at(&crossing), 2);
        assert_eq!(topology.intersection_points().len(), 1);

        let lonely = GridPoint::from_point(&GpsPoint::new(0.0, 4.0), PRECISION);
        assert!(!topology.is_intersection(&lonely));
    }

    #[test]
    fn test_subsegments_split_after_intersection() {
        let segments = segment_tracks(&crossing_tracks());
        let topology = RouteTopology::build(&segments, PRECISION);
        let subs = topology.subsegments(&segments);

        // a: [0,1] ends at crossing, [2,3] to the end
        // b: [4] ends at crossing, [5] to the end
        let runs: Vec<(usize, Vec<usize>)> =
            subs.iter().map(|s| (s.track_index, s.segments.clone())).collect();
        assert_eq!(
            runs,
            vec![(0, vec![0, 1]), (0, vec![2, 3]), (1, vec![4]), (1, vec![5])]
        );

        // Every run touches the crossing point
        assert!(subs.iter().all(|s| s.overlap_count == 2));
    }

    #[test]
    fn test_subsegments_cover_every_segment_once() {
        let segments = segment_tracks(&crossing_tracks());
        let subs = RouteTopology::build(&segments, PRECISION).subsegments(&segments);

        let mut covered: Vec<usize> = subs.iter().flat_map(|s| s.segments.iter().copied()).collect();
        covered.sort_unstable();
        assert_eq!(covered, (0..segments.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_isolated_track_single_subsegment() {
        let segments = segment_tracks(&[track("solo", &[(5.0, 5.0), (5.0, 6.0), (5.0, 7.0)])]);
        let subs = RouteTopology::build(&segments, PRECISION).subsegments(&segments);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].overlap_count, 1);
    }

    #[test]
    fn test_randomized_bounds_and_sharing() {
        let segments = segment_tracks(&crossing_tracks());
        let subs = RouteTopology::build(&segments, PRECISION).subsegments(&segments);

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let values = randomized_intensities(&segments, PRECISION, 3, 0.9, &mut rng);

            assert!(values.iter().all(|&v| (1..=3).contains(&v)));
            for sub in &subs {
                let first = values[sub.segments[0]];
                assert!(sub.segments.iter().all(|&i| values[i] == first));
            }
        }
    }

    #[test]
    fn test_randomized_default_jitter_keeps_base() {
        // Integer base +-0.2 always rounds back to the base
        let segments = segment_tracks(&crossing_tracks());
        let mut rng = rand::thread_rng();
        let values = randomized_intensities(&segments, PRECISION, 10, 0.2, &mut rng);
        assert!(values.iter().all(|&v| v == 2));
    }

    #[test]
    fn test_randomized_respects_cap() {
        let segments = segment_tracks(&crossing_tracks());
        let mut rng = StdRng::seed_from_u64(7);
        let values = randomized_intensities(&segments, PRECISION, 1, 0.2, &mut rng);
        assert!(values.iter().all(|&v| v == 1));
    }

    #[test]
    fn test_seeded_assignment_is_reproducible() {
        let segments = segment_tracks(&crossing_tracks());
        let density = aggregate_density(&segments, PRECISION);
        let config = DensityConfig {
            randomize: true,
            jitter: 0.8,
            seed: Some(42),
            ..DensityConfig::default()
        };

        assert_eq!(
            assign_intensities(&segments, &density, &config),
            assign_intensities(&segments, &density, &config)
        );
    }

    #[test]
    fn test_randomized_empty_input() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(randomized_intensities(&[], PRECISION, 10, 0.2, &mut rng).is_empty());
    }
}
