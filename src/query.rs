//! Spatial lookup of aggregated segments.
//!
//! Answers "what passes here?" for a tapped location: an R-tree over segment
//! envelopes narrows the candidates, then the exact point-to-segment distance
//! decides.

use rstar::{RTree, RTreeObject, AABB};

use crate::geo_utils::{distance_to_segment, meters_to_degrees};
use crate::network::{DensityNetwork, DensityRecord};
use crate::GpsPoint;

/// A record position wrapped for R-tree indexing.
#[derive(Debug, Clone, Copy)]
struct IndexedSegment {
    record: usize,
    min_lat: f64,
    max_lat: f64,
    min_lng: f64,
    max_lng: f64,
}

impl RTreeObject for IndexedSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.min_lng, self.min_lat], [self.max_lng, self.max_lat])
    }
}

/// Query result for one nearby segment.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SegmentQueryResult {
    pub record: DensityRecord,
    /// Distance from the query point to the segment in meters
    pub distance_meters: f64,
    /// Short description for a tooltip
    pub suggested_label: String,
}

/// R-tree over the records of one [`DensityNetwork`].
pub struct SegmentIndex<'a> {
    network: &'a DensityNetwork,
    tree: RTree<IndexedSegment>,
}

impl<'a> SegmentIndex<'a> {
    pub fn build(network: &'a DensityNetwork) -> Self {
        let entries: Vec<IndexedSegment> = network
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| IndexedSegment {
                record: i,
                min_lat: r.start.latitude.min(r.end.latitude),
                max_lat: r.start.latitude.max(r.end.latitude),
                min_lng: r.start.longitude.min(r.end.longitude),
                max_lng: r.start.longitude.max(r.end.longitude),
            })
            .collect();

        Self {
            network,
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Records within `radius_meters` of `point`, nearest first.
    pub fn query_near(&self, point: &GpsPoint, radius_meters: f64) -> Vec<SegmentQueryResult> {
        let radius_deg = meters_to_degrees(radius_meters, point.latitude);
        let search_bounds = AABB::from_corners(
            [point.longitude - radius_deg, point.latitude - radius_deg],
            [point.longitude + radius_deg, point.latitude + radius_deg],
        );

        let mut results: Vec<SegmentQueryResult> = self
            .tree
            .locate_in_envelope_intersecting(&search_bounds)
            .filter_map(|entry| {
                let record = &self.network.records[entry.record];
                let distance = distance_to_segment(point, &record.start, &record.end);
                (distance <= radius_meters).then(|| SegmentQueryResult {
                    record: record.clone(),
                    distance_meters: distance,
                    suggested_label: suggested_label(record, self.network.max_density),
                })
            })
            .collect();

        results.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
        results
    }
}

fn suggested_label(record: &DensityRecord, max_density: u32) -> String {
    if record.density <= 1 {
        "Single pass".to_string()
    } else if record.density > max_density {
        format!("Capped ({}+ passes)", max_density)
    } else {
        format!("Common path ({} passes)", record.density)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{aggregate, DensityConfig, Track};

    fn network() -> DensityNetwork {
        let a = Track::new(
            "a",
            vec![GpsPoint::new(51.5000, -0.1200), GpsPoint::new(51.5000, -0.1100)],
        );
        let b = a.clone();
        let c = Track::new(
            "c",
            vec![GpsPoint::new(51.5100, -0.1200), GpsPoint::new(51.5100, -0.1100)],
        );
        let b = Track { id: "b".to_string(), ..b };
        aggregate(&[a, b, c], &DensityConfig::default()).unwrap()
    }

    #[test]
    fn test_index_size() {
        let network = network();
        let index = SegmentIndex::build(&network);
        assert_eq!(index.len(), 3);
        assert!(!index.is_empty());
    }

    #[test]
    fn test_query_finds_shared_segment() {
        let network = network();
        let index = SegmentIndex::build(&network);

        // ~20m north of the shared segment's middle
        let results = index.query_near(&GpsPoint::new(51.50018, -0.1150), 50.0);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.record.density == 2));
        assert_eq!(results[0].suggested_label, "Common path (2 passes)");
        assert!(results[0].distance_meters < 25.0);
    }

    #[test]
    fn test_query_radius_excludes_far_segments() {
        let network = network();
        let index = SegmentIndex::build(&network);

        let results = index.query_near(&GpsPoint::new(51.5100, -0.1150), 50.0);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.track_id, "c");
        assert_eq!(results[0].suggested_label, "Single pass");

        assert!(index.query_near(&GpsPoint::new(51.5050, -0.1150), 50.0).is_empty());
    }

    #[test]
    fn test_label_for_capped_density() {
        let record = DensityRecord {
            start: GpsPoint::new(0.0, 0.0),
            end: GpsPoint::new(0.0, 1.0),
            density: 12,
            intensity: 10,
            track_id: "x".to_string(),
            segment_index: 0,
        };
        assert_eq!(suggested_label(&record, 10), "Capped (10+ passes)");
    }

    #[test]
    fn test_empty_network() {
        let network = aggregate(&[], &DensityConfig::default()).unwrap();
        let index = SegmentIndex::build(&network);
        assert!(index.is_empty());
        assert!(index.query_near(&GpsPoint::new(0.0, 0.0), 1000.0).is_empty());
    }
}
