//! Density engine with cached segmentation.
//!
//! Holds a track collection and its segments. Configuration changes
//! (precision, cap, randomize toggle) only drop the aggregated network; the
//! segments are reused and the network is rebuilt lazily on the next
//! [`DensityEngine::network`] call. A rebuilt network replaces the previous
//! one wholesale.

use log::info;

use crate::network::{aggregate_segments, DensityNetwork};
use crate::segments::{segment_track, segment_tracks, Segment};
use crate::{DensityConfig, DensityError, Result, Track};

/// Engine statistics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct EngineStats {
    pub track_count: u32,
    pub segment_count: u32,
    /// Whether an aggregated network is currently cached
    pub network_cached: bool,
    /// Number of aggregations run since the engine was created
    pub aggregation_count: u32,
}

/// Track collection plus cached segments and the current aggregation.
#[derive(Debug, Default)]
pub struct DensityEngine {
    tracks: Vec<Track>,
    segments: Vec<Segment>,
    config: DensityConfig,
    network: Option<DensityNetwork>,
    aggregation_count: u32,
}

impl DensityEngine {
    /// Create an empty engine. Fails if `config` is invalid.
    pub fn new(config: DensityConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// Create an engine preloaded with `tracks`.
    pub fn with_tracks(tracks: Vec<Track>, config: DensityConfig) -> Result<Self> {
        let mut engine = Self::new(config)?;
        engine.add_tracks(tracks);
        Ok(engine)
    }

    // ========================================================================
    // Tracks
    // ========================================================================

    /// Add one track; only the new track is segmented.
    pub fn add_track(&mut self, track: Track) {
        let index = self.tracks.len();
        self.segments.extend(segment_track(index, &track));
        self.tracks.push(track);
        self.network = None;
    }

    pub fn add_tracks(&mut self, tracks: impl IntoIterator<Item = Track>) {
        for track in tracks {
            self.add_track(track);
        }
    }

    /// Remove the first track with `id`.
    ///
    /// Track indices shift, so the remaining tracks are resegmented.
    pub fn remove_track(&mut self, id: &str) -> Result<Track> {
        let position = self
            .tracks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| DensityError::TrackNotFound(id.to_string()))?;

        let removed = self.tracks.remove(position);
        self.segments = segment_tracks(&self.tracks);
        self.network = None;
        Ok(removed)
    }

    /// Drop all tracks and derived state.
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.segments.clear();
        self.network = None;
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    pub fn config(&self) -> &DensityConfig {
        &self.config
    }

    /// Replace the whole configuration. The cached network is dropped when
    /// anything changed; invalid configurations leave the engine untouched.
    pub fn set_config(&mut self, config: DensityConfig) -> Result<()> {
        config.validate()?;
        if config != self.config {
            self.config = config;
            self.network = None;
        }
        Ok(())
    }

    pub fn set_precision(&mut self, precision: f64) -> Result<()> {
        self.set_config(DensityConfig {
            precision,
            ..self.config.clone()
        })
    }

    pub fn set_max_density(&mut self, max_density: u32) -> Result<()> {
        self.set_config(DensityConfig {
            max_density,
            ..self.config.clone()
        })
    }

    pub fn set_randomize(&mut self, randomize: bool) -> Result<()> {
        self.set_config(DensityConfig {
            randomize,
            ..self.config.clone()
        })
    }

    /// Drop the cached network so the next call recomputes it (re-rolls
    /// randomized intensities when no seed is set).
    pub fn invalidate(&mut self) {
        self.network = None;
    }

    // ========================================================================
    // Aggregation
    // ========================================================================

    /// The aggregated network for the current tracks and configuration.
    pub fn network(&mut self) -> Result<&DensityNetwork> {
        let network = match self.network.take() {
            Some(network) => network,
            None => {
                let start = std::time::Instant::now();
                let network = aggregate_segments(&self.tracks, &self.segments, &self.config)?;
                self.aggregation_count += 1;
                info!(
                    "[DensityEngine] Aggregated {} segments into {} buckets (precision {}, {:?}) in {:?}",
                    network.segment_count,
                    network.bucket_count,
                    self.config.precision,
                    network.policy,
                    start.elapsed()
                );
                network
            }
        };

        Ok(self.network.insert(network))
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            track_count: self.tracks.len() as u32,
            segment_count: self.segments.len() as u32,
            network_cached: self.network.is_some(),
            aggregation_count: self.aggregation_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GpsPoint;

    fn track(id: &str, points: &[(f64, f64)]) -> Track {
        Track::new(
            id,
            points.iter().map(|(lat, lng)| GpsPoint::new(*lat, *lng)).collect(),
        )
    }

    fn engine() -> DensityEngine {
        DensityEngine::with_tracks(
            vec![
                track("a", &[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)]),
                track("b", &[(0.0, 1.0), (0.0, 2.0), (0.0, 3.0)]),
            ],
            DensityConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = DensityConfig { max_density: 0, ..DensityConfig::default() };
        assert!(DensityEngine::new(config).is_err());
    }

    #[test]
    fn test_network_is_cached() {
        let mut engine = engine();
        assert!(!engine.stats().network_cached);

        engine.network().unwrap();
        engine.network().unwrap();

        let stats = engine.stats();
        assert!(stats.network_cached);
        assert_eq!(stats.aggregation_count, 1);
        assert_eq!(stats.segment_count, 4);
    }

    #[test]
    fn test_config_change_recomputes() {
        let mut engine = engine();
        assert_eq!(engine.network().unwrap().max_observed_density, 2);

        engine.set_max_density(1).unwrap();
        assert!(!engine.stats().network_cached);
        let network = engine.network().unwrap();
        assert!(network.records.iter().all(|r| r.intensity == 1));
        assert_eq!(engine.stats().aggregation_count, 2);
    }

    #[test]
    fn test_unchanged_config_keeps_cache() {
        let mut engine = engine();
        engine.network().unwrap();
        engine.set_precision(10_000.0).unwrap();
        assert!(engine.stats().network_cached);
    }

    #[test]
    fn test_invalid_setting_leaves_engine_untouched() {
        let mut engine = engine();
        engine.network().unwrap();
        assert!(engine.set_precision(0.0).is_err());
        assert_eq!(engine.config().precision, 10_000.0);
        assert!(engine.stats().network_cached);
    }

    #[test]
    fn test_precision_change_reuses_segments() {
        let mut engine = engine();
        let before = engine.segments().to_vec();
        engine.set_precision(1.0).unwrap();
        assert_eq!(engine.segments(), before.as_slice());
        // At 1 degree resolution the three segment buckets stay distinct
        assert_eq!(engine.network().unwrap().bucket_count, 3);
    }

    #[test]
    fn test_add_and_remove_tracks() {
        let mut engine = engine();
        engine.add_track(track("c", &[(0.0, 1.0), (0.0, 2.0)]));
        assert_eq!(engine.network().unwrap().max_observed_density, 3);

        let removed = engine.remove_track("a").unwrap();
        assert_eq!(removed.id, "a");
        assert_eq!(engine.stats().segment_count, 3);

        let network = engine.network().unwrap();
        assert_eq!(network.max_observed_density, 2);
        assert!(network.records.iter().all(|r| r.track_id != "a"));
        let b_first = network.records.iter().find(|r| r.track_id == "b").unwrap();
        assert_eq!(b_first.segment_index, 0);
    }

    #[test]
    fn test_remove_missing_track() {
        let mut engine = engine();
        assert!(matches!(
            engine.remove_track("zzz"),
            Err(DensityError::TrackNotFound(_))
        ));
    }

    #[test]
    fn test_clear() {
        let mut engine = engine();
        engine.clear();
        assert!(engine.tracks().is_empty());
        assert!(engine.network().unwrap().is_empty());
    }

    #[test]
    fn test_randomize_toggle() {
        let mut engine = engine();
        engine.set_randomize(true).unwrap();
        let network = engine.network().unwrap();
        assert!(network.records.iter().all(|r| (1..=10).contains(&r.intensity)));
    }
}
