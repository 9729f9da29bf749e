//! Interchange formats for aggregated networks.
//!
//! - [`NetworkSnapshot`]: the compact precomputed format consumed by map
//!   front-ends, a list of `[lon1, lat1, lon2, lat2, intensity]` tuples plus
//!   metadata. It drops per-track attribution, so it cannot be re-aggregated.
//! - [`to_geojson`]: a GeoJSON FeatureCollection of LineStrings that keeps
//!   density and attribution as properties.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::density::round_coordinate;
use crate::network::DensityNetwork;
use crate::{GpsPoint, Result};

/// `[lon1, lat1, lon2, lat2, intensity]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFeature(pub f64, pub f64, pub f64, pub f64, pub u32);

impl SnapshotFeature {
    pub fn start(&self) -> GpsPoint {
        GpsPoint::new(self.1, self.0)
    }

    pub fn end(&self) -> GpsPoint {
        GpsPoint::new(self.3, self.2)
    }

    pub fn intensity(&self) -> u32 {
        self.4
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    /// Tracks that went into the aggregation
    pub route_count: u32,
    /// Number of entries in `features`
    pub feature_count: u32,
    pub generated_at: DateTime<Utc>,
    /// Rounding multiplier the coordinates were snapped with
    pub precision: f64,
}

/// Precomputed, render-ready snapshot of a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub metadata: SnapshotMetadata,
    pub features: Vec<SnapshotFeature>,
}

impl NetworkSnapshot {
    /// Snapshot `network`, stamped with the current time.
    pub fn from_network(network: &DensityNetwork) -> Self {
        Self::from_network_at(network, Utc::now())
    }

    /// Snapshot `network` with an explicit generation time.
    ///
    /// Coordinates are snapped to the network's precision, which also keeps
    /// the JSON compact.
    pub fn from_network_at(network: &DensityNetwork, generated_at: DateTime<Utc>) -> Self {
        let precision = network.precision;
        let features: Vec<SnapshotFeature> = network
            .records
            .iter()
            .map(|r| {
                SnapshotFeature(
                    round_coordinate(r.start.longitude, precision),
                    round_coordinate(r.start.latitude, precision),
                    round_coordinate(r.end.longitude, precision),
                    round_coordinate(r.end.latitude, precision),
                    r.intensity,
                )
            })
            .collect();

        Self {
            metadata: SnapshotMetadata {
                route_count: network.track_count,
                feature_count: features.len() as u32,
                generated_at,
                precision,
            },
            features,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the snapshot as JSON to `writer`.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_json(&mut writer)?;
        writer.flush()?;
        info!(
            "[Snapshot] Wrote {} features to {}",
            self.features.len(),
            path.display()
        );
        Ok(())
    }

    pub fn read_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Highest intensity in the snapshot, 0 when empty.
    pub fn max_intensity(&self) -> u32 {
        self.features.iter().map(SnapshotFeature::intensity).max().unwrap_or(0)
    }
}

/// GeoJSON FeatureCollection of the network's segments.
pub fn to_geojson(network: &DensityNetwork) -> Value {
    let features: Vec<Value> = network
        .records
        .iter()
        .map(|r| {
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "LineString",
                    "coordinates": [
                        [r.start.longitude, r.start.latitude],
                        [r.end.longitude, r.end.latitude],
                    ],
                },
                "properties": {
                    "intensity": r.intensity,
                    "density": r.density,
                    "trackId": r.track_id,
                    "segmentIndex": r.segment_index,
                },
            })
        })
        .collect();

    let mut collection = json!({
        "type": "FeatureCollection",
        "features": features,
    });

    if let Some(b) = network.bounds {
        collection["bbox"] = json!([b.min_lng, b.min_lat, b.max_lng, b.max_lat]);
    }

    collection
}
