//! Show how precision controls aggregation on noisy repeats of one route.
//!
//! Run with: cargo run --example precision_sweep --features parallel

use std::time::Instant;
use track_density::{segment_tracks_parallel, DensityConfig, DensityEngine, GpsPoint, Track};

fn main() {
    println!("Precision Sweep Example\n");

    let base_route = vec![
        GpsPoint::new(48.8566, 2.3522),
        GpsPoint::new(48.8576, 2.3532),
        GpsPoint::new(48.8586, 2.3542),
        GpsPoint::new(48.8596, 2.3552),
        GpsPoint::new(48.8606, 2.3562),
    ];

    // 50 repeats of the same route with a few meters of GPS noise
    let tracks: Vec<Track> = (0..50)
        .map(|i| Track::new(format!("paris-{}", i), add_noise(&base_route, i)))
        .collect();

    let start = Instant::now();
    let segments = segment_tracks_parallel(&tracks);
    println!("Segmented {} tracks into {} segments in {:?}\n", tracks.len(), segments.len(), start.elapsed());

    let mut engine = DensityEngine::with_tracks(tracks, DensityConfig::default()).unwrap();

    for precision in [100_000.0, 10_000.0, 1_000.0, 100.0] {
        engine.set_precision(precision).unwrap();
        let network = engine.network().unwrap();
        println!(
            "precision {:>8}: {:>4} buckets, max density {:>3}",
            precision, network.bucket_count, network.max_observed_density
        );
    }

    println!("\nEngine stats: {:?}", engine.stats());
}

/// Deterministic jitter of up to ~5m, different per track.
fn add_noise(route: &[GpsPoint], seed: u64) -> Vec<GpsPoint> {
    route
        .iter()
        .enumerate()
        .map(|(j, p)| {
            let k = (seed * 31 + j as u64 * 17) % 11;
            let offset = (k as f64 - 5.0) * 0.00001;
            GpsPoint::new(p.latitude + offset, p.longitude - offset)
        })
        .collect()
}
