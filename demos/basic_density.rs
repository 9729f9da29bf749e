//! Basic example of aggregating overlapping GPS tracks.
//!
//! Run with: cargo run --example basic_density

use track_density::{aggregate, DensityConfig, GpsPoint, Track};

fn main() {
    // Two runs sharing a stretch along the Embankment (London)
    let morning = Track::new(
        "morning-run",
        vec![
            GpsPoint::new(51.5074, -0.1278), // Start
            GpsPoint::new(51.5080, -0.1240),
            GpsPoint::new(51.5086, -0.1200),
            GpsPoint::new(51.5092, -0.1160), // End
        ],
    );

    let evening = Track::new(
        "evening-run",
        vec![
            GpsPoint::new(51.5092, -0.1160), // Same stretch, reversed
            GpsPoint::new(51.5086, -0.1200),
            GpsPoint::new(51.5080, -0.1240),
            GpsPoint::new(51.5040, -0.1250), // Then turns south
        ],
    );

    let tracks = vec![morning, evening];

    println!("Segment Density Examples\n");

    // 1. Direct policy
    let config = DensityConfig::default();
    println!("1. Direct policy (precision={}, max_density={}):", config.precision, config.max_density);
    let network = aggregate(&tracks, &config).unwrap();
    for r in &network.records {
        println!(
            "   {} #{}: density {}, intensity {}",
            r.track_id, r.segment_index, r.density, r.intensity
        );
    }
    println!(
        "   {} segments in {} buckets, {:.0}m total\n",
        network.segment_count, network.bucket_count, network.total_length_meters
    );

    // 2. Lower cap
    let capped = DensityConfig { max_density: 1, ..config.clone() };
    println!("2. Capped at 1:");
    let network = aggregate(&tracks, &capped).unwrap();
    println!("   {} records at the cap\n", network.capped_records().count());

    // 3. Randomized policy
    let randomized = DensityConfig { randomize: true, jitter: 0.6, ..config };
    println!("3. Randomized (jitter 0.6):");
    let network = aggregate(&tracks, &randomized).unwrap();
    for r in &network.records {
        println!("   {} #{}: intensity {}", r.track_id, r.segment_index, r.intensity);
    }
}
