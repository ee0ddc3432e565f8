//! Feed a clustering index the way a map backend would: seed points around
//! a handful of cities, then query three viewport sizes and a k-nearest
//! lookup.
//!
//! ```sh
//! RUST_LOG=info cargo run --example clustering_map
//! ```

use geogrid::{ClusteringIndex, GeoPoint, Meters, RangeResult};

const CITIES: &[(&str, f64, f64)] = &[
    ("london", 51.5074, -0.1278),
    ("paris", 48.8566, 2.3522),
    ("berlin", 52.5200, 13.4050),
    ("madrid", 40.4168, -3.7038),
    ("rome", 41.9028, 12.4964),
];

const POINTS_PER_CITY: usize = 300;

/// Deterministic jitter in roughly ±0.15°.
fn jitter(seed: &mut u64) -> f64 {
    *seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    ((*seed >> 33) as f64 / (1u64 << 31) as f64 - 0.5) * 0.3
}

fn describe(label: &str, result: &RangeResult) {
    match result {
        RangeResult::Points(points) => {
            println!("{label}: {} raw points", points.len());
        }
        RangeResult::Clusters(clusters) => {
            println!("{label}: {} clusters", clusters.len());
            for cluster in clusters {
                println!(
                    "  {:>6.0} points near ({:.3}, {:.3})",
                    cluster.count, cluster.lat, cluster.lon
                );
            }
        }
    }
}

fn main() -> Result<(), geogrid::GeoGridError> {
    env_logger::init();

    let mut index = ClusteringIndex::new();
    let mut seed = 0x9e3779b97f4a7c15u64;

    for (city, lat, lon) in CITIES {
        for i in 0..POINTS_PER_CITY {
            index.add(GeoPoint::new(
                format!("{city}-{i}"),
                lat + jitter(&mut seed),
                lon + jitter(&mut seed),
            ));
        }
    }
    log::info!("seeded {} points", CITIES.len() * POINTS_PER_CITY);

    // Street zoom: a couple of kilometers across central London.
    let street = index.range(
        &GeoPoint::new("tl", 51.52, -0.15),
        &GeoPoint::new("br", 51.49, -0.10),
    )?;
    describe("central London", &street);

    // City zoom: the south of England.
    let city = index.range(
        &GeoPoint::new("tl", 52.2, -1.5),
        &GeoPoint::new("br", 50.8, 1.0),
    )?;
    describe("southern England", &city);

    // World zoom: most of Europe.
    let world = index.range(
        &GeoPoint::new("tl", 60.0, -10.0),
        &GeoPoint::new("br", 36.0, 20.0),
    )?;
    describe("Europe", &world);

    let query = GeoPoint::new("query", 51.5074, -0.1278);
    let nearest = index.k_nearest(&query, 5, Meters::from_km(5.0), |p| p.id.starts_with("london"));
    println!("5 nearest to central London:");
    for point in nearest {
        println!(
            "  {} at {:.0} m",
            point.id,
            geogrid::distance(&query, &point).get()
        );
    }

    Ok(())
}
