//! End-to-end scenarios across the index family, driven by a manual clock
//! where time matters.

use std::rc::Rc;
use std::time::{Duration, SystemTime};

use geogrid::{
    ClusteringIndex, GeoPoint, ManualClock, Meters, Minutes, PointsIndex, RangeResult, distance,
};

fn landmarks() -> Vec<GeoPoint> {
    vec![
        GeoPoint::new("Piccadilly Circus", 51.509860, -0.133700),
        GeoPoint::new("Charing Cross", 51.507460, -0.125500),
        GeoPoint::new("Embankment", 51.507312, -0.122367),
        GeoPoint::new("Covent Garden", 51.513103, -0.124731),
        GeoPoint::new("Leicester Square", 51.511291, -0.128242),
    ]
}

fn minutes(m: u64) -> Duration {
    Duration::from_secs(m * 60)
}

#[test]
fn range_over_a_two_km_box_returns_exactly_the_contained_landmarks() {
    let mut index = PointsIndex::new(Meters::from_km(0.5));
    for landmark in landmarks() {
        index.add(landmark);
    }

    // A roughly 2 km box over the West End that clips out Embankment and
    // Charing Cross.
    let top_left = GeoPoint::new("tl", 51.5155, -0.1420);
    let bottom_right = GeoPoint::new("br", 51.5090, -0.1240);

    let mut found: Vec<String> = index
        .range(&top_left, &bottom_right)
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    found.sort();

    assert_eq!(
        found,
        vec!["Covent Garden", "Leicester Square", "Piccadilly Circus"]
    );

    // No duplicates regardless of how many cells the box covers.
    found.dedup();
    assert_eq!(found.len(), 3);
}

#[test]
fn k_nearest_returns_the_three_closest_nearest_first() {
    let mut index = PointsIndex::new(Meters::from_km(0.5));
    for landmark in landmarks() {
        index.add(landmark);
    }

    let query = GeoPoint::new("query", 51.5080, -0.1245);
    let nearest = index.k_nearest(&query, 3, Meters::from_km(1.0), |_| true);

    assert_eq!(nearest.len(), 3);
    for pair in nearest.windows(2) {
        assert!(distance(&query, &pair[0]) <= distance(&query, &pair[1]));
    }

    // All three beat every landmark left out.
    let worst = distance(&query, &nearest[2]);
    for landmark in landmarks() {
        if nearest.iter().all(|p| p.id != landmark.id) {
            assert!(distance(&query, &landmark) >= worst);
        }
    }
}

#[test]
fn expiring_points_index_lifecycle() {
    let clock = Rc::new(ManualClock::starting_at(SystemTime::UNIX_EPOCH));
    let mut index =
        PointsIndex::expiring_with_clock(Meters::from_km(1.0), Minutes(5), clock.clone());

    // One landmark per minute, in declaration order.
    for (i, landmark) in landmarks().into_iter().enumerate() {
        clock.set(SystemTime::UNIX_EPOCH + minutes(i as u64));
        index.add(landmark);
    }

    let top_left = GeoPoint::new("tl", 51.5155, -0.1420);
    let bottom_right = GeoPoint::new("br", 51.5070, -0.1220);

    // Minute 4: everything is younger than the window.
    assert_eq!(index.range(&top_left, &bottom_right).unwrap().len(), 5);
    assert!(index.get("Piccadilly Circus").is_some());

    // Minute 7: the minute-0 and minute-1 adds have aged out; the minute-2
    // add sits exactly at the window edge and survives.
    clock.set(SystemTime::UNIX_EPOCH + minutes(7));
    assert!(index.get("Piccadilly Circus").is_none());
    assert!(index.get("Charing Cross").is_none());
    assert!(index.get("Embankment").is_some());

    let mut remaining: Vec<String> = index
        .range(&top_left, &bottom_right)
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    remaining.sort();
    assert_eq!(
        remaining,
        vec!["Covent Garden", "Embankment", "Leicester Square"]
    );

    let query = GeoPoint::new("query", 51.5080, -0.1245);
    let nearest = index.k_nearest(&query, 5, Meters::from_km(5.0), |_| true);
    assert_eq!(nearest.len(), 3);
    assert!(nearest.iter().all(|p| p.id != "Piccadilly Circus"));
}

#[test]
fn refreshing_a_point_keeps_it_past_the_original_horizon() {
    let clock = Rc::new(ManualClock::starting_at(SystemTime::UNIX_EPOCH));
    let mut index =
        PointsIndex::expiring_with_clock(Meters::from_km(1.0), Minutes(10), clock.clone());

    let embankment = GeoPoint::new("Embankment", 51.507312, -0.122367);
    index.add(embankment.clone());

    // Refresh inside the window.
    clock.advance(minutes(6));
    index.add(embankment.clone());

    // 12 minutes after the original add, 6 after the refresh: adding a
    // neighbor in the same cell drives that cell's purge over the
    // original add's expired record, and the refresh must keep
    // Embankment alive.
    clock.advance(minutes(6));
    index.add(GeoPoint::new("Craven Street", 51.507300, -0.123500));
    assert!(index.get("Embankment").is_some());

    // 11 minutes after the refresh it is genuinely gone.
    clock.advance(minutes(5));
    assert!(index.get("Embankment").is_none());
    assert!(index.get("Craven Street").is_some());
}

#[test]
fn clustering_index_trades_points_for_counts_as_the_viewport_grows() {
    let mut index = ClusteringIndex::new();
    for landmark in landmarks() {
        index.add(landmark);
    }
    // A second cluster of points around Birmingham.
    index.add(GeoPoint::new("Bullring", 52.477800, -1.894000));
    index.add(GeoPoint::new("New Street", 52.477700, -1.898500));

    // Street zoom over central London: raw points.
    let street = index
        .range(
            &GeoPoint::new("tl", 51.5155, -0.1420),
            &GeoPoint::new("br", 51.5070, -0.1220),
        )
        .unwrap();
    assert!(matches!(street, RangeResult::Points(ref points) if points.len() == 5));

    // A South-East England viewport: city-level clusters.
    let city = index
        .range(
            &GeoPoint::new("tl", 52.6, -2.1),
            &GeoPoint::new("br", 51.2, 0.5),
        )
        .unwrap();
    match city {
        RangeResult::Clusters(clusters) => {
            let total: f64 = clusters.iter().map(|c| c.count).sum();
            assert_eq!(total, 7.0);
        }
        RangeResult::Points(_) => panic!("expected city clusters"),
    }

    // A continental viewport: world-level clusters collapse Britain into
    // few cells.
    let world = index
        .range(
            &GeoPoint::new("tl", 64.1466, -21.9426),
            &GeoPoint::new("br", 39.9334, 32.8597),
        )
        .unwrap();
    match world {
        RangeResult::Clusters(clusters) => {
            let total: f64 = clusters.iter().map(|c| c.count).sum();
            assert_eq!(total, 7.0);
            assert!(clusters.len() <= 2);
        }
        RangeResult::Points(_) => panic!("expected world clusters"),
    }
}

#[test]
fn expiring_clustering_index_stays_consistent_across_levels() {
    let clock = Rc::new(ManualClock::starting_at(SystemTime::UNIX_EPOCH));
    let mut index = ClusteringIndex::expiring_with_clock(Minutes(5), clock.clone());

    for landmark in landmarks() {
        index.add(landmark);
    }

    clock.advance(minutes(6));
    index.add(GeoPoint::new("Bank", 51.513300, -0.088900));

    // Only the fresh point survives, at every zoom.
    let street = index
        .range(
            &GeoPoint::new("tl", 51.52, -0.15),
            &GeoPoint::new("br", 51.50, -0.08),
        )
        .unwrap();
    assert!(matches!(street, RangeResult::Points(ref points)
        if points.len() == 1 && points[0].id == "Bank"));

    let world = index
        .range(
            &GeoPoint::new("tl", 64.1466, -21.9426),
            &GeoPoint::new("br", 39.9334, 32.8597),
        )
        .unwrap();
    match world {
        RangeResult::Clusters(clusters) => {
            let total: f64 = clusters.iter().map(|c| c.count).sum();
            assert_eq!(total, 1.0);
        }
        RangeResult::Points(_) => panic!("expected clusters"),
    }
}

#[test]
fn geo_point_wire_format_uses_named_fields() {
    let point = GeoPoint::new("Embankment", 51.507312, -0.122367);

    let json = serde_json::to_value(&point).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "id": "Embankment",
            "lat": 51.507312,
            "lon": -0.122367,
        })
    );

    let parsed: GeoPoint = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, point);
}
