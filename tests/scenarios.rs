//! End-to-end scenarios over synthetic tracks.

mod common;

use chrono::Duration;
use common::{along, init_logging, track_json, SyntheticTrack, KM_LAT};
use track_analytics::geo_utils::haversine_distance;
use track_analytics::{
    course_splits, match_controls, partition, sample_chart, AnalysisConfig, FeatureCollection,
    GeoTrace, TrackMetrics, TrackPoint, TrackSession, TrackError, HEARTRATE_UNAVAILABLE,
};

#[test]
fn test_five_points_one_km_apart() {
    init_logging();
    let trace = SyntheticTrack::new("straight").build();
    let metrics = TrackMetrics::new(&trace);

    assert!((metrics.length() - 4.0).abs() < 1e-6);
    assert_eq!(metrics.pace().unwrap(), "5:00");
    assert!((metrics.speed().unwrap() - 12.0).abs() < 1e-6);
    assert_eq!(metrics.average_heartrate(), HEARTRATE_UNAVAILABLE);
}

#[test]
fn test_length_is_sum_of_great_circle_distances() {
    let points: Vec<TrackPoint> = (0..30)
        .map(|i| {
            let zigzag = if i % 2 == 0 { 0.0 } else { 0.002 };
            TrackPoint::new(46.0 + i as f64 * 0.001, 7.0 + zigzag, 500.0)
        })
        .collect();
    let trace = GeoTrace::new("zigzag", points).unwrap();

    let expected: f64 = trace
        .positions()
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]) / 1000.0)
        .sum();
    let length = TrackMetrics::new(&trace).length();
    assert!(length >= 0.0);
    assert!((length - expected).abs() < 1e-9);
}

#[test]
fn test_duplicate_morning_run() {
    init_logging();
    let mut session = TrackSession::new();
    let first = SyntheticTrack::new("Morning Run").build();
    let second = SyntheticTrack::new("Morning Run").points(8).build();

    session.add_track(first.clone()).unwrap();
    let err = session.add_track(second).unwrap_err();

    assert!(matches!(err, TrackError::DuplicateName { ref name, .. } if name == "Morning Run"));
    assert_eq!(session.tracks(), &[first]);
}

#[test]
fn test_three_control_course() {
    init_logging();
    // 3 km northwards, a vertex every 250 m, one minute apart
    let trace = SyntheticTrack::new("course run")
        .points(13)
        .spacing_km(0.25)
        .seconds_apart(60)
        .build();
    let controls = [along(0.6, 0.0003), along(1.6, -0.0002), along(2.35, 0.0001)];

    let cuts = match_controls(&trace, &controls);
    let splits = course_splits(&trace, &cuts, &AnalysisConfig::default()).unwrap();

    assert_eq!(splits.len(), 3);
    // The last split ends at the final trace point, not at a control
    let remaining = TrackMetrics::new(&trace).length() - cuts[2].location_km;
    assert!((splits[2].distance - remaining).abs() < 1e-6);
    assert!((splits[2].distance - 0.65).abs() < 1e-6);
    assert_eq!(splits[2].elapsed_seconds, 180);

    let total: f64 = splits.iter().map(|s| s.distance).sum();
    assert!((total - 2.4).abs() < 1e-6);
}

#[test]
fn test_zero_time_slice_excluded() {
    init_logging();
    let mut points = SyntheticTrack::new("stall")
        .points(8)
        .spacing_km(0.1)
        .seconds_apart(30)
        .track_points();
    // Points 4 and 5 carry point 3's timestamp
    let stalled = points[3].timestamp;
    points[4].timestamp = stalled;
    points[5].timestamp = stalled;
    for (i, p) in points.iter_mut().enumerate().skip(6) {
        p.timestamp = stalled.map(|t| t + Duration::seconds(30 * (i as i64 - 5)));
    }
    let trace = GeoTrace::new("stall", points).unwrap();

    // Slices of two points: [0,1] [2,3] [4,5] [6,7]
    let samples: Vec<_> = sample_chart(&trace, 4, 130.0).unwrap().collect();

    assert_eq!(samples.len(), 3);
    assert!(samples.iter().all(|s| s.average_speed.is_finite()));
    let elapsed: Vec<i64> = samples.iter().map(|s| s.elapsed_seconds).collect();
    assert_eq!(elapsed, vec![30, 90, 150]);
    // The dropped slice's 200 m never reach the running total
    assert!((samples[2].cumulative_distance - 0.5).abs() < 1e-6);
}

#[test]
fn test_timezone_normalized_total_time() {
    let lines = r#"[[0.0, 51.0, 5.0], [0.0, 51.01, 5.0], [0.0, 51.02, 5.0]]"#;
    let gmt = format!(
        r#"{{"type": "FeatureCollection", "features": [{{"type": "Feature",
            "properties": {{"coordTimes": ["2024-03-30T10:00:00Z", "2024-03-30T10:20:00Z", "2024-03-30T10:41:15Z"]}},
            "geometry": {{"type": "LineString", "coordinates": {}}}}}]}}"#,
        lines
    );
    let gmt_plus_one = format!(
        r#"{{"type": "FeatureCollection", "features": [{{"type": "Feature",
            "properties": {{"coordTimes": ["2024-03-30T11:00:00+01:00", "2024-03-30T11:20:00+01:00", "2024-03-30T11:41:15+01:00"]}},
            "geometry": {{"type": "LineString", "coordinates": {}}}}}]}}"#,
        lines
    );

    let gmt = FeatureCollection::from_json(&gmt).unwrap();
    let gmt_plus_one = FeatureCollection::from_json(&gmt_plus_one).unwrap();
    let a = GeoTrace::from_feature_collection(&gmt, "gmt").unwrap();
    let b = GeoTrace::from_feature_collection(&gmt_plus_one, "bst").unwrap();

    let ta = TrackMetrics::new(&a).total_time().unwrap();
    let tb = TrackMetrics::new(&b).total_time().unwrap();
    assert_eq!(ta, tb);
    assert_eq!(ta.num_seconds(), 41 * 60 + 15);
    assert_eq!(
        track_analytics::format_clock(ta),
        track_analytics::format_clock(tb)
    );
}

#[test]
fn test_partition_sizes() {
    for len in 0..200 {
        let items: Vec<usize> = (0..len).collect();
        for n in 1..30 {
            let slices = partition(&items, n);
            assert_eq!(slices.len(), n);
            assert_eq!(slices.iter().map(|s| s.len()).sum::<usize>(), len);
            assert!(slices.windows(2).all(|w| w[0].len() >= w[1].len()));
            // Contiguous, in order
            let flat: Vec<usize> = slices.iter().flat_map(|s| s.iter().copied()).collect();
            assert_eq!(flat, items);
        }
    }
}

#[test]
fn test_chart_samples_monotonic_and_bounded() {
    init_logging();
    // Alternating running and standing still, with GPS jitter while stopped
    let start = common::start_time();
    let mut points = Vec::new();
    let mut lat = 51.0;
    for i in 0..600 {
        let standing = (i / 50) % 3 == 2;
        lat += if standing { 0.000_001 } else { 0.02 * KM_LAT };
        points.push(
            TrackPoint::new(lat, 0.0, 30.0 + (i % 7) as f64)
                .with_timestamp(start + Duration::seconds(5 * i as i64))
                .with_heartrate(130 + (i % 20) as u32),
        );
    }
    let trace = GeoTrace::new("intervals", points).unwrap();
    let config = AnalysisConfig::default();
    let samples: Vec<_> = sample_chart(&trace, config.chart_slices, config.max_chart_pace)
        .unwrap()
        .collect();

    assert!(!samples.is_empty());
    assert!(samples.len() < config.chart_slices);
    assert!(samples
        .windows(2)
        .all(|w| w[0].cumulative_distance <= w[1].cumulative_distance));
    assert!(samples
        .iter()
        .all(|s| s.average_speed.is_finite() && s.average_pace <= 130.0));

    // Serialized track feeds back into a session unchanged
    let json = track_json(Some("intervals"), trace.points());
    let mut session = TrackSession::new();
    session
        .load_track(&FeatureCollection::from_json(&json).unwrap(), "intervals.gpx")
        .unwrap();
    assert_eq!(session.chart_data().unwrap().unwrap().samples, samples);
}
