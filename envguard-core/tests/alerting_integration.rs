//! Threshold, cooldown, grouping and report working together

mod common;

use chrono::Duration;
use common::{start, StreamGenerator};
use envguard_core::{
    default_gap, group_periods, CooldownTracker, Notification, ReportRenderer, SensorKind,
    ThresholdDetector,
};

#[test]
fn stuck_sensor_alerts_once_per_window() {
    // Humidity pinned at 92% for three hours, one reading a minute
    let readings = StreamGenerator::new("office", SensorKind::Humidity, Duration::minutes(1), 45.0)
        .excursion(10, 190, 92.0)
        .take(240);

    let detector = ThresholdDetector::default();
    let cooldown = CooldownTracker::default();

    let alerts: Vec<Notification> = readings
        .iter()
        .filter_map(|r| {
            let verdict = detector.evaluate(r);
            (verdict.is_anomaly && cooldown.should_alert(&r.alert_key(), r.timestamp()))
                .then(|| Notification::alert(&verdict))
        })
        .collect();

    // Minutes 10, 71 and 132: each more than an hour after the previous
    assert_eq!(alerts.len(), 3);
    assert!(alerts.iter().all(|n| n.body == "Humidity anomaly at office: 92%"));
}

#[test]
fn streams_cool_down_independently() {
    let detector = ThresholdDetector::default();
    let cooldown = CooldownTracker::default();

    let mut readings = StreamGenerator::new("office", SensorKind::Temperature, Duration::minutes(5), 45.0).take(6);
    readings.extend(StreamGenerator::new("lab", SensorKind::Temperature, Duration::minutes(5), 45.0).take(6));
    readings.extend(StreamGenerator::new("office", SensorKind::Humidity, Duration::minutes(5), 5.0).take(6));
    readings.sort_by_key(|r| r.timestamp());

    let emitted = readings
        .iter()
        .filter(|r| detector.evaluate(r).is_anomaly)
        .filter(|r| cooldown.should_alert(&r.alert_key(), r.timestamp()))
        .count();

    assert_eq!(emitted, 3);
    assert_eq!(cooldown.len(), 3);
}

#[test]
fn threshold_anomalies_grouped_into_report() {
    let readings = StreamGenerator::new("office", SensorKind::Temperature, Duration::minutes(2), 22.0)
        .excursion(5, 7, 41.5)
        .excursion(30, 30, 8.0)
        .take(60);

    let detector = ThresholdDetector::default();
    let flagged: Vec<_> = readings
        .iter()
        .filter(|r| detector.evaluate(r).is_anomaly)
        .map(|r| r.timestamp())
        .collect();

    let periods = group_periods(&flagged, default_gap());
    assert_eq!(periods.len(), 2);
    assert_eq!(periods[0].start, start() + Duration::minutes(10));
    assert_eq!(periods[0].end, start() + Duration::minutes(14));
    assert_eq!(periods[1].start, periods[1].end);

    let body = ReportRenderer::default().render(&periods);
    assert!(body.ends_with("- 2024-05-01 08:10 – 08:14\n- 2024-05-01 09:00 – 09:00"));
}
