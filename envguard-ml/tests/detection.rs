use chrono::{DateTime, Duration, TimeZone, Utc};
use envguard_core::{Reading, SensorKind};
use envguard_ml::{
    DetectorConfig, ForestConfig, IsolationForestClassifier, RowOutcome, StatisticalDetector,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
}

/// A day of minute readings around 21.5°C / 45% with mild noise
fn noisy_day(seed: u64) -> Vec<Reading> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..24 * 60)
        .flat_map(|i| {
            let ts = start() + Duration::minutes(i);
            let temperature = 21.5 + rng.gen_range(-0.5..0.5);
            let humidity = 45.0 + rng.gen_range(-2.0..2.0);
            [
                Reading::new(ts, "office", SensorKind::Temperature, temperature).unwrap(),
                Reading::new(ts + Duration::milliseconds(400), "office", SensorKind::Humidity, humidity)
                    .unwrap(),
            ]
        })
        .collect()
}

fn detector(seed: u64) -> StatisticalDetector<IsolationForestClassifier> {
    StatisticalDetector::new(
        IsolationForestClassifier::new(ForestConfig::default().with_seed(seed)),
        DetectorConfig::default(),
    )
    .unwrap()
}

#[test]
fn injected_outlier_is_flagged() {
    let mut readings = noisy_day(7);
    let spike = start() + Duration::hours(3) + Duration::minutes(17);
    let in_spike = |r: &Reading| r.timestamp() >= spike && r.timestamp() - spike < Duration::seconds(1);
    for r in readings.iter_mut().filter(|r| in_spike(r)) {
        let value = match r.kind() {
            SensorKind::Temperature => 33.0,
            _ => 12.0,
        };
        *r = Reading::new(r.timestamp(), "office", r.kind(), value).unwrap();
    }

    let detection = detector(42).detect(&readings).unwrap();

    assert_eq!(detection.outcome(spike), Some(&RowOutcome::Outlier));
    // At most ceil(1440 * 0.05); rows tied with the cut are not counted
    assert!(detection.outlier_count() <= 72);
    let outliers = detection.outlier_timestamps();
    assert!(outliers.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn flat_day_has_no_outliers() {
    let readings: Vec<Reading> = (0..24 * 60)
        .flat_map(|i| {
            let ts = start() + Duration::minutes(i);
            [
                Reading::new(ts, "office", SensorKind::Temperature, 21.5).unwrap(),
                Reading::new(ts + Duration::milliseconds(400), "office", SensorKind::Humidity, 45.0)
                    .unwrap(),
            ]
        })
        .collect();

    let detection = detector(42).detect(&readings).unwrap();

    assert_eq!(detection.evaluated_count(), 1440);
    assert_eq!(detection.outlier_count(), 0);
    assert!(detection.outlier_timestamps().is_empty());
}

#[test]
fn same_seed_same_flags() {
    let readings = noisy_day(11);
    let first = detector(42).detect(&readings).unwrap();
    let second = detector(42).detect(&readings).unwrap();
    assert_eq!(first, second);

    let mut reused = detector(42);
    reused.detect(&readings).unwrap();
    assert_eq!(reused.detect(&readings).unwrap(), first);
}

#[test]
fn gaps_in_one_kind_are_not_evaluable() {
    let readings: Vec<Reading> = noisy_day(3)
        .into_iter()
        // Humidity sensor offline for the first hour
        .filter(|r| !(r.kind() == SensorKind::Humidity && r.timestamp() < start() + Duration::hours(1)))
        .collect();

    let detection = detector(42).detect(&readings).unwrap();

    assert_eq!(detection.not_evaluable_count(), 60);
    assert_eq!(detection.evaluated_count(), 23 * 60);
    assert_eq!(
        detection.outcome(start()),
        Some(&RowOutcome::NotEvaluable { missing: vec![SensorKind::Humidity] })
    );
    assert!(detection
        .outlier_timestamps()
        .iter()
        .all(|ts| *ts >= start() + Duration::hours(1)));
}
