use chrono::{DateTime, Duration, NaiveTime, Utc};
use rand::Rng;

use crate::catalog::{self, SensorKind, ROOMS};
use crate::error::{Error, Result};
use crate::reading::{QueryWindow, SensorId, SensorReading};
use crate::source::{HistorySource, LiveSource};

const SAMPLES_PER_DAY: i64 = 24;
const SAMPLE_EVERY_MINUTES: i64 = 30;

/// Plausible random readings for every catalog sensor. Stands in for both
/// backends when they are unreachable or when nothing is configured.
#[derive(Default)]
pub struct SampleSource;

fn sample_value(kind: SensorKind, rng: &mut impl Rng) -> f64 {
    let round1 = |v: f64| (v * 10.0).round() / 10.0;
    match kind {
        SensorKind::Temperature => round1(rng.random_range(18.0..26.0)),
        SensorKind::Humidity => f64::from(rng.random_range(30..=70_u32)),
        SensorKind::Co2 => f64::from(rng.random_range(400..=1000_u32)),
        SensorKind::Pressure => round1(rng.random_range(950.0..1050.0)),
        SensorKind::Light => f64::from(rng.random_range(100..=1000_u32)),
        SensorKind::UvIndex => round1(rng.random_range(0.0..10.0)),
        SensorKind::GasResistance => f64::from(rng.random_range(100..=10000_u32)),
        SensorKind::Iaq => f64::from(rng.random_range(0..=500_u32)),
        SensorKind::NoiseLevel => round1(rng.random_range(20.0..80.0)),
    }
}

fn known_kind(sensor_id: &SensorId) -> Result<SensorKind> {
    SensorKind::from_entity_id(sensor_id)
        .map(|(_, kind)| kind)
        .ok_or_else(|| Error::NotFound(sensor_id.clone()))
}

/// Half-hourly timestamps from 06:00 UTC on the day of `day`.
fn sample_times(day: DateTime<Utc>) -> impl Iterator<Item = DateTime<Utc>> {
    let six = NaiveTime::from_hms_opt(6, 0, 0).unwrap_or_default();
    let first = day.date_naive().and_time(six).and_utc();
    (0..SAMPLES_PER_DAY).map(move |i| first + Duration::minutes(SAMPLE_EVERY_MINUTES * i))
}

impl HistorySource for SampleSource {
    fn history(&self, sensor_id: &SensorId, window: &QueryWindow) -> Result<Vec<SensorReading>> {
        window.validate()?;
        let kind = known_kind(sensor_id)?;
        let mut rng = rand::rng();
        Ok(sample_times(window.end)
            .filter(|t| window.contains(*t))
            .map(|timestamp| SensorReading {
                sensor_id: sensor_id.clone(),
                timestamp,
                value: sample_value(kind, &mut rng),
            })
            .collect())
    }
}

impl LiveSource for SampleSource {
    fn latest(&self, sensor_id: &SensorId) -> Result<SensorReading> {
        let kind = known_kind(sensor_id)?;
        Ok(SensorReading {
            sensor_id: sensor_id.clone(),
            timestamp: Utc::now(),
            value: sample_value(kind, &mut rand::rng()),
        })
    }

    fn all_latest(&self, prefix: &str) -> Result<Vec<SensorReading>> {
        let now = Utc::now();
        let mut rng = rand::rng();
        let mut readings = Vec::new();
        for room in ROOMS {
            for kind in SensorKind::ALL {
                let sensor_id = catalog::entity_id(room, kind);
                if sensor_id.as_str().starts_with(prefix) {
                    readings.push(SensorReading { sensor_id, timestamp: now, value: sample_value(kind, &mut rng) });
                }
            }
        }
        Ok(readings)
    }
}
