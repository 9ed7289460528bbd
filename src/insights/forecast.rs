use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::Serialize;

use crate::catalog::SensorKind;
use crate::reading::SensorReading;

const STEP_MINUTES: i64 = 15;
const STEPS: i64 = 25;
const FIT_WINDOW_HOURS: i64 = 2;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Index of the last local extremum, searching back from the end.
fn last_turning_point(values: &[f64]) -> Option<usize> {
    (1..values.len().saturating_sub(1)).rev().find(|&i| {
        let (prev, cur, next) = (values[i - 1], values[i], values[i + 1]);
        (cur > prev && cur > next) || (cur < prev && cur < next)
    })
}

/// Least-squares line through (seconds since origin, value).
fn fit(points: &[SensorReading]) -> Option<(f64, f64, DateTime<Utc>)> {
    let origin = points.first()?.timestamp;
    let n = points.len() as f64;
    let xs: Vec<f64> = points
        .iter()
        .map(|p| (p.timestamp - origin).num_milliseconds() as f64 / 1000.0)
        .collect();
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.value).sum::<f64>() / n;

    let (mut sxx, mut sxy) = (0.0, 0.0);
    for (x, p) in xs.iter().zip(points) {
        sxx += (x - mean_x).powi(2);
        sxy += (x - mean_x) * (p.value - mean_y);
    }
    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x, origin))
}

/// Projects `history` (ascending) six hours ahead in quarter-hour steps,
/// starting at `now` rounded down to the quarter hour. Empty when there is
/// not enough history to fit a line.
pub fn forecast(kind: SensorKind, history: &[SensorReading], now: DateTime<Utc>) -> Vec<ForecastPoint> {
    let Some(last) = history.last() else {
        return Vec::new();
    };

    let mut recent = match kind {
        SensorKind::Light => history,
        _ => {
            let since = last.timestamp - Duration::hours(FIT_WINDOW_HOURS);
            let first = history.partition_point(|r| r.timestamp < since);
            &history[first..]
        }
    };
    if !matches!(kind, SensorKind::NoiseLevel | SensorKind::Light) {
        let values: Vec<f64> = history.iter().map(|r| r.value).collect();
        if let Some(i) = last_turning_point(&values) {
            recent = &history[i..];
        }
    }

    let Some((slope, intercept, origin)) = fit(recent) else {
        return Vec::new();
    };

    let step = Duration::minutes(STEP_MINUTES);
    let start = now.duration_trunc(step).unwrap_or(now);
    (0..STEPS)
        .map(|i| {
            let timestamp = start + step * i as i32;
            let x = (timestamp - origin).num_milliseconds() as f64 / 1000.0;
            ForecastPoint { timestamp, value: (slope * x + intercept).max(0.0) }
        })
        .collect()
}
