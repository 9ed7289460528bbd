//! Display-ready view of every room: current values, today's history,
//! deltas, warnings, forecasts and estimated occupancy.

use chrono::{DateTime, Utc};
use log::*;
use serde::Serialize;
use std::collections::HashMap;

use crate::catalog::{self, Room, SensorKind, ENTITY_PREFIX, ROOMS};
use crate::error::Result;
use crate::insights::{self, ForecastPoint, Warning};
use crate::reading::{QueryWindow, SensorId, SensorReading};
use crate::source::{HistorySource, LiveSource};

#[derive(Serialize, Debug)]
pub struct SensorPanel {
    pub kind: SensorKind,
    pub title: &'static str,
    pub unit: &'static str,
    pub entity_id: SensorId,
    pub current: Option<SensorReading>,
    /// Current value minus the last stored one.
    pub delta: Option<f64>,
    /// Whether that change moves the value further from the kind's ideal.
    pub drifting_from_ideal: Option<bool>,
    pub warning: Option<Warning>,
    /// Warning for the first forecast point, a quarter hour out.
    pub forecast_warning: Option<Warning>,
    pub history: Vec<SensorReading>,
    pub forecast: Vec<ForecastPoint>,
}

#[derive(Serialize, Debug)]
pub struct RoomPanel {
    pub device: &'static str,
    pub room: &'static str,
    pub volume_m3: f64,
    pub occupancy: Option<u32>,
    pub occupancy_warning: Option<Warning>,
    pub sensors: Vec<SensorPanel>,
}

#[derive(Serialize, Debug)]
pub struct Snapshot {
    pub generated_at: DateTime<Utc>,
    pub window: QueryWindow,
    pub rooms: Vec<RoomPanel>,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn drifting(kind: SensorKind, value: f64, delta: f64) -> bool {
    let ideal = kind.ideal();
    (value < ideal && delta < 0.0) || (value > ideal && delta > 0.0)
}

fn sensor_panel(
    room: &Room,
    kind: SensorKind,
    current: Option<SensorReading>,
    history: &dyn HistorySource,
    window: &QueryWindow,
    now: DateTime<Utc>,
) -> SensorPanel {
    let entity_id = catalog::entity_id(room, kind);
    let mut readings = history
        .history_in(kind.unit(), &entity_id, window)
        .unwrap_or_else(|err| {
            warn!("No history for {entity_id}: {err}");
            Vec::new()
        });
    readings.retain(|r| r.timestamp <= now);

    let delta = match (&current, readings.last()) {
        (Some(c), Some(last)) => Some(round2(c.value - last.value)),
        _ => None,
    };
    let drifting_from_ideal = match (&current, delta) {
        (Some(c), Some(d)) => Some(drifting(kind, c.value, d)),
        _ => None,
    };
    let warning = current.as_ref().and_then(|c| insights::check(kind, c.value));
    let forecast = insights::forecast(kind, &readings, now);
    let forecast_warning = forecast.first().and_then(|p| insights::check(kind, p.value));

    SensorPanel {
        kind,
        title: kind.title(),
        unit: kind.unit(),
        entity_id,
        current,
        delta,
        drifting_from_ideal,
        warning,
        forecast_warning,
        history: readings,
        forecast,
    }
}

/// One bulk live fetch plus one history query per catalog sensor. A failed
/// live fetch fails the snapshot; a failed history query only leaves that
/// sensor's history empty.
pub fn build(
    live: &dyn LiveSource,
    history: &dyn HistorySource,
    window: &QueryWindow,
    now: DateTime<Utc>,
) -> Result<Snapshot> {
    window.validate()?;
    let mut latest: HashMap<SensorId, SensorReading> = live
        .all_latest(ENTITY_PREFIX)?
        .into_iter()
        .map(|r| (r.sensor_id.clone(), r))
        .collect();
    info!("Live states for {} sensors", latest.len());

    let rooms = ROOMS
        .iter()
        .map(|room| {
            let sensors: Vec<SensorPanel> = SensorKind::ALL
                .into_iter()
                .map(|kind| {
                    let current = latest.remove(&catalog::entity_id(room, kind));
                    sensor_panel(room, kind, current, history, window, now)
                })
                .collect();

            let volume_m3 = room.volume_m3();
            let occupancy = sensors
                .iter()
                .find(|s| s.kind == SensorKind::Co2)
                .and_then(|s| s.current.as_ref())
                .map(|co2| insights::estimate_occupancy(co2.value, volume_m3));

            RoomPanel {
                device: room.device,
                room: room.name,
                volume_m3,
                occupancy,
                occupancy_warning: occupancy.and_then(insights::check_occupancy),
                sensors,
            }
        })
        .collect();

    Ok(Snapshot { generated_at: now, window: *window, rooms })
}
