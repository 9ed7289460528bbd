use chrono::{DateTime, Utc};
use log::*;
use serde::Deserialize;
use serde_aux::prelude::*;
use serde_json::{value::from_value, Value};

use crate::error::{Error, Result};
use crate::reading::{SensorId, SensorReading};

#[derive(Deserialize, Debug)]
struct EntityState {
    entity_id: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    state: f64,
    last_changed: DateTime<Utc>,
}

impl TryFrom<EntityState> for SensorReading {
    type Error = Error;

    fn try_from(entity: EntityState) -> Result<Self> {
        // "nan" and "inf" parse as floats but are not readings.
        if !entity.state.is_finite() {
            return Err(Error::Parse(format!("{} has non-finite state {}", entity.entity_id, entity.state)));
        }
        Ok(SensorReading {
            sensor_id: SensorId::new(entity.entity_id),
            timestamp: entity.last_changed,
            value: entity.state,
        })
    }
}

/// One entity body, as returned by `GET /api/states/<entity_id>`.
pub fn parse_state(body: &str) -> Result<SensorReading> {
    let entity = serde_json::from_str::<EntityState>(body)?;
    entity.try_into()
}

/// The full state list from `GET /api/states`, filtered by entity id prefix.
/// Entities without a numeric state ("unavailable", "unknown") are skipped.
pub fn parse_states(body: &str, prefix: &str) -> Result<Vec<SensorReading>> {
    let all_states = serde_json::from_str::<Vec<Value>>(body)?;

    let mut readings: Vec<SensorReading> = Vec::new();
    for raw in all_states {
        let Some(entity_id) = raw["entity_id"].as_str() else {
            return Err(Error::Parse(format!("entity without entity_id: {raw}")));
        };
        if !entity_id.starts_with(prefix) {
            continue;
        }
        let entity_id = entity_id.to_string();
        match from_value::<EntityState>(raw).map_err(Error::from).and_then(SensorReading::try_from) {
            Ok(reading) => readings.push(reading),
            Err(err) => warn!("Skipping {entity_id}: {err}"),
        }
    }
    readings.sort_by(|a, b| a.sensor_id.as_str().cmp(b.sensor_id.as_str()));
    Ok(readings)
}
