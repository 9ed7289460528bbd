use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;

/// Key naming one physical sensor in both the store and the live API,
/// e.g. `sensor.multisensor_110_scd30_co2`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorId(String);

impl SensorId {
    pub fn new(id: impl Into<String>) -> Self {
        SensorId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entity id without its `sensor.` domain, which is how the store tags points.
    pub fn tag(&self) -> &str {
        self.0.strip_prefix("sensor.").unwrap_or(&self.0)
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SensorId {
    fn from(id: &str) -> Self {
        SensorId::new(id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub sensor_id: SensorId,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct QueryWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl QueryWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, Error> {
        let window = QueryWindow { start, end };
        window.validate()?;
        Ok(window)
    }

    /// From `hour`:00 UTC of the current day until `now`. Before that hour
    /// the window starts at `now` and is empty.
    pub fn since_today_at(hour: u32, now: DateTime<Utc>) -> Self {
        let start = NaiveTime::from_hms_opt(hour.min(23), 0, 0)
            .map(|t| now.date_naive().and_time(t).and_utc())
            .unwrap_or(now);
        QueryWindow { start: start.min(now), end: now }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.start > self.end {
            return Err(Error::InvalidRange { start: self.start, end: self.end });
        }
        Ok(())
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}
