use crate::error::Result;
use crate::reading::{QueryWindow, SensorId, SensorReading};

/// Something that can answer "what did this sensor record in this window".
pub trait HistorySource {
    fn history(&self, sensor_id: &SensorId, window: &QueryWindow) -> Result<Vec<SensorReading>>;

    /// Same as [`HistorySource::history`] when the measurement is known up front.
    fn history_in(&self, _measurement: &str, sensor_id: &SensorId, window: &QueryWindow) -> Result<Vec<SensorReading>> {
        self.history(sensor_id, window)
    }
}

/// Something that can report the current state of a sensor.
pub trait LiveSource {
    fn latest(&self, sensor_id: &SensorId) -> Result<SensorReading>;

    /// Latest readings for every sensor whose id starts with `prefix`.
    fn all_latest(&self, prefix: &str) -> Result<Vec<SensorReading>>;
}
