use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::reading::{QueryWindow, SensorId, SensorReading};

#[derive(Deserialize, Debug)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    error: Option<String>,
}

#[derive(Deserialize, Debug)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    error: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Series {
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

fn column(series: &Series, name: &str) -> Result<usize> {
    series
        .columns
        .iter()
        .position(|c| c == name)
        .ok_or_else(|| Error::Parse(format!("series has no '{name}' column")))
}

fn parse_time(cell: &Value) -> Result<DateTime<Utc>> {
    let raw = cell.as_str().ok_or_else(|| Error::Parse(format!("time is not a string: {cell}")))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|err| Error::Parse(format!("bad timestamp '{raw}': {err}")))
}

fn parse_value(cell: &Value) -> Result<Option<f64>> {
    match cell {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(Error::Parse(format!("value is not numeric: '{s}'"))),
        },
        other => Err(Error::Parse(format!("value is not numeric: {other}"))),
    }
}

/// Turns a `/query` response body into readings for `sensor_id`, keeping only
/// those inside `window`, ascending, one per timestamp.
pub fn parse_readings(sensor_id: &SensorId, body: &str, window: &QueryWindow) -> Result<Vec<SensorReading>> {
    let response = serde_json::from_str::<QueryResponse>(body)?;
    if let Some(err) = response.error {
        return Err(Error::Query(err));
    }

    let mut readings = Vec::new();
    for statement in response.results {
        if let Some(err) = statement.error {
            return Err(Error::Query(err));
        }
        for series in &statement.series {
            let time_idx = column(series, "time")?;
            let value_idx = column(series, "value")?;
            for row in &series.values {
                let (Some(time), Some(value)) = (row.get(time_idx), row.get(value_idx)) else {
                    return Err(Error::Parse(format!("short row: {row:?}")));
                };
                let timestamp = parse_time(time)?;
                // Points without a value field come back as null.
                let Some(value) = parse_value(value)? else {
                    continue;
                };
                if window.contains(timestamp) {
                    readings.push(SensorReading { sensor_id: sensor_id.clone(), timestamp, value });
                }
            }
        }
    }

    readings.sort_by_key(|r| r.timestamp);
    readings.dedup_by_key(|r| r.timestamp);
    Ok(readings)
}

/// Best-effort message from an error response body.
pub(super) fn parse_error_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"].as_str().map(str::to_string))
        .unwrap_or_else(|| format!("store answered {status}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn id() -> SensorId {
        SensorId::from("sensor.multisensor_110_bme680_temperature")
    }

    fn window(from_h: u32, to_h: u32) -> QueryWindow {
        QueryWindow::new(
            Utc.with_ymd_and_hms(2024, 5, 1, from_h, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, to_h, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn keeps_window_and_sorts_ascending() {
        let body = r#"{"results":[{"statement_id":0,"series":[
            {"name":"°C","columns":["time","value"],"values":[
                ["2024-05-01T09:00:00Z",22.5],
                ["2024-05-01T05:59:59Z",19.0],
                ["2024-05-01T07:00:00Z",21.0],
                ["2024-05-01T12:00:01Z",23.0],
                ["2024-05-01T06:00:00Z",20.0]
            ]}]}]}"#;
        let w = window(6, 12);
        let readings = parse_readings(&id(), body, &w).unwrap();

        let values: Vec<_> = readings.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![20.0, 21.0, 22.5]);
        assert!(readings.iter().all(|r| w.contains(r.timestamp)));
        assert!(readings.windows(2).all(|p| p[0].timestamp < p[1].timestamp));
        assert!(readings.iter().all(|r| r.sensor_id == id()));
    }

    #[test]
    fn point_in_time_window_yields_at_most_one_reading() {
        let body = r#"{"results":[{"series":[
            {"name":"°C","columns":["time","value"],"values":[["2024-05-01T07:00:00Z",21.0]]},
            {"name":"%","columns":["time","value"],"values":[["2024-05-01T07:00:00Z",45.0],["2024-05-01T07:00:01Z",46.0]]}
        ]}]}"#;
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap();
        let readings = parse_readings(&id(), body, &QueryWindow::new(at, at).unwrap()).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].value, 21.0);

        let empty = parse_readings(&id(), body, &QueryWindow::new(at - chrono::Duration::hours(1), at - chrono::Duration::hours(1)).unwrap()).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn stored_point_comes_back_unchanged() {
        let body = r#"{"results":[{"series":[{"name":"hPa","columns":["time","value"],
            "values":[["2024-05-01T08:15:30.25Z",1013.37]]}]}]}"#;
        let readings = parse_readings(&id(), body, &window(8, 9)).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(
            readings[0].timestamp,
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 15, 30).unwrap() + chrono::Duration::milliseconds(250)
        );
        assert_eq!(readings[0].value, 1013.37);
    }

    #[test]
    fn no_series_is_an_empty_result() {
        let readings = parse_readings(&id(), r#"{"results":[{"statement_id":0}]}"#, &window(6, 12)).unwrap();
        assert!(readings.is_empty());
    }

    #[test]
    fn null_values_are_skipped_and_columns_found_by_name() {
        let body = r#"{"results":[{"series":[{"name":"lx","columns":["value","time"],
            "values":[[null,"2024-05-01T07:00:00Z"],["350","2024-05-01T08:00:00Z"]]}]}]}"#;
        let readings = parse_readings(&id(), body, &window(6, 12)).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].value, 350.0);
    }

    #[test]
    fn statement_error_is_a_query_error() {
        let body = r#"{"results":[{"statement_id":0,"error":"database not found: ha"}]}"#;
        let err = parse_readings(&id(), body, &window(6, 12)).unwrap_err();
        assert!(matches!(err, Error::Query(ref msg) if msg.contains("database not found")));
    }

    #[test]
    fn malformed_bodies_are_parse_errors() {
        for body in [
            "<html>bad gateway</html>",
            r#"{"results":[{"series":[{"name":"x","columns":["time"],"values":[["2024-05-01T07:00:00Z"]]}]}]}"#,
            r#"{"results":[{"series":[{"name":"x","columns":["time","value"],"values":[["yesterday",1.0]]}]}]}"#,
            r#"{"results":[{"series":[{"name":"x","columns":["time","value"],"values":[["2024-05-01T07:00:00Z","on"]]}]}]}"#,
            r#"{"results":[{"series":[{"name":"x","columns":["time","value"],"values":[["2024-05-01T07:00:00Z","NaN"]]}]}]}"#,
            r#"{"results":[{"series":[{"name":"x","columns":["time","value"],"values":[["2024-05-01T07:00:00Z","-inf"]]}]}]}"#,
        ] {
            let err = parse_readings(&id(), body, &window(6, 12)).unwrap_err();
            assert!(matches!(err, Error::Parse(_)), "{body} gave {err:?}");
        }
    }
}
