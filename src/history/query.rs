use chrono::{DateTime, SecondsFormat, Utc};
use core::time::Duration;
use log::*;
use reqwest::blocking::Client;
use reqwest::StatusCode;

use super::parsing::{parse_error_message, parse_readings};
use crate::config::InfluxConfig;
use crate::error::{Error, Result};
use crate::reading::{QueryWindow, SensorId, SensorReading};
use crate::source::HistorySource;

pub struct InfluxHistory {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    dbname: String,
}

fn quote_literal(raw: &str) -> String {
    format!("'{}'", raw.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn quote_identifier(raw: &str) -> String {
    format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
}

fn format_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// InfluxQL for one sensor in a window; without a measurement every
/// measurement is searched.
pub fn build_statement(measurement: Option<&str>, sensor_id: &SensorId, window: &QueryWindow) -> String {
    let source = match measurement {
        Some(m) => quote_identifier(m),
        None => "/.*/".to_string(),
    };
    format!(
        "SELECT \"value\" FROM {source} WHERE \"entity_id\" = {tag} AND time >= {start} AND time <= {end} ORDER BY time ASC",
        tag = quote_literal(sensor_id.tag()),
        start = quote_literal(&format_time(window.start)),
        end = quote_literal(&format_time(window.end)),
    )
}

impl InfluxHistory {
    pub fn new(config: &InfluxConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(InfluxHistory {
            client,
            base_url: config.base_url(),
            username: config.username.clone(),
            password: config.password.clone(),
            dbname: config.dbname.clone(),
        })
    }

    pub fn readings(&self, sensor_id: &SensorId, window: &QueryWindow) -> Result<Vec<SensorReading>> {
        self.run(None, sensor_id, window)
    }

    pub fn readings_in(
        &self,
        measurement: &str,
        sensor_id: &SensorId,
        window: &QueryWindow,
    ) -> Result<Vec<SensorReading>> {
        self.run(Some(measurement), sensor_id, window)
    }

    fn run(&self, measurement: Option<&str>, sensor_id: &SensorId, window: &QueryWindow) -> Result<Vec<SensorReading>> {
        if sensor_id.is_empty() {
            return Err(Error::Query("sensor id must not be empty".into()));
        }
        window.validate()?;

        let statement = build_statement(measurement, sensor_id, window);
        debug!("InfluxQL: {statement}");

        let mut request = self
            .client
            .get(format!("{base}/query", base = self.base_url))
            .query(&[("db", self.dbname.as_str()), ("q", statement.as_str())]);
        if !self.username.is_empty() {
            request = request.basic_auth(&self.username, Some(&self.password));
        }

        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;

        match status {
            s if s.is_success() => parse_readings(sensor_id, &body, window),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Auth(parse_error_message(&body, status))),
            StatusCode::BAD_REQUEST => Err(Error::Query(parse_error_message(&body, status))),
            _ => Err(Error::Connection(parse_error_message(&body, status))),
        }
    }
}

impl HistorySource for InfluxHistory {
    fn history(&self, sensor_id: &SensorId, window: &QueryWindow) -> Result<Vec<SensorReading>> {
        self.readings(sensor_id, window)
    }

    fn history_in(&self, measurement: &str, sensor_id: &SensorId, window: &QueryWindow) -> Result<Vec<SensorReading>> {
        self.readings_in(measurement, sensor_id, window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{dead_port, serve_once};
    use chrono::TimeZone;

    fn window() -> QueryWindow {
        QueryWindow::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn config_for(base_url: &str) -> InfluxConfig {
        let port = base_url.rsplit(':').next().unwrap().parse().unwrap();
        InfluxConfig {
            host: "127.0.0.1".into(),
            port,
            username: "reader".into(),
            password: "s3cret".into(),
            dbname: "home_assistant".into(),
            ..Default::default()
        }
    }

    #[test]
    fn statement_escapes_tag_and_measurement() {
        let id = SensorId::from("sensor.it's");
        let statement = build_statement(Some("deg\"C"), &id, &window());
        assert_eq!(
            statement,
            "SELECT \"value\" FROM \"deg\\\"C\" WHERE \"entity_id\" = 'it\\'s' \
             AND time >= '2024-05-01T06:00:00Z' AND time <= '2024-05-01T12:00:00Z' ORDER BY time ASC"
        );
    }

    #[test]
    fn statement_searches_all_measurements_by_default() {
        let statement = build_statement(None, &SensorId::from("sensor.multisensor_110_scd30_co2"), &window());
        assert!(statement.starts_with("SELECT \"value\" FROM /.*/ WHERE \"entity_id\" = 'multisensor_110_scd30_co2'"));
    }

    #[test]
    fn reversed_window_fails_before_any_request() {
        let config = InfluxConfig { host: "127.0.0.1".into(), port: dead_port(), ..Default::default() };
        let history = InfluxHistory::new(&config).unwrap();
        let reversed = QueryWindow {
            start: Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        };
        let err = history.readings(&SensorId::from("sensor.x"), &reversed).unwrap_err();
        assert!(matches!(err, Error::InvalidRange { .. }), "got {err:?}");
    }

    #[test]
    fn empty_sensor_id_is_a_query_error() {
        let config = InfluxConfig { host: "127.0.0.1".into(), port: dead_port(), ..Default::default() };
        let history = InfluxHistory::new(&config).unwrap();
        let err = history.readings(&SensorId::from(""), &window()).unwrap_err();
        assert!(matches!(err, Error::Query(_)), "got {err:?}");
    }

    #[test]
    fn unreachable_store_is_a_connection_error() {
        let config = InfluxConfig { host: "127.0.0.1".into(), port: dead_port(), ..Default::default() };
        let history = InfluxHistory::new(&config).unwrap();
        let err = history.readings(&SensorId::from("sensor.x"), &window()).unwrap_err();
        assert!(matches!(err, Error::Connection(_)), "got {err:?}");
    }

    #[test]
    fn fetches_readings_with_db_and_credentials() {
        let body = r#"{"results":[{"statement_id":0,"series":[{"name":"ppm","columns":["time","value"],
            "values":[["2024-05-01T07:00:00Z",612.0],["2024-05-01T06:30:00Z",580.5]]}]}]}"#;
        let (base_url, stub) = serve_once(200, body);
        let history = InfluxHistory::new(&config_for(&base_url)).unwrap();

        let readings = history
            .readings_in("ppm", &SensorId::from("sensor.multisensor_110_scd30_co2"), &window())
            .unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].value, 580.5);
        assert_eq!(readings[1].value, 612.0);

        let recorded = stub.join().unwrap();
        assert!(recorded.url.starts_with("/query?"), "url was {}", recorded.url);
        assert!(recorded.url.contains("db=home_assistant"));
        assert!(recorded.url.contains("q=SELECT"));
        assert!(recorded.header("Authorization").unwrap().starts_with("Basic "));
    }

    #[test]
    fn rejected_query_is_a_query_error() {
        let (base_url, stub) = serve_once(400, r#"{"error":"error parsing query: found EOF"}"#);
        let history = InfluxHistory::new(&config_for(&base_url)).unwrap();
        let err = history.readings(&SensorId::from("sensor.x"), &window()).unwrap_err();
        match err {
            Error::Query(msg) => assert!(msg.contains("found EOF")),
            other => panic!("expected query error, got {other:?}"),
        }
        stub.join().unwrap();
    }

    #[test]
    fn rejected_credentials_are_an_auth_error() {
        let (base_url, stub) = serve_once(401, r#"{"error":"authorization failed"}"#);
        let history = InfluxHistory::new(&config_for(&base_url)).unwrap();
        let err = history.readings(&SensorId::from("sensor.x"), &window()).unwrap_err();
        assert!(matches!(err, Error::Auth(_)), "got {err:?}");
        stub.join().unwrap();
    }

    #[test]
    fn forbidden_user_is_an_auth_error() {
        let (base_url, stub) = serve_once(403, r#"{"error":"user is not authorized to read"}"#);
        let history = InfluxHistory::new(&config_for(&base_url)).unwrap();
        let err = history.readings(&SensorId::from("sensor.x"), &window()).unwrap_err();
        assert!(matches!(err, Error::Auth(ref msg) if msg.contains("not authorized")), "got {err:?}");
        stub.join().unwrap();
    }

    #[test]
    fn server_error_is_a_connection_error() {
        let (base_url, stub) = serve_once(503, "Service Unavailable");
        let history = InfluxHistory::new(&config_for(&base_url)).unwrap();
        let err = history.readings(&SensorId::from("sensor.x"), &window()).unwrap_err();
        assert!(matches!(err, Error::Connection(_)), "got {err:?}");
        stub.join().unwrap();
    }
}
