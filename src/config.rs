use anyhow::Context;
use log::*;
use serde::Deserialize;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

const DEFAULT_INFLUX_PORT: u16 = 8086;
const DEFAULT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_REFRESH_SECS: usize = 60;
const DEFAULT_CONTENT_TYPE: &str = "application/json";

pub const CONFIG_ENV: &str = "SENSORBOARD_CONFIG";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct InfluxConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub dbname: String,
    pub ssl: bool,
    pub timeout_secs: u64,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: DEFAULT_INFLUX_PORT,
            username: String::new(),
            password: String::new(),
            dbname: "home_assistant".into(),
            ssl: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl InfluxConfig {
    pub fn base_url(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!("{scheme}://{host}:{port}", host = self.host, port = self.port)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// States endpoint; a sensor is addressed as `{url}/{sensor_id}`.
    pub url: String,
    pub token: String,
    pub content_type: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: "http://homeassistant.local:8123/api/states".into(),
            token: String::new(),
            content_type: DEFAULT_CONTENT_TYPE.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub influxdb: InfluxConfig,
    pub api: ApiConfig,
    pub refresh_secs: usize,
    pub sample_fallback: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            influxdb: InfluxConfig::default(),
            api: ApiConfig::default(),
            refresh_secs: DEFAULT_REFRESH_SECS,
            sample_fallback: false,
        }
    }
}

impl Config {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        info!("Reading secrets from {}", path.display());
        let raw = read_to_string(path).with_context(|| format!("failed to read secrets file '{}'", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid secrets file '{}'", path.display()))
    }

    /// Explicit path, then `$SENSORBOARD_CONFIG`, then `~/.config/sensorboard/secrets.json`.
    pub fn locate(explicit: Option<&str>) -> anyhow::Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        let home = std::env::var("HOME").context("neither SENSORBOARD_CONFIG nor HOME is set")?;
        Ok(PathBuf::from(format!("{home}/.config/sensorboard/secrets.json")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = Config::from_json(
            r#"{
                "influxdb": { "host": "db.local", "username": "reader", "password": "s3cret", "dbname": "ha" },
                "api": { "url": "http://ha.local:8123/api/states", "token": "abc" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.influxdb.port, 8086);
        assert_eq!(config.influxdb.base_url(), "http://db.local:8086");
        assert_eq!(config.api.content_type, "application/json");
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.refresh_secs, 60);
        assert!(!config.sample_fallback);
    }

    #[test]
    fn ssl_switches_scheme() {
        let config = Config::from_json(r#"{ "influxdb": { "host": "db", "port": 443, "ssl": true } }"#).unwrap();
        assert_eq!(config.influxdb.base_url(), "https://db:443");
    }

    #[test]
    fn malformed_file_is_rejected() {
        assert!(Config::from_json("{ \"influxdb\": 3 }").is_err());
    }

    #[test]
    fn explicit_path_wins() {
        let path = Config::locate(Some("/tmp/secrets.json")).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/secrets.json"));
    }
}
