use core::time::Duration;
use log::*;
use reqwest::blocking::{Client, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{StatusCode, Url};

use super::parsing::{parse_state, parse_states};
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::reading::{SensorId, SensorReading};
use crate::source::LiveSource;

pub struct HomeAssistant {
    client: Client,
    url: Url,
    authorization: String,
    content_type: String,
}

/// Home Assistant long-lived tokens are bearer tokens; a value that already
/// carries a scheme is sent as-is.
fn authorization_value(token: &str) -> String {
    if token.contains(' ') {
        token.to_string()
    } else {
        format!("Bearer {token}")
    }
}

impl HomeAssistant {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let url = Url::parse(config.url.trim_end_matches('/'))
            .map_err(|err| Error::Connection(format!("bad api url '{}': {err}", config.url)))?;
        Ok(HomeAssistant {
            client,
            url,
            authorization: authorization_value(&config.token),
            content_type: config.content_type.clone(),
        })
    }

    fn get(&self, url: Url) -> Result<Response> {
        debug!("GET {url}");
        Ok(self
            .client
            .get(url)
            .header(AUTHORIZATION, &self.authorization)
            .header(CONTENT_TYPE, &self.content_type)
            .send()?)
    }

    fn check_auth(status: StatusCode) -> Result<()> {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Auth(format!("api answered {status}"))),
            _ => Ok(()),
        }
    }

    pub fn latest(&self, sensor_id: &SensorId) -> Result<SensorReading> {
        if sensor_id.is_empty() || sensor_id.as_str().contains('/') {
            return Err(Error::NotFound(sensor_id.clone()));
        }

        let mut url = self.url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Connection(format!("api url {} cannot take a path", self.url)))?
            .push(sensor_id.as_str());

        let response = self.get(url)?;
        let status = response.status();
        Self::check_auth(status)?;
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(sensor_id.clone()));
        }
        if !status.is_success() {
            return Err(Error::Connection(format!("api answered {status}")));
        }
        let reading = parse_state(&response.text()?)?;
        if reading.sensor_id != *sensor_id {
            warn!("Asked for {sensor_id}, api answered with {}", reading.sensor_id);
            return Err(Error::NotFound(sensor_id.clone()));
        }
        Ok(reading)
    }

    pub fn all_latest(&self, prefix: &str) -> Result<Vec<SensorReading>> {
        let response = self.get(self.url.clone())?;
        let status = response.status();
        Self::check_auth(status)?;
        if !status.is_success() {
            return Err(Error::Connection(format!("api answered {status}")));
        }
        parse_states(&response.text()?, prefix)
    }
}

impl LiveSource for HomeAssistant {
    fn latest(&self, sensor_id: &SensorId) -> Result<SensorReading> {
        HomeAssistant::latest(self, sensor_id)
    }

    fn all_latest(&self, prefix: &str) -> Result<Vec<SensorReading>> {
        HomeAssistant::all_latest(self, prefix)
    }
}
