use chrono::{DateTime, Utc};
use log::*;
use percent_encoding::percent_decode_str;
use reqwest::Url;
use serde::Serialize;
use std::fs::read_to_string;
use std::io;
use std::path::PathBuf;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use crate::catalog;
use crate::error::Error;
use crate::reading::{QueryWindow, SensorId};
use crate::source::{HistorySource, LiveSource};

/// History requests without bounds cover today from this hour (UTC).
pub const DAY_START_HOUR: u32 = 6;

pub struct Api {
    live: Box<dyn LiveSource>,
    history: Box<dyn HistorySource>,
    snapshot_fp: PathBuf,
    served_requests: usize,
}

type Reply = (u16, String);

#[derive(Serialize)]
struct Stats {
    served_requests: usize,
}

fn json<T: Serialize>(value: &T) -> Reply {
    match serde_json::to_string(value) {
        Ok(body) => (200, body),
        Err(err) => {
            error!("Could not convert response to JSON: {err}");
            error_reply(500, "internal error")
        }
    }
}

fn error_reply(status: u16, message: &str) -> Reply {
    (status, serde_json::json!({ "error": message }).to_string())
}

fn from_error(err: &Error) -> Reply {
    let status = match err {
        Error::NotFound(_) => 404,
        Error::InvalidRange { .. } | Error::Query(_) => 400,
        Error::Auth(_) | Error::Connection(_) | Error::Parse(_) => 502,
    };
    warn!("Request failed: {err}");
    error_reply(status, &err.to_string())
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|err| format!("bad timestamp '{raw}': {err}"))
}

/// Window from `start`/`end` query parameters; missing bounds default to
/// today's window ending now.
fn window_from_query(url: &Url, now: DateTime<Utc>) -> Result<QueryWindow, Reply> {
    let default = QueryWindow::since_today_at(DAY_START_HOUR, now);
    let (mut start, mut end) = (default.start, default.end);
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "start" => start = parse_time(&value).map_err(|msg| error_reply(400, &msg))?,
            "end" => end = parse_time(&value).map_err(|msg| error_reply(400, &msg))?,
            _ => {}
        }
    }
    QueryWindow::new(start, end).map_err(|err| from_error(&err))
}

impl Api {
    pub fn new(live: Box<dyn LiveSource>, history: Box<dyn HistorySource>, snapshot_fp: PathBuf) -> Self {
        Api { live, history, snapshot_fp, served_requests: 0 }
    }

    fn serve_snapshot(&self) -> Reply {
        match read_to_string(&self.snapshot_fp) {
            Ok(body) => (200, body),
            Err(_) => error_reply(404, "no snapshot yet"),
        }
    }

    fn serve_latest(&self, sensor_id: &SensorId) -> Reply {
        match self.live.latest(sensor_id) {
            Ok(reading) => json(&reading),
            Err(err) => from_error(&err),
        }
    }

    fn serve_history(&self, sensor_id: &SensorId, url: &Url) -> Reply {
        let window = match window_from_query(url, Utc::now()) {
            Ok(window) => window,
            Err(reply) => return reply,
        };
        let result = match catalog::SensorKind::from_entity_id(sensor_id) {
            Some((_, kind)) => self.history.history_in(kind.unit(), sensor_id, &window),
            None => self.history.history(sensor_id, &window),
        };
        match result {
            Ok(readings) => json(&readings),
            Err(err) => from_error(&err),
        }
    }

    pub fn route(&mut self, method: &Method, raw_url: &str) -> Reply {
        self.served_requests += 1;

        let Ok(url) = Url::parse(&format!("http://localhost{raw_url}")) else {
            return error_reply(400, "malformed url");
        };
        let decoded: Result<Vec<String>, _> = url
            .path_segments()
            .into_iter()
            .flatten()
            .map(|s| percent_decode_str(s).decode_utf8().map(|d| d.into_owned()))
            .collect();
        let Ok(decoded) = decoded else {
            return error_reply(400, "path is not valid utf-8");
        };
        let segments: Vec<&str> = decoded.iter().map(String::as_str).collect();

        match (method, segments.as_slice()) {
            (Method::Get, ["admin", "stats"]) => json(&Stats { served_requests: self.served_requests }),
            (Method::Get, ["api", "snapshot"]) => self.serve_snapshot(),
            (Method::Get, ["api", "sensors"]) => json(&catalog::listing()),
            (Method::Get, ["api", "sensors", id, "latest"]) => self.serve_latest(&SensorId::new(*id)),
            (Method::Get, ["api", "sensors", id, "history"]) => self.serve_history(&SensorId::new(*id), &url),
            _ => error_reply(404, "not found"),
        }
    }

    fn serve_request(&mut self, request: Request) -> io::Result<()> {
        info!("Received request! method: {:?}, url: {:?}", request.method(), request.url());

        let (status, body) = self.route(request.method(), request.url());
        let content_type_header = Header::from_bytes("Content-Type", "application/json; charset=utf-8")
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "bad content type header"))?;
        request.respond(
            Response::from_string(body)
                .with_status_code(StatusCode(status))
                .with_header(content_type_header),
        )
    }
}

pub fn start(address: &str, mut api: Api) -> anyhow::Result<()> {
    let server = Server::http(address)
        .map_err(|err| anyhow::anyhow!("could not start HTTP server at {address}: {err}"))?;

    info!("Listening at http://{address}/");

    for request in server.incoming_requests() {
        // don't stop on errors, keep serving
        if let Err(err) = api.serve_request(request) {
            error!("Could not serve the response: {err}");
        }
    }

    anyhow::bail!("the server socket has shutdown")
}
