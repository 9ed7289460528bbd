//! One-shot HTTP stub for exercising the accessors against canned responses.

use std::thread::{self, JoinHandle};
use tiny_http::{Header, Response, Server, StatusCode};

pub struct Recorded {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Serves exactly one request with `status` and `body`, returning the base
/// url and a handle yielding what the client sent.
pub fn serve_once(status: u16, body: &str) -> (String, JoinHandle<Recorded>) {
    let server = Server::http("127.0.0.1:0").expect("stub server binds");
    let addr = server.server_addr().to_ip().expect("stub listens on ip");
    let body = body.to_string();

    let handle = thread::spawn(move || {
        let request = server.recv().expect("stub receives a request");
        let recorded = Recorded {
            url: request.url().to_string(),
            headers: request
                .headers()
                .iter()
                .map(|h| (h.field.to_string(), h.value.to_string()))
                .collect(),
        };
        let content_type = Header::from_bytes("Content-Type", "application/json").unwrap();
        let _ = request.respond(
            Response::from_string(body)
                .with_status_code(StatusCode(status))
                .with_header(content_type),
        );
        recorded
    });

    (format!("http://{addr}"), handle)
}

/// Port with nothing listening, for asserting no request was attempted.
pub fn dead_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}
