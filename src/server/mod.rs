//! The HTTP server behind the dashboard's remote data
//!
//! A small blocking tiny_http server. Every response is JSON and carries
//! permissive CORS headers so the dashboard can be served from another origin.

pub mod routes;
pub mod state;

pub use state::ServerState;

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;

use tiny_http::{Header, Request, Response, Server};

use crate::error::{Error, Result};

pub struct MetricsServer {
    server: Arc<Server>,
    state: Arc<ServerState>,
}

impl MetricsServer {
    /// Bind to `addr`, e.g. `0.0.0.0:3001` or `127.0.0.1:0`
    pub fn bind(addr: &str, state: ServerState) -> Result<Self> {
        let server = Server::http(addr).map_err(|e| Error::Bind {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            server: Arc::new(server),
            state: Arc::new(state),
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serve requests until the server is unblocked
    pub fn run(&self) {
        for request in self.server.incoming_requests() {
            handle(&self.state, request);
        }
        log::info!("Metrics server stopped");
    }

    /// Serve on a background thread
    pub fn spawn(self) -> ServerHandle {
        let addr = self.local_addr();
        let server = Arc::clone(&self.server);
        let thread = std::thread::spawn(move || self.run());

        ServerHandle {
            server,
            addr,
            thread: Some(thread),
        }
    }
}

/// Running server; stopped on [`ServerHandle::shutdown`] or drop
pub struct ServerHandle {
    server: Arc<Server>,
    addr: Option<SocketAddr>,
    thread: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    /// `http://ip:port` of the running server
    pub fn base_url(&self) -> Option<String> {
        self.addr.map(|addr| format!("http://{}", addr))
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.server.unblock();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Metrics server thread panicked");
            }
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle(state: &ServerState, request: Request) {
    let method = request.method().clone();
    let url = request.url().to_string();
    let remote = request
        .remote_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "-".to_string());

    let reply = routes::route(state, &method, &url);
    let body = reply.body.map(|body| body.to_string()).unwrap_or_default();
    let length = body.len();

    let mut response = Response::from_string(body).with_status_code(reply.status);
    for header in default_headers() {
        response.add_header(header);
    }

    if let Err(e) = request.respond(response) {
        log::warn!("Failed to send response for {} {}: {}", method, url, e);
    }

    log::info!("{} \"{} {}\" {} {}", remote, method, url, reply.status, length);
}

fn default_headers() -> Vec<Header> {
    [
        ("Content-Type", "application/json; charset=utf-8"),
        ("Access-Control-Allow-Origin", "*"),
        ("Access-Control-Allow-Methods", "GET, OPTIONS"),
        ("Access-Control-Allow-Headers", "Content-Type"),
        ("Cross-Origin-Resource-Policy", "cross-origin"),
    ]
    .iter()
    .filter_map(|(name, value)| Header::from_bytes(name.as_bytes(), value.as_bytes()).ok())
    .collect()
}
