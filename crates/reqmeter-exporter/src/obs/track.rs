//! Request timing middleware.
//!
//! Runs as a route layer so the matched route template (`/users/:id`) is
//! available as the `uri` dimension instead of the raw path. Raw paths with
//! embedded ids never reach the recorder from here; the recorder's uri budget
//! is the second line of defense.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, MatchedPath, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use reqmeter_core::{HttpMetricsRecorder, Result};

use crate::app_state::AppState;

/// One completed request/response, as seen by the middleware.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub peer: SocketAddr,
    pub uri: String,
    pub method: String,
    pub status: StatusCode,
    pub elapsed: Duration,
    pub bytes_received: Option<u64>,
    pub bytes_sent: Option<u64>,
}

/// Push one exchange into the recorder. 5xx responses also count as errors.
pub fn record_exchange(recorder: &HttpMetricsRecorder, ex: &Exchange) -> Result<()> {
    recorder.record_response_time(&ex.peer, &ex.uri, &ex.method, ex.status.as_str(), ex.elapsed)?;
    if let Some(n) = ex.bytes_received {
        recorder.record_data_received(&ex.peer, &ex.uri, n)?;
    }
    if let Some(n) = ex.bytes_sent {
        recorder.record_data_sent(&ex.peer, &ex.uri, n)?;
    }
    if ex.status.is_server_error() {
        recorder.increment_errors_count(&ex.peer, &ex.uri)?;
    }
    Ok(())
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

pub async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().as_str().to_string();
    let uri = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string());
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let bytes_received = content_length(req.headers());

    let res = next.run(req).await;

    let (Some(peer), Some(uri)) = (peer, uri) else {
        tracing::debug!("no peer address or matched route on request; not recorded");
        return res;
    };
    let ex = Exchange {
        peer,
        uri,
        method,
        status: res.status(),
        elapsed: start.elapsed(),
        bytes_received,
        bytes_sent: content_length(res.headers()),
    };
    if let Err(e) = record_exchange(&state.recorder(), &ex) {
        tracing::warn!(
            code = e.code().as_str(),
            error = %e,
            uri = %ex.uri,
            "request metrics not recorded"
        );
    }
    res
}
