//! HTTP front end for the [`Predictor`], served by `warp` on `tokio`.
//!
//! Endpoints:
//! - `GET /health` returns `{"ok":true}`
//! - `POST /predict` takes one JSON record and returns `{"calories":<float>}`
//! - `OPTIONS *` answers with 204; CORS preflights are handled by the CORS layer
//!
//! Every request shares the same read-only predictor through an [`Arc`].
//! Dispatch lives in [`route`], which knows nothing about sockets.

use crate::inference::{InferenceRecord, Predictor};
use bytes::Buf;
use futures_util::{pin_mut, Stream, TryStreamExt};
use serde_json::json;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use warp::http::{Method, StatusCode};
use warp::path::FullPath;
use warp::{Filter, Rejection, Reply};

const MAX_BODY_BYTES: usize = 64 * 1024;

/// A status code plus JSON body.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    fn json(status: u16, value: serde_json::Value) -> Self {
        Self {
            status,
            body: value.to_string(),
        }
    }

    fn empty(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }

    fn detail(status: u16, message: impl std::fmt::Display) -> Self {
        Self::json(status, json!({ "detail": message.to_string() }))
    }

    fn into_reply(self) -> warp::reply::Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if self.body.is_empty() {
            warp::reply::with_status(warp::reply(), status).into_response()
        } else {
            warp::reply::with_status(
                warp::reply::with_header(self.body, "content-type", "application/json"),
                status,
            )
            .into_response()
        }
    }
}

/// Dispatch one parsed request. Independent of any socket.
pub fn route(predictor: &Predictor, method: &str, path: &str, body: &[u8]) -> Response {
    let path = path.split('?').next().unwrap_or(path);
    match (method, path) {
        ("OPTIONS", _) => Response::empty(204),
        ("GET", "/health") => match serde_json::to_value(predictor.health()) {
            Ok(value) => Response::json(200, value),
            Err(e) => Response::detail(500, e),
        },
        ("POST", "/predict") => handle_predict(predictor, body),
        (_, "/health") | (_, "/predict") => Response::detail(405, "Method Not Allowed"),
        _ => Response::detail(404, "Not Found"),
    }
}

fn handle_predict(predictor: &Predictor, body: &[u8]) -> Response {
    let value: serde_json::Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "malformed JSON body");
            return Response::detail(400, format!("Invalid JSON: {}", e));
        }
    };
    let record: InferenceRecord = match serde_json::from_value(value) {
        Ok(record) => record,
        Err(e) => {
            warn!(error = %e, "request does not match the record schema");
            return Response::detail(422, e);
        }
    };

    match predictor.predict(&record) {
        Ok(prediction) => match serde_json::to_value(prediction) {
            Ok(value) => Response::json(200, value),
            Err(e) => Response::detail(500, e),
        },
        Err(e) if e.is_client_error() => {
            warn!(error = %e, "rejected prediction request");
            Response::detail(422, e)
        }
        Err(e) => {
            error!(error = %e, "prediction failed");
            Response::detail(500, e)
        }
    }
}

/// Collect a request body, giving up once it exceeds `limit` bytes.
///
/// Works for both `Content-Length` and chunked bodies. `Ok(None)` means
/// the body was too large.
async fn collect_body<S, B>(stream: S, limit: usize) -> Result<Option<Vec<u8>>, warp::Error>
where
    S: Stream<Item = Result<B, warp::Error>>,
    B: Buf,
{
    pin_mut!(stream);
    let mut body = Vec::new();
    while let Some(mut chunk) = stream.try_next().await? {
        if body.len() + chunk.remaining() > limit {
            return Ok(None);
        }
        while chunk.has_remaining() {
            let part = chunk.chunk();
            let n = part.len();
            body.extend_from_slice(part);
            chunk.advance(n);
        }
    }
    Ok(Some(body))
}

async fn handle_request<S, B>(
    method: Method,
    path: FullPath,
    content_length: Option<u64>,
    body: S,
    predictor: Arc<Predictor>,
) -> Result<warp::reply::Response, Infallible>
where
    S: Stream<Item = Result<B, warp::Error>> + Send,
    B: Buf + Send,
{
    let response = if content_length.map_or(false, |len| len > MAX_BODY_BYTES as u64) {
        Response::detail(413, "Payload Too Large")
    } else {
        match collect_body(body, MAX_BODY_BYTES).await {
            Ok(Some(body)) => route(&predictor, method.as_str(), path.as_str(), &body),
            Ok(None) => Response::detail(413, "Payload Too Large"),
            Err(e) => {
                debug!(error = %e, "failed to read request body");
                Response::detail(400, "Unreadable request body")
            }
        }
    };
    debug!(%method, path = path.as_str(), status = response.status, "handled request");
    Ok(response.into_reply())
}

/// The service's routes: everything goes through [`route`], wrapped in a
/// permissive CORS layer. A malformed `Content-Length` is rejected by warp.
pub fn routes(
    predictor: Arc<Predictor>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let predictor = warp::any().map(move || Arc::clone(&predictor));
    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(vec!["content-type"]);

    warp::method()
        .and(warp::path::full())
        .and(warp::header::optional::<u64>("content-length"))
        .and(warp::body::stream())
        .and(predictor)
        .and_then(handle_request)
        .with(cors)
}

/// Serves the shared predictor over HTTP.
pub struct PredictionServer {
    predictor: Arc<Predictor>,
}

impl PredictionServer {
    pub fn new(predictor: Arc<Predictor>) -> Self {
        Self { predictor }
    }

    /// Bind `addr` and return the bound address plus the future that serves
    /// until dropped. Port 0 picks a free port.
    pub fn bind(
        self,
        addr: SocketAddr,
    ) -> Result<(SocketAddr, impl Future<Output = ()> + Send + 'static), warp::Error> {
        warp::serve(routes(self.predictor)).try_bind_ephemeral(addr)
    }

    /// Bind and serve until the process stops.
    pub async fn run(self, addr: SocketAddr) -> Result<(), warp::Error> {
        let (bound, server) = self.bind(addr)?;
        info!(addr = %bound, "calories prediction service listening");
        server.await;
        Ok(())
    }
}
