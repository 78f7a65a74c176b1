//! HTTP surface of the correlation service.
//!
//! A small hand-routed HTTP/1 server exposing the four boundary
//! operations plus a health probe. Domain errors map onto HTTP statuses:
//! `NotFound` → 404, `AlreadyConfirmed` → 409, storage failures → 500.
//!
//! | Route | Operation |
//! |---|---|
//! | `POST /log_access` | record one bridge scan report |
//! | `GET /pending_access` | the unresolved access at the door, if any |
//! | `POST /confirm_room` | resolve a pending access to a room |
//! | `GET /users/{id}/rooms` | rooms the user may be confirmed into |
//! | `GET /health` | liveness + database probe |

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::connection::Database;
use crate::error::{StorageError, StorageResult};
use crate::window::{AccessReport, AccessWindow};

/// Shared state for request handlers.
pub struct ApiState {
    pub window: AccessWindow,
    pub db: Database,
}

/// Bind `addr` and serve API requests until the process exits.
///
/// # Errors
/// Returns an error if the listener cannot bind; individual connection
/// failures are logged and do not stop the server.
pub async fn serve(addr: SocketAddr, state: Arc<ApiState>) -> StorageResult<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| StorageError::Configuration(format!("Cannot bind {addr}: {e}")))?;
    info!(%addr, "API listening");
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Accept failed");
                continue;
            }
        };
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| {
                let state = Arc::clone(&state);
                async move { handle(req, state).await }
            });
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!(%peer, error = %e, "Connection ended");
            }
        });
    }
}

async fn handle(
    req: Request<Incoming>,
    state: Arc<ApiState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(%method, %path, error = %e, "Unreadable request body");
            return Ok(error_response(
                StatusCode::BAD_REQUEST,
                "unreadable request body",
            ));
        }
    };
    debug!(%method, %path, "API request");
    Ok(route(&method, &path, &body, &state).await)
}

#[derive(Debug, Deserialize)]
struct ConfirmBody {
    access_id: i64,
    room_id: i64,
}

async fn route(
    method: &Method,
    path: &str,
    body: &Bytes,
    state: &ApiState,
) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::POST, "/log_access") => {
            let report = match parse_body::<AccessReport>(body) {
                Ok(r) => r,
                Err(resp) => return resp,
            };
            match state.window.record_access(report).await {
                Ok(event) => json_response(
                    StatusCode::OK,
                    &json!({ "access_id": event.id, "matched": event.matched }),
                ),
                Err(e) => error_to_response(&e),
            }
        }
        (&Method::GET, "/pending_access") => match state.window.lookup_pending_access().await {
            Ok(Some(pending)) => json_response(StatusCode::OK, &pending),
            Ok(None) => error_response(StatusCode::NOT_FOUND, "no pending access"),
            Err(e) => error_to_response(&e),
        },
        (&Method::POST, "/confirm_room") => {
            let body = match parse_body::<ConfirmBody>(body) {
                Ok(b) => b,
                Err(resp) => return resp,
            };
            match state.window.confirm_room(body.access_id, body.room_id).await {
                Ok(()) => json_response(
                    StatusCode::OK,
                    &json!({
                        "status": "confirmed",
                        "access_id": body.access_id,
                        "room_id": body.room_id,
                    }),
                ),
                Err(e) => error_to_response(&e),
            }
        }
        (&Method::GET, _) if path.starts_with("/users/") && path.ends_with("/rooms") => {
            let user_id = path
                .strip_prefix("/users/")
                .and_then(|rest| rest.strip_suffix("/rooms"))
                .and_then(|raw| raw.parse::<i64>().ok());
            match user_id {
                Some(user_id) => match state.window.list_authorized_rooms(user_id).await {
                    Ok(rooms) => json_response(
                        StatusCode::OK,
                        &json!({ "user_id": user_id, "rooms": rooms }),
                    ),
                    Err(e) => error_to_response(&e),
                },
                None => error_response(StatusCode::BAD_REQUEST, "invalid user id"),
            }
        }
        (&Method::GET, "/health") => match state.db.health_check().await {
            Ok(()) => json_response(
                StatusCode::OK,
                &json!({ "status": "ok", "database": true }),
            ),
            Err(e) => {
                warn!(error = %e, "Database probe failed");
                json_response(
                    StatusCode::SERVICE_UNAVAILABLE,
                    &json!({ "status": "degraded", "database": false }),
                )
            }
        },
        _ => error_response(StatusCode::NOT_FOUND, "no such route"),
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(
    bytes: &Bytes,
) -> Result<T, Response<Full<Bytes>>> {
    serde_json::from_slice(bytes).map_err(|e| {
        debug!(error = %e, "Invalid request body");
        error_response(StatusCode::BAD_REQUEST, &format!("invalid request body: {e}"))
    })
}

fn error_to_response(e: &StorageError) -> Response<Full<Bytes>> {
    let status = match e {
        StorageError::NotFound { .. } => StatusCode::NOT_FOUND,
        StorageError::AlreadyConfirmed { .. } => StatusCode::CONFLICT,
        StorageError::Database(_) | StorageError::Migration(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        StorageError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(%status, error = %e, "Request failed");
    error_response(status, &e.to_string())
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, &json!({ "error": message }))
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
