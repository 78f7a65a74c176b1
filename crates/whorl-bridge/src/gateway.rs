//! Operator-facing HTTP surface of the bridge.
//!
//! A small hand-routed HTTP/1 server: every route maps onto one session
//! operation, device JSON responses pass through verbatim, token responses
//! are wrapped as `{"status": <token>}`, and session errors map onto HTTP
//! statuses (`DeviceDisconnected` → 503, `Timeout` → 504, malformed device
//! traffic → 502, bad input → 400).
//!
//! | Route | Session operation |
//! |---|---|
//! | `POST /enroll` | enroll into `sensor_id` |
//! | `POST /delete` | delete `sensor_id` |
//! | `POST /wipe_all` | wipe the template library |
//! | `POST /extract/{id}` | stream the stored template out |
//! | `POST /upload_template` | stream a template into the buffer |
//! | `POST /scan` | capture and compare against the buffer |
//! | `POST /clear_temp` | drop temporary models |
//! | `POST /batch/start` | open a batch staging session |
//! | `POST /batch/upload` | stage one batch slot |
//! | `POST /batch/run` | one capture against all staged slots |
//! | `POST /batch/clear` | discard staged slots |
//! | `GET /health` | liveness + link state |

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
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use whorl_core::{Error, Result, SensorSlot};
use whorl_protocol::response::CommandResponse;
use whorl_protocol::template::{decode_hex, encode_hex};

use crate::dispatcher::SessionHandle;

/// Shared state for request handlers.
pub struct GatewayState {
    pub session: SessionHandle,
}

/// Bind `addr` and serve gateway requests until the process exits.
///
/// # Errors
/// Returns an error if the listener cannot bind; individual connection
/// failures are logged and do not stop the server.
pub async fn serve(addr: SocketAddr, state: Arc<GatewayState>) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Gateway listening");
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
    state: Arc<GatewayState>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
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
    debug!(%method, %path, "Gateway request");
    Ok(route(&method, &path, &body, &state).await)
}

#[derive(Debug, Deserialize)]
struct SlotBody {
    sensor_id: u8,
}

#[derive(Debug, Deserialize)]
struct UploadBody {
    sensor_id: u8,
    hex: String,
}

#[derive(Debug, Deserialize)]
struct BatchUploadBody {
    slot: u8,
    hex: String,
}

async fn route(
    method: &Method,
    path: &str,
    body: &Bytes,
    state: &GatewayState,
) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::POST, "/enroll") => {
            let body = match parse_body::<SlotBody>(body) {
                Ok(b) => b,
                Err(resp) => return resp,
            };
            match SensorSlot::new(body.sensor_id) {
                Ok(slot) => command_response(state.session.enroll(slot).await),
                Err(e) => error_to_response(&e),
            }
        }
        (&Method::POST, "/delete") => {
            let body = match parse_body::<SlotBody>(body) {
                Ok(b) => b,
                Err(resp) => return resp,
            };
            match SensorSlot::new(body.sensor_id) {
                Ok(slot) => command_response(state.session.delete(slot).await),
                Err(e) => error_to_response(&e),
            }
        }
        (&Method::POST, "/wipe_all") => command_response(state.session.delete_all().await),
        (&Method::POST, _) if path.starts_with("/extract/") => {
            let raw = &path["/extract/".len()..];
            match raw.parse::<SensorSlot>() {
                Ok(slot) => match state.session.extract_template(slot).await {
                    Ok(bytes) => json_response(
                        StatusCode::OK,
                        &json!({
                            "sensor_id": slot.as_u8(),
                            "template_hex": encode_hex(&bytes),
                        }),
                    ),
                    Err(e) => error_to_response(&e),
                },
                Err(e) => error_to_response(&e),
            }
        }
        (&Method::POST, "/upload_template") => {
            let body = match parse_body::<UploadBody>(body) {
                Ok(b) => b,
                Err(resp) => return resp,
            };
            let parsed = SensorSlot::new(body.sensor_id)
                .and_then(|slot| Ok((slot, decode_hex(&body.hex)?)));
            match parsed {
                Ok((slot, template)) => {
                    match state.session.upload_template(slot, template).await {
                        Ok(()) => json_response(StatusCode::OK, &json!({ "status": "ok" })),
                        Err(e) => error_to_response(&e),
                    }
                }
                Err(e) => error_to_response(&e),
            }
        }
        (&Method::POST, "/scan") => command_response(state.session.scan_and_compare().await),
        (&Method::POST, "/clear_temp") => {
            command_response(state.session.clear_temp_models().await)
        }
        (&Method::POST, "/batch/start") => command_response(state.session.begin_batch().await),
        (&Method::POST, "/batch/upload") => {
            let body = match parse_body::<BatchUploadBody>(body) {
                Ok(b) => b,
                Err(resp) => return resp,
            };
            let parsed =
                SensorSlot::new(body.slot).and_then(|slot| Ok((slot, decode_hex(&body.hex)?)));
            match parsed {
                Ok((slot, template)) => {
                    match state.session.stage_batch_template(slot, template).await {
                        Ok(()) => json_response(
                            StatusCode::OK,
                            &json!({ "status": "template_received", "slot": slot.as_u8() }),
                        ),
                        Err(e) => error_to_response(&e),
                    }
                }
                Err(e) => error_to_response(&e),
            }
        }
        (&Method::POST, "/batch/run") => command_response(state.session.run_batch_match().await),
        (&Method::POST, "/batch/clear") => command_response(state.session.clear_batch().await),
        (&Method::GET, "/health") => json_response(
            StatusCode::OK,
            &json!({
                "status": "ok",
                "serial_open": state.session.is_connected(),
            }),
        ),
        _ => error_response(StatusCode::NOT_FOUND, "no such route"),
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(
    bytes: &Bytes,
) -> std::result::Result<T, Response<Full<Bytes>>> {
    serde_json::from_slice(bytes).map_err(|e| {
        debug!(error = %e, "Invalid request body");
        error_response(StatusCode::BAD_REQUEST, &format!("invalid request body: {e}"))
    })
}

/// Render a completed exchange: device JSON passes through verbatim,
/// token responses wrap as `{"status": <token>}`.
fn command_response(outcome: Result<CommandResponse>) -> Response<Full<Bytes>> {
    match outcome {
        Ok(CommandResponse::Json(value)) => json_response(StatusCode::OK, &value),
        Ok(CommandResponse::Token(token)) => {
            json_response(StatusCode::OK, &json!({ "status": token }))
        }
        Err(e) => error_to_response(&e),
    }
}

fn error_to_response(e: &Error) -> Response<Full<Bytes>> {
    let status = match e {
        Error::DeviceDisconnected | Error::BackendUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        Error::MalformedResponse { .. } | Error::TransferFailed(_) => StatusCode::BAD_GATEWAY,
        Error::InvalidSlot(_) | Error::InvalidHex(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(%status, error = %e, "Request failed");
    error_response(status, &e.to_string())
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, &json!({ "error": message }))
}

fn json_response(status: StatusCode, value: &Value) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
