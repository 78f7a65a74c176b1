//! Response-shape matching for the sensor line protocol.
//!
//! The wire carries no correlation IDs, so attribution is structural: while a
//! command is outstanding, an incoming line either has the shape that command
//! declared ([`ResponseKind`]) or it does not. Lines that do not match stay
//! unsolicited and flow to the event path; a line that was clearly meant as a
//! JSON answer but fails to parse is a corrupted response and surfaces as
//! such instead of being silently reclassified.
//!
//! One rule keeps scans and commands from stealing each other's lines: a JSON
//! object carrying an `"event"` key is *always* an event, even while a JSON
//! exchange is outstanding — the sensor may complete a finger scan at any
//! moment, including mid-command.

use crate::command::ResponseKind;
use serde_json::Value;

/// Longest accepted bare token response.
const MAX_TOKEN_LENGTH: usize = 32;

/// A response line successfully attributed to the outstanding command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResponse {
    /// Parsed JSON object answer.
    Json(Value),
    /// Bare token answer (`OK`, `READY`, ...).
    Token(String),
}

impl CommandResponse {
    /// The parsed JSON value, if this was a JSON answer.
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Token(_) => None,
        }
    }

    /// The `status` field of a JSON answer.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.as_json()?.get("status")?.as_str()
    }

    /// The bare token, if this was a token answer.
    #[must_use]
    pub fn as_token(&self) -> Option<&str> {
        match self {
            Self::Token(token) => Some(token),
            Self::Json(_) => None,
        }
    }
}

/// Outcome of matching one line against the outstanding command's shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseMatch {
    /// The line completes the outstanding exchange.
    Response(CommandResponse),
    /// The line was shaped like an answer but did not parse; the exchange
    /// fails with a malformed-response error and the line is dropped.
    Malformed,
    /// The line is unrelated to the outstanding exchange (event, banner).
    Unrelated,
}

/// Match a trimmed line against the expected response shape.
#[must_use]
pub fn match_response(kind: ResponseKind, line: &str) -> ResponseMatch {
    match kind {
        ResponseKind::Json => match_json(line),
        ResponseKind::Token => match_token(line),
        ResponseKind::None => ResponseMatch::Unrelated,
    }
}

fn match_json(line: &str) -> ResponseMatch {
    if !line.starts_with('{') {
        return ResponseMatch::Unrelated;
    }
    match serde_json::from_str::<Value>(line) {
        Ok(value) => {
            let is_event = value
                .as_object()
                .is_some_and(|obj| obj.contains_key("event"));
            if is_event {
                ResponseMatch::Unrelated
            } else if value.is_object() {
                ResponseMatch::Response(CommandResponse::Json(value))
            } else {
                // `{` prefix guarantees an object or a parse error; kept for
                // exhaustiveness.
                ResponseMatch::Malformed
            }
        }
        Err(_) => ResponseMatch::Malformed,
    }
}

fn match_token(line: &str) -> ResponseMatch {
    let token = line.trim();
    let shaped = !token.is_empty()
        && token.len() <= MAX_TOKEN_LENGTH
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if shaped {
        ResponseMatch::Response(CommandResponse::Token(token.to_string()))
    } else {
        ResponseMatch::Unrelated
    }
}
