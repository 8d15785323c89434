//! HTTP helpers: headers, status mapping, server-sent event lines.

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use turnloop_core::AgentError;

/// JSON headers, with a bearer token when one is configured
pub fn bearer_headers(api_key: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(key) = api_key {
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {key}")) {
            headers.insert(AUTHORIZATION, value);
        }
    }
    headers
}

/// Map a non-success status to the gateway error taxonomy
pub fn status_to_error(status: StatusCode, body: &str) -> AgentError {
    let body = body.trim();
    match status.as_u16() {
        401 | 403 => AgentError::Authentication(format!("endpoint returned {status}: {body}")),
        429 => AgentError::Transport(format!("rate limited ({status}): {body}")),
        _ => AgentError::Transport(format!("endpoint returned {status}: {body}")),
    }
}

/// Map a client failure (connect, timeout, body read)
pub fn transport_error(err: &reqwest::Error) -> AgentError {
    if err.is_timeout() {
        AgentError::Transport(format!("request timed out: {err}"))
    } else {
        AgentError::Transport(err.to_string())
    }
}

/// One line of a server-sent event stream
#[derive(Debug, PartialEq, Eq)]
pub enum SseLine<'a> {
    Data(&'a str),
    Done,
    /// Blank lines, comments, `event:`/`id:` fields
    Ignored,
}

pub fn parse_sse_line(line: &str) -> SseLine<'_> {
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Ignored;
    };
    match data.trim() {
        "[DONE]" => SseLine::Done,
        "" => SseLine::Ignored,
        data => SseLine::Data(data),
    }
}
