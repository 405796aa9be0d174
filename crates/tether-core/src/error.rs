use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::problem::ProblemDetails;

/// Title used when neither the server nor the transport provides one
pub const GENERIC_TITLE: &str = "An unexpected error occurred";

/// Fallback shown to end users when details are hidden
const USER_FALLBACK: &str = "Something went wrong. Please try again.";

/// Original error kept alongside an `ApiError` for debugging
pub type TransportSource = Arc<dyn std::error::Error + Send + Sync>;

/// The single error type surfaced by every API call
///
/// Built exactly once per failed request and immutable afterwards. The
/// original transport error is kept for debugging only.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    problem: ProblemDetails,
    status: u16,
    message: String,
    source: Option<TransportSource>,
}

impl ApiError {
    /// Build from a non-success HTTP response
    ///
    /// A JSON object body is read as a problem document; anything else is
    /// turned into a synthesized problem carrying the body text.
    pub fn from_response(status: u16, body: &[u8], source: Option<TransportSource>) -> Self {
        let fallback = status_message(status);

        if let Some(problem) = ProblemDetails::from_slice(body) {
            let message = problem
                .detail
                .clone()
                .or_else(|| problem.title.clone())
                .unwrap_or(fallback);

            return Self {
                problem,
                status,
                message,
                source,
            };
        }

        let text = String::from_utf8_lossy(body);
        let text = text.trim();

        let title = http::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .map_or_else(|| fallback.clone(), str::to_owned);
        let detail = if text.is_empty() { fallback.clone() } else { text.to_owned() };

        Self {
            problem: ProblemDetails {
                title: Some(title),
                status: Some(status),
                detail: Some(detail),
                ..ProblemDetails::default()
            },
            status,
            message: fallback,
            source,
        }
    }

    /// Build from a failure that produced no HTTP response
    ///
    /// Covers connection errors, timeouts, and anything else raised before
    /// a status line was read. The status is 0.
    pub fn from_transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let message = err.to_string();

        Self {
            problem: ProblemDetails {
                title: Some(message.clone()),
                status: Some(0),
                detail: Some(message.clone()),
                ..ProblemDetails::default()
            },
            status: 0,
            message,
            source: Some(Arc::new(err)),
        }
    }

    /// Build from an already parsed problem document
    pub fn from_problem(status: u16, problem: ProblemDetails) -> Self {
        let message = problem
            .detail
            .clone()
            .or_else(|| problem.title.clone())
            .unwrap_or_else(|| status_message(status));

        Self {
            problem,
            status,
            message,
            source: None,
        }
    }

    /// Build from a success response whose body could not be decoded
    pub fn decode<E>(status: u16, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let message = format!("failed to decode response body: {err}");

        Self {
            problem: ProblemDetails {
                title: Some("Invalid response body".to_owned()),
                status: Some(status),
                detail: Some(message.clone()),
                ..ProblemDetails::default()
            },
            status,
            message,
            source: Some(Arc::new(err)),
        }
    }

    /// HTTP status of the failed response, 0 when there was none
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Underlying problem document
    pub const fn problem(&self) -> &ProblemDetails {
        &self.problem
    }

    /// Message the error was constructed with
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Problem type URI, `about:blank` when absent
    pub fn problem_type(&self) -> &str {
        self.problem.type_or_default()
    }

    pub fn title(&self) -> &str {
        self.problem.title.as_deref().unwrap_or(GENERIC_TITLE)
    }

    pub fn detail(&self) -> &str {
        self.problem.detail.as_deref().unwrap_or(&self.message)
    }

    pub fn instance(&self) -> Option<&str> {
        self.problem.instance.as_deref()
    }

    /// Typed lookup of a problem extension member
    pub fn extension<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.problem.extension(key)
    }

    pub fn is_type(&self, uri: &str) -> bool {
        self.problem_type() == uri
    }

    pub const fn is_status(&self, code: u16) -> bool {
        self.status == code
    }

    /// Whether the status is in `400..500`
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Whether the status is in `500..600`
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }

    /// Flattened representation for structured logs
    ///
    /// All problem members (extensions included) merged with the computed
    /// accessors, so `type`, `title`, `status` and `detail` are always present.
    pub fn to_json(&self) -> Value {
        let mut fields = match serde_json::to_value(&self.problem) {
            Ok(Value::Object(fields)) => fields,
            _ => Map::new(),
        };

        fields.insert("type".to_owned(), Value::from(self.problem_type()));
        fields.insert("title".to_owned(), Value::from(self.title()));
        fields.insert("status".to_owned(), Value::from(self.status));
        fields.insert("detail".to_owned(), Value::from(self.detail()));
        if let Some(instance) = self.instance() {
            fields.insert("instance".to_owned(), Value::from(instance));
        }

        Value::Object(fields)
    }

    /// Text suitable for an error screen
    ///
    /// With `reveal_details` (development builds) the raw message is
    /// appended for debugging.
    pub fn user_message(&self, reveal_details: bool) -> String {
        if reveal_details {
            format!("{USER_FALLBACK} ({})", self.message)
        } else {
            USER_FALLBACK.to_owned()
        }
    }
}

fn status_message(status: u16) -> String {
    format!("request failed with status code {status}")
}
