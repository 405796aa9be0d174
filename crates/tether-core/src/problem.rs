use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Problem type used when a document does not name one
pub const ABOUT_BLANK: &str = "about:blank";

/// Media type of an RFC 9457 problem document
pub const PROBLEM_JSON: &str = "application/problem+json";

/// `Accept` value sent on every request: a problem document or plain JSON
pub const ACCEPT_PROBLEM_OR_JSON: &str = "application/problem+json, application/json";

/// RFC 9457 Problem Details document
///
/// Standard members are typed; anything else the server sends is kept
/// in `extensions` in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemDetails {
    /// URI identifying the problem category
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub problem_type: Option<String>,
    /// Short human-readable summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// HTTP status code as reported by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Longer explanation of this occurrence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// URI identifying this occurrence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Problem-specific extension members
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

impl ProblemDetails {
    /// Build a problem from an arbitrary JSON value
    ///
    /// Returns `None` unless the value is an object. Standard members with
    /// the wrong JSON type are ignored rather than failing the whole
    /// document, as RFC 9457 asks of consumers.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(members) = value else {
            return None;
        };

        let mut problem = Self::default();

        for (key, value) in members {
            match key.as_str() {
                "type" => problem.problem_type = value.as_str().map(str::to_owned),
                "title" => problem.title = value.as_str().map(str::to_owned),
                "status" => problem.status = value.as_u64().and_then(|s| u16::try_from(s).ok()),
                "detail" => problem.detail = value.as_str().map(str::to_owned),
                "instance" => problem.instance = value.as_str().map(str::to_owned),
                _ => {
                    problem.extensions.insert(key, value);
                }
            }
        }

        Some(problem)
    }

    /// Parse a response body, returning `None` if it is not a JSON object
    pub fn from_slice(body: &[u8]) -> Option<Self> {
        serde_json::from_slice::<Value>(body).ok().and_then(Self::from_value)
    }

    /// Problem type, defaulting to `about:blank`
    pub fn type_or_default(&self) -> &str {
        self.problem_type.as_deref().filter(|t| !t.is_empty()).unwrap_or(ABOUT_BLANK)
    }

    /// Look up an extension member and deserialize it as `T`
    ///
    /// Returns `None` if the member is absent or has a different shape.
    pub fn extension<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.extensions.get(key).and_then(|value| T::deserialize(value).ok())
    }
}
