//! RFC 9457 problem document carried in every error response.
//!
//! Service-specific members live under `properties`:
//!
//! ```json
//! {
//!   "type": "https://api.example.com/errors/S401",
//!   "title": "INVALID_FORMAT",
//!   "detail": "Invalid format for (field: age, value: abc, type: Integer)",
//!   "properties": {
//!     "code": "S401",
//!     "service": "users",
//!     "timestamp": "2024-05-01T10:00:00Z",
//!     "errors": ["field:age, value:abc, type:Integer"]
//!   },
//!   "status": 400
//! }
//! ```

use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Content type for Problem Details as per RFC 9457.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// RFC 9457 default problem type.
pub const ABOUT_BLANK: &str = "about:blank";

/// Code stamped on documents that reach the decorator without one.
pub const BLANK_CODE: &str = "BLANK";

#[allow(clippy::trivially_copy_pass_by_ref)] // serde requires &T signature
fn serialize_status_code<S>(status: &StatusCode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u16(status.as_u16())
}

fn deserialize_status_code<'de, D>(deserializer: D) -> Result<StatusCode, D::Error>
where
    D: Deserializer<'de>,
{
    let code = u16::deserialize(deserializer)?;
    StatusCode::from_u16(code).map_err(serde::de::Error::custom)
}

fn about_blank() -> String {
    ABOUT_BLANK.to_owned()
}

/// `{base_url}/errors/{code}`
#[must_use]
pub fn error_type_url(base_url: &str, code: &str) -> String {
    format!("{}/errors/{code}", base_url.trim_end_matches('/'))
}

/// Extension members of a [`ProblemDocument`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemProperties {
    /// Stable error code, e.g. `S401`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Service that produced the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Field-level diagnostics; empty when there are none.
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Structured error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct ProblemDocument {
    /// URI reference identifying the problem type.
    #[serde(rename = "type", default = "about_blank")]
    pub type_url: String,
    /// Catalog label of the code.
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(default)]
    pub properties: ProblemProperties,
    #[serde(
        serialize_with = "serialize_status_code",
        deserialize_with = "deserialize_status_code"
    )]
    pub status: StatusCode,
}

impl ProblemDocument {
    pub fn new(status: StatusCode) -> Self {
        Self {
            type_url: about_blank(),
            title: String::new(),
            detail: None,
            instance: None,
            properties: ProblemProperties::default(),
            status,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_type(mut self, type_url: impl Into<String>) -> Self {
        self.type_url = type_url.into();
        self
    }

    pub fn with_instance(mut self, uri: impl Into<String>) -> Self {
        self.instance = Some(uri.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.properties.code = Some(code.into());
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.properties.service = Some(service.into());
        self
    }

    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.properties.errors = errors;
        self
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.properties.code.as_deref()
    }

    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.properties.errors
    }
}

/// Axum integration: make the document directly usable as a response
#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ProblemDocument {
    fn into_response(self) -> axum::response::Response {
        use axum::http::HeaderValue;

        let status = self.status;
        let mut resp = axum::Json(self).into_response();
        *resp.status_mut() = status;
        resp.headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
        );
        resp
    }
}
