//! Client side: rebuild a local [`WebError`] from a remote service's error response.
//!
//! Translation never fails. An unreadable body falls back to the built-in
//! code of the response status; a status outside the handled set falls back
//! to `NO_HANDLER` (`S499`).

use std::sync::Arc;

use chrono::Utc;
use http::StatusCode;
use serde_json::{Map, Value};

use crate::codes::NativeCode;
use crate::error::WebError;
use crate::problem::ProblemDocument;
use crate::registry::ErrorRegistry;

const FIELD_TYPE: &str = "type";
const FIELD_TITLE: &str = "title";
const FIELD_DETAIL: &str = "detail";
const FIELD_INSTANCE: &str = "instance";
const FIELD_PROPERTIES: &str = "properties";
const FIELD_CODE: &str = "code";
const FIELD_SERVICE: &str = "service";
const FIELD_ERRORS: &str = "errors";

type JsonObject = Map<String, Value>;

/// Built-in code used when a response with `status` carries no usable body.
/// `None` for statuses this translator does not handle.
#[must_use]
pub fn fallback_code(status: StatusCode) -> Option<NativeCode> {
    match status {
        StatusCode::NOT_FOUND => Some(NativeCode::NoResourceFound),
        StatusCode::BAD_REQUEST => Some(NativeCode::BadRequest),
        StatusCode::INTERNAL_SERVER_ERROR => Some(NativeCode::InternalServerError),
        StatusCode::METHOD_NOT_ALLOWED => Some(NativeCode::MethodNotAllowed),
        StatusCode::FORBIDDEN => Some(NativeCode::Forbidden),
        _ => None,
    }
}

/// Translates remote problem documents using the shared code vocabulary.
#[derive(Clone)]
pub struct InboundTranslator {
    registry: Arc<dyn ErrorRegistry>,
}

impl InboundTranslator {
    #[must_use]
    pub fn new(registry: Arc<dyn ErrorRegistry>) -> Self {
        Self { registry }
    }

    /// Rebuild the failure behind a non-success response.
    ///
    /// `service` is the caller's own name, stamped on synthesized fallbacks.
    #[must_use]
    pub fn translate(&self, status: u16, body: &str, service: &str) -> WebError {
        let document = parse_json(body);
        tracing::debug!(payload = ?document, "Error payload");

        let Some((status, fallback)) = StatusCode::from_u16(status)
            .ok()
            .and_then(|s| fallback_code(s).map(|c| (s, c)))
        else {
            tracing::warn!(status, "No handler found for HTTP status, falling back to NO_HANDLER");
            return self.fallback(NativeCode::NoHandler, service);
        };

        match document {
            Some(doc) => self.rebuild(&doc, status, fallback),
            None => self.fallback(fallback, service),
        }
    }

    fn fallback(&self, code: NativeCode, service: &str) -> WebError {
        let mut err = WebError::from_native(code).with_title(self.registry.lookup(code.code()));
        if !service.is_empty() {
            err = err.with_service(service);
        }
        err.problem_mut().properties.timestamp = Some(Utc::now());
        err
    }

    fn rebuild(&self, doc: &JsonObject, status: StatusCode, fallback: NativeCode) -> WebError {
        let props = doc.get(FIELD_PROPERTIES).and_then(Value::as_object);
        let field = |key: &str| text(doc, key).or_else(|| props.and_then(|p| text(p, key)));

        let code = field(FIELD_CODE).unwrap_or_else(|| fallback.code().to_owned());
        let title = field(FIELD_TITLE).unwrap_or_else(|| self.registry.lookup(&code));

        let errors = string_list(doc, FIELD_ERRORS)
            .or_else(|| props.and_then(|p| string_list(p, FIELD_ERRORS)))
            .unwrap_or_default();
        tracing::trace!(?errors, "Collected errors");

        let mut problem = ProblemDocument::new(status)
            .with_title(title)
            .with_code(code)
            .with_errors(errors);
        if let Some(type_url) = parse_uri(field(FIELD_TYPE)) {
            problem.type_url = type_url;
        }
        problem.instance = parse_uri(field(FIELD_INSTANCE));
        problem.detail = field(FIELD_DETAIL);
        problem.properties.service = field(FIELD_SERVICE);
        problem.properties.timestamp = Some(Utc::now());

        WebError::from_problem(problem)
    }
}

impl std::fmt::Debug for InboundTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundTranslator").finish_non_exhaustive()
    }
}

/// Parse `body` as a JSON object; anything else is treated as absent.
fn parse_json(body: &str) -> Option<JsonObject> {
    if body.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(obj)) => Some(obj),
        Ok(other) => {
            tracing::warn!(kind = json_kind(&other), "Error body is not a JSON object");
            None
        }
        Err(err) => {
            tracing::warn!("Could not parse JSON body");
            tracing::trace!(%err, body, "JSON parsing error");
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Non-blank string member.
fn text(obj: &JsonObject, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(ToOwned::to_owned)
}

/// Non-empty array member flattened to strings, skipping blank entries.
fn string_list(obj: &JsonObject, key: &str) -> Option<Vec<String>> {
    let items = obj.get(key)?.as_array().filter(|a| !a.is_empty())?;
    Some(
        items
            .iter()
            .filter_map(|item| match item {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
            .filter(|s| !s.trim().is_empty())
            .collect(),
    )
}

/// Keep `raw` when it is an absolute URL or a valid relative reference.
fn parse_uri(raw: Option<String>) -> Option<String> {
    let raw = raw?;
    match url::Url::parse(&raw) {
        Ok(_) => Some(raw),
        Err(url::ParseError::RelativeUrlWithoutBase) if raw.parse::<http::Uri>().is_ok() => {
            Some(raw)
        }
        Err(err) => {
            tracing::trace!(uri = %raw, %err, "Invalid URI");
            None
        }
    }
}
