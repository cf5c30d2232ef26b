//! Failure taxonomy.
//!
//! [`WebError`] is a failure raised deliberately with a known code; it owns
//! the [`ProblemDocument`] that will be sent back. [`Failure`] is the closed
//! set of everything the decorator knows how to classify.

use http::StatusCode;
use serde_json::error::Category;

use crate::codes::NativeCode;
use crate::problem::ProblemDocument;

/// Kind name used when a format failure carries no target type.
const INVALID_FORMAT_KIND: &str = "InvalidFormat";

/// Kind reported for causes whose type cannot be recovered.
const OPAQUE_ERROR_KIND: &str = "Error";

/// Field name used when a format failure carries no path.
const UNKNOWN_FIELD: &str = "unknown";

/// A declared failure carrying its own problem document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", self.message())]
pub struct WebError {
    problem: ProblemDocument,
}

impl WebError {
    /// Failure with an explicit status, code and detail message.
    #[must_use]
    pub fn new(status: StatusCode, code: impl Into<String>, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let mut problem = ProblemDocument::new(status).with_code(code);
        if !detail.is_empty() {
            problem.detail = Some(detail);
        }
        Self { problem }
    }

    /// Failure pre-bound to a built-in code, its status and message template.
    #[must_use]
    pub fn from_native(code: NativeCode) -> Self {
        Self::new(code.status(), code.code(), code.message())
    }

    #[must_use]
    pub fn from_problem(problem: ProblemDocument) -> Self {
        Self { problem }
    }

    /// `Resource with {key}={value} not found`, reported as a bad request.
    #[must_use]
    pub fn resource_not_found(code: &str, key: &str, value: &str) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            code,
            format!("Resource with {key}={value} not found"),
        )
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.problem.title = title.into();
        self
    }

    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.problem.properties.service = Some(service.into());
        self
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.problem.properties.errors = errors;
        self
    }

    #[must_use]
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.problem.instance = Some(instance.into());
        self
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.problem.status
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.problem.code()
    }

    #[must_use]
    pub fn problem(&self) -> &ProblemDocument {
        &self.problem
    }

    pub fn problem_mut(&mut self) -> &mut ProblemDocument {
        &mut self.problem
    }

    pub fn into_problem(self) -> ProblemDocument {
        self.problem
    }

    /// Detail when present, otherwise the title.
    #[must_use]
    pub fn message(&self) -> &str {
        self.problem
            .detail
            .as_deref()
            .unwrap_or(self.problem.title.as_str())
    }
}

impl From<NativeCode> for WebError {
    fn from(code: NativeCode) -> Self {
        Self::from_native(code)
    }
}

/// A value that could not be converted to its target type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidFormat {
    /// Simple name of the target type, e.g. `Integer`.
    pub target_type: Option<String>,
    /// The offending value as received.
    pub value: String,
    /// Path to the offending field, outermost first.
    pub path: Vec<String>,
}

impl InvalidFormat {
    #[must_use]
    pub fn new(target_type: impl Into<String>, value: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            target_type: Some(target_type.into()),
            value: value.into(),
            path: vec![field.into()],
        }
    }

    /// First path segment, or `unknown`.
    #[must_use]
    pub fn field_name(&self) -> &str {
        self.path.first().map_or(UNKNOWN_FIELD, String::as_str)
    }

    #[must_use]
    pub fn target_type_name(&self) -> &str {
        self.target_type.as_deref().unwrap_or(INVALID_FORMAT_KIND)
    }

    /// Recover the offending value, expected type and field path from a
    /// deserializer data error such as
    /// `age: invalid type: string "abc", expected i32 at line 1 column 12`.
    ///
    /// Returns `None` for data errors that are not about a value's type or
    /// shape (e.g. `missing field`).
    #[must_use]
    pub fn from_data_error(message: &str) -> Option<Self> {
        let message = message
            .split_once(DATA_ERROR_PREFIX)
            .map_or(message, |(_, rest)| rest);

        let (at, marker) = [INVALID_TYPE, INVALID_VALUE]
            .into_iter()
            .filter_map(|m| message.find(m).map(|i| (i, m)))
            .min_by_key(|(i, _)| *i)?;

        let (unexpected, expected) = message[at + marker.len()..].split_once(EXPECTED)?;
        let expected = expected
            .rfind(POSITION)
            .map_or(expected, |i| &expected[..i]);

        Some(Self {
            target_type: Some(expected.trim().to_owned()).filter(|t| !t.is_empty()),
            value: unexpected_value(unexpected.trim()),
            path: field_path(message[..at].trim_end().trim_end_matches(':')),
        })
    }
}

const DATA_ERROR_PREFIX: &str = "target type: ";
const INVALID_TYPE: &str = "invalid type: ";
const INVALID_VALUE: &str = "invalid value: ";
const EXPECTED: &str = ", expected ";
const POSITION: &str = " at line ";

/// `string "abc"` -> `abc`, ``integer `5` `` -> `5`, anything else verbatim.
fn unexpected_value(unexpected: &str) -> String {
    if let Some(quoted) = unexpected.strip_prefix("string ") {
        return quoted
            .strip_prefix('"')
            .and_then(|q| q.strip_suffix('"'))
            .unwrap_or(quoted)
            .to_owned();
    }
    match unexpected.split('`').nth(1) {
        Some(inner) => inner.to_owned(),
        None => unexpected.to_owned(),
    }
}

/// `user.tags[0]` -> `["user", "tags", "0"]`; anything that does not look
/// like a path yields no segments.
fn field_path(raw: &str) -> Vec<String> {
    if raw.is_empty() || raw == "." || raw.contains(char::is_whitespace) {
        return Vec::new();
    }
    raw.split(['.', '['])
        .map(|seg| seg.trim_end_matches(']'))
        .filter(|seg| !seg.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// One field error produced by a validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub object: String,
    pub field: String,
    /// Validator message code, e.g. `NotBlank`.
    pub code: String,
}

impl FieldViolation {
    #[must_use]
    pub fn new(object: impl Into<String>, field: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            field: field.into(),
            code: code.into(),
        }
    }

    /// `object:<obj>, field:<field>, message:<code>`
    #[must_use]
    pub fn formatted(&self) -> String {
        format!(
            "object:{}, field:{}, message:{}",
            self.object, self.field, self.code
        )
    }
}

/// Everything that can reach the error boundary of a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Failure {
    /// Raised deliberately with a known code.
    #[error(transparent)]
    Declared(#[from] WebError),

    #[error("cannot convert '{}' to {}", .0.value, .0.target_type_name())]
    InvalidFormat(InvalidFormat),

    /// Request body could not be read; the cause, when known, is more specific.
    #[error("unreadable request body: {message}")]
    Unreadable {
        message: String,
        #[source]
        cause: Option<Box<Failure>>,
    },

    #[error("validation failed for {} field(s)", .0.len())]
    FieldValidation(Vec<FieldViolation>),

    #[error("{0}")]
    ConstraintViolation(String),

    #[error("optimistic lock conflict: {0}")]
    OptimisticLock(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("method '{method}' is not allowed")]
    MethodNotAllowed { method: String },

    /// Framework error that documents its own status but carries no code.
    #[error("{type_name}")]
    ErrorResponse {
        type_name: String,
        status: StatusCode,
        detail: Option<String>,
    },

    /// Anything unrecognized.
    #[error("{message}")]
    Runtime {
        type_name: String,
        message: String,
        /// Kind of the immediate cause, e.g. `ParseIntError`.
        cause: Option<String>,
        cause_message: Option<String>,
    },
}

impl Failure {
    /// Unreadable body, with the format failure behind it when one was recovered.
    #[must_use]
    pub fn unreadable(message: impl Into<String>, cause: Option<InvalidFormat>) -> Self {
        Self::Unreadable {
            message: message.into(),
            cause: cause.map(|f| Box::new(Self::InvalidFormat(f))),
        }
    }

    /// Wrap an arbitrary error as an unrecognized failure.
    #[must_use]
    pub fn runtime<E>(err: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let source = err.source();
        Self::Runtime {
            type_name: short_type_name::<E>().to_owned(),
            message: err.to_string(),
            cause: source.map(error_kind),
            cause_message: source.map(ToString::to_string),
        }
    }

    /// Name of the failure kind, as logged at the boundary.
    #[must_use]
    pub fn kind_name(&self) -> &str {
        match self {
            Self::Declared(_) => "WebError",
            Self::InvalidFormat(_) => INVALID_FORMAT_KIND,
            Self::Unreadable { .. } => "Unreadable",
            Self::FieldValidation(_) => "FieldValidation",
            Self::ConstraintViolation(_) => "ConstraintViolation",
            Self::OptimisticLock(_) => "OptimisticLock",
            Self::BadRequest(_) => "BadRequest",
            Self::NotFound(_) => "NotFound",
            Self::Forbidden(_) => "Forbidden",
            Self::MethodNotAllowed { .. } => "MethodNotAllowed",
            Self::ErrorResponse { type_name, .. } | Self::Runtime { type_name, .. } => {
                type_name.as_str()
            }
        }
    }

    /// Message of the immediate cause, when the failure records one.
    #[must_use]
    pub fn cause_message(&self) -> Option<String> {
        match self {
            Self::Unreadable { cause, .. } => cause.as_deref().map(ToString::to_string),
            Self::Runtime { cause_message, .. } => cause_message.clone(),
            _ => None,
        }
    }

    /// Kind of the immediate cause, when the failure records one.
    #[must_use]
    pub fn cause_name(&self) -> Option<&str> {
        match self {
            Self::Unreadable { cause, .. } => cause.as_deref().map(Failure::kind_name),
            Self::Runtime { cause, .. } => cause.as_deref(),
            _ => None,
        }
    }
}

impl From<InvalidFormat> for Failure {
    fn from(value: InvalidFormat) -> Self {
        Self::InvalidFormat(value)
    }
}

impl From<anyhow::Error> for Failure {
    fn from(err: anyhow::Error) -> Self {
        let source = err.chain().nth(1);
        Self::Runtime {
            type_name: "anyhow::Error".to_owned(),
            message: err.to_string(),
            cause: source.map(error_kind),
            cause_message: source.map(ToString::to_string),
        }
    }
}

impl From<serde_json::Error> for Failure {
    fn from(err: serde_json::Error) -> Self {
        let message = err.to_string();
        let cause = if err.classify() == Category::Data {
            InvalidFormat::from_data_error(&message)
        } else {
            None
        };
        Self::unreadable(message, cause)
    }
}

/// Kind of a type-erased error, read from the leading identifier of its
/// `Debug` output (`ParseIntError { kind: InvalidDigit }` -> `ParseIntError`).
#[allow(clippy::use_debug)] // the concrete type is only visible through Debug
fn error_kind(err: &(dyn std::error::Error + 'static)) -> String {
    let debug = format!("{err:?}");
    let name: String = debug
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if name.starts_with(|c: char| c.is_ascii_uppercase()) {
        name
    } else {
        OPAQUE_ERROR_KIND.to_owned()
    }
}

/// Last path segment of a type name, without generic arguments.
fn short_type_name<E: ?Sized>() -> &'static str {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
