//! Outbound classification: turn a [`Failure`] into a complete [`ProblemDocument`].
//!
//! Every failure is logged once at error level, then either enriched in place
//! (declared failures) or classified into `(code, status, detail, errors)` and
//! rendered. The resulting document always has a code, an `errors` list and
//! a `type` of the form `{origin}/errors/{code}` built from the current request.

use std::sync::Arc;

use chrono::Utc;
use http::StatusCode;

use crate::codes::{NativeCode, format_template};
use crate::config::ErrorsConfig;
use crate::context::RequestContext;
use crate::error::{FieldViolation, Failure, InvalidFormat};
use crate::problem::{BLANK_CODE, ProblemDocument, error_type_url};
use crate::registry::ErrorRegistry;

/// Detail for bodies that could not be read.
const UNREADABLE_DETAIL: &str = "Failed to read request";

/// Outcome of classifying a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub code: String,
    pub status: StatusCode,
    pub detail: Option<String>,
    pub errors: Vec<String>,
}

impl Classification {
    fn native(code: NativeCode) -> Self {
        Self {
            code: code.code().to_owned(),
            status: code.status(),
            detail: None,
            errors: Vec::new(),
        }
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        if !detail.is_empty() {
            self.detail = Some(detail);
        }
        self
    }

    fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }

    fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

/// Builds problem documents for one service.
#[derive(Clone)]
pub struct Decorator {
    registry: Arc<dyn ErrorRegistry>,
    service: String,
    runtime_status: StatusCode,
    expose_runtime_detail: bool,
}

impl Decorator {
    #[must_use]
    pub fn new(registry: Arc<dyn ErrorRegistry>, service: impl Into<String>) -> Self {
        Self {
            registry,
            service: service.into(),
            runtime_status: StatusCode::INTERNAL_SERVER_ERROR,
            expose_runtime_detail: false,
        }
    }

    #[must_use]
    pub fn from_config(cfg: &ErrorsConfig, registry: Arc<dyn ErrorRegistry>) -> Self {
        Self::new(registry, cfg.service_name.clone())
            .with_runtime_status(cfg.runtime_status())
            .with_runtime_detail(cfg.expose_runtime_detail)
    }

    /// Status for unrecognized failures (400 or 500 depending on policy).
    #[must_use]
    pub fn with_runtime_status(mut self, status: StatusCode) -> Self {
        self.runtime_status = status;
        self
    }

    #[must_use]
    pub fn with_runtime_detail(mut self, expose: bool) -> Self {
        self.expose_runtime_detail = expose;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<dyn ErrorRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service
    }

    /// Log `failure` and produce the response document for it.
    pub fn decorate(&self, failure: Failure, ctx: &RequestContext) -> ProblemDocument {
        log_raw_failure(&failure);

        match unwrap_declared(failure) {
            Failure::Declared(err) => self.enrich(err.into_problem(), ctx),
            other => {
                let c = self.classify(&other);
                let mut problem = ProblemDocument::new(c.status)
                    .with_title(self.registry.lookup(&c.code))
                    .with_errors(c.errors);
                problem.detail = c.detail;
                self.stamp(problem, c.code, ctx)
            }
        }
    }

    /// Restamp a document raised deliberately. The code is kept when present
    /// (otherwise `BLANK`); detail and errors are left as they are.
    pub fn enrich(&self, mut problem: ProblemDocument, ctx: &RequestContext) -> ProblemDocument {
        let code = problem
            .properties
            .code
            .take()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| BLANK_CODE.to_owned());
        if problem.title.is_empty() {
            problem.title = self.registry.lookup(&code);
        }
        self.stamp(problem, code, ctx)
    }

    /// Select code, status, detail and field errors for `failure`.
    #[must_use]
    pub fn classify(&self, failure: &Failure) -> Classification {
        match failure {
            Failure::Declared(err) => {
                let problem = err.problem();
                Classification {
                    code: problem.code().unwrap_or(BLANK_CODE).to_owned(),
                    status: problem.status,
                    detail: problem.detail.clone(),
                    errors: problem.properties.errors.clone(),
                }
            }
            Failure::InvalidFormat(f) => classify_invalid_format(f),
            Failure::Unreadable { cause, .. } => match cause.as_deref() {
                Some(inner) if is_specific(inner) => self.classify(inner),
                _ => Classification::native(NativeCode::BadRequest).with_detail(UNREADABLE_DETAIL),
            },
            Failure::FieldValidation(violations) => classify_field_validation(violations),
            Failure::ConstraintViolation(message) => {
                Classification::native(NativeCode::ConstraintViolation).with_detail(message.clone())
            }
            Failure::OptimisticLock(_) => Classification::native(NativeCode::OptimisticLock),
            Failure::BadRequest(detail) => {
                Classification::native(NativeCode::BadRequest).with_detail(detail.clone())
            }
            Failure::NotFound(detail) => {
                Classification::native(NativeCode::NoResourceFound).with_detail(detail.clone())
            }
            Failure::Forbidden(detail) => {
                Classification::native(NativeCode::Forbidden).with_detail(detail.clone())
            }
            Failure::MethodNotAllowed { method } => Classification::native(NativeCode::MethodNotAllowed)
                .with_detail(format!("Method '{method}' is not supported.")),
            Failure::ErrorResponse {
                type_name,
                status,
                detail,
            } => Classification::native(NativeCode::from_type_name(type_name))
                .with_status(*status)
                .with_detail(detail.clone().unwrap_or_default()),
            Failure::Runtime { message, .. } => {
                let c = Classification::native(NativeCode::Runtime).with_status(self.runtime_status);
                if self.expose_runtime_detail {
                    c.with_detail(message.clone())
                } else {
                    c
                }
            }
        }
    }

    fn stamp(
        &self,
        mut problem: ProblemDocument,
        code: String,
        ctx: &RequestContext,
    ) -> ProblemDocument {
        problem.type_url = error_type_url(ctx.base_url(), &code);
        problem.properties.service = (!self.service.is_empty()).then(|| self.service.clone());
        problem.properties.timestamp = Some(Utc::now());
        problem.properties.code = Some(code);
        if problem.instance.is_none() {
            problem.instance = ctx.instance().map(ToOwned::to_owned);
        }
        problem
    }
}

impl std::fmt::Debug for Decorator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decorator")
            .field("service", &self.service)
            .field("runtime_status", &self.runtime_status)
            .field("expose_runtime_detail", &self.expose_runtime_detail)
            .finish_non_exhaustive()
    }
}

/// Surface a declared failure wrapped as the cause of an unreadable body so it
/// is enriched with its own title and instance rather than reclassified.
fn unwrap_declared(failure: Failure) -> Failure {
    match failure {
        Failure::Unreadable {
            cause: Some(inner), ..
        } if contains_declared(&inner) => unwrap_declared(*inner),
        other => other,
    }
}

fn contains_declared(failure: &Failure) -> bool {
    match failure {
        Failure::Declared(_) => true,
        Failure::Unreadable {
            cause: Some(inner), ..
        } => contains_declared(inner),
        _ => false,
    }
}

/// A cause specific enough to win over the generic unreadable-body rule.
fn is_specific(failure: &Failure) -> bool {
    !matches!(failure, Failure::Runtime { .. })
}

fn classify_invalid_format(f: &InvalidFormat) -> Classification {
    let field = f.field_name();
    let target = f.target_type_name();
    let detail = format_template(
        NativeCode::InvalidFormat.message(),
        &[field, f.value.as_str(), target],
    );
    Classification::native(NativeCode::InvalidFormat)
        .with_detail(detail)
        .with_errors(vec![format!(
            "field:{field}, value:{}, type:{target}",
            f.value
        )])
}

fn classify_field_validation(violations: &[FieldViolation]) -> Classification {
    let params: Vec<String> = violations.iter().map(FieldViolation::formatted).collect();
    let joined = params
        .iter()
        .map(|p| format!("({p})"))
        .collect::<Vec<_>>()
        .join(";");
    Classification::native(NativeCode::MethodArgumentNotValid)
        .with_detail(format_template(
            NativeCode::MethodArgumentNotValid.message(),
            &[joined.as_str()],
        ))
        .with_errors(params)
}

fn log_raw_failure(failure: &Failure) {
    let kind = failure.kind_name();
    match failure.cause_name() {
        Some(cause) => tracing::error!(
            failure = kind,
            cause,
            cause_message = failure.cause_message(),
            error = %failure,
            "Raw failure: {cause}, {kind}"
        ),
        None => tracing::error!(failure = kind, error = %failure, "Raw failure: {kind}"),
    }
}
