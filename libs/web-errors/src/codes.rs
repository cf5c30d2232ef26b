//! Built-in error code taxonomy.
//!
//! Codes are short tokens whose first letter names the category:
//!
//! - `A` - application error
//! - `B` - business error
//! - `S` - system / framework error
//! - `E` - entity error
//!
//! Uniqueness is a convention only. Services extend the vocabulary through
//! [`crate::registry::ErrorRegistry::merge`], where a colliding code overrides
//! the previous label.

use heck::ToSnakeCase;
use http::StatusCode;

/// Category encoded in the first character of an error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeCategory {
    Application,
    Business,
    System,
    Entity,
}

impl CodeCategory {
    /// Parse the category prefix of `code`. Returns `None` for unknown prefixes.
    #[must_use]
    pub fn of(code: &str) -> Option<Self> {
        match code.chars().next()? {
            'A' => Some(Self::Application),
            'B' => Some(Self::Business),
            'S' => Some(Self::System),
            'E' => Some(Self::Entity),
            _ => None,
        }
    }

    #[must_use]
    pub const fn prefix(self) -> char {
        match self {
            Self::Application => 'A',
            Self::Business => 'B',
            Self::System => 'S',
            Self::Entity => 'E',
        }
    }
}

/// Framework-level codes every service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeCode {
    BadRequest,
    InvalidFormat,
    HttpMethodNotSupported,
    Forbidden,
    MethodArgumentNotValid,
    NoResourceFound,
    MethodNotAllowed,
    ConstraintViolation,
    OptimisticLock,
    NoHandler,
    Runtime,
    InternalServerError,
    BadGateway,
}

impl NativeCode {
    /// Every built-in code, in catalog seeding order.
    pub const ALL: [NativeCode; 13] = [
        Self::BadRequest,
        Self::InvalidFormat,
        Self::HttpMethodNotSupported,
        Self::Forbidden,
        Self::MethodArgumentNotValid,
        Self::NoResourceFound,
        Self::MethodNotAllowed,
        Self::ConstraintViolation,
        Self::OptimisticLock,
        Self::NoHandler,
        Self::Runtime,
        Self::InternalServerError,
        Self::BadGateway,
    ];

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::BadRequest => "S400",
            Self::InvalidFormat => "S401",
            Self::HttpMethodNotSupported => "S402",
            Self::Forbidden => "S403",
            Self::MethodArgumentNotValid => "S404",
            Self::NoResourceFound => "S405",
            Self::MethodNotAllowed => "S406",
            Self::ConstraintViolation => "S407",
            Self::OptimisticLock => "S409",
            Self::NoHandler => "S499",
            Self::Runtime => "S500",
            Self::InternalServerError => "S501",
            Self::BadGateway => "S502",
        }
    }

    /// Display label seeded into the catalog.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::InvalidFormat => "INVALID_FORMAT",
            Self::HttpMethodNotSupported => "HTTP_REQUEST_METHOD_NOT_SUPPORTED_EXCEPTION",
            Self::Forbidden => "FORBIDDEN",
            Self::MethodArgumentNotValid => "METHOD_ARGUMENT_NOT_VALID",
            Self::NoResourceFound => "NO_RESOURCE_FOUND_EXCEPTION",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::ConstraintViolation => "CONSTRAINT_VIOLATION",
            Self::OptimisticLock => "OPTIMISTIC_LOCK",
            Self::NoHandler => "NO_HANDLER",
            Self::Runtime => "RUNTIME",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
            Self::BadGateway => "BAD_GATEWAY",
        }
    }

    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::BadRequest | Self::InvalidFormat => StatusCode::BAD_REQUEST,
            Self::HttpMethodNotSupported | Self::MethodNotAllowed => {
                StatusCode::METHOD_NOT_ALLOWED
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::MethodArgumentNotValid | Self::NoResourceFound => StatusCode::NOT_FOUND,
            Self::OptimisticLock => StatusCode::CONFLICT,
            Self::ConstraintViolation
            | Self::NoHandler
            | Self::Runtime
            | Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadGateway => StatusCode::BAD_GATEWAY,
        }
    }

    /// Detail template; `{0}`, `{1}`, ... are positional placeholders.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidFormat => "Invalid format for (field: {0}, value: {1}, type: {2})",
            Self::MethodArgumentNotValid => "Validation failed for fields {0}",
            _ => "",
        }
    }

    /// Resolve a built-in code from its token, e.g. `"S401"`.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    /// Resolve a built-in code from a mixed-case failure type name.
    ///
    /// `NoResourceFoundException` becomes the key `no_resource_found_exception`,
    /// which is matched against the lowercased labels. Unmatched names map to
    /// [`NativeCode::InternalServerError`].
    #[must_use]
    pub fn from_type_name(type_name: &str) -> Self {
        let key = type_name.to_snake_case();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(&key))
            .unwrap_or(Self::InternalServerError)
    }
}

/// Substitute positional `{n}` placeholders in `template` in one left-to-right
/// pass. Substituted text is never rescanned; unknown placeholders stay as is.
pub(crate) fn format_template(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let arg = tail.find('}').and_then(|close| {
            let index = tail[1..close].parse::<usize>().ok()?;
            Some((*args.get(index)?, close))
        });
        match arg {
            Some((value, close)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
