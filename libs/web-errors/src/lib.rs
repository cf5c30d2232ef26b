//! Shared error taxonomy for HTTP services
//!
//! This crate turns failures raised while handling a request into RFC 9457
//! problem documents with a stable error code, and turns problem documents
//! received from other services back into local failures. It includes:
//! - the error code registry shared by every service in a process (`CodeRegistry`)
//! - the problem document model (`ProblemDocument`)
//! - outbound classification and decoration (`Decorator`)
//! - inbound translation of remote error responses (`InboundTranslator`)
//! - Axum glue behind the `axum` feature
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod catalog;
pub mod codes;
pub mod config;
pub mod context;
pub mod decorator;
pub mod error;
pub mod inbound;
pub mod problem;
pub mod registry;

#[cfg(feature = "axum")]
pub mod axum_ext;

// Re-export commonly used types
pub use catalog::Catalog;
pub use codes::{CodeCategory, NativeCode};
pub use config::{ConfigError, ErrorsConfig};
pub use context::RequestContext;
pub use decorator::{Classification, Decorator};
pub use error::{Failure, FieldViolation, InvalidFormat, WebError};
pub use inbound::InboundTranslator;
pub use problem::{APPLICATION_PROBLEM_JSON, ProblemDocument, ProblemProperties};
pub use registry::{
    CATALOG_NOT_INITIALIZED, CodeMap, CodeRegistry, ErrorRegistry, MergeOutcome, ServiceErrors,
};
