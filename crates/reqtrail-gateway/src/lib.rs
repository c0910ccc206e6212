//! Reqtrail Gateway Integration
//!
//! Audit logging for axum services:
//! - Request/response interceptors with correlation propagation
//! - An error-path interceptor for centralized error handlers
//! - Single-line JSON encoding for every tracing event
//! - Logging bootstrap (console + optional rolling file output)

pub mod audit;
pub mod logging;

pub use audit::{
    audit_middleware, error_audit_middleware, with_audit, with_error_audit, AuditPolicy,
};
pub use logging::{error_chain, init_logging, JsonLineFormat, LoggingOptions};
