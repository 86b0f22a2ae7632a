//! Web server module for HTTP invocations.
//!
//! This module provides a small web server that:
//! - Accepts a batch event on `POST /invoke`
//! - Verifies the shared invocation token, if one is configured
//! - Processes the batch and returns the fixed invocation response
//!
//! Per-record outcomes are only reported through the logs.

pub mod handlers;

pub use handlers::{health, invoke, AppState, HealthResponse, StatusResponse};
