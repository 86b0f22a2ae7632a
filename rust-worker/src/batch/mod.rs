//! Batch types exchanged with the transport.
//!
//! This module provides:
//! - The inbound batch event (`{"Records": [{"body": ...}]}`)
//! - The fixed invocation response returned once a batch is processed
//!
//! ## Flow
//!
//! ```text
//! Transport → BatchEvent → BatchProcessor → InvocationResponse
//! ```

pub mod types;

pub use types::{BatchEvent, InvocationResponse, RawRecord, PROCESSED_BODY};
