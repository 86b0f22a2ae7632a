//! MailRelay - queue-record to email dispatcher.
//!
//! This library provides shared modules for the two MailRelay binaries:
//! - `mailrelay-worker`: RabbitMQ consumer dispatching each delivery as email
//! - `mailrelay-web`: HTTP endpoint accepting whole batch events
//!
//! ## Architecture
//!
//! ```text
//! Transport → BatchEvent → BatchProcessor → decode/unwrap → validate → build → SMTP relay
//! ```

pub mod batch;
pub mod config;
pub mod mailer;
pub mod process;
pub mod processor;
pub mod shutdown;
pub mod web;

// Re-export commonly used types
pub use batch::{BatchEvent, InvocationResponse, RawRecord, PROCESSED_BODY};
pub use config::{Config, SmtpConfig};
pub use mailer::{DeliveryError, Mailer, SmtpMailer};
pub use process::{
    build_message, decode_envelope, MailFields, MailRequest, OutgoingMail, RecordError,
};
pub use processor::{BatchProcessor, BatchResult, Outcome, SkipReason};
pub use web::AppState;
