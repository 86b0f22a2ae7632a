//! Record payload processing module.
//!
//! This module turns a raw record body into a ready-to-send mail message.
//!
//! ## Processing Flow
//!
//! ```text
//! body → decode_envelope() → MailFields → into_request() → MailRequest → build_message() → OutgoingMail
//! ```

pub mod envelope;
pub mod message;

use thiserror::Error;

use crate::mailer::DeliveryError;

pub use envelope::{decode_envelope, MailFields, MailRequest};
pub use message::{build_message, OutgoingMail, MESSAGE_BODY, MESSAGE_SUBJECT};

/// Reasons a single record did not result in a delivered email.
///
/// None of these leave the record boundary: the batch processor converts each
/// one into an outcome and moves on to the next record.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The record carried no body
    #[error("empty body")]
    EmptyBody,

    /// The body, or the envelope's inner message, is not usable JSON
    #[error("parse error: {0}")]
    Parse(String),

    /// No `to` address in the effective payload
    #[error("missing recipient")]
    MissingRecipient,

    /// The message could not be built or handed to the relay
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl RecordError {
    pub(crate) fn parse(err: impl std::fmt::Display) -> Self {
        RecordError::Parse(err.to_string())
    }
}
