//! Batch processing module - core dispatch logic.
//!
//! Records are handled one at a time, in order. Each record runs through the
//! full pipeline (empty check, decode, validate, build, send) and always ends
//! in exactly one [`Outcome`]. A failing record never stops the batch.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::batch::{BatchEvent, InvocationResponse, RawRecord};
use crate::config::SmtpConfig;
use crate::mailer::{Mailer, SmtpMailer};
use crate::process::{build_message, decode_envelope, RecordError};

/// Why a record was skipped without opening a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    EmptyBody,
    Parse(String),
    MissingRecipient,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptyBody => write!(f, "empty body"),
            SkipReason::Parse(detail) => write!(f, "parse error: {}", detail),
            SkipReason::MissingRecipient => write!(f, "missing recipient"),
        }
    }
}

/// How processing of a single record concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped(SkipReason),
    /// Delivery failed; holds the error detail
    SendFailed(String),
    /// Delivered; holds the recipient
    SendSucceeded(String),
}

impl From<RecordError> for Outcome {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::EmptyBody => Outcome::Skipped(SkipReason::EmptyBody),
            RecordError::Parse(detail) => Outcome::Skipped(SkipReason::Parse(detail)),
            RecordError::MissingRecipient => Outcome::Skipped(SkipReason::MissingRecipient),
            RecordError::Delivery(e) => Outcome::SendFailed(e.to_string()),
        }
    }
}

/// Outcomes of one batch, in record order.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub outcomes: Vec<Outcome>,
}

impl BatchResult {
    /// The response reported to the transport. Always a success.
    pub fn response(&self) -> InvocationResponse {
        InvocationResponse::processed()
    }

    pub fn sent(&self) -> usize {
        self.count(|o| matches!(o, Outcome::SendSucceeded(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::SendFailed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|&o| pred(o)).count()
    }
}

/// Dispatches every record of a batch as an email.
#[derive(Clone)]
pub struct BatchProcessor {
    mailer: Arc<dyn Mailer>,
}

impl BatchProcessor {
    /// Create a processor that delivers through the given mailer.
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Create a processor that delivers through an authenticated SMTP relay.
    pub fn from_config(config: SmtpConfig) -> Self {
        Self::new(Arc::new(SmtpMailer::new(config)))
    }

    /// Process a whole batch.
    ///
    /// Each send is awaited before the next record starts, so at most one SMTP
    /// session is open at a time.
    pub async fn process(&self, event: &BatchEvent) -> BatchResult {
        info!(records = event.records.len(), "batch_received");

        let mut outcomes = Vec::with_capacity(event.records.len());

        for (index, record) in event.records.iter().enumerate() {
            let outcome = self.process_record(record).await;
            log_outcome(index, &outcome);
            outcomes.push(outcome);
        }

        let result = BatchResult { outcomes };

        info!(
            records = result.outcomes.len(),
            sent = result.sent(),
            failed = result.failed(),
            skipped = result.skipped(),
            "batch_processed"
        );

        result
    }

    /// Process a single record into its outcome.
    pub async fn process_record(&self, record: &RawRecord) -> Outcome {
        match self.deliver(record).await {
            Ok(recipient) => Outcome::SendSucceeded(recipient),
            Err(e) => Outcome::from(e),
        }
    }

    async fn deliver(&self, record: &RawRecord) -> Result<String, RecordError> {
        let body = record.body().ok_or(RecordError::EmptyBody)?;
        let request = decode_envelope(body)?.into_request()?;
        let message = build_message(&request)?;

        self.mailer.send(message).await?;

        Ok(request.to)
    }
}

fn log_outcome(index: usize, outcome: &Outcome) {
    match outcome {
        Outcome::Skipped(reason) => {
            warn!(index = index, reason = %reason, "record_skipped");
        }
        Outcome::SendFailed(e) => {
            error!(index = index, error = %e, "email_send_failed");
        }
        Outcome::SendSucceeded(to) => {
            info!(index = index, to = %to, "email_sent");
        }
    }
}
