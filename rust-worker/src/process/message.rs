//! Mail message construction.
//!
//! Every message carries the same subject and plain-text body; only the
//! addresses come from the record.
//!
//! The sender is written as-is into the `From` header and is never validated.
//! When it is empty or not an address the SMTP envelope gets a null
//! reverse-path and the relay decides whether to accept it.

use lettre::address::{Address, Envelope};
use lettre::message::header::{self, HeaderName, HeaderValue, Headers};
use lettre::message::{Mailbox, Mailboxes, SinglePart};

use super::envelope::MailRequest;
use crate::mailer::DeliveryError;

/// Subject line of every dispatched message.
pub const MESSAGE_SUBJECT: &str = "Correo enviado desde AWS Lambda";

/// Plain-text body of every dispatched message.
pub const MESSAGE_BODY: &str =
    "Este es un correo enviado automáticamente desde AWS Lambda utilizando SMTP.";

/// A message ready for a relay: SMTP envelope plus the RFC 5322 content.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    envelope: Envelope,
    headers: Headers,
    body: SinglePart,
}

impl OutgoingMail {
    /// Reverse-path and recipients used for the SMTP transaction.
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Top-level headers as written on the wire. Bcc is never among them.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Full message bytes: top-level headers followed by the body part.
    pub fn formatted(&self) -> Vec<u8> {
        let mut out = self.headers.to_string().into_bytes();
        out.extend(self.body.formatted());
        out
    }
}

/// Build the outgoing message for a validated request.
///
/// `to`, `cc` and `bcc` may each hold a comma-separated address list. Bcc
/// recipients end up in the SMTP envelope only, not in the written headers.
pub fn build_message(request: &MailRequest) -> Result<OutgoingMail, DeliveryError> {
    let to = parse_mailboxes("to", &request.to)?;
    let cc = request
        .cc
        .as_deref()
        .map(|cc| parse_mailboxes("cc", cc))
        .transpose()?;
    let bcc = request
        .bcc
        .as_deref()
        .map(|bcc| parse_mailboxes("bcc", bcc))
        .transpose()?;

    let recipients: Vec<Address> = to
        .iter()
        .chain(cc.iter().flat_map(|m| m.iter()))
        .chain(bcc.iter().flat_map(|m| m.iter()))
        .map(|mailbox| mailbox.email.clone())
        .collect();

    let envelope = Envelope::new(reverse_path(request.from.as_deref()), recipients)?;

    let mut headers = Headers::new();
    if let Some(from) = request.from.as_deref().filter(|from| !from.is_empty()) {
        headers.insert_raw(HeaderValue::new(
            HeaderName::new_from_ascii_str("From"),
            from.to_string(),
        ));
    }
    headers.set(header::To::from(to));
    if let Some(cc) = cc {
        headers.set(header::Cc::from(cc));
    }
    headers.set(header::Subject::from(MESSAGE_SUBJECT.to_string()));
    headers.set(header::Date::now());
    headers.set(header::MIME_VERSION_1_0);

    Ok(OutgoingMail {
        envelope,
        headers,
        body: SinglePart::plain(MESSAGE_BODY.to_string()),
    })
}

/// Envelope sender taken from the `From` value, if it holds an address.
fn reverse_path(from: Option<&str>) -> Option<Address> {
    from?.parse::<Mailbox>().ok().map(|mailbox| mailbox.email)
}

fn parse_mailboxes(field: &'static str, value: &str) -> Result<Mailboxes, DeliveryError> {
    value
        .trim()
        .parse::<Mailboxes>()
        .map_err(|e| DeliveryError::InvalidAddress {
            field,
            value: value.to_string(),
            reason: format!("{}", e),
        })
}
