//! Delivery of ballot links to voters.
//!
//! Every voter is emailed their link. Voters who gave a phone number are also
//! sent a text, which is a courtesy: its failure is logged and otherwise
//! ignored. Sending never rolls back poll or voter state.

use aws_sdk_sesv2::{
    types::{Body, Content, Destination, EmailContent, Message},
    Client as SesClient,
};
use aws_sdk_sns::Client as SnsClient;
use thiserror::Error;

use crate::model::db::voter::{Delivery, Voter};

/// Subject line of ballot link emails.
pub const BALLOT_SUBJECT: &str = "Poll Notification";

/// A message that could not be delivered.
#[derive(Debug, Error)]
#[error("Failed to send message to {recipient}: {reason}")]
pub struct NotifyError {
    pub recipient: String,
    pub reason: String,
}

impl NotifyError {
    fn new(recipient: &str, reason: impl ToString) -> Self {
        Self {
            recipient: recipient.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Something that can send an email.
#[rocket::async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Something that can send a text message to a phone number.
#[rocket::async_trait]
pub trait TextSender: Send + Sync {
    async fn send_text(&self, phone_number: &str, message: &str) -> Result<(), NotifyError>;
}

/// The channels ballot links go out on. Held in managed state.
pub struct Notifier {
    mailer: Box<dyn Mailer>,
    texter: Box<dyn TextSender>,
}

impl Notifier {
    pub fn new(mailer: impl Mailer + 'static, texter: impl TextSender + 'static) -> Self {
        Self {
            mailer: Box::new(mailer),
            texter: Box::new(texter),
        }
    }

    /// Send `voter` their ballot link. The result reflects the email alone.
    pub async fn send_ballot_link(&self, voter: &Voter, poll_name: &str, link: &str) -> Delivery {
        let message = ballot_message(poll_name, link);

        if let Some(phone) = &voter.phone_number {
            if let Err(e) = self.texter.send_text(&phone.to_string(), &message).await {
                warn!("{e}");
            }
        }

        match self.mailer.send_email(&voter.email, BALLOT_SUBJECT, &message).await {
            Ok(()) => Delivery::Sent,
            Err(e) => {
                warn!("{e}");
                Delivery::Failed
            }
        }
    }
}

/// The text of a ballot link message.
pub fn ballot_message(poll_name: &str, link: &str) -> String {
    format!("Please participate in the poll '{poll_name}'. Cast your vote here:\n\n{link}")
}

/// Email over Amazon SES, from a fixed sender address.
pub struct SesMailer {
    client: SesClient,
    from: String,
}

impl SesMailer {
    pub fn new(client: SesClient, from: String) -> Self {
        Self { client, from }
    }
}

#[rocket::async_trait]
impl Mailer for SesMailer {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let text = |data: &str| {
            Content::builder()
                .data(data)
                .charset("UTF-8")
                .build()
                .map_err(|e| NotifyError::new(to, e))
        };
        let message = Message::builder()
            .subject(text(subject)?)
            .body(Body::builder().text(text(body)?).build())
            .build();

        self.client
            .send_email()
            .from_email_address(&self.from)
            .destination(Destination::builder().to_addresses(to).build())
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .map(|_| ())
            .map_err(|e| NotifyError::new(to, e))
    }
}

#[rocket::async_trait]
impl TextSender for SnsClient {
    async fn send_text(&self, phone_number: &str, message: &str) -> Result<(), NotifyError> {
        self.publish()
            .phone_number(phone_number)
            .message(message)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| NotifyError::new(phone_number, e))
    }
}

/// Records every message instead of sending it, and refuses to deliver to
/// [`Self::UNREACHABLE_EMAIL`] and [`Self::UNREACHABLE_PHONE`].
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    emails: std::sync::Arc<std::sync::Mutex<Vec<(String, String)>>>,
    texts: std::sync::Arc<std::sync::Mutex<Vec<(String, String)>>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub const UNREACHABLE_EMAIL: &'static str = "bounce@example.com";
    pub const UNREACHABLE_PHONE: &'static str = "+447700900999";

    pub fn new() -> Self {
        Self::default()
    }

    /// A [`Notifier`] whose channels both record into this one.
    pub fn notifier(&self) -> Notifier {
        Notifier::new(self.clone(), self.clone())
    }

    /// Emails delivered so far, as `(address, body)` pairs.
    pub fn emails(&self) -> Vec<(String, String)> {
        self.emails.lock().unwrap().clone()
    }

    /// Texts delivered so far, as `(phone number, message)` pairs.
    pub fn texts(&self) -> Vec<(String, String)> {
        self.texts.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[rocket::async_trait]
impl Mailer for RecordingNotifier {
    async fn send_email(&self, to: &str, _subject: &str, body: &str) -> Result<(), NotifyError> {
        if to == Self::UNREACHABLE_EMAIL {
            return Err(NotifyError::new(to, "mailbox unavailable"));
        }
        self.emails
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        Ok(())
    }
}

#[cfg(test)]
#[rocket::async_trait]
impl TextSender for RecordingNotifier {
    async fn send_text(&self, phone_number: &str, message: &str) -> Result<(), NotifyError> {
        if phone_number == Self::UNREACHABLE_PHONE {
            return Err(NotifyError::new(phone_number, "unreachable"));
        }
        self.texts
            .lock()
            .unwrap()
            .push((phone_number.to_string(), message.to_string()));
        Ok(())
    }
}
