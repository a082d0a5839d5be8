//! Notification delivery
//!
//! [`SmtpNotifier`] mails each notification over implicit TLS (SMTPS, port
//! 465 by default), authenticating as the sender. An attachment turns the
//! message into `multipart/mixed` with the body as its first part.
//!
//! [`LogNotifier`] writes notifications to the log instead, for dry runs.

use async_trait::async_trait;
use envguard_core::Notification;
use lettre::{
    message::{header::ContentType, Attachment as MailAttachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{NotifyError, Notifier};

/// Mail account and relay settings
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Sender address, also the login name
    pub sender: String,
    pub password: String,
    pub receiver: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".into(),
            port: 465,
            sender: String::new(),
            password: String::new(),
            receiver: String::new(),
        }
    }
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("sender", &self.sender)
            .field("password", &"<redacted>")
            .field("receiver", &self.receiver)
            .finish()
    }
}

/// Sends notifications as email
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpNotifier {
    /// Validate addresses and prepare the relay; no connection is made yet
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let from: Mailbox = config.sender.parse()?;
        let to: Mailbox = config.receiver.parse()?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(config.sender.clone(), config.password.clone()))
            .build();

        Ok(Self { transport, from, to })
    }

    fn build_message(&self, notification: &Notification) -> Result<Message, NotifyError> {
        let builder = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(notification.subject.as_str());

        let message = match &notification.attachment {
            None => builder
                .header(ContentType::TEXT_PLAIN)
                .body(notification.body.clone())?,
            Some(attachment) => {
                let content_type = ContentType::parse(&attachment.content_type)?;
                builder.multipart(
                    MultiPart::mixed()
                        .singlepart(SinglePart::plain(notification.body.clone()))
                        .singlepart(
                            MailAttachment::new(attachment.filename.clone())
                                .body(attachment.bytes.clone(), content_type),
                        ),
                )?
            }
        };

        Ok(message)
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let message = self.build_message(notification)?;
        let response = self.transport.send(message).await?;
        if !response.is_positive() {
            return Err(NotifyError::Rejected(response.code().to_string()));
        }
        log::info!("mailed `{}` to {}", notification.subject, self.to);
        Ok(())
    }
}

/// Writes notifications to the log instead of delivering them
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        log::info!("notification `{}`:\n{}", notification.subject, notification.body);
        if let Some(attachment) = &notification.attachment {
            log::info!(
                "attachment {} ({}, {} bytes) not delivered",
                attachment.filename,
                attachment.content_type,
                attachment.bytes.len()
            );
        }
        Ok(())
    }
}
