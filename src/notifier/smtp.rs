use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{
    authentication::Credentials, AsyncSmtpTransport, AsyncSmtpTransportBuilder,
};
use lettre::{AsyncTransport, Tokio1Executor};

use crate::app::{FeedwatchError, Result};
use crate::config::{MailConfig, MailTls};
use crate::notifier::Notifier;

/// Sends the notification as an HTML email through an SMTP relay.
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
    subject: String,
}

impl SmtpNotifier {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let mut builder = transport_builder(&config.smtp_host, config.tls_mode())?;

        if let Some(port) = config.smtp_port {
            builder = builder.port(port);
        }
        if let (Some(user), Some(pass)) = (&config.username, config.password()) {
            builder = builder.credentials(Credentials::new(user.clone(), pass));
        }

        let from = parse_mailbox(&config.from)?;
        let to = config
            .to
            .iter()
            .map(|addr| parse_mailbox(addr))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            mailer: builder.build(),
            from,
            to,
            subject: config.subject.clone(),
        })
    }
}

fn transport_builder(host: &str, tls: MailTls) -> Result<AsyncSmtpTransportBuilder> {
    let builder = match tls {
        MailTls::Wrapper => AsyncSmtpTransport::<Tokio1Executor>::relay(host),
        MailTls::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host),
        MailTls::None => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)),
    };

    builder.map_err(|e| FeedwatchError::Config(format!("invalid smtp_host: {}", e)))
}

fn build_message(from: &Mailbox, to: &[Mailbox], subject: &str, body: &str) -> Result<Message> {
    let mut builder = Message::builder()
        .from(from.clone())
        .subject(subject)
        .header(header::ContentType::TEXT_HTML);

    for recipient in to {
        builder = builder.to(recipient.clone());
    }

    builder
        .body(body.to_string())
        .map_err(|e| FeedwatchError::DeliveryFailed(format!("build email: {}", e)))
}

fn parse_mailbox(addr: &str) -> Result<Mailbox> {
    addr.parse()
        .map_err(|e| FeedwatchError::Config(format!("invalid email address {:?}: {}", addr, e)))
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, body: &str) -> Result<()> {
        let msg = build_message(&self.from, &self.to, &self.subject, body)?;

        let response = self
            .mailer
            .send(msg)
            .await
            .map_err(|e| FeedwatchError::DeliveryFailed(format!("send email: {}", e)))?;

        tracing::info!(
            "Email sent to {} recipient(s) (code {})",
            self.to.len(),
            response.code()
        );
        Ok(())
    }
}
