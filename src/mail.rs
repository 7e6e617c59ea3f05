//! Outbound mail: a single contact-form message to the operator, and a
//! broadcast to every registered user.
//!
//! Delivery goes through the [`Mailer`] trait so tests can substitute a
//! recording transport for the real SMTP client.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::MailConfig;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(String),

    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone)]
pub enum MailBody {
    Plain(String),
    Html(String),
}

#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: MailBody,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// SMTP transport over STARTTLS with an explicit connection timeout.
/// Relay host and credentials come from configuration.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .timeout(Some(Duration::from_secs(config.timeout_secs)));

        if let (Some(user), Some(pass)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let from = config
            .from_address
            .parse()
            .map_err(|_| MailError::Address(config.from_address.clone()))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|_| MailError::Address(mail.to.clone()))?;

        let builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&mail.subject);

        let message = match &mail.body {
            MailBody::Plain(text) => builder
                .header(ContentType::TEXT_PLAIN)
                .body(text.clone()),
            MailBody::Html(html) => builder.header(ContentType::TEXT_HTML).body(html.clone()),
        }
        .map_err(|e| MailError::Transport(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| MailError::Transport(e.to_string()))
    }
}

/// Compose the contact-form message addressed to the operator.
pub fn contact_mail(config: &MailConfig, name: &str, email: &str, message: &str) -> OutgoingMail {
    OutgoingMail {
        to: config.contact_address.clone(),
        subject: "Message from blog".to_string(),
        body: MailBody::Plain(format!(
            "name: {name}\nemail: {email}\nmessage: {message}\n"
        )),
    }
}

/// Outcome of one broadcast delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub recipient: String,
    pub outcome: Delivery,
}

/// Send an HTML message to every recipient in order. A failure for one
/// recipient is recorded and logged but never stops the batch; there are no
/// retries. A pacing delay is awaited between consecutive sends to stay
/// under the mail provider's rate limit.
pub async fn broadcast(
    mailer: &dyn Mailer,
    recipients: &[String],
    subject: &str,
    html_body: &str,
    pacing: Duration,
) -> Vec<DeliveryReport> {
    let mut report = Vec::with_capacity(recipients.len());

    for (i, to) in recipients.iter().enumerate() {
        let mail = OutgoingMail {
            to: to.clone(),
            subject: subject.to_string(),
            body: MailBody::Html(html_body.to_string()),
        };

        let outcome = match mailer.send(&mail).await {
            Ok(()) => Delivery::Sent,
            Err(e) => {
                tracing::warn!("Broadcast to {} failed: {}", to, e);
                Delivery::Failed(e.to_string())
            }
        };
        report.push(DeliveryReport {
            recipient: to.clone(),
            outcome,
        });

        if i + 1 < recipients.len() && !pacing.is_zero() {
            tokio::time::sleep(pacing).await;
        }
    }

    report
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingMailer;
    use super::*;
    use crate::config::MailConfig;

    fn recipients(addrs: &[&str]) -> Vec<String> {
        addrs.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn contact_mail_goes_to_operator_address() {
        let config = MailConfig {
            contact_address: "operator@example.com".to_string(),
            ..MailConfig::default()
        };
        let mail = contact_mail(&config, "A", "a@x.com", "hello there");
        assert_eq!(mail.to, "operator@example.com");
        match &mail.body {
            MailBody::Plain(text) => {
                assert!(text.contains("name: A"));
                assert!(text.contains("email: a@x.com"));
                assert!(text.contains("message: hello there"));
            }
            MailBody::Html(_) => panic!("contact mail must be plain text"),
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_every_recipient() {
        let mailer = RecordingMailer::new();
        let to = recipients(&["a@x.com", "b@x.com", "c@x.com"]);

        let report = broadcast(&mailer, &to, "News", "<p>hi</p>", Duration::ZERO).await;

        assert_eq!(mailer.attempted(), to);
        assert!(report.iter().all(|r| r.outcome == Delivery::Sent));
    }

    #[tokio::test]
    async fn broadcast_continues_past_a_failing_recipient() {
        let mailer = RecordingMailer::failing_for(&["b@x.com"]);
        let to = recipients(&["a@x.com", "b@x.com", "c@x.com", "d@x.com"]);

        let report = broadcast(&mailer, &to, "News", "<p>hi</p>", Duration::ZERO).await;

        // Every recipient after the failure was still attempted
        assert_eq!(mailer.attempted(), to);
        assert_eq!(report.len(), 4);
        assert_eq!(report[0].outcome, Delivery::Sent);
        assert!(matches!(report[1].outcome, Delivery::Failed(_)));
        assert_eq!(report[2].outcome, Delivery::Sent);
        assert_eq!(report[3].outcome, Delivery::Sent);
    }

    #[tokio::test]
    async fn broadcast_sends_html_bodies() {
        let mailer = RecordingMailer::new();
        let to = recipients(&["a@x.com"]);
        broadcast(&mailer, &to, "News", "<h1>hi</h1>", Duration::ZERO).await;

        let sent = mailer.sent.lock().unwrap();
        match &sent[0].body {
            MailBody::Html(html) => assert_eq!(html, "<h1>hi</h1>"),
            MailBody::Plain(_) => panic!("broadcast must send HTML"),
        }
        assert_eq!(sent[0].subject, "News");
    }

    #[tokio::test]
    async fn broadcast_with_no_recipients_is_empty() {
        let mailer = RecordingMailer::new();
        let report = broadcast(&mailer, &[], "News", "<p>hi</p>", Duration::ZERO).await;
        assert!(report.is_empty());
        assert!(mailer.attempted().is_empty());
    }
}
