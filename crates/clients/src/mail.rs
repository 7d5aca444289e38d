use std::time::Duration;

use async_trait::async_trait;
use domain::ports::{Mailer, OutgoingEmail, PortError};
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

use crate::ClientError;

const SERVICE: &str = "smtp";

/// SMTP 553: mailbox name not allowed.
const BAD_MAILBOX: u16 = 553;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: String,
    pub from_name: String,
}

/// Sends HTML mail over plaintext SMTP.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("from", &self.from.to_string())
            .finish_non_exhaustive()
    }
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Result<Self, ClientError> {
        let address: Address = config
            .from_address
            .parse()
            .map_err(|e| ClientError::Mail(format!("MAIL_FROM: {e}")))?;
        let from = Mailbox::new(Some(config.from_name), address);

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)));
        if let (Some(username), Some(password)) = (config.username, config.password) {
            builder = builder.credentials(Credentials::new(username, password));
        }

        tracing::info!(host = %config.host, port = config.port, "SMTP mailer configured");
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message, PortError> {
        let rejected = |message: String| PortError::Rejected {
            service: SERVICE,
            status: BAD_MAILBOX,
            message,
        };

        let to: Address = email
            .to
            .parse()
            .map_err(|e| rejected(format!("{}: {e}", email.to)))?;
        let to_name = Some(email.to_name.clone()).filter(|n| !n.trim().is_empty());

        Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(to_name, to))
            .subject(&email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())
            .map_err(|e| rejected(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), PortError> {
        let message = self.build_message(email)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| PortError::unavailable(SERVICE, e.to_string()))?;
        tracing::info!(to = %email.to, subject = %email.subject, "Email sent");
        Ok(())
    }
}
