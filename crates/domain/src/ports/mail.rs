use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{PortError, Unreachable};

/// A rendered HTML email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub to_name: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), PortError>;
}

#[async_trait]
impl Mailer for Unreachable {
    async fn send(&self, _email: &OutgoingEmail) -> Result<(), PortError> {
        Err(Self::error("smtp"))
    }
}

/// Logs emails instead of sending them. Used when no SMTP host is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), PortError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            bytes = email.html.len(),
            "SMTP not configured, email logged only"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MailboxState {
    sent: Vec<OutgoingEmail>,
    fail: bool,
}

/// Mailer that keeps sent messages in memory, for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMailer {
    state: Arc<RwLock<MailboxState>>,
}

impl InMemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail(&self, fail: bool) {
        self.state.write().await.fail = fail;
    }

    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.state.read().await.sent.clone()
    }
}

#[async_trait]
impl Mailer for InMemoryMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), PortError> {
        let mut state = self.state.write().await;
        if state.fail {
            return Err(PortError::unavailable("smtp", "mail server rejected message"));
        }
        state.sent.push(email.clone());
        Ok(())
    }
}
