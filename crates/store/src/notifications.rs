//! Delivery log kept by the notification service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    ReservationConfirmation,
    RegistrationConfirmation,
    ReservationCancellation,
    General,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::ReservationConfirmation => "RESERVATION_CONFIRMATION",
            NotificationType::RegistrationConfirmation => "REGISTRATION_CONFIRMATION",
            NotificationType::ReservationCancellation => "RESERVATION_CANCELLATION",
            NotificationType::General => "GENERAL",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RESERVATION_CONFIRMATION" => Ok(NotificationType::ReservationConfirmation),
            "REGISTRATION_CONFIRMATION" => Ok(NotificationType::RegistrationConfirmation),
            "RESERVATION_CANCELLATION" => Ok(NotificationType::ReservationCancellation),
            "GENERAL" => Ok(NotificationType::General),
            _ => Err(format!("Invalid notification type: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "PENDING",
            NotificationStatus::Sent => "SENT",
            NotificationStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(NotificationStatus::Pending),
            "SENT" => Ok(NotificationStatus::Sent),
            "FAILED" => Ok(NotificationStatus::Failed),
            _ => Err(format!("Invalid notification status: {s}")),
        }
    }
}

/// One delivery attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: i64,
    pub recipient_email: String,
    pub recipient_name: String,
    pub notification_type: NotificationType,
    pub subject: String,
    pub message: Option<String>,
    pub status: NotificationStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub reference_id: Option<String>,
}

impl NotificationRecord {
    pub fn mark_sent(&mut self, message: impl Into<String>) {
        self.status = NotificationStatus::Sent;
        self.sent_at = Some(Utc::now());
        self.message = Some(message.into());
        self.error_message = None;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = NotificationStatus::Failed;
        self.error_message = Some(error.into());
    }
}

/// A log row about to be inserted as PENDING.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub recipient_email: String,
    pub recipient_name: String,
    pub notification_type: NotificationType,
    pub subject: String,
    pub reference_id: Option<String>,
}

/// Filter for the notification log. Results are always newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationQuery {
    pub recipient_email: Option<String>,
    pub notification_type: Option<NotificationType>,
    pub status: Option<NotificationStatus>,
    /// Created at or after this instant.
    pub from: Option<DateTime<Utc>>,
    /// Created at or before this instant.
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl NotificationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recipient(mut self, email: impl Into<String>) -> Self {
        self.recipient_email = Some(email.into());
        self
    }

    pub fn notification_type(mut self, kind: NotificationType) -> Self {
        self.notification_type = Some(kind);
        self
    }

    pub fn status(mut self, status: NotificationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &NotificationRecord) -> bool {
        self.recipient_email
            .as_deref()
            .is_none_or(|e| record.recipient_email == e)
            && self
                .notification_type
                .is_none_or(|t| record.notification_type == t)
            && self.status.is_none_or(|s| record.status == s)
            && self.from.is_none_or(|from| record.created_at >= from)
            && self.to.is_none_or(|to| record.created_at <= to)
    }
}

/// Counts over the whole log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationStats {
    pub total: i64,
    pub sent: i64,
    pub failed: i64,
    pub pending: i64,
    pub reservations: i64,
    pub registrations: i64,
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, new: NewNotification) -> Result<NotificationRecord>;

    /// Persists status, message, error and sent time. Fails with `NotFound` if absent.
    async fn update_notification(&self, record: NotificationRecord)
    -> Result<NotificationRecord>;

    async fn find_notification(&self, id: i64) -> Result<Option<NotificationRecord>>;

    async fn query_notifications(
        &self,
        query: NotificationQuery,
    ) -> Result<Vec<NotificationRecord>>;

    async fn notification_stats(&self) -> Result<NotificationStats>;
}
