use std::sync::Arc;

use chrono::{DateTime, Utc};
use store::{
    NewNotification, NotificationQuery, NotificationRecord, NotificationStats, NotificationStatus,
    NotificationStore, NotificationType,
};
use validator::Validate;

use super::templates::{self, CANCELLATION_SUBJECT, REGISTRATION_SUBJECT, RESERVATION_SUBJECT};
use super::{NotificationError, NotificationJob, NotificationRequest};
use crate::events::{CancellationEvent, RegistrationEvent, ReservationEvent};
use crate::ports::{Mailer, OutgoingEmail};
use crate::qr::QrCodeGenerator;
use crate::{DomainError, Result};

/// Default page size of [`NotificationService::recent`].
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Renders and sends emails, and keeps a log row for every attempt.
pub struct NotificationService {
    log: Arc<dyn NotificationStore>,
    mailer: Arc<dyn Mailer>,
}

impl NotificationService {
    pub fn new(log: Arc<dyn NotificationStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self { log, mailer }
    }

    /// Handles one queued job and returns its final log row.
    pub async fn process(&self, job: NotificationJob) -> Result<NotificationRecord> {
        job.validate()?;
        match job {
            NotificationJob::Reservation(event) => self.reservation_confirmation(event).await,
            NotificationJob::Registration(event) => self.registration_confirmation(event).await,
            NotificationJob::Cancellation(event) => self.reservation_cancellation(event).await,
        }
    }

    #[tracing::instrument(skip(self, event), fields(reservation_id = %event.reservation_id))]
    async fn reservation_confirmation(&self, event: ReservationEvent) -> Result<NotificationRecord> {
        let new = NewNotification {
            recipient_email: event.user_email.clone(),
            recipient_name: event.user_name.clone(),
            notification_type: NotificationType::ReservationConfirmation,
            subject: RESERVATION_SUBJECT.to_string(),
            reference_id: Some(event.reservation_id.clone()),
        };

        let qr_data = format!(
            "BOOKFAIR_RESERVATION|ID:{}|USER:{}|NAME:{}|DATE:{}",
            event.reservation_id,
            event.user_id,
            event.user_name,
            Utc::now().to_rfc3339()
        );
        let html = QrCodeGenerator::render_png(&qr_data)
            .map(|png| templates::reservation_confirmation(&event, &QrCodeGenerator::to_base64(&png)))
            .map_err(|e| e.to_string());

        self.deliver(new, html, "Reservation confirmation sent with QR code")
            .await
    }

    #[tracing::instrument(skip(self, event), fields(user_id = %event.user_id))]
    async fn registration_confirmation(
        &self,
        event: RegistrationEvent,
    ) -> Result<NotificationRecord> {
        let new = NewNotification {
            recipient_email: event.email.clone(),
            recipient_name: event.user_name.clone(),
            notification_type: NotificationType::RegistrationConfirmation,
            subject: REGISTRATION_SUBJECT.to_string(),
            reference_id: Some(event.user_id.clone()),
        };
        let html = templates::registration_confirmation(&event);
        self.deliver(new, Ok(html), "Registration confirmation sent")
            .await
    }

    #[tracing::instrument(skip(self, event), fields(reservation_id = %event.reservation_id))]
    async fn reservation_cancellation(
        &self,
        event: CancellationEvent,
    ) -> Result<NotificationRecord> {
        let new = NewNotification {
            recipient_email: event.user_email.clone(),
            recipient_name: event.user_name.clone(),
            notification_type: NotificationType::ReservationCancellation,
            subject: CANCELLATION_SUBJECT.to_string(),
            reference_id: Some(event.reservation_id.clone()),
        };
        let html = templates::reservation_cancellation(&event);
        self.deliver(new, Ok(html), "Cancellation notice sent")
            .await
    }

    /// Sends a notification synchronously and returns its log row.
    #[tracing::instrument(skip(self, request), fields(to = %request.recipient_email))]
    pub async fn send(&self, request: NotificationRequest) -> Result<NotificationRecord> {
        request.validate()?;

        let html = match (request.template(), request.body()) {
            (Some(name), _) => {
                let mut data = request.template_data.clone();
                data.entry("recipient_name".to_string())
                    .or_insert_with(|| request.recipient_name.clone().into());
                data.entry("title".to_string())
                    .or_insert_with(|| request.subject.clone().into());
                if let Some(message) = request.body() {
                    data.entry("message".to_string())
                        .or_insert_with(|| message.into());
                }
                templates::render_named(name, &data)?
            }
            (None, Some(message)) => {
                templates::plain(&request.recipient_name, &request.subject, message)
            }
            (None, None) => return Err(NotificationError::EmptyBody.into()),
        };

        let new = NewNotification {
            recipient_email: request.recipient_email,
            recipient_name: request.recipient_name,
            notification_type: request.notification_type,
            subject: request.subject,
            reference_id: request.reference_id,
        };
        self.deliver(new, Ok(html), "Notification sent").await
    }

    /// Logs the attempt as PENDING, sends, then records SENT or FAILED.
    async fn deliver(
        &self,
        new: NewNotification,
        html: std::result::Result<String, String>,
        success_message: &str,
    ) -> Result<NotificationRecord> {
        let kind = new.notification_type;
        let mut record = self.log.insert_notification(new).await?;
        tracing::debug!(notification_id = record.id, "Notification log created");

        let outcome = match html {
            Ok(html) => {
                let email = OutgoingEmail {
                    to: record.recipient_email.clone(),
                    to_name: record.recipient_name.clone(),
                    subject: record.subject.clone(),
                    html,
                };
                self.mailer.send(&email).await.map_err(|e| e.to_string())
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                record.mark_sent(success_message);
                tracing::info!(notification_id = record.id, "Email sent");
            }
            Err(e) => {
                tracing::error!(notification_id = record.id, error = %e, "Email delivery failed");
                record.mark_failed(e);
            }
        }

        metrics::counter!(
            "notifications_processed_total",
            "type" => kind.as_str(),
            "status" => record.status.as_str()
        )
        .increment(1);

        Ok(self.log.update_notification(record).await?)
    }

    pub async fn all(&self) -> Result<Vec<NotificationRecord>> {
        Ok(self.log.query_notifications(NotificationQuery::new()).await?)
    }

    pub async fn get(&self, id: i64) -> Result<NotificationRecord> {
        self.log
            .find_notification(id)
            .await?
            .ok_or_else(|| NotificationError::NotFound(id).into())
    }

    pub async fn by_email(&self, email: &str) -> Result<Vec<NotificationRecord>> {
        Ok(self
            .log
            .query_notifications(NotificationQuery::new().recipient(email))
            .await?)
    }

    pub async fn by_type(&self, kind: &str) -> Result<Vec<NotificationRecord>> {
        let kind: NotificationType = kind.parse().map_err(DomainError::Validation)?;
        Ok(self
            .log
            .query_notifications(NotificationQuery::new().notification_type(kind))
            .await?)
    }

    pub async fn by_status(&self, status: &str) -> Result<Vec<NotificationRecord>> {
        let status: NotificationStatus = status.parse().map_err(DomainError::Validation)?;
        Ok(self
            .log
            .query_notifications(NotificationQuery::new().status(status))
            .await?)
    }

    pub async fn stats(&self) -> Result<NotificationStats> {
        Ok(self.log.notification_stats().await?)
    }

    pub async fn recent(&self, limit: Option<usize>) -> Result<Vec<NotificationRecord>> {
        let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT);
        Ok(self
            .log
            .query_notifications(NotificationQuery::new().limit(limit))
            .await?)
    }

    pub async fn date_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<NotificationRecord>> {
        if from > to {
            return Err(DomainError::Validation(
                "Start date must be before end date".to_string(),
            ));
        }
        Ok(self
            .log
            .query_notifications(NotificationQuery::new().between(from, to))
            .await?)
    }
}
