use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::{NotificationError, NotificationService};
use crate::events::{CancellationEvent, RegistrationEvent, ReservationEvent};
use crate::ports::{NotificationPublisher, PortError};

/// One unit of work for the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "event", rename_all = "snake_case")]
pub enum NotificationJob {
    Reservation(ReservationEvent),
    Registration(RegistrationEvent),
    Cancellation(CancellationEvent),
}

impl NotificationJob {
    pub fn recipient(&self) -> &str {
        match self {
            NotificationJob::Reservation(e) => &e.user_email,
            NotificationJob::Registration(e) => &e.email,
            NotificationJob::Cancellation(e) => &e.user_email,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NotificationJob::Reservation(_) => "reservation",
            NotificationJob::Registration(_) => "registration",
            NotificationJob::Cancellation(_) => "cancellation",
        }
    }

    /// Intake check done before a job is queued.
    pub fn validate(&self) -> Result<(), NotificationError> {
        if self.recipient().trim().is_empty() {
            return Err(NotificationError::MissingRecipient);
        }
        Ok(())
    }
}

/// Sending half of the dispatcher channel.
///
/// Cloned into every producer. Once all clones are dropped the worker
/// drains what is left and stops.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<NotificationJob>,
}

impl NotificationQueue {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<NotificationJob>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Validates and queues a job. Waits when the queue is full.
    pub async fn enqueue(&self, job: NotificationJob) -> Result<(), NotificationError> {
        job.validate()?;
        let kind = job.kind();
        self.tx
            .send(job)
            .await
            .map_err(|_| NotificationError::QueueClosed)?;
        tracing::debug!(kind, "Notification job queued");
        Ok(())
    }

    /// Queues a job without waiting. A full queue drops the job and reports
    /// unavailable so producers never stall on slow delivery.
    fn publish(&self, job: NotificationJob) -> Result<(), PortError> {
        job.validate()
            .map_err(|e| PortError::unavailable("notification-queue", e.to_string()))?;
        let kind = job.kind();
        match self.tx.try_send(job) {
            Ok(()) => {
                tracing::debug!(kind, "Notification job queued");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(kind, "Notification queue full, event dropped");
                Err(PortError::unavailable("notification-queue", "queue is full"))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(PortError::unavailable(
                "notification-queue",
                NotificationError::QueueClosed.to_string(),
            )),
        }
    }
}

#[async_trait]
impl NotificationPublisher for NotificationQueue {
    async fn publish_reservation(&self, event: ReservationEvent) -> Result<(), PortError> {
        self.publish(NotificationJob::Reservation(event))
    }

    async fn publish_registration(&self, event: RegistrationEvent) -> Result<(), PortError> {
        self.publish(NotificationJob::Registration(event))
    }

    async fn publish_cancellation(&self, event: CancellationEvent) -> Result<(), PortError> {
        self.publish(NotificationJob::Cancellation(event))
    }
}

/// Background task that turns queued jobs into emails.
pub struct NotificationWorker {
    service: Arc<NotificationService>,
}

impl NotificationWorker {
    pub fn new(service: Arc<NotificationService>) -> Self {
        Self { service }
    }

    /// Runs until the channel is closed and empty.
    pub async fn run(self, mut rx: mpsc::Receiver<NotificationJob>) {
        tracing::info!("Notification worker started");

        while let Some(job) = rx.recv().await {
            let kind = job.kind();
            match self.service.process(job).await {
                Ok(log) => tracing::debug!(
                    notification_id = log.id,
                    kind,
                    status = %log.status,
                    "Notification processed"
                ),
                Err(e) => tracing::error!(kind, error = %e, "Notification processing failed"),
            }
        }

        tracing::info!("Notification channel closed, worker stopping");
    }

    pub fn spawn(self, rx: mpsc::Receiver<NotificationJob>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(rx))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use store::{InMemoryStore, NotificationQuery, NotificationStatus, NotificationStore};

    use super::*;
    use crate::ports::InMemoryMailer;

    fn registration(email: &str) -> RegistrationEvent {
        RegistrationEvent {
            user_id: "1".into(),
            email: email.into(),
            user_name: "Vendor".into(),
            business_name: None,
            business_type: None,
            phone_number: None,
            registration_date: Utc::now(),
            temporary_password: None,
        }
    }

    #[tokio::test]
    async fn rejects_job_without_recipient() {
        let (queue, _rx) = NotificationQueue::new(4);
        let err = queue
            .enqueue(NotificationJob::Registration(registration("  ")))
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::MissingRecipient));
    }

    #[tokio::test]
    async fn closed_queue_reports_unavailable() {
        let (queue, rx) = NotificationQueue::new(4);
        drop(rx);
        let err = queue
            .publish_registration(registration("v@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn full_queue_rejects_publish_without_waiting() {
        let (queue, _rx) = NotificationQueue::new(1);
        queue
            .publish_registration(registration("a@example.com"))
            .await
            .unwrap();

        let second = tokio::time::timeout(
            std::time::Duration::from_millis(500),
            queue.publish_registration(registration("b@example.com")),
        )
        .await
        .expect("publish must not wait for a free slot");
        assert!(matches!(second, Err(PortError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn worker_drains_queue_after_senders_drop() {
        let store = Arc::new(InMemoryStore::new());
        let mailer = InMemoryMailer::new();
        let service = Arc::new(NotificationService::new(
            store.clone(),
            Arc::new(mailer.clone()),
        ));

        let (queue, rx) = NotificationQueue::new(NotificationQueue::DEFAULT_CAPACITY);
        for i in 0..5 {
            queue
                .publish_registration(registration(&format!("v{i}@example.com")))
                .await
                .unwrap();
        }
        drop(queue);

        NotificationWorker::new(service).spawn(rx).await.unwrap();

        assert_eq!(mailer.sent().await.len(), 5);
        let logs = store
            .query_notifications(NotificationQuery::new())
            .await
            .unwrap();
        assert_eq!(logs.len(), 5);
        assert!(logs.iter().all(|l| l.status == NotificationStatus::Sent));
    }

    #[test]
    fn job_json_is_tagged() {
        let job = NotificationJob::Registration(registration("v@example.com"));
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["kind"], "registration");
        assert_eq!(json["event"]["email"], "v@example.com");
    }
}
