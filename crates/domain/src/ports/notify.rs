use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{PortError, Unreachable};
use crate::events::{CancellationEvent, RegistrationEvent, ReservationEvent};

/// Hands events to the notification service.
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    async fn publish_reservation(&self, event: ReservationEvent) -> Result<(), PortError>;

    async fn publish_registration(&self, event: RegistrationEvent) -> Result<(), PortError>;

    async fn publish_cancellation(&self, event: CancellationEvent) -> Result<(), PortError>;
}

#[async_trait]
impl NotificationPublisher for Unreachable {
    async fn publish_reservation(&self, _event: ReservationEvent) -> Result<(), PortError> {
        Err(Self::error("notification-service"))
    }

    async fn publish_registration(&self, _event: RegistrationEvent) -> Result<(), PortError> {
        Err(Self::error("notification-service"))
    }

    async fn publish_cancellation(&self, _event: CancellationEvent) -> Result<(), PortError> {
        Err(Self::error("notification-service"))
    }
}

/// An event captured by [`RecordingPublisher`].
#[derive(Debug, Clone, PartialEq)]
pub enum PublishedEvent {
    Reservation(ReservationEvent),
    Registration(RegistrationEvent),
    Cancellation(CancellationEvent),
}

#[derive(Debug, Default)]
struct RecordingState {
    events: Vec<PublishedEvent>,
    fail: bool,
}

/// Publisher that keeps every event in memory, for tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    state: Arc<RwLock<RecordingState>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent publish fail.
    pub async fn set_fail(&self, fail: bool) {
        self.state.write().await.fail = fail;
    }

    pub async fn events(&self) -> Vec<PublishedEvent> {
        self.state.read().await.events.clone()
    }

    async fn record(&self, event: PublishedEvent) -> Result<(), PortError> {
        let mut state = self.state.write().await;
        if state.fail {
            return Err(PortError::unavailable(
                "notification-service",
                "publisher disabled",
            ));
        }
        state.events.push(event);
        Ok(())
    }
}

#[async_trait]
impl NotificationPublisher for RecordingPublisher {
    async fn publish_reservation(&self, event: ReservationEvent) -> Result<(), PortError> {
        self.record(PublishedEvent::Reservation(event)).await
    }

    async fn publish_registration(&self, event: RegistrationEvent) -> Result<(), PortError> {
        self.record(PublishedEvent::Registration(event)).await
    }

    async fn publish_cancellation(&self, event: CancellationEvent) -> Result<(), PortError> {
        self.record(PublishedEvent::Cancellation(event)).await
    }
}
