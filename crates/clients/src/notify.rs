use async_trait::async_trait;
use domain::ports::{NotificationPublisher, PortError};
use domain::{CancellationEvent, RegistrationEvent, ReservationEvent};
use serde::Serialize;

use crate::ServiceClient;

/// Posts events to the notification service's intake endpoints.
#[derive(Debug, Clone)]
pub struct HttpNotificationPublisher {
    client: ServiceClient,
}

impl HttpNotificationPublisher {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            client: ServiceClient::new(http, base_url, "notification-service"),
        }
    }

    async fn post<E: Serialize + Sync>(&self, kind: &str, event: &E) -> Result<(), PortError> {
        let request = self
            .client
            .post(&format!("/api/notifications/events/{kind}"))
            .json(event);
        self.client.send(request, None).await?;
        tracing::debug!(kind, "Event handed to notification service");
        Ok(())
    }
}

#[async_trait]
impl NotificationPublisher for HttpNotificationPublisher {
    async fn publish_reservation(&self, event: ReservationEvent) -> Result<(), PortError> {
        self.post("reservation", &event).await
    }

    async fn publish_registration(&self, event: RegistrationEvent) -> Result<(), PortError> {
        self.post("registration", &event).await
    }

    async fn publish_cancellation(&self, event: CancellationEvent) -> Result<(), PortError> {
        self.post("cancellation", &event).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use httpmock::prelude::*;

    use super::*;

    #[tokio::test]
    async fn posts_registration_event() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/notifications/events/registration")
                .json_body_partial(r#"{"email": "v@example.com", "user_name": "Vendor"}"#);
            then.status(202);
        });

        let publisher = HttpNotificationPublisher::new(reqwest::Client::new(), &server.base_url());
        publisher
            .publish_registration(RegistrationEvent {
                user_id: "1".into(),
                email: "v@example.com".into(),
                user_name: "Vendor".into(),
                business_name: None,
                business_type: None,
                phone_number: None,
                registration_date: Utc::now(),
                temporary_password: None,
            })
            .await
            .unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn rejected_event_surfaces_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/notifications/events/cancellation");
            then.status(400).json_body(serde_json::json!({
                "success": false,
                "error": "Recipient email is required",
                "timestamp": 0
            }));
        });

        let publisher = HttpNotificationPublisher::new(reqwest::Client::new(), &server.base_url());
        let err = publisher
            .publish_cancellation(CancellationEvent {
                reservation_id: "9".into(),
                user_id: "1".into(),
                user_email: String::new(),
                user_name: "Vendor".into(),
                reason: None,
                cancelled_at: Utc::now(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PortError::Rejected { status: 400, ref message, .. } if message == "Recipient email is required"
        ));
    }
}
