use async_trait::async_trait;
use chrono::NaiveDate;
use common::{Money, StallId};
use domain::ports::{BookingCalendar, PortError, StallCatalog, StallSummary};
use domain::stall::StallResponse;

use crate::ServiceClient;
use crate::http::is_not_found;

/// Reads stalls from the stall service.
#[derive(Debug, Clone)]
pub struct HttpStallCatalog {
    client: ServiceClient,
}

impl HttpStallCatalog {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            client: ServiceClient::new(http, base_url, "stall-service"),
        }
    }
}

#[async_trait]
impl StallCatalog for HttpStallCatalog {
    async fn stall(&self, id: StallId) -> Result<Option<StallSummary>, PortError> {
        let request = self.client.get(&format!("/api/stalls/{id}"));
        let response = match self.client.send(request, None).await {
            Ok(response) => response,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(e),
        };

        let stall: StallResponse = self.client.json(response).await?;
        Ok(Some(StallSummary {
            id: stall.id,
            stall_code: stall.stall_code,
            name: stall.name,
            size: stall.size,
            section: stall.section,
            price_per_day: Money::from_cents(stall.price_per_day_cents),
        }))
    }
}

/// Asks the reservation service whether a stall is booked.
#[derive(Debug, Clone)]
pub struct HttpBookingCalendar {
    client: ServiceClient,
}

impl HttpBookingCalendar {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            client: ServiceClient::new(http, base_url, "reservation-service"),
        }
    }
}

#[async_trait]
impl BookingCalendar for HttpBookingCalendar {
    async fn is_stall_free(
        &self,
        stall: StallId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<bool, PortError> {
        let request = self
            .client
            .get(&format!("/api/reservations/stall/{stall}/availability"))
            .query(&[
                ("start_date", start.to_string()),
                ("end_date", end.to_string()),
            ]);
        let response = self.client.send(request, None).await?;
        self.client.envelope(response).await
    }
}
