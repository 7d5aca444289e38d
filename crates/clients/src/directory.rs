use async_trait::async_trait;
use common::UserId;
use domain::auth::UserResponse;
use domain::ports::{AccountDirectory, PortError, ProfileDirectory, ReservationDirectory};
use domain::profile::CreateProfileRequest;
use domain::reservation::ReservationResponse;

use crate::ServiceClient;
use crate::http::is_not_found;

#[derive(Debug, Clone)]
pub struct HttpProfileDirectory {
    client: ServiceClient,
}

impl HttpProfileDirectory {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            client: ServiceClient::new(http, base_url, "profile-service"),
        }
    }
}

#[async_trait]
impl ProfileDirectory for HttpProfileDirectory {
    async fn create_profile(&self, request: CreateProfileRequest) -> Result<(), PortError> {
        let request = self.client.post("/api/profiles").json(&request);
        self.client.send(request, None).await?;
        Ok(())
    }

    async fn delete_profile(&self, user_id: UserId) -> Result<(), PortError> {
        let request = self.client.delete(&format!("/api/profiles/{user_id}"));
        self.client.send(request, None).await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct HttpReservationDirectory {
    client: ServiceClient,
}

impl HttpReservationDirectory {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            client: ServiceClient::new(http, base_url, "reservation-service"),
        }
    }
}

#[async_trait]
impl ReservationDirectory for HttpReservationDirectory {
    async fn reservations_for_user(
        &self,
        user_id: UserId,
        token: Option<&str>,
    ) -> Result<Vec<ReservationResponse>, PortError> {
        let request = self
            .client
            .get(&format!("/api/reservations/user/{user_id}"));
        let response = self.client.send(request, token).await?;
        self.client.envelope(response).await
    }
}

#[derive(Debug, Clone)]
pub struct HttpAccountDirectory {
    client: ServiceClient,
}

impl HttpAccountDirectory {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            client: ServiceClient::new(http, base_url, "auth-service"),
        }
    }
}

#[async_trait]
impl AccountDirectory for HttpAccountDirectory {
    async fn account_by_email(
        &self,
        email: &str,
        token: Option<&str>,
    ) -> Result<Option<UserResponse>, PortError> {
        let request = self
            .client
            .get("/api/auth/user/details")
            .query(&[("email", email)]);
        match self.client.send(request, token).await {
            Ok(response) => self.client.json(response).await.map(Some),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
