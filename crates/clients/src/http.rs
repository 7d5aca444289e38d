use std::time::Duration;

use common::ApiResponse;
use domain::ports::PortError;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::ClientError;

/// Per-request timeout for calls between services.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds the `reqwest::Client` shared by every adapter of a process.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ClientError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// A peer service reachable at `base_url`.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    base_url: String,
    service: &'static str,
}

impl ServiceClient {
    pub fn new(http: reqwest::Client, base_url: &str, service: &'static str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            service,
        }
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(self.url(path))
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.http.delete(self.url(path))
    }

    /// Sends the request, forwarding `token` as a bearer credential.
    ///
    /// Transport failures become `Unavailable`; non-2xx answers become
    /// `Rejected` carrying the peer's error message when it sent one.
    pub async fn send(
        &self,
        request: RequestBuilder,
        token: Option<&str>,
    ) -> Result<Response, PortError> {
        let request = match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| PortError::unavailable(self.service, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiResponse<serde_json::Value>>(&text)
            .ok()
            .and_then(|body| body.error.or(body.message))
            .unwrap_or(text);

        tracing::debug!(
            service = self.service,
            status = status.as_u16(),
            %message,
            "Peer rejected request"
        );
        Err(PortError::Rejected {
            service: self.service,
            status: status.as_u16(),
            message,
        })
    }

    /// Decodes a bare JSON body.
    pub async fn json<T: DeserializeOwned>(&self, response: Response) -> Result<T, PortError> {
        response.json().await.map_err(|e| PortError::Decode {
            service: self.service,
            reason: e.to_string(),
        })
    }

    /// Decodes an `ApiResponse` body and returns its `data`.
    pub async fn envelope<T: DeserializeOwned>(&self, response: Response) -> Result<T, PortError> {
        let body: ApiResponse<T> = self.json(response).await?;
        match body.data {
            Some(data) if body.success => Ok(data),
            _ => Err(PortError::Decode {
                service: self.service,
                reason: body
                    .error
                    .unwrap_or_else(|| "response envelope has no data".to_string()),
            }),
        }
    }
}

pub(crate) fn is_not_found(error: &PortError) -> bool {
    matches!(error, PortError::Rejected { status: 404, .. })
}
