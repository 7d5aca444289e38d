//! Request extractors: bearer authentication plus JSON bodies and query
//! strings whose rejections render as the error envelope.

use std::convert::Infallible;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{
    FromRef, FromRequest, FromRequestParts, OptionalFromRequest, Query, Request,
};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use common::JwtService;
use domain::Caller;

use crate::error::ApiError;

/// The raw `Authorization` header, if any.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationHeader(pub Option<String>);

impl AuthorizationHeader {
    /// The bearer token inside the header.
    pub fn token(&self) -> Option<&str> {
        self.0.as_deref().and_then(JwtService::extract_from_header)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthorizationHeader {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(Self(value))
    }
}

/// The caller authenticated by a valid bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub caller: Caller,
    /// The token itself, for forwarding to other services.
    pub token: String,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    JwtService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .unwrap_or_default();
        let token = header
            .token()
            .ok_or_else(|| ApiError::Unauthorized("Authorization token required".into()))?;

        let jwt = JwtService::from_ref(state);
        let caller = jwt
            .validate_token(token)
            .and_then(Caller::try_from)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected bearer token");
                ApiError::Unauthorized("Invalid or expired token".into())
            })?;

        Ok(Self {
            caller,
            token: token.to_string(),
        })
    }
}

/// A JSON request body. Malformed or mistyped bodies are a 400 envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(
            status = %rejection.status(),
            error = %rejection.body_text(),
            "Rejected request body"
        );
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected query string");
        ApiError::BadRequest(rejection.body_text())
    }
}

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = <Json<T> as FromRequest<S>>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// A body without a JSON content type is absent; a broken one still rejects.
impl<S, T> OptionalFromRequest<S> for ApiJson<T>
where
    Json<T>: OptionalFromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        let value = <Json<T> as OptionalFromRequest<S>>::from_request(req, state).await?;
        Ok(value.map(|Json(value)| Self(value)))
    }
}

/// Query parameters. Missing or unparsable fields are a 400 envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) =
            <Query<T> as FromRequestParts<S>>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use axum::http::header::CONTENT_TYPE;
    use common::{Role, UserId};
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Range {
        start_date: chrono::NaiveDate,
        end_date: chrono::NaiveDate,
    }

    async fn extract(header: Option<&str>) -> Result<CurrentUser, ApiError> {
        let mut builder = Request::builder().uri("/");
        if let Some(header) = header {
            builder = builder.header(AUTHORIZATION, header);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        CurrentUser::from_request_parts(&mut parts, &JwtService::default()).await
    }

    #[tokio::test]
    async fn accepts_valid_token() {
        let token = JwtService::default()
            .generate_token(UserId::new(4), "v@example.com", Role::Vendor, None)
            .unwrap();
        let user = extract(Some(&format!("Bearer {token}"))).await.unwrap();

        assert_eq!(user.caller.user_id, UserId::new(4));
        assert_eq!(user.caller.role, Role::Vendor);
        assert_eq!(user.token, token);
    }

    #[tokio::test]
    async fn missing_and_invalid_tokens_are_distinguished() {
        let missing = extract(None).await.unwrap_err();
        assert!(matches!(missing, ApiError::Unauthorized(ref m) if m == "Authorization token required"));

        let basic = extract(Some("Basic dXNlcg==")).await.unwrap_err();
        assert!(matches!(basic, ApiError::Unauthorized(ref m) if m == "Authorization token required"));

        let garbage = extract(Some("Bearer not.a.jwt")).await.unwrap_err();
        assert!(matches!(garbage, ApiError::Unauthorized(ref m) if m == "Invalid or expired token"));
    }

    fn json_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn parse_json(body: &str) -> Result<ApiJson<Range>, ApiError> {
        <ApiJson<Range> as FromRequest<()>>::from_request(json_request(body), &()).await
    }

    #[tokio::test]
    async fn json_rejections_become_bad_request() {
        let missing = parse_json(r#"{"start_date":"2099-01-01"}"#).await.unwrap_err();
        assert_eq!(missing.status(), axum::http::StatusCode::BAD_REQUEST);
        assert!(matches!(missing, ApiError::BadRequest(ref m) if m.contains("end_date")));

        let broken = parse_json("{not json").await.unwrap_err();
        assert!(matches!(broken, ApiError::BadRequest(_)));

        let ApiJson(range) = parse_json(r#"{"start_date":"2099-01-01","end_date":"2099-01-03"}"#)
            .await
            .unwrap();
        assert!(range.start_date < range.end_date);
    }

    #[tokio::test]
    async fn optional_json_is_absent_without_content_type() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let body = <ApiJson<Range> as OptionalFromRequest<()>>::from_request(request, &())
            .await
            .unwrap();
        assert!(body.is_none());

        let broken =
            <ApiJson<Range> as OptionalFromRequest<()>>::from_request(json_request("[1,"), &())
                .await
                .unwrap_err();
        assert!(matches!(broken, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn query_rejections_become_bad_request() {
        let (mut parts, ()) = Request::builder()
            .uri("/availability?start_date=2099-01-01")
            .body(())
            .unwrap()
            .into_parts();
        let err = ApiQuery::<Range>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m.contains("end_date")));

        let (mut parts, ()) = Request::builder()
            .uri("/availability?start_date=2099-01-01&end_date=2099-01-02")
            .body(())
            .unwrap()
            .into_parts();
        let ApiQuery(range) = ApiQuery::<Range>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(range.end_date.to_string(), "2099-01-02");
    }
}
