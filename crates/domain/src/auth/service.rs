use std::sync::Arc;

use chrono::Utc;
use common::{JwtService, Role, UserId};
use store::{NewUser, StoreError, UserStore};
use validator::Validate;

use super::{
    AllUsersResponse, AuthError, DeleteUserResponse, LoginRequest, LoginResponse,
    RegisterRequest, RegisterResponse, UserResponse,
};
use crate::events::RegistrationEvent;
use crate::password::{hash_password, verify_password};
use crate::ports::{NotificationPublisher, ProfileDirectory};
use crate::profile::CreateProfileRequest;
use crate::{Caller, Result};

/// Registration, login and the user directory.
pub struct AuthService {
    users: Arc<dyn UserStore>,
    jwt: JwtService,
    profiles: Arc<dyn ProfileDirectory>,
    publisher: Arc<dyn NotificationPublisher>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        jwt: JwtService,
        profiles: Arc<dyn ProfileDirectory>,
        publisher: Arc<dyn NotificationPublisher>,
    ) -> Self {
        Self {
            users,
            jwt,
            profiles,
            publisher,
        }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    /// Creates an account, then best-effort creates its profile and
    /// announces the registration.
    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<RegisterResponse> {
        request.validate()?;
        let role: Role = request
            .role
            .parse()
            .map_err(|e: common::RoleParseError| AuthError::InvalidRole(e.to_string()))?;

        if self.users.find_user_by_email(&request.email).await?.is_some() {
            return Err(AuthError::UserExists(request.email).into());
        }

        let password_hash = hash_password(&request.password)?;
        let user = self
            .users
            .insert_user(NewUser {
                email: request.email.clone(),
                password_hash,
                role,
                full_name: request.full_name.clone(),
                phone_number: request.phone_number.clone(),
                company_name: request.company_name.clone(),
                contact_number: request.contact_number.clone(),
                owner: request.owner.clone(),
                business_reg_no: request.business_reg_no.clone(),
                address: request.address.clone(),
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AuthError::UserExists(request.email.clone()).into(),
                other => crate::DomainError::from(other),
            })?;

        metrics::counter!("auth_registrations_total").increment(1);
        tracing::info!(user_id = %user.id, "User registered");

        let profile = CreateProfileRequest {
            user_id: user.id,
            full_name: request.full_name.clone().or_else(|| request.owner.clone()),
            email: Some(user.email.clone()),
            phone_number: request.phone_number.clone().or(request.contact_number.clone()),
            company_name: request.company_name.clone(),
            business_reg_no: request.business_reg_no,
            address: request.address,
            literary_genres: request.literary_genres,
            role: role.as_str().to_string(),
            business_description: None,
            profile_image_url: None,
            website_url: None,
            facebook_url: None,
        };
        if let Err(e) = self.profiles.create_profile(profile).await {
            tracing::warn!(user_id = %user.id, error = %e, "Profile creation failed");
        }

        let event = RegistrationEvent {
            user_id: user.id.to_string(),
            email: user.email.clone(),
            user_name: user
                .full_name
                .clone()
                .or_else(|| user.owner.clone())
                .unwrap_or_else(|| user.email.clone()),
            business_name: user.company_name.clone(),
            business_type: Some(role.as_str().to_string()),
            phone_number: user.phone_number.clone().or(user.contact_number.clone()),
            registration_date: Utc::now(),
            temporary_password: None,
        };
        if let Err(e) = self.publisher.publish_registration(event).await {
            tracing::warn!(user_id = %user.id, error = %e, "Registration event not published");
        }

        Ok(RegisterResponse {
            message: format!("User registered with id {}", user.id),
            id: user.id,
            email: user.email,
        })
    }

    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse> {
        request.validate()?;

        let Some(user) = self.users.find_user_by_email(&request.email).await? else {
            metrics::counter!("auth_logins_total", "outcome" => "failure").increment(1);
            return Err(AuthError::InvalidCredentials.into());
        };

        if !verify_password(&request.password, &user.password_hash)? {
            metrics::counter!("auth_logins_total", "outcome" => "failure").increment(1);
            return Err(AuthError::InvalidCredentials.into());
        }

        let token = self
            .jwt
            .generate_token(
                user.id,
                &user.email,
                user.role,
                user.company_name.as_deref(),
            )
            .map_err(AuthError::from)?;

        metrics::counter!("auth_logins_total", "outcome" => "success").increment(1);
        tracing::info!(user_id = %user.id, "Login successful");

        Ok(LoginResponse {
            message: "Login successful".to_string(),
            token,
            user: user.into(),
        })
    }

    /// Tokens are stateless, so logout only checks that one was sent.
    pub fn logout(&self, authorization: Option<&str>) -> Result<&'static str> {
        authorization
            .and_then(JwtService::extract_from_header)
            .map(|_| "User logged out successfully.")
            .ok_or_else(|| AuthError::NoToken.into())
    }

    pub async fn user_details(&self, email: &str) -> Result<UserResponse> {
        self.users
            .find_user_by_email(email)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| AuthError::EmailNotFound(email.to_string()).into())
    }

    pub async fn user_by_id(&self, id: UserId) -> Result<UserResponse> {
        self.users
            .find_user_by_id(id)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| AuthError::UserNotFound(id).into())
    }

    pub async fn all_users(&self, caller: &Caller) -> Result<AllUsersResponse> {
        caller.require_admin()?;
        let users = self.users.list_users().await?;
        Ok(AllUsersResponse {
            users: users.into_iter().map(UserResponse::from).collect(),
        })
    }

    #[tracing::instrument(skip(self, caller), fields(admin = %caller.user_id))]
    pub async fn delete_user(&self, caller: &Caller, id: UserId) -> Result<DeleteUserResponse> {
        caller.require_admin()?;

        if !self.users.delete_user(id).await? {
            return Err(AuthError::UserNotFound(id).into());
        }
        tracing::info!(user_id = %id, "User deleted");

        if let Err(e) = self.profiles.delete_profile(id).await {
            tracing::warn!(user_id = %id, error = %e, "Profile deletion failed");
        }

        Ok(DeleteUserResponse {
            success: true,
            message: "User deleted successfully".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use store::{InMemoryStore, ProfileStore};

    use super::*;
    use crate::DomainError;
    use crate::ports::local::LocalProfileDirectory;
    use crate::ports::{PublishedEvent, RecordingPublisher, Unreachable};

    struct Fixture {
        store: Arc<InMemoryStore>,
        publisher: RecordingPublisher,
        service: AuthService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let publisher = RecordingPublisher::new();
        let service = AuthService::new(
            store.clone(),
            JwtService::default(),
            Arc::new(LocalProfileDirectory::new(store.clone())),
            Arc::new(publisher.clone()),
        );
        Fixture {
            store,
            publisher,
            service,
        }
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "secret-password".to_string(),
            role: "vendor".to_string(),
            full_name: None,
            phone_number: None,
            company_name: Some("Sarasavi".into()),
            contact_number: Some("0771234567".into()),
            owner: Some("Nimal".into()),
            business_reg_no: None,
            address: None,
            literary_genres: vec!["Fiction".into()],
        }
    }

    fn admin() -> Caller {
        Caller {
            user_id: UserId::new(100),
            email: "admin@bookfair.lk".into(),
            role: Role::Admin,
            company_name: None,
        }
    }

    #[tokio::test]
    async fn register_creates_user_profile_and_event() {
        let f = fixture();

        let response = f
            .service
            .register(register_request("v@example.com"))
            .await
            .unwrap();
        assert_eq!(response.message, format!("User registered with id {}", response.id));

        let profile = f.store.find_profile(response.id).await.unwrap().unwrap();
        assert_eq!(profile.role, Role::Vendor);
        assert_eq!(profile.literary_genres, vec!["Fiction".to_string()]);

        let events = f.publisher.events().await;
        assert!(matches!(
            &events[..],
            [PublishedEvent::Registration(e)] if e.email == "v@example.com" && e.user_name == "Nimal"
        ));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let f = fixture();
        f.service
            .register(register_request("v@example.com"))
            .await
            .unwrap();

        let err = f
            .service
            .register(register_request("v@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "User already exists with email: v@example.com");
    }

    #[tokio::test]
    async fn register_validates_input() {
        let f = fixture();

        let mut short = register_request("v@example.com");
        short.password = "short".into();
        let err = f.service.register(short).await.unwrap_err();
        assert_eq!(err.to_string(), "Password must be at least 8 characters");

        let mut bad_role = register_request("w@example.com");
        bad_role.role = "emperor".into();
        let err = f.service.register(bad_role).await.unwrap_err();
        assert!(matches!(err, DomainError::Auth(AuthError::InvalidRole(_))));
    }

    #[tokio::test]
    async fn register_survives_downstream_outages() {
        let store = Arc::new(InMemoryStore::new());
        let service = AuthService::new(
            store.clone(),
            JwtService::default(),
            Arc::new(Unreachable),
            Arc::new(Unreachable),
        );

        let response = service
            .register(register_request("v@example.com"))
            .await
            .unwrap();
        assert!(store.find_profile(response.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn login_issues_token_with_claims() {
        let f = fixture();
        let registered = f
            .service
            .register(register_request("v@example.com"))
            .await
            .unwrap();

        let response = f
            .service
            .login(LoginRequest {
                email: "v@example.com".into(),
                password: "secret-password".into(),
            })
            .await
            .unwrap();
        assert_eq!(response.message, "Login successful");
        assert_eq!(response.user.id, registered.id);

        let claims = f.service.jwt().validate_token(&response.token).unwrap();
        assert_eq!(claims.user_id().unwrap(), registered.id);
        assert_eq!(claims.role, Role::Vendor);
        assert_eq!(claims.company_name.as_deref(), Some("Sarasavi"));
        assert_eq!(claims.exp - claims.iat, 300 * 60);
    }

    #[tokio::test]
    async fn login_failures_share_one_message() {
        let f = fixture();
        f.service
            .register(register_request("v@example.com"))
            .await
            .unwrap();

        for (email, password) in [("v@example.com", "wrong-password"), ("x@example.com", "whatever1")] {
            let err = f
                .service
                .login(LoginRequest {
                    email: email.into(),
                    password: password.into(),
                })
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), "Invalid email or password");
        }
    }

    #[test]
    fn logout_requires_bearer_token() {
        let f = fixture();
        assert_eq!(
            f.service.logout(Some("Bearer abc")).unwrap(),
            "User logged out successfully."
        );
        assert_eq!(
            f.service.logout(Some("Basic abc")).unwrap_err().to_string(),
            "No token provided."
        );
        assert!(f.service.logout(None).is_err());
    }

    #[tokio::test]
    async fn admin_only_directory_operations() {
        let f = fixture();
        let registered = f
            .service
            .register(register_request("v@example.com"))
            .await
            .unwrap();

        let vendor = Caller {
            role: Role::Vendor,
            ..admin()
        };
        let err = f.service.all_users(&vendor).await.unwrap_err();
        assert_eq!(err.to_string(), "Admin access required");

        assert_eq!(f.service.all_users(&admin()).await.unwrap().users.len(), 1);

        f.service.delete_user(&admin(), registered.id).await.unwrap();
        assert!(f.store.find_profile(registered.id).await.unwrap().is_none());

        let err = f
            .service
            .delete_user(&admin(), registered.id)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("User with ID {} does not exist", registered.id)
        );
    }

    #[tokio::test]
    async fn lookups_by_email_and_id() {
        let f = fixture();
        let registered = f
            .service
            .register(register_request("v@example.com"))
            .await
            .unwrap();

        let by_email = f.service.user_details("v@example.com").await.unwrap();
        assert_eq!(by_email.id, registered.id);
        let by_id = f.service.user_by_id(registered.id).await.unwrap();
        assert_eq!(by_id.email, "v@example.com");

        assert!(f.service.user_details("none@example.com").await.is_err());
    }
}
