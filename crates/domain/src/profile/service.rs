use std::sync::Arc;

use common::UserId;
use store::{ProfileRecord, ProfileStore, StoreError};
use validator::Validate;

use super::{
    CreateProfileRequest, ProfileError, RichProfileRequest, UpdateProfileRequest,
    VendorDashboard,
};
use crate::Result;
use crate::ports::{AccountDirectory, ReservationDirectory};

/// Manages vendor profiles and assembles the vendor dashboard.
pub struct ProfileService {
    profiles: Arc<dyn ProfileStore>,
    reservations: Arc<dyn ReservationDirectory>,
    accounts: Arc<dyn AccountDirectory>,
}

impl ProfileService {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        reservations: Arc<dyn ReservationDirectory>,
        accounts: Arc<dyn AccountDirectory>,
    ) -> Self {
        Self {
            profiles,
            reservations,
            accounts,
        }
    }

    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn create(&self, request: CreateProfileRequest) -> Result<ProfileRecord> {
        request.validate()?;
        let user_id = request.user_id;
        let profile = request.into_new_profile()?;

        match self.profiles.insert_profile(profile).await {
            Ok(created) => {
                tracing::info!(profile_id = created.id, "Profile created");
                Ok(created)
            }
            Err(StoreError::Conflict(_)) => Err(ProfileError::AlreadyExists(user_id).into()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, user_id: UserId) -> Result<ProfileRecord> {
        self.profiles
            .find_profile(user_id)
            .await?
            .ok_or_else(|| ProfileError::NotFound(user_id).into())
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update(
        &self,
        user_id: UserId,
        patch: UpdateProfileRequest,
    ) -> Result<ProfileRecord> {
        let mut profile = self.get(user_id).await?;
        patch.apply(&mut profile);
        Ok(self.profiles.update_profile(profile).await?)
    }

    pub async fn update_rich_info(
        &self,
        user_id: UserId,
        rich: RichProfileRequest,
    ) -> Result<ProfileRecord> {
        self.update(user_id, rich.into()).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn replace_genres(
        &self,
        user_id: UserId,
        genres: Vec<String>,
    ) -> Result<ProfileRecord> {
        let mut profile = self.get(user_id).await?;
        profile.literary_genres = genres;
        Ok(self.profiles.update_profile(profile).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, user_id: UserId) -> Result<()> {
        if self.profiles.delete_profile(user_id).await? {
            tracing::info!("Profile deleted");
            Ok(())
        } else {
            Err(ProfileError::NotFound(user_id).into())
        }
    }

    pub async fn search_by_genre(&self, genre: &str) -> Result<Vec<ProfileRecord>> {
        Ok(self.profiles.search_profiles_by_genre(genre).await?)
    }

    /// Profile plus reservations and account details.
    ///
    /// Either remote lookup failing leaves its part empty instead of
    /// failing the whole dashboard.
    #[tracing::instrument(skip(self, token))]
    pub async fn dashboard(&self, user_id: UserId, token: Option<&str>) -> Result<VendorDashboard> {
        let profile = self.get(user_id).await?;

        let reservations = match self.reservations.reservations_for_user(user_id, token).await {
            Ok(reservations) => reservations,
            Err(e) => {
                tracing::warn!(error = %e, "Reservation lookup failed, showing none");
                Vec::new()
            }
        };

        let account_details = match profile.email.as_deref() {
            Some(email) => match self.accounts.account_by_email(email, token).await {
                Ok(account) => account,
                Err(e) => {
                    tracing::warn!(error = %e, "Account lookup failed");
                    None
                }
            },
            None => None,
        };

        Ok(VendorDashboard {
            total_reservations: reservations.len(),
            reservations,
            account_details,
            profile,
        })
    }
}

#[cfg(test)]
mod tests {
    use common::Role;
    use store::InMemoryStore;

    use super::*;
    use crate::DomainError;
    use crate::ports::Unreachable;
    use crate::ports::local::{LocalAccountDirectory, LocalReservationDirectory};

    fn service_with(store: &Arc<InMemoryStore>) -> ProfileService {
        ProfileService::new(
            store.clone(),
            Arc::new(LocalReservationDirectory::new(store.clone())),
            Arc::new(LocalAccountDirectory::new(store.clone())),
        )
    }

    fn request(user: i64) -> CreateProfileRequest {
        let mut request = CreateProfileRequest::for_user(UserId::new(user), Role::Vendor);
        request.email = Some(format!("vendor{user}@example.com"));
        request.company_name = Some("Godage".into());
        request.literary_genres = vec!["Fiction".into()];
        request
    }

    #[tokio::test]
    async fn create_then_get() {
        let store = Arc::new(InMemoryStore::new());
        let service = service_with(&store);

        let created = service.create(request(1)).await.unwrap();
        assert_eq!(created.role, Role::Vendor);
        assert_eq!(service.get(UserId::new(1)).await.unwrap().id, created.id);
    }

    #[tokio::test]
    async fn duplicate_user_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let service = service_with(&store);

        service.create(request(1)).await.unwrap();
        let err = service.create(request(1)).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Profile(ProfileError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn invalid_email_fails_validation() {
        let store = Arc::new(InMemoryStore::new());
        let service = service_with(&store);

        let mut bad = request(1);
        bad.email = Some("not-an-email".into());
        let err = service.create(bad).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid email format");
    }

    #[tokio::test]
    async fn missing_profile_message() {
        let store = Arc::new(InMemoryStore::new());
        let service = service_with(&store);

        let err = service.get(UserId::new(99)).await.unwrap_err();
        assert_eq!(err.to_string(), "User not found: 99");
        assert!(service.delete(UserId::new(99)).await.is_err());
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let store = Arc::new(InMemoryStore::new());
        let service = service_with(&store);
        service.create(request(1)).await.unwrap();

        let updated = service
            .update(
                UserId::new(1),
                UpdateProfileRequest {
                    phone_number: Some("0711111111".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.phone_number.as_deref(), Some("0711111111"));
        assert_eq!(updated.company_name.as_deref(), Some("Godage"));

        let rich = service
            .update_rich_info(
                UserId::new(1),
                RichProfileRequest {
                    website_url: Some("https://godage.lk".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(rich.website_url.as_deref(), Some("https://godage.lk"));
        assert_eq!(rich.phone_number.as_deref(), Some("0711111111"));
    }

    #[tokio::test]
    async fn genres_replace_and_search() {
        let store = Arc::new(InMemoryStore::new());
        let service = service_with(&store);
        service.create(request(1)).await.unwrap();
        service.create(request(2)).await.unwrap();

        service
            .replace_genres(UserId::new(2), vec!["Poetry".into()])
            .await
            .unwrap();

        let fiction = service.search_by_genre("FICTION").await.unwrap();
        assert_eq!(fiction.len(), 1);
        assert_eq!(fiction[0].user_id, UserId::new(1));
    }

    #[tokio::test]
    async fn dashboard_degrades_when_dependencies_fail() {
        let store = Arc::new(InMemoryStore::new());
        let service = ProfileService::new(
            store.clone(),
            Arc::new(Unreachable),
            Arc::new(Unreachable),
        );
        service.create(request(1)).await.unwrap();

        let dashboard = service.dashboard(UserId::new(1), Some("t")).await.unwrap();
        assert!(dashboard.reservations.is_empty());
        assert_eq!(dashboard.total_reservations, 0);
        assert!(dashboard.account_details.is_none());
    }

    #[tokio::test]
    async fn dashboard_for_missing_profile_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let service = service_with(&store);

        let err = service.dashboard(UserId::new(5), None).await.unwrap_err();
        assert!(matches!(err, DomainError::Profile(ProfileError::NotFound(_))));
    }
}
