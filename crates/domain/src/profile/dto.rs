use common::{Role, UserId};
use serde::{Deserialize, Serialize};
use store::{NewProfile, ProfileRecord};
use validator::Validate;

use super::ProfileError;
use crate::auth::UserResponse;
use crate::reservation::ReservationResponse;

fn default_role() -> String {
    Role::Vendor.as_str().to_string()
}

/// Body of `POST /api/profiles`. Also sent by the auth service on registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CreateProfileRequest {
    pub user_id: UserId,
    pub full_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub company_name: Option<String>,
    pub business_reg_no: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub literary_genres: Vec<String>,
    #[serde(default = "default_role")]
    pub role: String,
    pub business_description: Option<String>,
    pub profile_image_url: Option<String>,
    pub website_url: Option<String>,
    pub facebook_url: Option<String>,
}

impl CreateProfileRequest {
    /// A request with only the user and role set.
    pub fn for_user(user_id: UserId, role: Role) -> Self {
        Self {
            user_id,
            full_name: None,
            email: None,
            phone_number: None,
            company_name: None,
            business_reg_no: None,
            address: None,
            literary_genres: Vec::new(),
            role: role.as_str().to_string(),
            business_description: None,
            profile_image_url: None,
            website_url: None,
            facebook_url: None,
        }
    }

    /// Parses the role, which normalizes its case.
    pub fn into_new_profile(self) -> Result<NewProfile, ProfileError> {
        let role: Role = self
            .role
            .parse()
            .map_err(|e: common::RoleParseError| ProfileError::InvalidRole(e.to_string()))?;

        Ok(NewProfile {
            user_id: self.user_id,
            full_name: self.full_name,
            email: self.email,
            phone_number: self.phone_number,
            company_name: self.company_name,
            business_reg_no: self.business_reg_no,
            address: self.address,
            literary_genres: self.literary_genres,
            role,
            business_description: self.business_description,
            profile_image_url: self.profile_image_url,
            website_url: self.website_url,
            facebook_url: self.facebook_url,
        })
    }
}

/// Partial update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub company_name: Option<String>,
    pub address: Option<String>,
    pub business_description: Option<String>,
    pub profile_image_url: Option<String>,
    pub website_url: Option<String>,
    pub facebook_url: Option<String>,
}

impl UpdateProfileRequest {
    pub(super) fn apply(self, profile: &mut ProfileRecord) {
        fn set(field: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *field = value;
            }
        }

        set(&mut profile.full_name, self.full_name);
        set(&mut profile.phone_number, self.phone_number);
        set(&mut profile.company_name, self.company_name);
        set(&mut profile.address, self.address);
        set(&mut profile.business_description, self.business_description);
        set(&mut profile.profile_image_url, self.profile_image_url);
        set(&mut profile.website_url, self.website_url);
        set(&mut profile.facebook_url, self.facebook_url);
    }
}

/// Partial update of the public-facing fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RichProfileRequest {
    pub business_description: Option<String>,
    pub profile_image_url: Option<String>,
    pub website_url: Option<String>,
    pub facebook_url: Option<String>,
}

impl From<RichProfileRequest> for UpdateProfileRequest {
    fn from(rich: RichProfileRequest) -> Self {
        Self {
            business_description: rich.business_description,
            profile_image_url: rich.profile_image_url,
            website_url: rich.website_url,
            facebook_url: rich.facebook_url,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenresRequest {
    pub literary_genres: Vec<String>,
}

/// Everything the vendor dashboard shows on one page.
#[derive(Debug, Clone, Serialize)]
pub struct VendorDashboard {
    pub profile: ProfileRecord,
    pub reservations: Vec<ReservationResponse>,
    pub total_reservations: usize,
    pub account_details: Option<UserResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_is_normalized() {
        let mut request = CreateProfileRequest::for_user(UserId::new(1), Role::Vendor);
        request.role = "admin".into();
        assert_eq!(request.into_new_profile().unwrap().role, Role::Admin);
    }

    #[test]
    fn unknown_role_is_rejected() {
        let mut request = CreateProfileRequest::for_user(UserId::new(1), Role::Vendor);
        request.role = "publisher".into();
        assert!(matches!(
            request.into_new_profile(),
            Err(ProfileError::InvalidRole(_))
        ));
    }

    #[test]
    fn role_defaults_to_vendor() {
        let request: CreateProfileRequest =
            serde_json::from_value(serde_json::json!({ "user_id": 4 })).unwrap();
        assert_eq!(request.role, "VENDOR");
        assert!(request.literary_genres.is_empty());
    }
}
