//! User domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::errors::{AppError, AppResult, FieldErrors};

/// User domain entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub user_name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Soft delete flag (row is retained)
    pub is_deleted: bool,
    pub role_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Check if user is soft deleted
    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    /// First and last name joined for display.
    pub fn display_name(&self) -> String {
        match self.last_name.as_deref().map(str::trim) {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }

    /// Overwrite the editable profile fields. The password is never touched here.
    pub fn apply_profile(&mut self, changes: ProfileChanges) {
        self.first_name = changes.first_name;
        self.last_name = changes.last_name;
        self.phone_number = changes.phone_number;
        self.user_name = changes.user_name;
        self.email = changes.email;
        self.updated_at = Utc::now();
    }

    /// Soft delete the user. Only the flag changes.
    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
    }
}

/// Fields needed to insert a new user row.
#[derive(Clone, PartialEq)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub user_name: Option<String>,
    pub password_hash: String,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("password_hash", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// User creation request
#[derive(Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    /// User email address
    #[validate(
        required(message = "The email field is required."),
        email(message = "The email must be a valid email address.")
    )]
    #[schema(example = "a@b.com")]
    pub email: Option<String>,
    /// Given name
    #[validate(
        required(message = "The first name field is required."),
        length(min = 1, message = "The first name field is required.")
    )]
    #[schema(example = "Ada")]
    pub first_name: Option<String>,
    #[schema(example = "Lovelace")]
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub user_name: Option<String>,
    /// Initial password, emailed to the user once
    #[validate(
        required(message = "The password field is required."),
        length(min = 1, message = "The password field is required.")
    )]
    #[schema(example = "p1")]
    pub password: Option<String>,
    /// Roles to associate with the new account
    pub role_ids: Option<Vec<Uuid>>,
}

impl std::fmt::Debug for CreateUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateUser")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("password", &"[REDACTED]")
            .field("role_ids", &self.role_ids)
            .finish_non_exhaustive()
    }
}

/// Profile fields shared by the admin update and the self-service profile update.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    #[validate(
        required(message = "The first name field is required."),
        length(min = 1, message = "The first name field is required.")
    )]
    #[schema(example = "Ada")]
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub user_name: Option<String>,
    #[validate(
        required(message = "The email field is required."),
        email(message = "The email must be a valid email address.")
    )]
    #[schema(example = "a@b.com")]
    pub email: Option<String>,
}

/// Validated profile overwrite.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileChanges {
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub user_name: Option<String>,
    pub email: String,
}

impl UpdateProfile {
    /// Check required fields and produce the overwrite set.
    pub fn into_changes(self) -> AppResult<ProfileChanges> {
        FieldErrors::from_validation(self.validate()).into_result()?;

        let (Some(first_name), Some(email)) = (self.first_name, self.email) else {
            return Err(AppError::internal("profile passed validation without required fields"));
        };

        Ok(ProfileChanges {
            first_name,
            last_name: self.last_name,
            phone_number: self.phone_number,
            user_name: self.user_name,
            email,
        })
    }
}

/// Admin update request. A `password` key in the body is ignored.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    #[serde(flatten)]
    pub profile: UpdateProfile,
    /// Replaces the role associations when present
    pub role_ids: Option<Vec<Uuid>>,
}

/// User response (safe to return to client)
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    #[schema(example = "a@b.com")]
    pub email: String,
    #[schema(example = "Ada")]
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub user_name: Option<String>,
    pub is_deleted: bool,
    pub role_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone_number: user.phone_number,
            user_name: user.user_name,
            is_deleted: user.is_deleted,
            role_ids: user.role_ids,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Entry of the user picker list
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DropdownOption {
    pub id: Uuid,
    #[schema(example = "Ada Lovelace")]
    pub name: String,
}

impl From<&User> for DropdownOption {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.display_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "a@b.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: Some("Lovelace".to_string()),
            phone_number: None,
            user_name: None,
            password_hash: "hash".to_string(),
            is_deleted: false,
            role_ids: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_display_name() {
        let mut u = user();
        assert_eq!(u.display_name(), "Ada Lovelace");

        u.last_name = None;
        assert_eq!(u.display_name(), "Ada");

        u.last_name = Some("  ".to_string());
        assert_eq!(u.display_name(), "Ada");
    }

    #[test]
    fn test_soft_delete_only_flips_flag() {
        let original = user();
        let mut deleted = original.clone();
        deleted.soft_delete();

        assert!(deleted.is_deleted());
        deleted.is_deleted = false;
        assert_eq!(deleted, original);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(user()).unwrap();

        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["isDeleted"], false);
    }

    #[test]
    fn test_create_user_validation_messages() {
        let request = CreateUser {
            email: Some("not-an-email".to_string()),
            first_name: Some(String::new()),
            ..Default::default()
        };

        let errors = FieldErrors::from_validation(request.validate());

        assert_eq!(
            errors.get("email"),
            Some(&["The email must be a valid email address.".to_string()][..])
        );
        assert!(errors.has("firstName"));
        assert!(errors.has("password"));
    }

    #[test]
    fn test_profile_requires_first_name_and_email() {
        let result = UpdateProfile::default().into_changes();

        match result {
            Err(AppError::Validation(fields)) => {
                assert!(fields.has("firstName"));
                assert!(fields.has("email"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_profile_rejects_malformed_email() {
        let request = UpdateProfile {
            first_name: Some("Ada".to_string()),
            email: Some("not-an-email".to_string()),
            ..Default::default()
        };

        match request.into_changes() {
            Err(AppError::Validation(fields)) => {
                assert!(fields.has("email"));
                assert!(!fields.has("firstName"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_update_user_ignores_password_key() {
        let body = serde_json::json!({
            "firstName": "Grace",
            "email": "g@h.com",
            "password": "should-not-matter",
            "roleIds": []
        });

        let request: UpdateUser = serde_json::from_value(body).unwrap();
        let changes = request.profile.into_changes().unwrap();

        assert_eq!(changes.first_name, "Grace");
        assert_eq!(request.role_ids, Some(vec![]));
    }
}
