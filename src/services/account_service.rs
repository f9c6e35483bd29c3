//! Account service - user records and their lifecycle.
//!
//! Soft-deleted rows stay reachable by id so they can still be edited;
//! only listings and the dropdown hide them.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::CredentialDelivery;
use crate::domain::{
    AuthContext, CreateUser, DropdownOption, NewUser, Password, ResetPassword, UpdateProfile,
    UpdateUser, User,
};
use crate::errors::{AppError, AppResult, FieldErrors, OptionExt};
use crate::infra::UserRepository;

/// Account service trait for dependency injection.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// All users that are not soft deleted
    async fn list_users(&self) -> AppResult<Vec<User>>;

    /// `{id, name}` pairs for active users
    async fn dropdown(&self) -> AppResult<Vec<DropdownOption>>;

    /// One user by id, soft-deleted or not
    async fn get_user(&self, id: Uuid) -> AppResult<User>;

    /// Create a user and email them their initial password.
    ///
    /// Rejected input is reported as `Conflict`. A failed email yields
    /// `EmailDelivery` while the created row is kept.
    async fn create_user(&self, request: CreateUser) -> AppResult<User>;

    /// Overwrite profile fields and, when given, role associations
    async fn update_user(&self, id: Uuid, request: UpdateUser) -> AppResult<User>;

    /// Flag the user as deleted, keeping the row
    async fn soft_delete(&self, id: Uuid) -> AppResult<()>;

    /// Overwrite the caller's own profile fields
    async fn update_profile(&self, caller: &AuthContext, request: UpdateProfile)
        -> AppResult<User>;

    /// Set a new password on the account(s) with the given email
    async fn reset_password(&self, request: ResetPassword) -> AppResult<()>;
}

/// Concrete implementation of AccountService
pub struct AccountManager {
    users: Arc<dyn UserRepository>,
    credentials: Arc<dyn CredentialDelivery>,
}

impl AccountManager {
    pub fn new(users: Arc<dyn UserRepository>, credentials: Arc<dyn CredentialDelivery>) -> Self {
        Self { users, credentials }
    }

    /// Reject role ids that do not exist.
    async fn check_roles(&self, role_ids: &[Uuid]) -> AppResult<()> {
        if role_ids.is_empty() {
            return Ok(());
        }

        let missing = self.users.missing_roles(role_ids.to_vec()).await?;
        if missing.is_empty() {
            Ok(())
        } else {
            tracing::debug!(?missing, "Unknown role ids");
            Err(AppError::validation("roleIds", "The selected role ids is invalid."))
        }
    }
}

#[async_trait]
impl AccountService for AccountManager {
    async fn list_users(&self) -> AppResult<Vec<User>> {
        self.users.list_active().await
    }

    async fn dropdown(&self) -> AppResult<Vec<DropdownOption>> {
        let users = self.users.list_active().await?;
        Ok(users.iter().map(DropdownOption::from).collect())
    }

    async fn get_user(&self, id: Uuid) -> AppResult<User> {
        self.users.find_by_id(id).await?.ok_or_not_found()
    }

    async fn create_user(&self, request: CreateUser) -> AppResult<User> {
        let mut fields = FieldErrors::from_validation(request.validate());

        if let (false, Some(email)) = (fields.has("email"), request.email.as_deref()) {
            if self.users.find_by_email(email).await?.is_some() {
                fields.add("email", "The email has already been taken.");
            }
        }

        if !fields.is_empty() {
            return Err(AppError::Conflict(fields));
        }

        let role_ids = request.role_ids.unwrap_or_default();
        self.check_roles(&role_ids).await?;

        let (Some(email), Some(first_name), Some(password)) =
            (request.email, request.first_name, request.password)
        else {
            return Err(AppError::internal("user creation passed validation without required fields"));
        };

        let password_hash = Password::new(&password)?.into_string();
        let mut user = self
            .users
            .create(NewUser {
                email,
                first_name,
                last_name: request.last_name,
                phone_number: request.phone_number,
                user_name: request.user_name,
                password_hash,
            })
            .await?;

        if !role_ids.is_empty() {
            user.role_ids = self.users.sync_roles(user.id, role_ids).await?;
        }

        tracing::info!(user_id = %user.id, "User created");

        self.credentials
            .send_login_credentials(&user, &password)
            .await?;

        Ok(user)
    }

    async fn update_user(&self, id: Uuid, request: UpdateUser) -> AppResult<User> {
        let changes = request.profile.into_changes()?;
        if let Some(role_ids) = &request.role_ids {
            self.check_roles(role_ids).await?;
        }

        let mut user = self.users.find_by_id(id).await?.ok_or_not_found()?;
        user.apply_profile(changes);

        let mut saved = self.users.save(user).await?;
        if let Some(role_ids) = request.role_ids {
            saved.role_ids = self.users.sync_roles(saved.id, role_ids).await?;
        }

        tracing::info!(user_id = %saved.id, "User updated");
        Ok(saved)
    }

    async fn soft_delete(&self, id: Uuid) -> AppResult<()> {
        let mut user = self.users.find_by_id(id).await?.ok_or_not_found()?;
        user.soft_delete();
        self.users.save(user).await?;

        tracing::info!(user_id = %id, "User soft deleted");
        Ok(())
    }

    async fn update_profile(
        &self,
        caller: &AuthContext,
        request: UpdateProfile,
    ) -> AppResult<User> {
        let changes = request.into_changes()?;

        let mut user = self
            .users
            .find_by_id(caller.user_id)
            .await?
            .ok_or_not_found()?;
        user.apply_profile(changes);

        let saved = self.users.save(user).await?;
        tracing::info!(user_id = %saved.id, "Profile updated");
        Ok(saved)
    }

    async fn reset_password(&self, request: ResetPassword) -> AppResult<()> {
        let mut fields = FieldErrors::from_validation(request.validate());

        if let (false, Some(email)) = (fields.has("email"), request.email.as_deref()) {
            if self.users.find_by_email(email).await?.is_none() {
                fields.add("email", "The selected email is invalid.");
            }
        }
        fields.into_result()?;

        let (Some(email), Some(password)) = (request.email, request.password) else {
            return Err(AppError::internal("password reset passed validation without required fields"));
        };

        let password_hash = Password::new(&password)?.into_string();
        let updated = self
            .users
            .update_password_by_email(&email, password_hash)
            .await?;

        tracing::info!(rows = updated, "Password reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MockCredentialDelivery;
    use crate::infra::MockUserRepository;
    use chrono::Utc;

    fn stored_user(email: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
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

    fn from_new(new: NewUser) -> User {
        let mut user = stored_user(&new.email);
        user.first_name = new.first_name;
        user.last_name = new.last_name;
        user.password_hash = new.password_hash;
        user
    }

    fn create_request() -> CreateUser {
        CreateUser {
            email: Some("a@b.com".to_string()),
            first_name: Some("A".to_string()),
            password: Some("p1".to_string()),
            ..Default::default()
        }
    }

    fn manager(users: MockUserRepository, credentials: MockCredentialDelivery) -> AccountManager {
        AccountManager::new(Arc::new(users), Arc::new(credentials))
    }

    #[tokio::test]
    async fn test_create_user_hashes_and_sends_credentials() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(None));
        users
            .expect_create()
            .withf(|new| {
                new.email == "a@b.com"
                    && new.password_hash != "p1"
                    && Password::from_hash(new.password_hash.clone()).verify("p1")
            })
            .times(1)
            .returning(|new| Ok(from_new(new)));

        let mut credentials = MockCredentialDelivery::new();
        credentials
            .expect_send_login_credentials()
            .withf(|user, password| user.email == "a@b.com" && password == "p1")
            .times(1)
            .returning(|_, _| Ok(()));

        let user = manager(users, credentials)
            .create_user(create_request())
            .await
            .unwrap();

        assert_eq!(user.email, "a@b.com");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_a_conflict() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|email| Ok(Some(stored_user(email))));
        users.expect_create().never();

        let mut credentials = MockCredentialDelivery::new();
        credentials.expect_send_login_credentials().never();

        let result = manager(users, credentials)
            .create_user(create_request())
            .await;

        match result {
            Err(AppError::Conflict(fields)) => {
                assert_eq!(
                    fields.get("email"),
                    Some(&["The email has already been taken.".to_string()][..])
                );
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_insert_is_a_conflict() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(None));
        users
            .expect_create()
            .times(1)
            .returning(|_| Err(AppError::conflict("email", "The email has already been taken.")));
        users.expect_sync_roles().never();

        let mut credentials = MockCredentialDelivery::new();
        credentials.expect_send_login_credentials().never();

        let result = manager(users, credentials)
            .create_user(create_request())
            .await;

        match result {
            Err(err @ AppError::Conflict(_)) => {
                assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);
                assert_eq!(
                    err.fields().and_then(|f| f.get("email")),
                    Some(&["The email has already been taken.".to_string()][..])
                );
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_fields_are_a_conflict() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().never();
        users.expect_create().never();

        let result = manager(users, MockCredentialDelivery::new())
            .create_user(CreateUser::default())
            .await;

        match result {
            Err(AppError::Conflict(fields)) => {
                assert!(fields.has("email"));
                assert!(fields.has("firstName"));
                assert!(fields.has("password"));
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_roles_rejected_before_insert() {
        let unknown = Uuid::new_v4();

        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(None));
        users
            .expect_missing_roles()
            .returning(|ids| Ok(ids));
        users.expect_create().never();

        let mut request = create_request();
        request.role_ids = Some(vec![unknown]);

        let result = manager(users, MockCredentialDelivery::new())
            .create_user(request)
            .await;

        match result {
            Err(AppError::Validation(fields)) => assert!(fields.has("roleIds")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_roles() {
        let role = Uuid::new_v4();

        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(None));
        users.expect_missing_roles().returning(|_| Ok(vec![]));
        users.expect_create().returning(|new| Ok(from_new(new)));
        users
            .expect_sync_roles()
            .times(1)
            .returning(|_, ids| Ok(ids));

        let mut credentials = MockCredentialDelivery::new();
        credentials
            .expect_send_login_credentials()
            .returning(|_, _| Ok(()));

        let mut request = create_request();
        request.role_ids = Some(vec![role]);

        let user = manager(users, credentials).create_user(request).await.unwrap();
        assert_eq!(user.role_ids, vec![role]);
    }

    #[tokio::test]
    async fn test_soft_delete_only_sets_flag() {
        let original = stored_user("a@b.com");
        let id = original.id;

        let mut users = MockUserRepository::new();
        let found = original.clone();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        let expected = original.clone();
        users
            .expect_save()
            .withf(move |user| {
                let mut restored = user.clone();
                restored.is_deleted = false;
                user.is_deleted && restored == expected
            })
            .times(1)
            .returning(Ok);

        let result = manager(users, MockCredentialDelivery::new())
            .soft_delete(id)
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(None));

        let result = manager(users, MockCredentialDelivery::new())
            .get_user(Uuid::new_v4())
            .await;

        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_without_role_ids_keeps_roles() {
        let mut original = stored_user("a@b.com");
        original.role_ids = vec![Uuid::new_v4()];
        let roles = original.role_ids.clone();

        let mut users = MockUserRepository::new();
        let found = original.clone();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        users.expect_save().returning(Ok);
        users.expect_sync_roles().never();

        let request = UpdateUser {
            profile: UpdateProfile {
                first_name: Some("Grace".to_string()),
                email: Some("g@h.com".to_string()),
                ..Default::default()
            },
            role_ids: None,
        };

        let user = manager(users, MockCredentialDelivery::new())
            .update_user(original.id, request)
            .await
            .unwrap();

        assert_eq!(user.first_name, "Grace");
        assert_eq!(user.email, "g@h.com");
        assert_eq!(user.last_name, None);
        assert_eq!(user.role_ids, roles);
        assert_eq!(user.password_hash, "hash");
    }

    #[tokio::test]
    async fn test_dropdown_names() {
        let mut users = MockUserRepository::new();
        users.expect_list_active().returning(|| {
            let mut solo = stored_user("s@b.com");
            solo.first_name = "Solo".to_string();
            solo.last_name = None;
            Ok(vec![stored_user("a@b.com"), solo])
        });

        let options = manager(users, MockCredentialDelivery::new())
            .dropdown()
            .await
            .unwrap();

        let names: Vec<_> = options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Ada Lovelace", "Solo"]);
    }

    #[tokio::test]
    async fn test_reset_password_unknown_email() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(None));
        users.expect_update_password_by_email().never();

        let request = ResetPassword {
            email: Some("nobody@b.com".to_string()),
            password: Some("p2".to_string()),
        };

        let result = manager(users, MockCredentialDelivery::new())
            .reset_password(request)
            .await;

        match result {
            Err(AppError::Validation(fields)) => {
                assert_eq!(
                    fields.get("email"),
                    Some(&["The selected email is invalid.".to_string()][..])
                );
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reset_password_hashes_new_password() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|email| Ok(Some(stored_user(email))));
        users
            .expect_update_password_by_email()
            .withf(|email, hash| email == "a@b.com" && Password::from_hash(hash.clone()).verify("p2"))
            .times(1)
            .returning(|_, _| Ok(1));

        let request = ResetPassword {
            email: Some("a@b.com".to_string()),
            password: Some("p2".to_string()),
        };

        let result = manager(users, MockCredentialDelivery::new())
            .reset_password(request)
            .await;

        assert!(result.is_ok());
    }
}
