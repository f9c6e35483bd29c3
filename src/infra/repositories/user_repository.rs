//! User repository implementation with soft delete and role associations.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use super::entities::role::{self, Entity as RoleEntity};
use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use super::entities::user_role::{self, Entity as UserRoleEntity};
use crate::domain::{NewUser, User};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
///
/// Lookups by id or email see soft-deleted rows too; only `list_active`
/// and `find_active_by_email` filter them out.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID, including soft-deleted
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find user by email, including soft-deleted
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Find active user by email (excludes soft-deleted)
    async fn find_active_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// List all active users (excludes soft-deleted)
    async fn list_active(&self) -> AppResult<Vec<User>>;

    /// Insert a new user without roles
    async fn create(&self, user: NewUser) -> AppResult<User>;

    /// Persist every column of an existing user (role associations excluded)
    async fn save(&self, user: User) -> AppResult<User>;

    /// Replace the user's role associations, returning the stored set
    async fn sync_roles(&self, user_id: Uuid, role_ids: Vec<Uuid>) -> AppResult<Vec<Uuid>>;

    /// Role ids from the input that do not exist
    async fn missing_roles(&self, role_ids: Vec<Uuid>) -> AppResult<Vec<Uuid>>;

    /// Overwrite one user's password hash
    async fn update_password(&self, id: Uuid, password_hash: String) -> AppResult<()>;

    /// Overwrite the password hash of every row with this email, returning the row count
    async fn update_password_by_email(&self, email: &str, password_hash: String) -> AppResult<u64>;
}

/// A concurrent insert can pass the service's email lookup and still hit the
/// unique index; that surfaces as the same conflict the lookup reports.
fn insert_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::conflict("email", "The email has already been taken.")
        }
        _ => AppError::from(err),
    }
}

/// Concrete implementation of UserRepository
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Role ids per user for the given users.
    async fn role_ids_for(&self, user_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<Uuid>>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let links = UserRoleEntity::find()
            .filter(user_role::Column::UserId.is_in(user_ids.iter().copied()))
            .all(&self.db)
            .await?;

        let mut by_user: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for link in links {
            by_user.entry(link.user_id).or_default().push(link.role_id);
        }
        for roles in by_user.values_mut() {
            roles.sort();
        }
        Ok(by_user)
    }

    async fn with_roles(&self, model: Option<user::Model>) -> AppResult<Option<User>> {
        match model {
            Some(model) => {
                let mut roles = self.role_ids_for(&[model.id]).await?;
                let role_ids = roles.remove(&model.id).unwrap_or_default();
                Ok(Some(model.into_domain(role_ids)))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let result = UserEntity::find_by_id(id).one(&self.db).await?;
        self.with_roles(result).await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        self.with_roles(result).await
    }

    async fn find_active_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .filter(user::Column::IsDeleted.eq(false))
            .one(&self.db)
            .await?;
        self.with_roles(result).await
    }

    async fn list_active(&self) -> AppResult<Vec<User>> {
        let models = UserEntity::find()
            .filter(user::Column::IsDeleted.eq(false))
            .order_by_asc(user::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        let mut roles = self.role_ids_for(&ids).await?;

        Ok(models
            .into_iter()
            .map(|m| {
                let role_ids = roles.remove(&m.id).unwrap_or_default();
                m.into_domain(role_ids)
            })
            .collect())
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        let now = Utc::now();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(user.email),
            first_name: Set(user.first_name),
            last_name: Set(user.last_name),
            phone_number: Set(user.phone_number),
            user_name: Set(user.user_name),
            password_hash: Set(user.password_hash),
            is_deleted: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(insert_error)?;
        Ok(model.into_domain(Vec::new()))
    }

    async fn save(&self, user: User) -> AppResult<User> {
        let active_model = ActiveModel {
            id: Set(user.id),
            email: Set(user.email),
            first_name: Set(user.first_name),
            last_name: Set(user.last_name),
            phone_number: Set(user.phone_number),
            user_name: Set(user.user_name),
            password_hash: Set(user.password_hash),
            is_deleted: Set(user.is_deleted),
            created_at: Set(user.created_at),
            updated_at: Set(user.updated_at),
        };

        let model = active_model.update(&self.db).await.map_err(|e| match e {
            DbErr::RecordNotUpdated => AppError::NotFound,
            other => AppError::from(other),
        })?;

        Ok(model.into_domain(user.role_ids))
    }

    async fn sync_roles(&self, user_id: Uuid, role_ids: Vec<Uuid>) -> AppResult<Vec<Uuid>> {
        let unique: BTreeSet<Uuid> = role_ids.into_iter().collect();

        let txn = self.db.begin().await?;

        UserRoleEntity::delete_many()
            .filter(user_role::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        if !unique.is_empty() {
            let links = unique.iter().map(|role_id| user_role::ActiveModel {
                user_id: Set(user_id),
                role_id: Set(*role_id),
            });
            UserRoleEntity::insert_many(links).exec(&txn).await?;
        }

        txn.commit().await?;

        tracing::debug!(user_id = %user_id, roles = unique.len(), "Role associations replaced");
        Ok(unique.into_iter().collect())
    }

    async fn missing_roles(&self, role_ids: Vec<Uuid>) -> AppResult<Vec<Uuid>> {
        let wanted: BTreeSet<Uuid> = role_ids.into_iter().collect();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let found: BTreeSet<Uuid> = RoleEntity::find()
            .filter(role::Column::Id.is_in(wanted.iter().copied()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();

        Ok(wanted.difference(&found).copied().collect())
    }

    async fn update_password(&self, id: Uuid, password_hash: String) -> AppResult<()> {
        let result = UserEntity::update_many()
            .col_expr(user::Column::PasswordHash, Expr::value(password_hash))
            .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(user::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }

        Ok(())
    }

    async fn update_password_by_email(&self, email: &str, password_hash: String) -> AppResult<u64> {
        let result = UserEntity::update_many()
            .col_expr(user::Column::PasswordHash, Expr::value(password_hash))
            .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(user::Column::Email.eq(email))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_insert_errors_stay_database_errors() {
        let err = insert_error(DbErr::Custom("connection reset".to_string()));

        assert!(matches!(err, AppError::Database(_)));
    }
}
