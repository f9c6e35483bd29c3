//! User management handlers.
//!
//! Every route here sits behind the bearer-token middleware.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post, put},
    Extension, Router,
};
use uuid::Uuid;

use crate::api::extractors::AppJson;
use crate::api::AppState;
use crate::domain::{
    AuthContext, ChangePassword, CreateUser, DropdownOption, ResetPassword, UpdateProfile,
    UpdateUser, UserResponse,
};
use crate::errors::AppResult;
use crate::types::{Created, MessageResponse, NoContent};

const PASSWORD_CHANGED: &str = "Password changed successfully. OTP sent to your email.";

/// Create user routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/dropdown", get(dropdown))
        .route("/profile", put(update_profile))
        .route("/reset-password", post(reset_password))
        .route("/change-password", post(change_password))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

/// List active users
#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active users", body = Vec<UserResponse>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserResponse>>> {
    let users = state.account_service.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Active users as `{id, name}` options
#[utoipa::path(
    get,
    path = "/users/dropdown",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dropdown options", body = Vec<DropdownOption>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn dropdown(State(state): State<AppState>) -> AppResult<Json<Vec<DropdownOption>>> {
    Ok(Json(state.account_service.dropdown().await?))
}

/// Create a user and email the initial password
#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 409, description = "Invalid or duplicate input"),
        (status = 422, description = "Unknown role ids"),
        (status = 500, description = "User created but the email could not be sent")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateUser>,
) -> AppResult<Created<UserResponse>> {
    let user = state.account_service.create_user(payload).await?;
    Ok(Created(UserResponse::from(user)))
}

/// Get a user by ID (soft-deleted users included)
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let user = state.account_service.get_user(id).await?;
    Ok(Json(UserResponse::from(user)))
}

/// Update a user's profile fields and roles
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 404, description = "User not found"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateUser>,
) -> AppResult<Json<UserResponse>> {
    let user = state.account_service.update_user(id, payload).await?;
    Ok(Json(UserResponse::from(user)))
}

/// Soft delete a user
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User soft deleted"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state.account_service.soft_delete(id).await?;
    Ok(NoContent)
}

/// Update the caller's own profile
#[utoipa::path(
    put,
    path = "/users/profile",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = UpdateProfile,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 404, description = "Caller no longer exists"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    AppJson(payload): AppJson<UpdateProfile>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .account_service
        .update_profile(&caller, payload)
        .await?;
    Ok(Json(UserResponse::from(user)))
}

/// Set a new password on the account with the given email
#[utoipa::path(
    post,
    path = "/users/reset-password",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = ResetPassword,
    responses(
        (status = 204, description = "Password reset"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ResetPassword>,
) -> AppResult<NoContent> {
    state.account_service.reset_password(payload).await?;
    Ok(NoContent)
}

/// Change the caller's password and email them a one-time code
#[utoipa::path(
    post,
    path = "/users/change-password",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = ChangePassword,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 422, description = "Missing fields or old password mismatch"),
        (status = 500, description = "Password changed but the code email failed")
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthContext>,
    AppJson(payload): AppJson<ChangePassword>,
) -> AppResult<Json<MessageResponse>> {
    state
        .credential_service
        .change_password(&caller, payload)
        .await?;

    Ok(Json(MessageResponse::new(PASSWORD_CHANGED)))
}
