//! User administration; every route here sits behind the admin role guard
use crate::error::{ApiResult, MessageResponse};
use crate::handlers::common::ValidatedJson;
use crate::handlers::users::UserResponse;
use crate::server::AccountServer;
use crate::types::{Pagination, UserListParams};
use auth_gateway::CurrentIdentity;
use auth_identity::{AccountProfile, Role};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<AccountProfile>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRoleRequest {
    /// `admin` or `user`
    #[validate(length(min = 1, message = "Role is required"))]
    pub role: String,
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(UserListParams),
    responses(
        (status = 200, description = "Page of users, newest first", body = UserListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(
    State(server): State<AccountServer>,
    Query(params): Query<UserListParams>,
) -> ApiResult<Json<UserListResponse>> {
    let listing = server
        .accounts
        .list_accounts(params.page(), params.limit(), params.search())
        .await?;
    Ok(Json(UserListResponse {
        users: listing.users,
        pagination: listing.pagination,
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found", body = crate::error::ApiErrorResponse)
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_user(
    State(server): State<AccountServer>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let user = server.accounts.account(id).await?;
    Ok(Json(UserResponse {
        message: None,
        user,
    }))
}

/// New role reaches tokens at the user's next login or refresh
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/role",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = UserResponse),
        (status = 400, description = "Invalid role", body = crate::error::ApiErrorResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found", body = crate::error::ApiErrorResponse)
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_user_role(
    State(server): State<AccountServer>,
    Path(id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<UpdateRoleRequest>,
) -> ApiResult<Json<UserResponse>> {
    let role: Role = body.role.trim().parse()?;
    let user = server.accounts.update_role(id, role).await?;
    Ok(Json(UserResponse {
        message: Some("User role updated successfully".to_string()),
        user,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "Cannot delete your own account", body = crate::error::ApiErrorResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found", body = crate::error::ApiErrorResponse)
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_user(
    State(server): State<AccountServer>,
    CurrentIdentity(actor): CurrentIdentity,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    server.accounts.delete_account(actor.subject_id, id).await?;
    Ok(MessageResponse::new("User deleted successfully"))
}
