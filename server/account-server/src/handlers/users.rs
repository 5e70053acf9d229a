use crate::error::{ApiError, ApiResult, MessageResponse};
use crate::handlers::common::ValidatedJson;
use crate::server::AccountServer;
use crate::services::images::{ImageStore, TOO_LARGE_MESSAGE};
use crate::services::ProfileChanges;
use auth_gateway::CurrentIdentity;
use auth_identity::{AccountProfile, IdentityError};
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use error_common::codes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Multipart field carrying the upload
pub const IMAGE_FIELD: &str = "image";

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 50, message = "First name must be between 2 and 50 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 2, max = 50, message = "Last name must be between 2 and 50 characters"))]
    pub last_name: Option<String>,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 6, message = "New password must be at least 6 characters long"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DeleteAccountRequest {
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub user: AccountProfile,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileImageResponse {
    pub message: String,
    /// Public path of the stored image
    pub profile_image: String,
    pub user: AccountProfile,
}

#[utoipa::path(
    get,
    path = "/api/user/profile",
    responses(
        (status = 200, description = "Current user's profile", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found", body = crate::error::ApiErrorResponse)
    ),
    tag = "user",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_profile(
    State(server): State<AccountServer>,
    CurrentIdentity(identity): CurrentIdentity,
) -> ApiResult<Json<UserResponse>> {
    let user = server.accounts.profile(identity.subject_id).await?;
    Ok(Json(UserResponse {
        message: None,
        user,
    }))
}

/// Changing the email clears verification and mails a new link
#[utoipa::path(
    put,
    path = "/api/user/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Validation failed or email already in use", body = crate::error::ApiErrorResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "user",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_profile(
    State(server): State<AccountServer>,
    CurrentIdentity(identity): CurrentIdentity,
    ValidatedJson(body): ValidatedJson<UpdateProfileRequest>,
) -> ApiResult<Json<UserResponse>> {
    let user = server
        .accounts
        .update_profile(
            identity.subject_id,
            ProfileChanges {
                first_name: body.first_name,
                last_name: body.last_name,
                email: body.email,
            },
        )
        .await?;

    Ok(Json(UserResponse {
        message: Some("Profile updated successfully".to_string()),
        user,
    }))
}

fn multipart_error(err: &MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::bad_request(TOO_LARGE_MESSAGE, codes::validation::INVALID_FILE)
    } else {
        ApiError::validation(err.body_text())
    }
}

#[utoipa::path(
    post,
    path = "/api/user/profile/image",
    request_body(content = String, description = "Multipart form with an `image` file field (png, jpeg, gif or webp, at most 5MB)", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image stored", body = ProfileImageResponse),
        (status = 400, description = "No file, not an image, or too large", body = crate::error::ApiErrorResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "user",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_profile_image(
    State(server): State<AccountServer>,
    CurrentIdentity(identity): CurrentIdentity,
    mut multipart: Multipart,
) -> ApiResult<Json<ProfileImageResponse>> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(&e))? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| multipart_error(&e))?;
        upload = Some((bytes, content_type));
        break;
    }

    let Some((bytes, content_type)) = upload.filter(|(bytes, _)| !bytes.is_empty()) else {
        return Err(ApiError::bad_request(
            "No file uploaded",
            codes::validation::MISSING_REQUIRED_FIELD,
        ));
    };

    let user = server
        .accounts
        .upload_profile_image(identity.subject_id, &bytes, &content_type)
        .await?;
    let profile_image = user
        .profile_image
        .as_deref()
        .map(ImageStore::public_path)
        .unwrap_or_default();

    Ok(Json(ProfileImageResponse {
        message: "Profile image uploaded successfully".to_string(),
        profile_image,
        user,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/user/profile/image",
    responses(
        (status = 200, description = "Image removed", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No profile image", body = crate::error::ApiErrorResponse)
    ),
    tag = "user",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_profile_image(
    State(server): State<AccountServer>,
    CurrentIdentity(identity): CurrentIdentity,
) -> ApiResult<Json<MessageResponse>> {
    if server
        .accounts
        .delete_profile_image(identity.subject_id)
        .await?
    {
        Ok(MessageResponse::new("Profile image deleted successfully"))
    } else {
        Err(ApiError::not_found("Profile image not found"))
    }
}

#[utoipa::path(
    post,
    path = "/api/user/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Current password is incorrect or new password too weak", body = crate::error::ApiErrorResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "user",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn change_password(
    State(server): State<AccountServer>,
    CurrentIdentity(identity): CurrentIdentity,
    ValidatedJson(body): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    server
        .accounts
        .change_password(identity.subject_id, &body.current_password, &body.new_password)
        .await?;
    Ok(MessageResponse::new("Password changed successfully"))
}

#[utoipa::path(
    delete,
    path = "/api/user/delete-account",
    request_body = DeleteAccountRequest,
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 400, description = "Password is incorrect", body = crate::error::ApiErrorResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "user",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_account(
    State(server): State<AccountServer>,
    CurrentIdentity(identity): CurrentIdentity,
    ValidatedJson(body): ValidatedJson<DeleteAccountRequest>,
) -> ApiResult<Json<MessageResponse>> {
    server
        .accounts
        .delete_own_account(identity.subject_id, &body.password)
        .await
        .map_err(|e| match e {
            IdentityError::IncorrectPassword => ApiError::bad_request(
                "Password is incorrect",
                codes::account::PASSWORD_INCORRECT,
            ),
            other => other.into(),
        })?;
    Ok(MessageResponse::new("Account deleted successfully"))
}
