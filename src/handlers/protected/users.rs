use axum::extract::State;

use crate::api::users::{CreateUserRequest, ListUsersResponse, UserResponse};
use crate::codec::{ExtendedJson, ResponseFormat};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /users - provision an API-key principal
pub async fn create_user(
    State(state): State<AppState>,
    ResponseFormat(format): ResponseFormat,
    ExtendedJson(request): ExtendedJson<CreateUserRequest>,
) -> ApiResult<UserResponse> {
    let user = state.users().create(request).await?;
    Ok(ApiResponse::created(user).with_format(format))
}

/// GET /users - every stored principal, unpaginated
pub async fn list_users(
    State(state): State<AppState>,
    ResponseFormat(format): ResponseFormat,
) -> ApiResult<ListUsersResponse> {
    let users = state.users().list().await?;
    Ok(ApiResponse::success(users).with_format(format))
}
