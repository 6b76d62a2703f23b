use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::UserData;
use crate::domain::user::models::UpdateUserCommand;
use crate::domain::user::ports::UserServicePort;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;
use crate::user::errors::ValidationError;

/// HTTP request body for updating the current user (raw JSON)
#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UpdateMeRequest {
    fn try_into_command(self) -> Result<UpdateUserCommand, ValidationError> {
        UpdateUserCommand::new(self.name, self.email, self.password)
    }
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(current): Extension<AuthenticatedUser>,
    Json(req): Json<UpdateMeRequest>,
) -> Result<ApiSuccess<UserData>, ApiError> {
    let command = req.try_into_command()?;

    state
        .user_service
        .update_user(&current.user.id, command)
        .await
        .map_err(ApiError::from)
        .map(|ref user| ApiSuccess::new(StatusCode::OK, user.into()))
}
