use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::auth::{authenticate, require_admin};
use crate::entities::{Role, User};
use crate::errors::ApiError;
use crate::handlers::NewUserInput;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserDto {
    uid: String,
    name: String,
    email: String,
    avatar: String,
    role: Role,
    badges: Vec<String>,
    joined_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        let mut badges = u.badges.into_iter().collect::<Vec<_>>();
        badges.sort();

        Self {
            uid: u.uid,
            name: u.name,
            email: u.email,
            avatar: u.avatar,
            role: u.role,
            badges,
            joined_at: u.joined_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateUserBody {
    name: Option<String>,
    email: Option<String>,
    avatar: Option<String>,
}

/// The profile is created for the verified identity; there is no
/// body-supplied uid to spoof.
pub(crate) async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateUserBody>,
) -> Result<(StatusCode, Json<UserDto>), ApiError> {
    let claims = authenticate(&*state.verifier, &headers).await?;

    let user = state
        .handler
        .create_user(
            &claims,
            NewUserInput {
                name: body.name,
                email: body.email,
                avatar: body.avatar,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

pub(crate) async fn promote(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    headers: HeaderMap,
) -> Result<Json<UserDto>, ApiError> {
    let claims = authenticate(&*state.verifier, &headers).await?;
    require_admin(&*state.handler.user_repository, &claims).await?;

    let user = state.handler.promote_user(&uid).await?;

    Ok(Json(user.into()))
}
