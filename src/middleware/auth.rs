use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::database::models::User;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller, resolved from the bearer token and the user store
#[derive(Clone, Debug, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub name: Option<String>,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
        }
    }
}

impl AuthUser {
    /// Owner ids are compared in their string form
    pub fn owns(&self, owner: Option<Uuid>) -> bool {
        owner.map(|o| o.to_string()) == Some(self.id.to_string())
    }
}

/// Extract the token from `Authorization: Bearer <token>`. Missing or
/// malformed headers yield no identity.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authorization gate for mutating routes: verifies the bearer token,
/// resolves its subject to a user and injects [`AuthUser`] into the request.
pub async fn user_extractor(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or(ApiError::TokenInvalid)?;
    let user_id = state.tokens.verify(token)?;

    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Token subject {} does not match any user", user_id);
            ApiError::UserNotFound
        })?;

    tracing::debug!("Authenticated user {} ({})", user.username, user.id);
    request.extensions_mut().insert(AuthUser::from(user));

    Ok(next.run(request).await)
}
