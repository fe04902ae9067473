use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::{Blog, BlogChanges, PopulatedBlog};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

use super::{body_rejection, check_likes, parse_id, present, present_likes};

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBlogRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub author: Option<Option<String>>,
    pub url: Option<String>,
    #[serde(default, deserialize_with = "present_likes")]
    pub likes: Option<Option<i64>>,
    pub owner: Option<Uuid>,
}

impl UpdateBlogRequest {
    pub fn validate(self) -> Result<BlogChanges, ApiError> {
        if matches!(self.title.as_deref(), Some("")) || matches!(self.url.as_deref(), Some("")) {
            return Err(ApiError::invalid_input("Title or url cannot be empty"));
        }
        if let Some(likes) = self.likes {
            check_likes(likes)?;
        }

        Ok(BlogChanges {
            title: self.title,
            author: self.author,
            url: self.url,
            likes: self.likes,
            owner: self.owner,
        })
    }
}

/// Load a blog and check the caller created it
async fn owned_blog(state: &AppState, id: Uuid, user: &AuthUser) -> Result<Blog, ApiError> {
    let blog = state
        .blogs
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("blog not found"))?;

    if !user.owns(blog.owner) {
        tracing::warn!(
            "User {} ({}) is not the owner of blog {}",
            user.username,
            user.id,
            blog.id
        );
        return Err(ApiError::forbidden("only the creator can modify this blog"));
    }

    Ok(blog)
}

/// GET /api/blogs/:id - a single blog, owner expanded
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<PopulatedBlog> {
    let id = parse_id(&id)?;
    let blog = state
        .blogs
        .find_populated_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("blog not found"))?;

    Ok(ApiResponse::success(blog))
}

/// PUT /api/blogs/:id - update fields of a blog owned by the caller
pub async fn put(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateBlogRequest>, JsonRejection>,
) -> ApiResult<PopulatedBlog> {
    let id = parse_id(&id)?;
    let current = owned_blog(&state, id, &user).await?;

    let Json(payload) = payload.map_err(body_rejection)?;
    let changes = payload.validate()?;

    if let Some(new_owner) = changes.owner.filter(|o| Some(*o) != current.owner) {
        if state.users.find_by_id(new_owner).await?.is_none() {
            return Err(ApiError::UserNotFound);
        }
        tracing::info!("Blog {} handed over from {} to {}", id, user.id, new_owner);
    }

    let updated = state
        .blogs
        .update_by_id(id, user.id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("blog not found"))?;
    tracing::info!("Blog {} updated by {}", id, user.id);

    Ok(ApiResponse::success(updated))
}

/// DELETE /api/blogs/:id - only the creator may delete
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = parse_id(&id)?;
    owned_blog(&state, id, &user).await?;

    state.blogs.delete_by_id(id, user.id).await?;
    tracing::info!("Blog {} deleted by {}", id, user.id);

    Ok(ApiResponse::no_content())
}
