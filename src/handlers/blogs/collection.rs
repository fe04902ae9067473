use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::database::models::{Blog, NewBlog, PopulatedBlog};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

use super::{body_rejection, check_likes, present_likes};

#[derive(Debug, Deserialize)]
pub struct CreateBlogRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    #[serde(default, deserialize_with = "present_likes")]
    pub likes: Option<Option<i64>>,
}

impl CreateBlogRequest {
    /// Title and url must be non-empty. `likes` defaults to 0 only when the
    /// field is absent; an explicit value, `null` included, is kept as sent.
    pub fn validate(self) -> Result<NewBlog, ApiError> {
        let title = self.title.filter(|t| !t.is_empty());
        let url = self.url.filter(|u| !u.is_empty());

        let (title, url) = match (title, url) {
            (Some(title), Some(url)) => (title, url),
            _ => return Err(ApiError::invalid_input("Title or url is required")),
        };

        let likes = match self.likes {
            None => Some(0),
            Some(explicit) => explicit,
        };
        check_likes(likes)?;

        Ok(NewBlog {
            title,
            author: self.author,
            url,
            likes,
        })
    }
}

/// GET /api/blogs - every blog, owner expanded to username and name
pub async fn get(State(state): State<AppState>) -> ApiResult<Vec<PopulatedBlog>> {
    let blogs = state.blogs.list_all().await?;
    Ok(ApiResponse::success(blogs))
}

/// POST /api/blogs - create a blog owned by the authenticated user
pub async fn post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CreateBlogRequest>, JsonRejection>,
) -> ApiResult<Blog> {
    let Json(payload) = payload.map_err(body_rejection)?;
    let new_blog = payload.validate()?;

    let blog = state.blogs.insert(new_blog, user.id).await?;
    tracing::info!("Blog {} created by {} ({})", blog.id, user.username, user.id);

    Ok(ApiResponse::created(blog))
}
