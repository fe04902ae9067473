pub mod collection;
pub mod record;

// Re-export handler functions for use in routing
pub use collection::get as list;
pub use collection::post as create;
pub use record::delete as remove;
pub use record::get as show;
pub use record::put as update;

use axum::extract::rejection::JsonRejection;
use serde::{de, Deserialize, Deserializer};
use uuid::Uuid;

use crate::error::ApiError;

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
/// Pair with `#[serde(default)]`.
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LikesInput {
    Count(i64),
    Text(String),
}

/// Like [`present`] for `likes`, which also takes numeric strings. An empty
/// string is a present value that stores as null.
pub(crate) fn present_likes<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let likes = match Option::<LikesInput>::deserialize(deserializer)? {
        None => None,
        Some(LikesInput::Count(n)) => Some(n),
        Some(LikesInput::Text(text)) if text.trim().is_empty() => None,
        Some(LikesInput::Text(text)) => Some(text.trim().parse().map_err(|_| {
            de::Error::custom(format!("likes: expected a number, got {:?}", text))
        })?),
    };
    Ok(Some(likes))
}

/// Path ids that are not UUIDs are not handled locally; they surface as a
/// generic failure.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|e| ApiError::internal(format!("malformed id {:?}: {}", raw, e)))
}

pub(crate) fn body_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::invalid_input(rejection.body_text())
}

pub(crate) fn check_likes(likes: Option<i64>) -> Result<(), ApiError> {
    match likes {
        Some(n) if n < 0 => Err(ApiError::invalid_input("likes must be a non-negative integer")),
        _ => Ok(()),
    }
}
