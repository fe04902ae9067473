pub mod auth;
pub mod response;

pub use auth::{bearer_token, user_extractor, AuthUser};
pub use response::{ApiResponse, ApiResult};
