pub mod blog;
pub mod user;

pub use blog::{Blog, BlogChanges, NewBlog, OwnerSummary, PopulatedBlog};
pub use user::User;
