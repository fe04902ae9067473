use async_trait::async_trait;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Blog, BlogChanges, NewBlog, PopulatedBlog, User};

/// Persistence operations for blog records. Every call is atomic on its own;
/// implementations keep the owner's back-reference list in step with the blog.
#[async_trait]
pub trait BlogRepository: Send + Sync {
    /// All blogs, owner expanded to username and name
    async fn list_all(&self) -> Result<Vec<PopulatedBlog>, DatabaseError>;

    /// Stores a new blog owned by `owner` and appends its id to the owner's list
    async fn insert(&self, blog: NewBlog, owner: Uuid) -> Result<Blog, DatabaseError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Blog>, DatabaseError>;

    async fn find_populated_by_id(&self, id: Uuid) -> Result<Option<PopulatedBlog>, DatabaseError>;

    /// Applies `changes` and returns the new state, or `None` for an unknown id.
    /// Fails with `OwnerMismatch` unless the blog is owned by `expected_owner`
    /// at write time.
    async fn update_by_id(
        &self,
        id: Uuid,
        expected_owner: Uuid,
        changes: BlogChanges,
    ) -> Result<Option<PopulatedBlog>, DatabaseError>;

    /// Removes the blog if `expected_owner` still owns it. Unknown ids are a no-op.
    async fn delete_by_id(&self, id: Uuid, expected_owner: Uuid) -> Result<(), DatabaseError>;

    async fn count(&self) -> Result<i64, DatabaseError>;
}

/// Read access to users plus the minimal writes the operator CLI and test
/// seeding need. Registration itself happens elsewhere.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError>;

    async fn insert(&self, username: &str, name: Option<&str>) -> Result<User, DatabaseError>;
}
