use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tokio::sync::RwLock;
use tower::ServiceExt;
use uuid::Uuid;

use crate::auth::TokenService;
use crate::database::models::{Blog, BlogChanges, NewBlog, OwnerSummary, PopulatedBlog, User};
use crate::database::{BlogRepository, DatabaseError, UserRepository};
use crate::state::AppState;

pub const TEST_SECRET: &str = "test-secret";

#[derive(Default)]
struct Store {
    // Vecs keep insertion order, matching the SQL listing order
    blogs: Vec<Blog>,
    users: Vec<User>,
}

impl Store {
    fn populate(&self, blog: &Blog) -> PopulatedBlog {
        let owner = blog
            .owner
            .and_then(|id| self.users.iter().find(|u| u.id == id))
            .map(|u| OwnerSummary {
                username: u.username.clone(),
                name: u.name.clone(),
            });
        PopulatedBlog::from_parts(blog.clone(), owner)
    }

    fn user_mut(&mut self, id: Uuid) -> Result<&mut User, DatabaseError> {
        self.users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| DatabaseError::NotFound(format!("user {} not found", id)))
    }
}

/// In-memory repository with the same observable behavior as the SQL one.
/// Each operation holds the lock for its whole duration.
#[derive(Default)]
pub struct MemoryRepository {
    store: RwLock<Store>,
}

impl MemoryRepository {
    pub async fn user(&self, id: Uuid) -> Option<User> {
        self.store.read().await.users.iter().find(|u| u.id == id).cloned()
    }

    pub async fn blog_titles(&self) -> Vec<String> {
        self.store.read().await.blogs.iter().map(|b| b.title.clone()).collect()
    }
}

#[async_trait]
impl BlogRepository for MemoryRepository {
    async fn list_all(&self) -> Result<Vec<PopulatedBlog>, DatabaseError> {
        let store = self.store.read().await;
        Ok(store.blogs.iter().map(|b| store.populate(b)).collect())
    }

    async fn insert(&self, blog: NewBlog, owner: Uuid) -> Result<Blog, DatabaseError> {
        let mut store = self.store.write().await;
        let blog = blog.into_blog(Uuid::new_v4(), owner);
        store.user_mut(owner)?.blogs.push(blog.id);
        store.blogs.push(blog.clone());
        Ok(blog)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Blog>, DatabaseError> {
        let store = self.store.read().await;
        Ok(store.blogs.iter().find(|b| b.id == id).cloned())
    }

    async fn find_populated_by_id(&self, id: Uuid) -> Result<Option<PopulatedBlog>, DatabaseError> {
        let store = self.store.read().await;
        Ok(store.blogs.iter().find(|b| b.id == id).map(|b| store.populate(b)))
    }

    async fn update_by_id(
        &self,
        id: Uuid,
        expected_owner: Uuid,
        changes: BlogChanges,
    ) -> Result<Option<PopulatedBlog>, DatabaseError> {
        let mut store = self.store.write().await;
        let Some(index) = store.blogs.iter().position(|b| b.id == id) else {
            return Ok(None);
        };

        let previous_owner = store.blogs[index].owner;
        if previous_owner != Some(expected_owner) {
            return Err(DatabaseError::OwnerMismatch(id));
        }
        let mut next = store.blogs[index].clone();
        changes.apply_to(&mut next);

        if next.owner != previous_owner {
            if let Some(owner) = next.owner {
                store.user_mut(owner)?.blogs.push(id);
            }
            if let Some(previous) = previous_owner {
                if let Ok(user) = store.user_mut(previous) {
                    user.blogs.retain(|b| *b != id);
                }
            }
        }

        store.blogs[index] = next;
        Ok(Some(store.populate(&store.blogs[index])))
    }

    async fn delete_by_id(&self, id: Uuid, expected_owner: Uuid) -> Result<(), DatabaseError> {
        let mut store = self.store.write().await;
        let Some(index) = store.blogs.iter().position(|b| b.id == id) else {
            return Ok(());
        };
        if store.blogs[index].owner != Some(expected_owner) {
            return Err(DatabaseError::OwnerMismatch(id));
        }
        let removed = store.blogs.remove(index);
        if let Some(owner) = removed.owner {
            if let Ok(user) = store.user_mut(owner) {
                user.blogs.retain(|b| *b != id);
            }
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64, DatabaseError> {
        Ok(self.store.read().await.blogs.len() as i64)
    }
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.user(id).await)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let store = self.store.read().await;
        Ok(store.users.iter().find(|u| u.username == username).cloned())
    }

    async fn insert(&self, username: &str, name: Option<&str>) -> Result<User, DatabaseError> {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            name: name.map(str::to_string),
            blogs: Vec::new(),
        };
        self.store.write().await.users.push(user.clone());
        Ok(user)
    }
}

/// Router wired to a fresh in-memory repository
pub struct TestContext {
    pub repo: Arc<MemoryRepository>,
    pub tokens: TokenService,
    pub app: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Value,
}

impl TestContext {
    pub fn new() -> Self {
        let repo = Arc::new(MemoryRepository::default());
        let tokens = TokenService::new(TEST_SECRET, 1);
        let state = AppState::new(repo.clone(), repo.clone(), tokens.clone());

        Self {
            repo,
            tokens,
            app: crate::app(state),
        }
    }

    pub async fn create_user(&self, username: &str, name: &str) -> User {
        UserRepository::insert(self.repo.as_ref(), username, Some(name))
            .await
            .expect("seed user")
    }

    pub fn token_for(&self, user: &User) -> String {
        self.tokens.issue(user).expect("issue token")
    }

    pub async fn seed_blog(&self, owner: &User, title: &str, author: &str, url: &str, likes: i64) -> Blog {
        let blog = NewBlog {
            title: title.into(),
            author: Some(author.into()),
            url: url.into(),
            likes: Some(likes),
        };
        BlogRepository::insert(self.repo.as_ref(), blog, owner.id)
            .await
            .expect("seed blog")
    }

    pub async fn blog_count(&self) -> i64 {
        self.repo.count().await.expect("count")
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self.app.clone().oneshot(request).await.expect("infallible");
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };

        TestResponse {
            status,
            content_type,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryRepository, User, User, Blog) {
        let repo = MemoryRepository::default();
        let owner = UserRepository::insert(&repo, "root", Some("Superuser")).await.unwrap();
        let other = UserRepository::insert(&repo, "mluukkai", None).await.unwrap();
        let blog = NewBlog {
            title: "Blog".into(),
            author: Some("Author".into()),
            url: "url".into(),
            likes: Some(5),
        };
        let blog = BlogRepository::insert(&repo, blog, owner.id).await.unwrap();
        (repo, owner, other, blog)
    }

    #[tokio::test]
    async fn update_by_another_owner_leaves_the_blog_untouched() {
        let (repo, _owner, other, blog) = seeded().await;
        let changes = BlogChanges {
            likes: Some(Some(99)),
            ..Default::default()
        };

        let err = repo.update_by_id(blog.id, other.id, changes).await.unwrap_err();
        assert!(matches!(err, DatabaseError::OwnerMismatch(id) if id == blog.id));

        let stored = BlogRepository::find_by_id(&repo, blog.id).await.unwrap().unwrap();
        assert_eq!(stored.likes, Some(5));
    }

    #[tokio::test]
    async fn delete_by_another_owner_keeps_the_blog() {
        let (repo, owner, other, blog) = seeded().await;

        let err = repo.delete_by_id(blog.id, other.id).await.unwrap_err();
        assert!(matches!(err, DatabaseError::OwnerMismatch(_)));
        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.user(owner.id).await.unwrap().blogs, vec![blog.id]);
    }

    #[tokio::test]
    async fn delete_by_owner_clears_the_back_reference() {
        let (repo, owner, _other, blog) = seeded().await;

        repo.delete_by_id(blog.id, owner.id).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
        assert!(repo.user(owner.id).await.unwrap().blogs.is_empty());
    }
}
