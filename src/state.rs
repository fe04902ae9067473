use std::sync::Arc;

use crate::auth::TokenService;
use crate::database::{BlogRepository, DatabaseManager, PgRepository, UserRepository};

/// Handles shared by every request. Built once at startup and cloned into
/// handlers; no component reaches for global state.
#[derive(Clone)]
pub struct AppState {
    pub blogs: Arc<dyn BlogRepository>,
    pub users: Arc<dyn UserRepository>,
    pub tokens: TokenService,
    /// Absent when running on a non-SQL repository
    pub database: Option<DatabaseManager>,
}

impl AppState {
    pub fn new(
        blogs: Arc<dyn BlogRepository>,
        users: Arc<dyn UserRepository>,
        tokens: TokenService,
    ) -> Self {
        Self {
            blogs,
            users,
            tokens,
            database: None,
        }
    }

    pub fn with_database(database: DatabaseManager, tokens: TokenService) -> Self {
        let repository = Arc::new(PgRepository::new(database.pool().clone()));
        Self {
            blogs: repository.clone(),
            users: repository,
            tokens,
            database: Some(database),
        }
    }
}
