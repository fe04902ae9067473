#![allow(dead_code)]

use std::sync::OnceLock;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, MutexGuard};

use bloglist_api::auth::TokenService;
use bloglist_api::config::DatabaseConfig;
use bloglist_api::database::models::{Blog, NewBlog, User};
use bloglist_api::database::{BlogRepository, DatabaseManager, PgRepository, UserRepository};
use bloglist_api::state::AppState;

// Tests share one database and reset it, so they take turns
static DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub const INITIAL_BLOGS: [(&str, &str, &str, i64); 2] = [
    ("Blog", "Author", "url", 5),
    ("GYUH", "kfkfk", "kkd", 6),
];

pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub repo: PgRepository,
    pub tokens: TokenService,
    pub root: User,
    _guard: MutexGuard<'static, ()>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn token_for(&self, user: &User) -> String {
        self.tokens.issue(user).expect("issue token")
    }

    pub async fn blogs_in_db(&self) -> Result<Vec<serde_json::Value>> {
        let blogs = self.repo.list_all().await?;
        Ok(blogs
            .into_iter()
            .map(|b| serde_json::to_value(b).expect("serialize blog"))
            .collect())
    }
}

/// Reason attached to every test that needs a live database
pub const NEEDS_DATABASE: &str = "requires TEST_DATABASE_URL pointing at a PostgreSQL database";

/// Serve the app on a free port against `TEST_DATABASE_URL`, seeded with
/// the initial blogs.
pub async fn spawn_app() -> Result<TestApp> {
    let url = std::env::var("TEST_DATABASE_URL").context(NEEDS_DATABASE)?;

    let guard = DB_LOCK.get_or_init(|| Mutex::new(())).lock().await;

    let database = DatabaseManager::connect(&DatabaseConfig {
        url,
        max_connections: 5,
        connection_timeout_secs: 10,
    })
    .await?;
    database.migrate().await?;

    sqlx::query("DELETE FROM blogs").execute(database.pool()).await?;
    sqlx::query("DELETE FROM users").execute(database.pool()).await?;

    let repo = PgRepository::new(database.pool().clone());
    let root = UserRepository::insert(&repo, "root", Some("Superuser")).await?;
    for (title, author, url, likes) in INITIAL_BLOGS {
        seed_blog(&repo, &root, title, author, url, likes).await?;
    }
    // Refresh so `blogs` reflects the seeded back-references
    let root = UserRepository::find_by_id(&repo, root.id)
        .await?
        .context("seeded user vanished")?;

    let tokens = TokenService::new("integration-secret", 1);
    let state = AppState::with_database(database, tokens.clone());

    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, bloglist_api::app(state)).await {
            eprintln!("test server stopped: {}", e);
        }
    });

    Ok(TestApp {
        base_url: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        repo,
        tokens,
        root,
        _guard: guard,
    })
}

pub async fn seed_blog(
    repo: &PgRepository,
    owner: &User,
    title: &str,
    author: &str,
    url: &str,
    likes: i64,
) -> Result<Blog> {
    let blog = NewBlog {
        title: title.to_string(),
        author: Some(author.to_string()),
        url: url.to_string(),
        likes: Some(likes),
    };
    Ok(BlogRepository::insert(repo, blog, owner.id).await?)
}
