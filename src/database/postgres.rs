use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Blog, BlogChanges, NewBlog, OwnerSummary, PopulatedBlog, User};
use crate::database::repository::{BlogRepository, UserRepository};

const BLOG_COLUMNS: &str = "id, title, author, url, likes, owner";

const POPULATED_SELECT: &str = r#"
    SELECT b.id, b.title, b.author, b.url, b.likes, b.owner,
           u.username AS owner_username, u.name AS owner_name
    FROM blogs b
    LEFT JOIN users u ON u.id = b.owner
"#;

#[derive(FromRow)]
struct PopulatedBlogRow {
    id: Uuid,
    title: String,
    author: Option<String>,
    url: String,
    likes: Option<i64>,
    owner: Option<Uuid>,
    owner_username: Option<String>,
    owner_name: Option<String>,
}

impl From<PopulatedBlogRow> for PopulatedBlog {
    fn from(row: PopulatedBlogRow) -> Self {
        let owner = row.owner_username.map(|username| OwnerSummary {
            username,
            name: row.owner_name,
        });
        let blog = Blog {
            id: row.id,
            title: row.title,
            author: row.author,
            url: row.url,
            likes: row.likes,
            owner: row.owner,
        };
        PopulatedBlog::from_parts(blog, owner)
    }
}

/// PostgreSQL-backed repositories sharing one pool
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn append_to_owner(
        tx: &mut Transaction<'_, Postgres>,
        owner: Uuid,
        blog_id: Uuid,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE users SET blogs = array_append(blogs, $1) WHERE id = $2")
            .bind(blog_id)
            .bind(owner)
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("user {} not found", owner)));
        }
        Ok(())
    }

    async fn remove_from_owner(
        tx: &mut Transaction<'_, Postgres>,
        owner: Uuid,
        blog_id: Uuid,
    ) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE users SET blogs = array_remove(blogs, $1) WHERE id = $2")
            .bind(blog_id)
            .bind(owner)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl BlogRepository for PgRepository {
    async fn list_all(&self) -> Result<Vec<PopulatedBlog>, DatabaseError> {
        let sql = format!("{} ORDER BY b.created_at, b.id", POPULATED_SELECT);
        let rows = sqlx::query_as::<_, PopulatedBlogRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(PopulatedBlog::from).collect())
    }

    async fn insert(&self, blog: NewBlog, owner: Uuid) -> Result<Blog, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO blogs ({cols}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {cols}",
            cols = BLOG_COLUMNS
        );
        let saved = sqlx::query_as::<_, Blog>(&sql)
            .bind(Uuid::new_v4())
            .bind(&blog.title)
            .bind(&blog.author)
            .bind(&blog.url)
            .bind(blog.likes)
            .bind(owner)
            .fetch_one(&mut *tx)
            .await?;

        // Dropping the transaction on error rolls the insert back
        Self::append_to_owner(&mut tx, owner, saved.id).await?;
        tx.commit().await?;

        debug!("Inserted blog {} for user {}", saved.id, owner);
        Ok(saved)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Blog>, DatabaseError> {
        let sql = format!("SELECT {} FROM blogs WHERE id = $1", BLOG_COLUMNS);
        let blog = sqlx::query_as::<_, Blog>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(blog)
    }

    async fn find_populated_by_id(&self, id: Uuid) -> Result<Option<PopulatedBlog>, DatabaseError> {
        let sql = format!("{} WHERE b.id = $1", POPULATED_SELECT);
        let row = sqlx::query_as::<_, PopulatedBlogRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(PopulatedBlog::from))
    }

    async fn update_by_id(
        &self,
        id: Uuid,
        expected_owner: Uuid,
        changes: BlogChanges,
    ) -> Result<Option<PopulatedBlog>, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {} FROM blogs WHERE id = $1 FOR UPDATE", BLOG_COLUMNS);
        let current = match sqlx::query_as::<_, Blog>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        {
            Some(blog) => blog,
            None => return Ok(None),
        };
        if current.owner != Some(expected_owner) {
            return Err(DatabaseError::OwnerMismatch(id));
        }

        let mut next = current.clone();
        changes.apply_to(&mut next);

        sqlx::query(
            "UPDATE blogs SET title = $2, author = $3, url = $4, likes = $5, owner = $6 WHERE id = $1",
        )
        .bind(id)
        .bind(&next.title)
        .bind(&next.author)
        .bind(&next.url)
        .bind(next.likes)
        .bind(next.owner)
        .execute(&mut *tx)
        .await?;

        if current.owner != next.owner {
            if let Some(previous) = current.owner {
                Self::remove_from_owner(&mut tx, previous, id).await?;
            }
            if let Some(owner) = next.owner {
                Self::append_to_owner(&mut tx, owner, id).await?;
            }
        }

        let sql = format!("{} WHERE b.id = $1", POPULATED_SELECT);
        let row = sqlx::query_as::<_, PopulatedBlogRow>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(row.into()))
    }

    async fn delete_by_id(&self, id: Uuid, expected_owner: Uuid) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let owner: Option<Option<Uuid>> =
            sqlx::query_scalar("SELECT owner FROM blogs WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        match owner {
            None => return Ok(()),
            Some(owner) if owner != Some(expected_owner) => {
                return Err(DatabaseError::OwnerMismatch(id));
            }
            Some(_) => {}
        }

        sqlx::query("DELETE FROM blogs WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Self::remove_from_owner(&mut tx, expected_owner, id).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn count(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blogs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl UserRepository for PgRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, name, blogs FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, name, blogs FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert(&self, username: &str, name: Option<&str>) -> Result<User, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, name) VALUES ($1, $2, $3)
             RETURNING id, username, name, blogs",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }
}
