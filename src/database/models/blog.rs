use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Stored blog record. `owner` is the raw id of the creating user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Blog {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub url: String,
    /// Nullable: an explicit `null` on create is kept rather than defaulted
    pub likes: Option<i64>,
    pub owner: Option<Uuid>,
}

/// Projection of the owning user exposed on listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerSummary {
    pub username: String,
    pub name: Option<String>,
}

/// Blog with its owner expanded to [`OwnerSummary`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulatedBlog {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub url: String,
    pub likes: Option<i64>,
    pub owner: Option<OwnerSummary>,
}

impl PopulatedBlog {
    pub fn from_parts(blog: Blog, owner: Option<OwnerSummary>) -> Self {
        Self {
            id: blog.id,
            title: blog.title,
            author: blog.author,
            url: blog.url,
            likes: blog.likes,
            owner,
        }
    }
}

/// Validated input for an insert. The owner is supplied separately.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBlog {
    pub title: String,
    pub author: Option<String>,
    pub url: String,
    pub likes: Option<i64>,
}

impl NewBlog {
    pub fn into_blog(self, id: Uuid, owner: Uuid) -> Blog {
        Blog {
            id,
            title: self.title,
            author: self.author,
            url: self.url,
            likes: self.likes,
            owner: Some(owner),
        }
    }
}

/// Field-wise update. `None` leaves the stored value untouched; for the
/// nullable columns `Some(None)` stores null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlogChanges {
    pub title: Option<String>,
    pub author: Option<Option<String>>,
    pub url: Option<String>,
    pub likes: Option<Option<i64>>,
    pub owner: Option<Uuid>,
}

impl BlogChanges {
    pub fn apply_to(&self, blog: &mut Blog) {
        if let Some(title) = &self.title {
            blog.title = title.clone();
        }
        if let Some(author) = &self.author {
            blog.author = author.clone();
        }
        if let Some(url) = &self.url {
            blog.url = url.clone();
        }
        if let Some(likes) = self.likes {
            blog.likes = likes;
        }
        if let Some(owner) = self.owner {
            blog.owner = Some(owner);
        }
    }
}
