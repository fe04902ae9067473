use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Registered user. Records are created by the registration service; this
/// service reads them and maintains the `blogs` back-references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub name: Option<String>,
    /// Ids of the blogs this user created, appended on every create
    pub blogs: Vec<Uuid>,
}
