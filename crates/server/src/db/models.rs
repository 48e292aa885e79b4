use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub country: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Film {
    pub id: String,
    pub title: String,
    pub original_title: Option<String>,
    pub description: Option<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub release_date: Option<String>,
    pub duration: Option<i64>,
    pub rating: Option<f64>,
    pub vote_count: Option<i64>,
    pub director: Option<String>,
}

/// A comment joined with its author.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentWithAuthor {
    pub id: String,
    pub content: String,
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub parent_id: Option<String>,
    pub likes_count: Option<i64>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// A list joined with its creator.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ListWithCreator {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub likes_count: i64,
    pub comments_count: i64,
    pub created_at: String,
    pub updated_at: String,
    pub creator_id: String,
    pub username: String,
    pub email: String,
}

/// Public identity of a comment author or list creator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Author {
    pub id: String,
    pub username: String,
    pub email: String,
}
