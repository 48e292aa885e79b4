// Two-level comment threads attached to either a film or a list.

use futures::future::try_join_all;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{
        self,
        models::{Author, CommentWithAuthor},
        Database,
    },
    error::{AppError, Result},
};

const COMMENT_COLUMNS: &str = "SELECT c.id, c.content, c.user_id, u.username, u.email, c.parent_id, \
     c.likes_count, c.created_at, c.updated_at \
     FROM comments c JOIN users u ON c.user_id = u.id";

/// What a comment is attached to. A comment belongs to exactly one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Film,
    List,
}

impl Scope {
    fn column(self) -> &'static str {
        match self {
            Scope::Film => "film_id",
            Scope::List => "list_id",
        }
    }

    fn table(self) -> &'static str {
        match self {
            Scope::Film => "films",
            Scope::List => "lists",
        }
    }

    fn not_found(self) -> AppError {
        match self {
            Scope::Film => AppError::NotFound("Film not found".to_string()),
            Scope::List => AppError::NotFound("List not found".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentNode {
    pub id: String,
    pub content: String,
    pub author: Author,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub likes_count: i64,
    pub parent_id: Option<String>,
    pub replies: Vec<CommentNode>,
}

impl From<CommentWithAuthor> for CommentNode {
    fn from(row: CommentWithAuthor) -> Self {
        Self {
            id: row.id,
            content: row.content,
            author: Author {
                id: row.user_id,
                username: row.username,
                email: row.email,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
            likes_count: row.likes_count.unwrap_or(0),
            parent_id: row.parent_id,
            replies: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct CommentService {
    db: Database,
}

impl CommentService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Top-level comments newest first, each with its direct replies oldest
    /// first. Replies of replies are never expanded.
    pub async fn comments(&self, scope: Scope, scope_id: &str) -> Result<Vec<CommentNode>> {
        let top_level = sqlx::query_as::<_, CommentWithAuthor>(&format!(
            "{COMMENT_COLUMNS} WHERE c.{} = ? AND c.parent_id IS NULL \
             ORDER BY c.created_at DESC, c.rowid DESC",
            scope.column()
        ))
        .bind(scope_id)
        .fetch_all(&self.db.pool)
        .await?;

        let replies = try_join_all(top_level.iter().map(|c| self.replies(&c.id))).await?;

        Ok(top_level
            .into_iter()
            .zip(replies)
            .map(|(row, replies)| CommentNode {
                replies,
                ..CommentNode::from(row)
            })
            .collect())
    }

    async fn replies(&self, parent_id: &str) -> Result<Vec<CommentNode>> {
        let rows = sqlx::query_as::<_, CommentWithAuthor>(&format!(
            "{COMMENT_COLUMNS} WHERE c.parent_id = ? ORDER BY c.created_at ASC, c.rowid ASC"
        ))
        .bind(parent_id)
        .fetch_all(&self.db.pool)
        .await?;

        Ok(rows.into_iter().map(CommentNode::from).collect())
    }

    /// Posts a new top-level comment on a film or list.
    pub async fn post(
        &self,
        scope: Scope,
        scope_id: &str,
        author_id: Option<&str>,
        content: Option<&str>,
    ) -> Result<CommentNode> {
        let author_id = author_id.ok_or(AppError::Unauthorized)?;

        let content = content.map(str::trim).unwrap_or_default();
        if content.is_empty() {
            return Err(AppError::Validation(
                "Comment content is required".to_string(),
            ));
        }

        let author = sqlx::query_as::<_, (String, String, String)>(
            "SELECT id, username, email FROM users WHERE id = ?",
        )
        .bind(author_id)
        .fetch_optional(&self.db.pool)
        .await?
        .map(|(id, username, email)| Author { id, username, email })
        .ok_or(AppError::Unauthorized)?;

        let exists = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM {} WHERE id = ?",
            scope.table()
        ))
        .bind(scope_id)
        .fetch_one(&self.db.pool)
        .await?;
        if exists == 0 {
            return Err(scope.not_found());
        }

        let id = Uuid::new_v4().to_string();
        let now = db::now();
        let (film_id, list_id) = match scope {
            Scope::Film => (Some(scope_id), None),
            Scope::List => (None, Some(scope_id)),
        };

        let mut tx = self.db.pool.begin().await?;

        sqlx::query(
            "INSERT INTO comments (id, film_id, list_id, user_id, content, parent_id, likes_count, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, NULL, 0, ?, ?)",
        )
        .bind(&id)
        .bind(film_id)
        .bind(list_id)
        .bind(&author.id)
        .bind(content)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        if scope == Scope::List {
            sqlx::query("UPDATE lists SET comments_count = comments_count + 1 WHERE id = ?")
                .bind(scope_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::debug!(comment_id = %id, ?scope, scope_id, "comment posted");

        Ok(CommentNode {
            id,
            content: content.to_string(),
            author,
            created_at: now.clone(),
            updated_at: Some(now),
            likes_count: 0,
            parent_id: None,
            replies: Vec::new(),
        })
    }
}
