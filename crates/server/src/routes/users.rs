use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::{error::Result, AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/popular", get(popular_users))
}

#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub country: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<PublicUser>,
}

/// Users ranked by how many lists and comments they have written.
async fn popular_users(State(state): State<AppState>) -> Result<Json<UsersResponse>> {
    let users = sqlx::query_as::<_, (String, String, String, Option<String>)>(
        r#"
        SELECT u.id, u.username, u.email, u.country
        FROM users u
        LEFT JOIN lists l ON u.id = l.user_id
        LEFT JOIN comments c ON u.id = c.user_id
        GROUP BY u.id, u.username, u.email, u.country
        ORDER BY (COUNT(DISTINCT l.id) + COUNT(DISTINCT c.id)) DESC, u.created_at ASC
        LIMIT 20
        "#,
    )
    .fetch_all(&state.db.pool)
    .await
    .map_err(|e| crate::error::AppError::from(e).masked("Failed to load popular users"))?;

    let users = users
        .into_iter()
        .map(|(id, username, email, country)| PublicUser {
            id,
            username,
            email,
            country,
        })
        .collect();

    Ok(Json(UsersResponse { users }))
}
