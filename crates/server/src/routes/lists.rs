use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::{
        self,
        models::{Author, ListWithCreator},
        select_in, MAX_BINDS,
    },
    error::{AppError, Result},
    middleware::auth::AuthUser,
    routes::films::MessageResponse,
    services::films::FilmView,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(user_lists).post(create_list))
        .route("/:id/films", post(add_film))
}

#[derive(Debug, Deserialize)]
pub struct ListsQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateListRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddFilmRequest {
    pub film_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub creator: Author,
    pub films: Vec<FilmView>,
    pub created_at: String,
    pub updated_at: String,
    pub likes_count: i64,
    pub comments_count: i64,
    pub is_public: bool,
}

#[derive(Debug, Serialize)]
pub struct ListsResponse {
    pub lists: Vec<ListResponse>,
}

#[derive(Debug, Serialize)]
pub struct CreatedListResponse {
    pub list: ListResponse,
}

impl ListResponse {
    fn new(row: ListWithCreator, films: Vec<FilmView>) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            creator: Author {
                id: row.creator_id,
                username: row.username,
                email: row.email,
            },
            films,
            created_at: row.created_at,
            updated_at: row.updated_at,
            likes_count: row.likes_count,
            comments_count: row.comments_count,
            is_public: row.is_public,
        }
    }
}

/// Lists visible to a user (their own plus every public list), newest
/// first, with member films aggregated in one batch.
async fn visible_lists(state: &AppState, user_id: &str) -> Result<Vec<ListResponse>> {
    let rows = sqlx::query_as::<_, ListWithCreator>(
        r#"
        SELECT l.id, l.title, l.description, l.is_public, l.likes_count, l.comments_count,
               l.created_at, l.updated_at, u.id AS creator_id, u.username, u.email
        FROM lists l
        JOIN users u ON l.user_id = u.id
        WHERE l.user_id = ? OR l.is_public = 1
        ORDER BY l.created_at DESC, l.rowid DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&state.db.pool)
    .await?;

    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let list_ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let mut members: Vec<(String, String)> = Vec::new();
    for chunk in list_ids.chunks(MAX_BINDS) {
        let mut query = select_in("SELECT list_id, film_id FROM list_films", "list_id", chunk);
        query.push(" ORDER BY added_at, rowid");
        members.extend(query.build_query_as::<(String, String)>().fetch_all(&state.db.pool).await?);
    }

    let mut film_ids: Vec<String> = members.iter().map(|(_, film_id)| film_id.clone()).collect();
    film_ids.sort();
    film_ids.dedup();
    let films: HashMap<String, FilmView> = state
        .films
        .format_films(&film_ids)
        .await?
        .into_iter()
        .map(|f| (f.id.clone(), f))
        .collect();

    let mut by_list: HashMap<String, Vec<FilmView>> = HashMap::new();
    for (list_id, film_id) in members {
        if let Some(film) = films.get(&film_id) {
            by_list.entry(list_id).or_default().push(film.clone());
        }
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let films = by_list.remove(&row.id).unwrap_or_default();
            ListResponse::new(row, films)
        })
        .collect())
}

async fn user_lists(
    State(state): State<AppState>,
    Query(query): Query<ListsQuery>,
) -> Result<Json<ListsResponse>> {
    let user_id = query
        .user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("user_id parameter is required".to_string()))?;

    let lists = visible_lists(&state, &user_id)
        .await
        .map_err(|e| e.masked("Failed to load lists"))?;

    Ok(Json(ListsResponse { lists }))
}

async fn create_list(
    State(state): State<AppState>,
    user: AuthUser,
    body: Option<Json<CreateListRequest>>,
) -> Result<(StatusCode, Json<CreatedListResponse>)> {
    // A missing or unreadable body is treated as empty
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let title = body.title.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }

    let list_id = Uuid::new_v4().to_string();
    let is_public = body.is_public != Some(false);
    let now = db::now();

    sqlx::query(
        "INSERT INTO lists (id, user_id, title, description, is_public, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&list_id)
    .bind(&user.id)
    .bind(title)
    .bind(&body.description)
    .bind(is_public)
    .bind(&now)
    .bind(&now)
    .execute(&state.db.pool)
    .await
    .map_err(|e| AppError::from(e).masked("Failed to create list"))?;

    let row = ListWithCreator {
        id: list_id,
        title: title.to_string(),
        description: body.description,
        is_public,
        likes_count: 0,
        comments_count: 0,
        created_at: now.clone(),
        updated_at: now,
        creator_id: user.id,
        username: user.username,
        email: user.email,
    };

    Ok((
        StatusCode::CREATED,
        Json(CreatedListResponse {
            list: ListResponse::new(row, Vec::new()),
        }),
    ))
}

async fn add_film(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    body: Option<Json<AddFilmRequest>>,
) -> Result<Json<MessageResponse>> {
    let film_id = body
        .and_then(|Json(body)| body.film_id)
        .filter(|film_id| !film_id.trim().is_empty())
        .ok_or_else(|| AppError::Validation("film_id is required".to_string()))?;

    add_list_film(&state, &user, &id, film_id.trim())
        .await
        .map_err(|e| e.masked("Failed to add film to list"))?;

    Ok(Json(MessageResponse {
        message: "Film added to list".to_string(),
    }))
}

async fn add_list_film(state: &AppState, user: &AuthUser, list_id: &str, film_id: &str) -> Result<()> {
    // Only the owner can change a list
    let (owner_id,) = sqlx::query_as::<_, (String,)>("SELECT user_id FROM lists WHERE id = ?")
        .bind(list_id)
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("List not found".to_string()))?;

    if owner_id != user.id {
        return Err(AppError::Forbidden("Cannot modify this list".to_string()));
    }

    let film = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM films WHERE id = ?")
        .bind(film_id)
        .fetch_one(&state.db.pool)
        .await?;
    if film == 0 {
        return Err(AppError::NotFound("Film not found".to_string()));
    }

    let now = db::now();
    let mut tx = state.db.pool.begin().await?;

    sqlx::query("INSERT OR IGNORE INTO list_films (list_id, film_id, added_at) VALUES (?, ?, ?)")
        .bind(list_id)
        .bind(film_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE lists SET updated_at = ? WHERE id = ?")
        .bind(&now)
        .bind(list_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}
