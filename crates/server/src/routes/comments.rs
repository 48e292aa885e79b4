use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    middleware::auth::AuthUser,
    services::comments::{CommentNode, Scope},
    AppState,
};

/// Mounted at `/films/comments`.
pub fn film_router() -> Router<AppState> {
    Router::new().route("/:id", get(film_comments).post(post_film_comment))
}

/// Mounted at `/lists/comments`.
pub fn list_router() -> Router<AppState> {
    Router::new().route("/:id", get(list_comments).post(post_list_comment))
}

#[derive(Debug, Deserialize)]
pub struct PostCommentRequest {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommentsListResponse {
    pub comments: Vec<CommentNode>,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub comment: CommentNode,
}

async fn load(state: &AppState, scope: Scope, id: &str) -> Result<Json<CommentsListResponse>> {
    let comments = state
        .comments
        .comments(scope, id)
        .await
        .map_err(|e| e.masked("Failed to load comments"))?;

    Ok(Json(CommentsListResponse { comments }))
}

async fn post(
    state: &AppState,
    scope: Scope,
    id: &str,
    user: Option<AuthUser>,
    body: Option<Json<PostCommentRequest>>,
) -> Result<(StatusCode, Json<CommentResponse>)> {
    let content = body.and_then(|Json(body)| body.content);

    let comment = state
        .comments
        .post(
            scope,
            id,
            user.as_ref().map(|u| u.id.as_str()),
            content.as_deref(),
        )
        .await
        .map_err(|e| e.masked("Failed to post comment"))?;

    Ok((StatusCode::CREATED, Json(CommentResponse { comment })))
}

async fn film_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CommentsListResponse>> {
    load(&state, Scope::Film, &id).await
}

async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CommentsListResponse>> {
    load(&state, Scope::List, &id).await
}

async fn post_film_comment(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<String>,
    body: Option<Json<PostCommentRequest>>,
) -> Result<(StatusCode, Json<CommentResponse>)> {
    post(&state, Scope::Film, &id, user, body).await
}

async fn post_list_comment(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<String>,
    body: Option<Json<PostCommentRequest>>,
) -> Result<(StatusCode, Json<CommentResponse>)> {
    post(&state, Scope::List, &id, user, body).await
}
