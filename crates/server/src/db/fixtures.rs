use uuid::Uuid;

use super::{now, Database};

pub async fn insert_user(db: &Database, username: &str) -> String {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, country, created_at) VALUES (?, ?, ?, 'x', NULL, ?)",
    )
    .bind(&id)
    .bind(username)
    .bind(format!("{username}@example.com"))
    .bind(now())
    .execute(&db.pool)
    .await
    .unwrap();
    id
}

pub async fn insert_film(db: &Database, id: &str, title: &str) {
    let now = now();
    sqlx::query("INSERT INTO films (id, title, created_at, updated_at) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(title)
        .bind(&now)
        .bind(&now)
        .execute(&db.pool)
        .await
        .unwrap();
}

pub async fn insert_list(db: &Database, id: &str, owner: &str, title: &str) {
    let now = now();
    sqlx::query(
        "INSERT INTO lists (id, user_id, title, is_public, created_at, updated_at) VALUES (?, ?, ?, 1, ?, ?)",
    )
    .bind(id)
    .bind(owner)
    .bind(title)
    .bind(&now)
    .bind(&now)
    .execute(&db.pool)
    .await
    .unwrap();
}

pub async fn insert_edge(db: &Database, table: &str, film_id: &str, user_id: &str) {
    sqlx::query(&format!(
        "INSERT INTO {table} (film_id, user_id, created_at) VALUES (?, ?, ?)"
    ))
    .bind(film_id)
    .bind(user_id)
    .bind(now())
    .execute(&db.pool)
    .await
    .unwrap();
}

pub async fn count(db: &Database, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&db.pool)
        .await
        .unwrap()
}
