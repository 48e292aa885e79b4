// Like / watched / watchlist edges between a film and a user.

use crate::{
    db::{self, Database},
    error::{AppError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engagement {
    Like,
    Watched,
    Watchlist,
}

impl Engagement {
    fn table(self) -> &'static str {
        match self {
            Engagement::Like => "film_likes",
            Engagement::Watched => "film_watched",
            Engagement::Watchlist => "film_watchlist",
        }
    }

    pub fn message(self, toggle: Toggle) -> &'static str {
        match (self, toggle) {
            (Engagement::Like, Toggle::Added) => "Film liked",
            (Engagement::Like, Toggle::Removed) => "Like removed",
            (Engagement::Watched, Toggle::Added) => "Film marked as watched",
            (Engagement::Watched, Toggle::Removed) => "Watched removed",
            (Engagement::Watchlist, Toggle::Added) => "Added to watchlist",
            (Engagement::Watchlist, Toggle::Removed) => "Removed from watchlist",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
}

#[derive(Clone)]
pub struct EngagementService {
    db: Database,
}

impl EngagementService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Flips the (film, user) edge of the given kind.
    ///
    /// Delete and insert run in one transaction and the insert ignores a
    /// conflicting edge, so concurrent duplicate toggles never create a
    /// second edge.
    pub async fn toggle(
        &self,
        kind: Engagement,
        film_id: &str,
        user_id: Option<&str>,
    ) -> Result<Toggle> {
        let user_id = user_id.ok_or(AppError::Unauthorized)?;

        let film = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM films WHERE id = ?")
            .bind(film_id)
            .fetch_one(&self.db.pool)
            .await?;
        if film == 0 {
            return Err(AppError::NotFound("Film not found".to_string()));
        }

        let table = kind.table();
        let mut tx = self.db.pool.begin().await?;

        let removed = sqlx::query(&format!(
            "DELETE FROM {table} WHERE film_id = ? AND user_id = ?"
        ))
        .bind(film_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let toggle = if removed > 0 {
            Toggle::Removed
        } else {
            sqlx::query(&format!(
                "INSERT INTO {table} (film_id, user_id, created_at) VALUES (?, ?, ?) \
                 ON CONFLICT (film_id, user_id) DO NOTHING"
            ))
            .bind(film_id)
            .bind(user_id)
            .bind(db::now())
            .execute(&mut *tx)
            .await?;
            Toggle::Added
        };

        tx.commit().await?;

        tracing::debug!(?kind, ?toggle, film_id, user_id, "engagement toggled");
        Ok(toggle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures;

    #[tokio::test]
    async fn toggling_alternates_presence() {
        let db = Database::in_memory().await.unwrap();
        let user = fixtures::insert_user(&db, "alice").await;
        fixtures::insert_film(&db, "F", "Film").await;
        let service = EngagementService::new(db.clone());

        for round in 1..=5 {
            let toggle = service
                .toggle(Engagement::Like, "F", Some(user.as_str()))
                .await
                .unwrap();
            let present = fixtures::count(&db, "film_likes").await;
            if round % 2 == 1 {
                assert_eq!(toggle, Toggle::Added);
                assert_eq!(present, 1);
            } else {
                assert_eq!(toggle, Toggle::Removed);
                assert_eq!(present, 0);
            }
        }
    }

    #[tokio::test]
    async fn kinds_are_independent() {
        let db = Database::in_memory().await.unwrap();
        let user = fixtures::insert_user(&db, "alice").await;
        fixtures::insert_film(&db, "F", "Film").await;
        let service = EngagementService::new(db.clone());

        service.toggle(Engagement::Watched, "F", Some(user.as_str())).await.unwrap();
        service.toggle(Engagement::Watchlist, "F", Some(user.as_str())).await.unwrap();

        assert_eq!(fixtures::count(&db, "film_likes").await, 0);
        assert_eq!(fixtures::count(&db, "film_watched").await, 1);
        assert_eq!(fixtures::count(&db, "film_watchlist").await, 1);
    }

    #[tokio::test]
    async fn unknown_film_is_not_found_and_inserts_nothing() {
        let db = Database::in_memory().await.unwrap();
        let user = fixtures::insert_user(&db, "alice").await;

        let err = EngagementService::new(db.clone())
            .toggle(Engagement::Like, "nope", Some(user.as_str()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(fixtures::count(&db, "film_likes").await, 0);
    }

    #[tokio::test]
    async fn anonymous_toggle_is_unauthorized() {
        let db = Database::in_memory().await.unwrap();
        fixtures::insert_film(&db, "F", "Film").await;

        let err = EngagementService::new(db)
            .toggle(Engagement::Watchlist, "F", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[test]
    fn messages_match_outcome() {
        assert_eq!(Engagement::Like.message(Toggle::Added), "Film liked");
        assert_eq!(Engagement::Watchlist.message(Toggle::Removed), "Removed from watchlist");
    }
}
