// Film aggregation: joins a film row with its genres, countries, cast and
// live engagement counters into one response view.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    db::{models::Film, select_in, Database, MAX_BINDS},
    error::Result,
};

/// Number of cast members kept per film.
pub const CAST_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilmView {
    pub id: String,
    pub title: String,
    pub original_title: Option<String>,
    pub description: Option<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub release_date: Option<String>,
    pub duration: Option<i64>,
    pub rating: Option<f64>,
    pub vote_count: i64,
    pub likes_count: i64,
    pub watched_count: i64,
    pub watchlist_count: i64,
    pub genres: Vec<String>,
    pub countries: Vec<String>,
    pub director: Option<String>,
    pub cast: Vec<String>,
}

#[derive(Clone)]
pub struct FilmAggregator {
    db: Database,
}

impl FilmAggregator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns `None` when no film row exists for `id`.
    pub async fn format_film(&self, id: &str) -> Result<Option<FilmView>> {
        let mut films = self.format_films(&[id.to_string()]).await?;
        Ok(films.pop())
    }

    /// Aggregates many films with one query per facet instead of one round
    /// of queries per film. Output follows the order of `ids`; unknown ids
    /// are skipped.
    pub async fn format_films(&self, ids: &[String]) -> Result<Vec<FilmView>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut films: HashMap<String, Film> = HashMap::new();
        let mut genres = HashMap::new();
        let mut countries = HashMap::new();
        let mut cast = HashMap::new();
        let mut likes = HashMap::new();
        let mut watched = HashMap::new();
        let mut watchlist = HashMap::new();

        for chunk in ids.chunks(MAX_BINDS) {
            let facets = tokio::try_join!(
                self.film_rows(chunk),
                self.values_by_film("SELECT film_id, genre FROM film_genres", chunk, " ORDER BY film_id, genre"),
                self.values_by_film(
                    "SELECT film_id, country FROM film_countries",
                    chunk,
                    " ORDER BY film_id, country"
                ),
                self.values_by_film("SELECT film_id, actor_name FROM film_cast", chunk, " ORDER BY film_id, id"),
                self.counts("film_likes", chunk),
                self.counts("film_watched", chunk),
                self.counts("film_watchlist", chunk),
            )?;

            films.extend(facets.0.into_iter().map(|f| (f.id.clone(), f)));
            genres.extend(facets.1);
            countries.extend(facets.2);
            cast.extend(facets.3);
            likes.extend(facets.4);
            watched.extend(facets.5);
            watchlist.extend(facets.6);
        }

        let mut views = Vec::with_capacity(films.len());
        for id in ids {
            // Duplicate ids only yield one view
            let Some(film) = films.remove(id) else {
                continue;
            };

            let mut film_cast = cast.remove(id).unwrap_or_default();
            film_cast.truncate(CAST_LIMIT);

            views.push(FilmView {
                likes_count: likes.get(id).copied().unwrap_or(0),
                watched_count: watched.get(id).copied().unwrap_or(0),
                watchlist_count: watchlist.get(id).copied().unwrap_or(0),
                genres: genres.remove(id).unwrap_or_default(),
                countries: countries.remove(id).unwrap_or_default(),
                cast: film_cast,
                release_date: film.release_date.as_deref().and_then(plain_date),
                vote_count: film.vote_count.unwrap_or(0),
                id: film.id,
                title: film.title,
                original_title: film.original_title,
                description: film.description,
                poster_url: film.poster_url,
                backdrop_url: film.backdrop_url,
                duration: film.duration,
                rating: film.rating,
                director: film.director,
            });
        }

        Ok(views)
    }

    async fn film_rows(&self, ids: &[String]) -> Result<Vec<Film>> {
        let mut query = select_in(
            "SELECT id, title, original_title, description, poster_url, backdrop_url, \
             release_date, duration, rating, vote_count, director FROM films",
            "id",
            ids,
        );
        Ok(query.build_query_as::<Film>().fetch_all(&self.db.pool).await?)
    }

    async fn values_by_film(
        &self,
        select: &str,
        ids: &[String],
        order: &str,
    ) -> Result<HashMap<String, Vec<String>>> {
        let mut query = select_in(select, "film_id", ids);
        query.push(order);

        let rows: Vec<(String, String)> = query.build_query_as().fetch_all(&self.db.pool).await?;

        let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
        for (film_id, value) in rows {
            grouped.entry(film_id).or_default().push(value);
        }
        Ok(grouped)
    }

    async fn counts(&self, table: &str, ids: &[String]) -> Result<HashMap<String, i64>> {
        let mut query = select_in(&format!("SELECT film_id, COUNT(*) FROM {table}"), "film_id", ids);
        query.push(" GROUP BY film_id");

        let rows: Vec<(String, i64)> = query.build_query_as().fetch_all(&self.db.pool).await?;
        Ok(rows.into_iter().collect())
    }
}

/// Normalizes a stored release date to `YYYY-MM-DD`, dropping any time part.
fn plain_date(raw: &str) -> Option<String> {
    let date = raw.get(..10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}
