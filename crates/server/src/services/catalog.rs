// TMDB catalog client and the paths that copy catalog records into the
// local film tables.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    config::Config,
    db::{self, Database},
    error::Result,
    services::films::CAST_LIMIT,
};

/// Number of discover pages merged by the genre listing.
const GENRE_PAGES: u32 = 5;
/// Number of discover results kept by the country listing.
const COUNTRY_LIMIT: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogMovie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<i64>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<i64>,
    #[serde(default)]
    pub genres: Vec<Named>,
    #[serde(default)]
    pub production_countries: Vec<Named>,
    #[serde(default)]
    pub credits: Option<Credits>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Named {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<Named>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrewMember {
    pub name: String,
    #[serde(default)]
    pub job: Option<String>,
}

impl CatalogMovie {
    // The catalog sends empty strings and zeroes for unknown values.

    fn release_date(&self) -> Option<&str> {
        self.release_date.as_deref().filter(|d| !d.is_empty())
    }

    fn runtime(&self) -> Option<i64> {
        self.runtime.filter(|r| *r > 0)
    }

    fn rating(&self) -> Option<f64> {
        self.vote_average.filter(|r| *r > 0.0)
    }

    pub fn director(&self) -> Option<&str> {
        self.credits
            .as_ref()?
            .crew
            .iter()
            .find(|c| c.job.as_deref() == Some("Director"))
            .map(|c| c.name.as_str())
    }
}

/// Entry of a paged catalog listing.
#[derive(Debug, Clone, Deserialize)]
pub struct MovieSummary {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    results: Vec<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieList {
    Popular,
    TopRated,
    NowPlaying,
}

impl MovieList {
    fn path(self) -> &'static str {
        match self {
            MovieList::Popular => "popular",
            MovieList::TopRated => "top_rated",
            MovieList::NowPlaying => "now_playing",
        }
    }
}

/// Simplified record returned by the genre listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreMovie {
    pub id: i64,
    pub title: String,
    pub overview: Option<String>,
    pub rating: Option<f64>,
    pub poster: Option<String>,
}

#[derive(Clone)]
pub struct TmdbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    image_base_url: String,
}

impl TmdbClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.tmdb_base_url.trim_end_matches('/').to_string(),
            api_key: config.tmdb_api_key.clone(),
            image_base_url: config.tmdb_image_base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%url, "catalog request");

        let response = self
            .http
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<T>().await?)
    }

    pub async fn movie(&self, id: i64, with_credits: bool) -> Result<CatalogMovie> {
        let params = if with_credits {
            vec![("append_to_response", "credits".to_string())]
        } else {
            Vec::new()
        };
        self.get(&format!("/movie/{id}"), &params).await
    }

    pub async fn discover(&self, filter: (&str, &str), page: u32) -> Result<Vec<MovieSummary>> {
        let params = [(filter.0, filter.1.to_string()), ("page", page.to_string())];
        let page: Page<MovieSummary> = self.get("/discover/movie", &params).await?;
        Ok(page.results)
    }

    pub async fn movie_list(&self, list: MovieList, page: u32) -> Result<Vec<MovieSummary>> {
        let params = [("page", page.to_string()), ("language", "en-US".to_string())];
        let page: Page<MovieSummary> = self.get(&format!("/movie/{}", list.path()), &params).await?;
        Ok(page.results)
    }

    pub fn image_url(&self, path: Option<&str>) -> Option<String> {
        path.filter(|p| !p.is_empty())
            .map(|p| format!("{}{p}", self.image_base_url))
    }
}

#[derive(Clone)]
pub struct Catalog {
    client: TmdbClient,
    db: Database,
}

impl Catalog {
    pub fn new(client: TmdbClient, db: Database) -> Self {
        Self { client, db }
    }

    pub fn client(&self) -> &TmdbClient {
        &self.client
    }

    /// Fetches a movie from the catalog and inserts it with its genres and
    /// countries unless a film with that catalog id is already stored.
    ///
    /// Cast and director are left empty here; only [`Catalog::store_film`]
    /// fills them.
    pub async fn fetch_and_store(&self, tmdb_id: i64) -> Result<CatalogMovie> {
        let movie = self.client.movie(tmdb_id, false).await?;

        let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM films WHERE tmdb_id = ?")
            .bind(tmdb_id)
            .fetch_one(&self.db.pool)
            .await?;
        if existing > 0 {
            return Ok(movie);
        }

        let film_id = movie.id.to_string();
        let now = db::now();
        let mut tx = self.db.pool.begin().await?;

        sqlx::query(
            "INSERT OR IGNORE INTO films (id, title, original_title, description, poster_url, backdrop_url, \
             release_date, duration, rating, tmdb_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&film_id)
        .bind(&movie.title)
        .bind(&movie.original_title)
        .bind(&movie.overview)
        .bind(self.client.image_url(movie.poster_path.as_deref()))
        .bind(self.client.image_url(movie.backdrop_path.as_deref()))
        .bind(movie.release_date())
        .bind(movie.runtime())
        .bind(movie.rating())
        .bind(movie.id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        for genre in &movie.genres {
            sqlx::query("INSERT OR IGNORE INTO film_genres (film_id, genre) VALUES (?, ?)")
                .bind(&film_id)
                .bind(&genre.name)
                .execute(&mut *tx)
                .await?;
        }

        for country in &movie.production_countries {
            sqlx::query("INSERT OR IGNORE INTO film_countries (film_id, country) VALUES (?, ?)")
                .bind(&film_id)
                .bind(&country.name)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(tmdb_id, "stored film {}", movie.title);
        Ok(movie)
    }

    /// Inserts or refreshes a film from a full catalog record, replacing its
    /// genres, countries and cast and setting the director.
    pub async fn store_film(&self, movie: &CatalogMovie) -> Result<()> {
        let film_id = movie.id.to_string();
        let now = db::now();
        let mut tx = self.db.pool.begin().await?;

        sqlx::query(
            "INSERT INTO films (id, title, original_title, description, poster_url, backdrop_url, \
             release_date, duration, rating, vote_count, tmdb_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (id) DO UPDATE SET \
                title = excluded.title, \
                original_title = excluded.original_title, \
                description = excluded.description, \
                poster_url = excluded.poster_url, \
                backdrop_url = excluded.backdrop_url, \
                release_date = excluded.release_date, \
                duration = excluded.duration, \
                rating = excluded.rating, \
                vote_count = excluded.vote_count, \
                updated_at = excluded.updated_at",
        )
        .bind(&film_id)
        .bind(&movie.title)
        .bind(&movie.original_title)
        .bind(&movie.overview)
        .bind(self.client.image_url(movie.poster_path.as_deref()))
        .bind(self.client.image_url(movie.backdrop_path.as_deref()))
        .bind(movie.release_date())
        .bind(movie.runtime())
        .bind(movie.rating())
        .bind(movie.vote_count.unwrap_or(0))
        .bind(movie.id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        if !movie.genres.is_empty() {
            sqlx::query("DELETE FROM film_genres WHERE film_id = ?")
                .bind(&film_id)
                .execute(&mut *tx)
                .await?;
            for genre in &movie.genres {
                sqlx::query("INSERT OR IGNORE INTO film_genres (film_id, genre) VALUES (?, ?)")
                    .bind(&film_id)
                    .bind(&genre.name)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        if !movie.production_countries.is_empty() {
            sqlx::query("DELETE FROM film_countries WHERE film_id = ?")
                .bind(&film_id)
                .execute(&mut *tx)
                .await?;
            for country in &movie.production_countries {
                sqlx::query("INSERT OR IGNORE INTO film_countries (film_id, country) VALUES (?, ?)")
                    .bind(&film_id)
                    .bind(&country.name)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        if let Some(director) = movie.director() {
            sqlx::query("UPDATE films SET director = ? WHERE id = ?")
                .bind(director)
                .bind(&film_id)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(credits) = &movie.credits {
            sqlx::query("DELETE FROM film_cast WHERE film_id = ?")
                .bind(&film_id)
                .execute(&mut *tx)
                .await?;
            for actor in credits.cast.iter().take(CAST_LIMIT) {
                sqlx::query("INSERT OR IGNORE INTO film_cast (film_id, actor_name) VALUES (?, ?)")
                    .bind(&film_id)
                    .bind(&actor.name)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Catalog ids of the first discover page for an origin country.
    pub async fn country_ids(&self, country: &str) -> Result<Vec<i64>> {
        let results = self
            .client
            .discover(("with_origin_country", country), 1)
            .await?;
        Ok(results.into_iter().take(COUNTRY_LIMIT).map(|m| m.id).collect())
    }

    pub async fn movies_by_genre(&self, genre_id: &str) -> Result<Vec<GenreMovie>> {
        let mut movies = Vec::new();
        for page in 1..=GENRE_PAGES {
            let results = self.client.discover(("with_genres", genre_id), page).await?;
            movies.extend(results.into_iter().map(|m| GenreMovie {
                id: m.id,
                poster: self.client.image_url(m.poster_path.as_deref()),
                title: m.title,
                overview: m.overview,
                rating: m.vote_average,
            }));
        }
        Ok(movies)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::fixtures;

    fn offline_catalog(db: Database) -> Catalog {
        let mut config = Config::from_env();
        config.tmdb_base_url = "http://127.0.0.1:9".to_string();
        config.tmdb_image_base_url = "https://img.test/w500".to_string();
        Catalog::new(TmdbClient::new(&config), db)
    }

    fn inception() -> CatalogMovie {
        serde_json::from_value(json!({
            "id": 27205,
            "title": "Inception",
            "original_title": "Inception",
            "overview": "A thief who steals corporate secrets.",
            "poster_path": "/poster.jpg",
            "backdrop_path": null,
            "release_date": "2010-07-15",
            "runtime": 148,
            "vote_average": 8.4,
            "vote_count": 35000,
            "genres": [{"id": 28, "name": "Action"}, {"id": 878, "name": "Science Fiction"}],
            "production_countries": [{"iso_3166_1": "US", "name": "United States of America"}],
            "credits": {
                "cast": [
                    {"name": "Leonardo DiCaprio"}, {"name": "Joseph Gordon-Levitt"},
                    {"name": "Elliot Page"}, {"name": "Tom Hardy"},
                    {"name": "Ken Watanabe"}, {"name": "Cillian Murphy"}
                ],
                "crew": [
                    {"name": "Hans Zimmer", "job": "Original Music Composer"},
                    {"name": "Christopher Nolan", "job": "Director"}
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn finds_director_in_crew() {
        assert_eq!(inception().director(), Some("Christopher Nolan"));
    }

    #[test]
    fn zero_values_are_unknown() {
        let movie: CatalogMovie = serde_json::from_value(json!({
            "id": 1, "title": "Untitled", "release_date": "", "runtime": 0, "vote_average": 0.0
        }))
        .unwrap();
        assert_eq!(movie.release_date(), None);
        assert_eq!(movie.runtime(), None);
        assert_eq!(movie.rating(), None);
        assert_eq!(movie.director(), None);
    }

    #[tokio::test]
    async fn image_urls_skip_missing_paths() {
        let db = Database::in_memory().await.unwrap();
        let catalog = offline_catalog(db);
        assert_eq!(
            catalog.client().image_url(Some("/a.jpg")).as_deref(),
            Some("https://img.test/w500/a.jpg")
        );
        assert_eq!(catalog.client().image_url(None), None);
        assert_eq!(catalog.client().image_url(Some("")), None);
    }

    #[tokio::test]
    async fn store_film_populates_credits() {
        let db = Database::in_memory().await.unwrap();
        let catalog = offline_catalog(db.clone());

        catalog.store_film(&inception()).await.unwrap();

        let (director, vote_count, poster): (Option<String>, i64, Option<String>) = sqlx::query_as(
            "SELECT director, vote_count, poster_url FROM films WHERE id = '27205'",
        )
        .fetch_one(&db.pool)
        .await
        .unwrap();
        assert_eq!(director.as_deref(), Some("Christopher Nolan"));
        assert_eq!(vote_count, 35000);
        assert_eq!(poster.as_deref(), Some("https://img.test/w500/poster.jpg"));
        assert_eq!(fixtures::count(&db, "film_cast").await, 5);
        assert_eq!(fixtures::count(&db, "film_genres").await, 2);
    }

    #[tokio::test]
    async fn store_film_refreshes_existing_rows() {
        let db = Database::in_memory().await.unwrap();
        let catalog = offline_catalog(db.clone());
        catalog.store_film(&inception()).await.unwrap();

        let mut refreshed = inception();
        refreshed.vote_count = Some(36000);
        refreshed.genres = vec![Named { name: "Thriller".to_string() }];
        catalog.store_film(&refreshed).await.unwrap();

        assert_eq!(fixtures::count(&db, "films").await, 1);
        let genres: Vec<String> = sqlx::query_scalar("SELECT genre FROM film_genres WHERE film_id = '27205'")
            .fetch_all(&db.pool)
            .await
            .unwrap();
        assert_eq!(genres, vec!["Thriller"]);
        let vote_count: i64 = sqlx::query_scalar("SELECT vote_count FROM films WHERE id = '27205'")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(vote_count, 36000);
    }

    #[tokio::test]
    async fn fetch_failure_propagates() {
        let db = Database::in_memory().await.unwrap();
        let catalog = offline_catalog(db.clone());

        let err = catalog.fetch_and_store(27205).await.unwrap_err();
        assert!(matches!(err, crate::error::AppError::Upstream(_)));
        assert_eq!(fixtures::count(&db, "films").await, 0);
    }
}
