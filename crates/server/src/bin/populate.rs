//! Bulk catalog population: copies the popular, top rated and now playing
//! listings, with credits, into the local film tables.

use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use filmlog_server::{
    config::Config,
    db::Database,
    services::catalog::{Catalog, MovieList, TmdbClient},
};

const LISTS: [(MovieList, u32); 3] = [
    (MovieList::Popular, 10),
    (MovieList::TopRated, 10),
    (MovieList::NowPlaying, 5),
];

/// Pause between catalog calls.
const PACE: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "populate=info,filmlog_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let db = Database::connect(&config.database_url).await?;
    db.run_migrations().await?;

    let client = TmdbClient::new(&config);
    let catalog = Catalog::new(client.clone(), db);

    let mut ids: Vec<i64> = Vec::new();
    for (list, pages) in LISTS {
        let before = ids.len();
        for page in 1..=pages {
            match client.movie_list(list, page).await {
                Ok(movies) => {
                    tracing::info!(?list, page, "fetched {} movies", movies.len());
                    ids.extend(movies.into_iter().map(|m| m.id));
                }
                Err(e) => {
                    tracing::error!(?list, page, "listing failed: {e}");
                    break;
                }
            }
            tokio::time::sleep(PACE).await;
        }
        tracing::info!(?list, "collected {} ids", ids.len() - before);
    }

    let ids = dedup_in_order(ids);
    tracing::info!("processing {} unique films", ids.len());

    let (mut stored, mut failed) = (0usize, 0usize);
    for (i, id) in ids.iter().enumerate() {
        let result = match client.movie(*id, true).await {
            Ok(movie) => catalog.store_film(&movie).await.map(|_| movie.title),
            Err(e) => Err(e),
        };

        match result {
            Ok(title) => {
                stored += 1;
                tracing::info!("[{}/{}] stored {title}", i + 1, ids.len());
            }
            Err(e) => {
                failed += 1;
                tracing::warn!("[{}/{}] film {id} failed: {e}", i + 1, ids.len());
            }
        }

        tokio::time::sleep(PACE).await;
    }

    tracing::info!(stored, failed, total = ids.len(), "population finished");
    Ok(())
}

fn dedup_in_order(ids: Vec<i64>) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_occurrence() {
        assert_eq!(dedup_in_order(vec![3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }
}
