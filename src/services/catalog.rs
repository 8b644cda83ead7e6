use std::collections::BTreeMap;
use std::path::Path;

use crate::db::Repository;
use crate::error::AppError;
use crate::models::{Favorite, FavoriteKind, NewsFilter, NewsRecord};

/// Opens the store for read commands. A store that cannot be opened is logged
/// and reported as `None` so callers can still serve empty results.
pub async fn open_store(db_path: impl AsRef<Path>) -> Option<Repository> {
    let db_path = db_path.as_ref();
    match Repository::new(db_path).await {
        Ok(repository) => Some(repository),
        Err(e) => {
            tracing::error!(path = %db_path.display(), error = %e, "cannot open news store");
            None
        }
    }
}

/// Read side handed to presentation layers.
///
/// Store failures are logged and surface as empty lists, zero counts or
/// `false`, so callers cannot tell "no rows" from "query failed". A catalog
/// without a store answers every call that way.
#[derive(Clone, Copy)]
pub struct NewsCatalog<'a> {
    repository: Option<&'a Repository>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: u64,
    pub per_league: BTreeMap<String, u64>,
    pub clubs: usize,
}

impl<'a> NewsCatalog<'a> {
    pub fn new(repository: &'a Repository) -> Self {
        Self {
            repository: Some(repository),
        }
    }

    pub fn over(repository: Option<&'a Repository>) -> Self {
        Self { repository }
    }

    fn store(&self, operation: &str) -> Option<&'a Repository> {
        if self.repository.is_none() {
            tracing::error!(operation, "news store unavailable");
        }
        self.repository
    }

    pub async fn list_news(&self, limit: usize, filter: NewsFilter) -> Vec<NewsRecord> {
        let Some(repository) = self.store("list_news") else {
            return Vec::new();
        };
        repository
            .list_news(limit, filter)
            .await
            .unwrap_or_else(|e| degraded("list_news", e))
    }

    /// News matching any of the user's favorites of `kind`: club tags for
    /// clubs, titles for players.
    pub async fn list_for_favorites(
        &self,
        user_id: i64,
        kind: FavoriteKind,
        limit: usize,
    ) -> Vec<NewsRecord> {
        let Some(repository) = self.store("list_for_favorites") else {
            return Vec::new();
        };
        let names: Vec<String> = self
            .list_favorites(user_id, Some(kind))
            .await
            .into_iter()
            .map(|f| f.name)
            .collect();

        let result = match kind {
            FavoriteKind::Club => repository.list_for_clubs(names, limit).await,
            FavoriteKind::Player => repository.list_for_players(names, limit).await,
        };
        result.unwrap_or_else(|e| degraded("list_for_favorites", e))
    }

    pub async fn distinct_clubs(&self) -> Vec<String> {
        let Some(repository) = self.store("distinct_clubs") else {
            return Vec::new();
        };
        repository
            .distinct_clubs()
            .await
            .unwrap_or_else(|e| degraded("distinct_clubs", e))
    }

    pub async fn distinct_leagues(&self) -> Vec<String> {
        let Some(repository) = self.store("distinct_leagues") else {
            return Vec::new();
        };
        repository
            .distinct_leagues()
            .await
            .unwrap_or_else(|e| degraded("distinct_leagues", e))
    }

    pub async fn count_news(&self, league: Option<&str>) -> u64 {
        let Some(repository) = self.store("count_news") else {
            return 0;
        };
        repository
            .count_news(league.map(str::to_string))
            .await
            .unwrap_or_else(|e| degraded("count_news", e))
    }

    pub async fn stats(&self) -> Stats {
        let mut per_league = BTreeMap::new();
        for league in self.distinct_leagues().await {
            let count = self.count_news(Some(&league)).await;
            per_league.insert(league, count);
        }
        Stats {
            total: self.count_news(None).await,
            per_league,
            clubs: self.distinct_clubs().await.len(),
        }
    }

    // Favorites

    /// `true` once the triple is stored.
    pub async fn add_favorite(&self, user_id: i64, kind: FavoriteKind, name: &str) -> bool {
        let Some(repository) = self.store("add_favorite") else {
            return false;
        };
        match repository.add_favorite(user_id, kind, name).await {
            Ok(()) => true,
            Err(e) => degraded("add_favorite", e),
        }
    }

    pub async fn remove_favorite(&self, user_id: i64, kind: FavoriteKind, name: &str) -> bool {
        let Some(repository) = self.store("remove_favorite") else {
            return false;
        };
        match repository.remove_favorite(user_id, kind, name).await {
            Ok(()) => true,
            Err(e) => degraded("remove_favorite", e),
        }
    }

    pub async fn list_favorites(&self, user_id: i64, kind: Option<FavoriteKind>) -> Vec<Favorite> {
        let Some(repository) = self.store("list_favorites") else {
            return Vec::new();
        };
        repository
            .list_favorites(user_id, kind)
            .await
            .unwrap_or_else(|e| degraded("list_favorites", e))
    }

    pub async fn is_favorite(&self, user_id: i64, kind: FavoriteKind, name: &str) -> bool {
        let Some(repository) = self.store("is_favorite") else {
            return false;
        };
        repository
            .is_favorite(user_id, kind, name)
            .await
            .unwrap_or_else(|e| degraded("is_favorite", e))
    }
}

fn degraded<T: Default>(operation: &str, error: AppError) -> T {
    tracing::error!(operation, error = %error, "store query failed");
    T::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewNews, UpsertPolicy};

    fn news(link: &str, title: &str, clubs: &str, league: Option<&str>) -> NewNews {
        NewNews {
            title: title.to_string(),
            link: link.to_string(),
            rubric: None,
            date: None,
            image_url: None,
            club_tags: clubs.to_string(),
            league: league.map(str::to_string),
            scraped_at: "2026-10-14 08:00:00".to_string(),
        }
    }

    async fn seeded(repo: &Repository) {
        repo.upsert_many(
            vec![
                news("https://a/1", "Зенит взял верх", "Зенит", Some("Российская Премьер-лига")),
                news("https://a/2", "Холанд снова забил", "Манчестер Сити", Some("Английская Премьер-лига")),
                news("https://a/3", "Спартак и Зенит в дерби", "Спартак, Зенит", Some("Российская Премьер-лига")),
            ],
            UpsertPolicy::Ignore,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn stats_counts_per_league() {
        let repo = Repository::in_memory().await.unwrap();
        seeded(&repo).await;

        let stats = NewsCatalog::new(&repo).stats().await;
        assert_eq!(stats.total, 3);
        assert_eq!(stats.per_league.get("Российская Премьер-лига"), Some(&2));
        assert_eq!(stats.per_league.get("Английская Премьер-лига"), Some(&1));
        assert_eq!(stats.clubs, 3);
    }

    #[tokio::test]
    async fn favorites_drive_listings() {
        let repo = Repository::in_memory().await.unwrap();
        seeded(&repo).await;
        let catalog = NewsCatalog::new(&repo);

        assert!(catalog.list_for_favorites(7, FavoriteKind::Club, 10).await.is_empty());

        assert!(catalog.add_favorite(7, FavoriteKind::Club, "Спартак").await);
        assert!(catalog.add_favorite(7, FavoriteKind::Player, "Холанд").await);

        let clubs = catalog.list_for_favorites(7, FavoriteKind::Club, 10).await;
        assert_eq!(clubs.len(), 1);
        assert_eq!(clubs[0].link, "https://a/3");

        let players = catalog.list_for_favorites(7, FavoriteKind::Player, 10).await;
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].link, "https://a/2");

        assert!(catalog.is_favorite(7, FavoriteKind::Club, "Спартак").await);
        assert!(catalog.remove_favorite(7, FavoriteKind::Club, "Спартак").await);
        assert!(!catalog.is_favorite(7, FavoriteKind::Club, "Спартак").await);
    }

    #[tokio::test]
    async fn unopenable_store_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path().join("missing").join("sub").join("news.db")).await;
        assert!(store.is_none());

        let catalog = NewsCatalog::over(store.as_ref());
        assert!(catalog.list_news(10, NewsFilter::default()).await.is_empty());
        assert!(catalog.list_for_favorites(1, FavoriteKind::Club, 10).await.is_empty());
        assert_eq!(catalog.count_news(Some("MLS")).await, 0);
        assert_eq!(catalog.stats().await, Stats::default());
        assert!(catalog.list_favorites(1, None).await.is_empty());
        assert!(!catalog.add_favorite(1, FavoriteKind::Player, "Дзюба").await);
        assert!(!catalog.remove_favorite(1, FavoriteKind::Player, "Дзюба").await);
    }

    #[tokio::test]
    async fn broken_store_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news.db");
        let repo = Repository::new(&path).await.unwrap();
        seeded(&repo).await;

        let raw = rusqlite::Connection::open(&path).unwrap();
        raw.execute_batch("DROP TABLE news; DROP TABLE favorites;").unwrap();
        drop(raw);

        let catalog = NewsCatalog::new(&repo);
        assert!(catalog.list_news(10, NewsFilter::default()).await.is_empty());
        assert!(catalog.distinct_clubs().await.is_empty());
        assert!(catalog.distinct_leagues().await.is_empty());
        assert_eq!(catalog.count_news(None).await, 0);
        assert_eq!(catalog.stats().await, Stats::default());
        assert!(!catalog.add_favorite(1, FavoriteKind::Club, "Зенит").await);
        assert!(!catalog.is_favorite(1, FavoriteKind::Club, "Зенит").await);
    }
}
