use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::models::{FavoriteKind, NewsFilter, NewsRecord};
use crate::services::NewsCatalog;

pub const MIN_PLAYER_QUERY_CHARS: usize = 2;

/// What a browse session lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewsQuery {
    All,
    Club(String),
    League(String),
    Player(String),
    FavoriteClubs,
    FavoritePlayers,
}

impl fmt::Display for NewsQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NewsQuery::All => f.write_str("все новости"),
            NewsQuery::Club(club) => write!(f, "клуб {club}"),
            NewsQuery::League(league) => write!(f, "лига {league}"),
            NewsQuery::Player(player) => write!(f, "игрок {player}"),
            NewsQuery::FavoriteClubs => f.write_str("избранные клубы"),
            NewsQuery::FavoritePlayers => f.write_str("избранные игроки"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BrowseError {
    #[error("player query must be at least {} characters", MIN_PLAYER_QUERY_CHARS)]
    QueryTooShort,

    #[error("no news for {0}")]
    Empty(NewsQuery),
}

/// Outcome of [`BrowseSession::toggle_favorite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteToggle {
    Added,
    Removed,
    /// The store rejected the change; nothing was toggled.
    Failed,
}

/// A fetched list of news plus a cursor over it. Never empty.
#[derive(Debug, Clone)]
pub struct BrowseSession {
    pub user_id: i64,
    pub query: NewsQuery,
    news: Vec<NewsRecord>,
    selected_index: usize,
}

impl BrowseSession {
    pub async fn open(
        catalog: &NewsCatalog<'_>,
        user_id: i64,
        query: NewsQuery,
        limit: usize,
    ) -> Result<Self, BrowseError> {
        let query = match query {
            NewsQuery::Player(player) => {
                let player = player.trim().to_string();
                if player.chars().count() < MIN_PLAYER_QUERY_CHARS {
                    return Err(BrowseError::QueryTooShort);
                }
                NewsQuery::Player(player)
            }
            NewsQuery::Club(club) => NewsQuery::Club(club.trim().to_string()),
            NewsQuery::League(league) => NewsQuery::League(league.trim().to_string()),
            other => other,
        };

        let news = match &query {
            NewsQuery::All => catalog.list_news(limit, NewsFilter::default()).await,
            NewsQuery::Club(club) => catalog.list_news(limit, NewsFilter::club(club.as_str())).await,
            NewsQuery::League(league) => {
                catalog.list_news(limit, NewsFilter::league(league.as_str())).await
            }
            NewsQuery::Player(player) => {
                catalog.list_news(limit, NewsFilter::player(player.as_str())).await
            }
            NewsQuery::FavoriteClubs => {
                catalog.list_for_favorites(user_id, FavoriteKind::Club, limit).await
            }
            NewsQuery::FavoritePlayers => {
                catalog.list_for_favorites(user_id, FavoriteKind::Player, limit).await
            }
        };

        if news.is_empty() {
            return Err(BrowseError::Empty(query));
        }
        Ok(Self::from_news(user_id, query, news))
    }

    fn from_news(user_id: i64, query: NewsQuery, news: Vec<NewsRecord>) -> Self {
        Self {
            user_id,
            query,
            news,
            selected_index: 0,
        }
    }

    pub fn current(&self) -> &NewsRecord {
        &self.news[self.selected_index]
    }

    /// Returns false when already on the last card.
    pub fn next(&mut self) -> bool {
        if self.selected_index + 1 < self.news.len() {
            self.selected_index += 1;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.selected_index > 0 {
            self.selected_index -= 1;
            true
        } else {
            false
        }
    }

    /// 1-based index and total.
    pub fn position(&self) -> (usize, usize) {
        (self.selected_index + 1, self.news.len())
    }

    /// The club or player that `toggle_favorite` acts on: the queried one, or
    /// the first club tagged on the current card.
    pub fn favorite_target(&self) -> Option<(FavoriteKind, String)> {
        match &self.query {
            NewsQuery::Club(club) => Some((FavoriteKind::Club, club.clone())),
            NewsQuery::Player(player) => Some((FavoriteKind::Player, player.clone())),
            _ => self
                .current()
                .clubs()
                .next()
                .map(|club| (FavoriteKind::Club, club.to_string())),
        }
    }

    /// Adds or removes the favorite target. `None` when there is nothing to toggle.
    pub async fn toggle_favorite(&self, catalog: &NewsCatalog<'_>) -> Option<FavoriteToggle> {
        let (kind, name) = self.favorite_target()?;
        let toggle = if catalog.is_favorite(self.user_id, kind, &name).await {
            if catalog.remove_favorite(self.user_id, kind, &name).await {
                FavoriteToggle::Removed
            } else {
                FavoriteToggle::Failed
            }
        } else if catalog.add_favorite(self.user_id, kind, &name).await {
            FavoriteToggle::Added
        } else {
            FavoriteToggle::Failed
        };
        Some(toggle)
    }

    pub fn render(&self, width: usize) -> String {
        let news = self.current();
        let mut card = textwrap::fill(&news.title, width);
        card.push_str("\n\n");

        let fields = [
            ("Рубрика", news.rubric.as_deref()),
            ("Дата", news.date.as_deref()),
            ("Лига", news.league.as_deref()),
            ("Клубы", Some(news.club_tags.as_str()).filter(|s| !s.is_empty())),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                card.push_str(&textwrap::fill(&format!("{label}: {value}"), width));
                card.push('\n');
            }
        }

        if let NewsQuery::Player(player) = &self.query {
            card.push_str(&format!("Поиск по игроку «{player}» идёт только по заголовкам\n"));
        }

        let (index, total) = self.position();
        card.push_str(&format!("\n{}\n[{index}/{total}]", news.link));
        card
    }
}

/// Live sessions by user id. Opening a new session replaces the old one.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<i64, BrowseSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: BrowseSession) -> &mut BrowseSession {
        match self.sessions.entry(session.user_id) {
            Entry::Occupied(mut entry) => {
                entry.insert(session);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(session),
        }
    }

    pub fn get(&self, user_id: i64) -> Option<&BrowseSession> {
        self.sessions.get(&user_id)
    }

    pub fn get_mut(&mut self, user_id: i64) -> Option<&mut BrowseSession> {
        self.sessions.get_mut(&user_id)
    }

    pub fn remove(&mut self, user_id: i64) -> Option<BrowseSession> {
        self.sessions.remove(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::db::Repository;
    use crate::models::{NewNews, UpsertPolicy};

    fn record(id: i64, title: &str, clubs: &str) -> NewsRecord {
        NewsRecord {
            id,
            title: title.to_string(),
            link: format!("https://news.sportbox.ru/n/{id}"),
            rubric: Some("РПЛ".to_string()),
            date: Some("14 октября 10:00".to_string()),
            image_url: None,
            club_tags: clubs.to_string(),
            league: Some("Российская Премьер-лига".to_string()),
            scraped_at: "2026-10-14 10:00:00".to_string(),
            created_at: Utc::now(),
        }
    }

    fn session() -> BrowseSession {
        BrowseSession::from_news(
            1,
            NewsQuery::All,
            vec![
                record(3, "Зенит обыграл Спартак", "Зенит, Спартак"),
                record(2, "Судья матча назначен", ""),
                record(1, "ЦСКА сыграл вничью", "ЦСКА"),
            ],
        )
    }

    async fn seeded_repo() -> Repository {
        let repo = Repository::in_memory().await.unwrap();
        let items = [
            ("https://a/1", "Дзюба оформил дубль", "Зенит"),
            ("https://a/2", "Зенит готовится к выезду", "Зенит"),
        ];
        let batch = items
            .iter()
            .map(|(link, title, clubs)| NewNews {
                title: title.to_string(),
                link: link.to_string(),
                rubric: None,
                date: None,
                image_url: None,
                club_tags: clubs.to_string(),
                league: None,
                scraped_at: String::new(),
            })
            .collect();
        repo.upsert_many(batch, UpsertPolicy::Ignore).await.unwrap();
        repo
    }

    #[test]
    fn cursor_clamps_at_both_ends() {
        let mut session = session();
        assert!(!session.prev());
        assert_eq!(session.position(), (1, 3));

        assert!(session.next());
        assert!(session.next());
        assert!(!session.next());
        assert_eq!(session.position(), (3, 3));
        assert_eq!(session.current().id, 1);

        assert!(session.prev());
        assert_eq!(session.current().id, 2);
    }

    #[test]
    fn card_lists_present_fields_and_position() {
        let mut session = session();
        let card = session.render(80);
        assert!(card.starts_with("Зенит обыграл Спартак\n\n"));
        assert!(card.contains("Рубрика: РПЛ"));
        assert!(card.contains("Клубы: Зенит, Спартак"));
        assert!(card.ends_with("https://news.sportbox.ru/n/3\n[1/3]"));

        session.next();
        let card = session.render(80);
        assert!(!card.contains("Клубы"));
        assert!(card.ends_with("[2/3]"));
    }

    #[test]
    fn favorite_target_follows_query_then_card() {
        let mut session = session();
        assert_eq!(
            session.favorite_target(),
            Some((FavoriteKind::Club, "Зенит".to_string()))
        );
        session.next();
        assert_eq!(session.favorite_target(), None);

        session.query = NewsQuery::Player("Дзюба".to_string());
        assert_eq!(
            session.favorite_target(),
            Some((FavoriteKind::Player, "Дзюба".to_string()))
        );
    }

    #[tokio::test]
    async fn short_player_queries_are_rejected() {
        let repo = seeded_repo().await;
        let catalog = NewsCatalog::new(&repo);

        let err = BrowseSession::open(&catalog, 1, NewsQuery::Player(" Д ".to_string()), 10)
            .await
            .unwrap_err();
        assert_eq!(err, BrowseError::QueryTooShort);

        let session = BrowseSession::open(&catalog, 1, NewsQuery::Player("Дзюба".to_string()), 10)
            .await
            .unwrap();
        assert_eq!(session.position(), (1, 1));
        assert!(session.render(80).contains("только по заголовкам"));
    }

    #[tokio::test]
    async fn empty_results_are_reported() {
        let repo = seeded_repo().await;
        let catalog = NewsCatalog::new(&repo);

        let err = BrowseSession::open(&catalog, 1, NewsQuery::FavoriteClubs, 10)
            .await
            .unwrap_err();
        assert_eq!(err, BrowseError::Empty(NewsQuery::FavoriteClubs));
    }

    #[tokio::test]
    async fn toggling_flips_the_favorite() {
        let repo = seeded_repo().await;
        let catalog = NewsCatalog::new(&repo);
        let session = BrowseSession::open(&catalog, 5, NewsQuery::Club("Зенит".to_string()), 10)
            .await
            .unwrap();
        assert_eq!(session.position().1, 2);

        assert_eq!(session.toggle_favorite(&catalog).await, Some(FavoriteToggle::Added));
        assert!(catalog.is_favorite(5, FavoriteKind::Club, "Зенит").await);

        let favorites = BrowseSession::open(&catalog, 5, NewsQuery::FavoriteClubs, 10)
            .await
            .unwrap();
        assert_eq!(favorites.position().1, 2);

        assert_eq!(session.toggle_favorite(&catalog).await, Some(FavoriteToggle::Removed));
        assert!(!catalog.is_favorite(5, FavoriteKind::Club, "Зенит").await);
    }

    #[tokio::test]
    async fn failed_add_is_not_reported_as_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news.db");
        let repo = Repository::new(&path).await.unwrap();
        let catalog = NewsCatalog::new(&repo);
        let session = BrowseSession::from_news(
            9,
            NewsQuery::Club("Зенит".to_string()),
            vec![record(1, "Зенит обыграл Спартак", "Зенит, Спартак")],
        );

        let raw = rusqlite::Connection::open(&path).unwrap();
        raw.execute_batch("DROP TABLE favorites;").unwrap();
        drop(raw);

        assert_eq!(session.toggle_favorite(&catalog).await, Some(FavoriteToggle::Failed));
        assert!(!catalog.is_favorite(9, FavoriteKind::Club, "Зенит").await);
    }

    #[tokio::test]
    async fn store_keeps_one_session_per_user() {
        let repo = seeded_repo().await;
        let catalog = NewsCatalog::new(&repo);
        let mut store = SessionStore::new();

        let first = BrowseSession::open(&catalog, 1, NewsQuery::All, 10).await.unwrap();
        store.insert(first).next();
        let second = BrowseSession::open(&catalog, 2, NewsQuery::All, 10).await.unwrap();
        store.insert(second);
        assert!(store.get(2).is_some());
        assert_eq!(store.get(1).map(|s| s.position()), Some((2, 2)));

        let reopened = BrowseSession::open(&catalog, 1, NewsQuery::All, 10).await.unwrap();
        store.insert(reopened);
        assert!(store.get(2).is_some());
        assert_eq!(store.get(1).map(|s| s.position()), Some((1, 2)));
        assert!(store.remove(2).is_some());
        assert!(store.get_mut(2).is_none());
    }
}
