use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{
    Favorite, FavoriteKind, NewNews, NewsFilter, NewsRecord, UpsertPolicy, UpsertReport,
};

use super::schema::{MIGRATED_COLUMNS, SCHEMA};

const NEWS_COLUMNS: &str =
    "id, title, link, rubric, date, image_url, club_tags, league, scraped_at, created_at";

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;

            let mut stmt = conn.prepare("PRAGMA table_info(news)")?;
            let columns = stmt
                .query_map([], |row| row.get::<_, String>(1))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            for &(column, index) in MIGRATED_COLUMNS {
                if !columns.iter().any(|c| c == column) {
                    tracing::info!(column, "adding missing column to news table");
                    conn.execute(&format!("ALTER TABLE news ADD COLUMN {column} TEXT"), [])?;
                }
                conn.execute(index, [])?;
            }
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // News writes

    /// Stores every record with a non-empty link in one transaction.
    /// Already-known links are skipped or refreshed according to `policy`.
    pub async fn upsert_many(
        &self,
        records: Vec<NewNews>,
        policy: UpsertPolicy,
    ) -> Result<UpsertReport> {
        let report = self
            .conn
            .call(move |conn| {
                let mut report = UpsertReport::default();
                let mut seen = HashSet::new();
                let tx = conn.transaction()?;
                {
                    let mut insert = tx.prepare(
                        r#"INSERT OR IGNORE INTO news
                           (title, link, rubric, date, image_url, scraped_at, club_tags, league)
                           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
                    )?;
                    let mut update = tx.prepare(
                        r#"UPDATE news SET
                               title = ?1,
                               rubric = ?2,
                               date = ?3,
                               image_url = ?4,
                               scraped_at = ?5
                           WHERE link = ?6"#,
                    )?;

                    for record in records {
                        if record.link.trim().is_empty() {
                            tracing::debug!(title = %record.title, "skipping record without link");
                            report.skipped += 1;
                            continue;
                        }

                        // overlapping pages repeat items; the first copy wins
                        if !seen.insert(record.link.clone()) {
                            report.skipped += 1;
                            continue;
                        }

                        let known = link_exists(&tx, &record.link)?;
                        match (known, policy) {
                            (false, _) => {
                                let changed = insert.execute(params![
                                    record.title,
                                    record.link,
                                    record.rubric,
                                    record.date,
                                    record.image_url,
                                    record.scraped_at,
                                    record.club_tags,
                                    record.league,
                                ])?;
                                if changed > 0 {
                                    report.inserted += 1;
                                } else {
                                    report.skipped += 1;
                                }
                            }
                            (true, UpsertPolicy::Ignore) => report.skipped += 1,
                            (true, UpsertPolicy::Update) => {
                                update.execute(params![
                                    record.title,
                                    record.rubric,
                                    record.date,
                                    record.image_url,
                                    record.scraped_at,
                                    record.link,
                                ])?;
                                report.updated += 1;
                            }
                        }
                    }
                }
                tx.commit()?;
                Ok(report)
            })
            .await?;
        Ok(report)
    }

    #[allow(dead_code)]
    pub async fn exists(&self, link: &str) -> Result<bool> {
        let link = link.to_string();
        let exists = self
            .conn
            .call(move |conn| Ok(link_exists(conn, &link)?))
            .await?;
        Ok(exists)
    }

    // News queries

    pub async fn list_news(&self, limit: usize, filter: NewsFilter) -> Result<Vec<NewsRecord>> {
        let mut conditions = Vec::new();
        let mut values = Vec::new();

        if let Some(club) = filter.club {
            conditions.push("club_tags LIKE ? ESCAPE '\\'".to_string());
            values.push(Value::Text(like_pattern(&club)));
        }
        if let Some(league) = filter.league {
            conditions.push("league = ?".to_string());
            values.push(Value::Text(league));
        }
        if let Some(player) = filter.player {
            conditions.push("title LIKE ? ESCAPE '\\'".to_string());
            values.push(Value::Text(like_pattern(&player)));
        }

        self.select_news(conditions, " AND ", values, limit).await
    }

    /// Records tagged with any of `clubs`.
    pub async fn list_for_clubs(&self, clubs: Vec<String>, limit: usize) -> Result<Vec<NewsRecord>> {
        self.list_any_of("club_tags", clubs, limit).await
    }

    /// Records whose title mentions any of `players`.
    pub async fn list_for_players(
        &self,
        players: Vec<String>,
        limit: usize,
    ) -> Result<Vec<NewsRecord>> {
        self.list_any_of("title", players, limit).await
    }

    pub async fn list_all(&self) -> Result<Vec<NewsRecord>> {
        self.select_news(Vec::new(), " AND ", Vec::new(), usize::MAX).await
    }

    async fn list_any_of(
        &self,
        column: &str,
        needles: Vec<String>,
        limit: usize,
    ) -> Result<Vec<NewsRecord>> {
        if needles.is_empty() {
            return Ok(Vec::new());
        }
        let conditions = needles
            .iter()
            .map(|_| format!("{column} LIKE ? ESCAPE '\\'"))
            .collect();
        let values = needles
            .iter()
            .map(|n| Value::Text(like_pattern(n)))
            .collect();
        self.select_news(conditions, " OR ", values, limit).await
    }

    async fn select_news(
        &self,
        conditions: Vec<String>,
        joiner: &str,
        mut values: Vec<Value>,
        limit: usize,
    ) -> Result<Vec<NewsRecord>> {
        let mut sql = format!("SELECT {NEWS_COLUMNS} FROM news");
        if !conditions.is_empty() {
            sql.push_str(&format!(" WHERE ({})", conditions.join(joiner)));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT ?");
        values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));

        let news = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let news = stmt
                    .query_map(params_from_iter(values.iter()), news_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(news)
            })
            .await?;
        Ok(news)
    }

    pub async fn distinct_clubs(&self) -> Result<Vec<String>> {
        let clubs = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT DISTINCT club_tags FROM news WHERE club_tags IS NOT NULL AND club_tags != ''",
                )?;
                let mut clubs = BTreeSet::new();
                let tags = stmt.query_map([], |row| row.get::<_, String>(0))?;
                for tag in tags {
                    for club in tag?.split(", ") {
                        let club = club.trim();
                        if !club.is_empty() {
                            clubs.insert(club.to_string());
                        }
                    }
                }
                Ok(clubs.into_iter().collect())
            })
            .await?;
        Ok(clubs)
    }

    pub async fn distinct_leagues(&self) -> Result<Vec<String>> {
        let leagues = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT DISTINCT league FROM news WHERE league IS NOT NULL AND league != '' ORDER BY league",
                )?;
                let leagues = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(leagues)
            })
            .await?;
        Ok(leagues)
    }

    pub async fn count_news(&self, league: Option<String>) -> Result<u64> {
        let count = self
            .conn
            .call(move |conn| {
                let count: i64 = match league {
                    Some(league) => conn.query_row(
                        "SELECT COUNT(*) FROM news WHERE league = ?1",
                        params![league],
                        |row| row.get(0),
                    )?,
                    None => conn.query_row("SELECT COUNT(*) FROM news", [], |row| row.get(0))?,
                };
                Ok(count)
            })
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    // Favorites

    pub async fn add_favorite(&self, user_id: i64, kind: FavoriteKind, name: &str) -> Result<()> {
        let name = name.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO favorites (user_id, type, name) VALUES (?1, ?2, ?3)",
                    params![user_id, kind.as_str(), name],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn remove_favorite(&self, user_id: i64, kind: FavoriteKind, name: &str) -> Result<()> {
        let name = name.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM favorites WHERE user_id = ?1 AND type = ?2 AND name = ?3",
                    params![user_id, kind.as_str(), name],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Most recently added first.
    pub async fn list_favorites(
        &self,
        user_id: i64,
        kind: Option<FavoriteKind>,
    ) -> Result<Vec<Favorite>> {
        let favorites = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT user_id, type, name, added_at FROM favorites
                       WHERE user_id = ?1 AND (?2 IS NULL OR type = ?2)
                       ORDER BY added_at DESC, rowid DESC"#,
                )?;
                let favorites = stmt
                    .query_map(params![user_id, kind.map(|k| k.as_str())], favorite_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(favorites)
            })
            .await?;
        Ok(favorites)
    }

    pub async fn is_favorite(&self, user_id: i64, kind: FavoriteKind, name: &str) -> Result<bool> {
        let name = name.to_string();
        let exists = self
            .conn
            .call(move |conn| {
                let found = conn
                    .query_row(
                        "SELECT 1 FROM favorites WHERE user_id = ?1 AND type = ?2 AND name = ?3",
                        params![user_id, kind.as_str(), name],
                        |_| Ok(()),
                    )
                    .optional()?;
                Ok(found.is_some())
            })
            .await?;
        Ok(exists)
    }
}

fn link_exists(conn: &rusqlite::Connection, link: &str) -> rusqlite::Result<bool> {
    conn.prepare_cached("SELECT 1 FROM news WHERE link = ?1")?
        .exists(params![link])
}

fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite CURRENT_TIMESTAMP format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn news_from_row(row: &Row) -> rusqlite::Result<NewsRecord> {
    Ok(NewsRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        link: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        rubric: non_empty(row.get(3)?),
        date: non_empty(row.get(4)?),
        image_url: non_empty(row.get(5)?),
        club_tags: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        league: non_empty(row.get(7)?),
        scraped_at: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        created_at: row
            .get::<_, String>(9)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    })
}

fn favorite_from_row(row: &Row) -> rusqlite::Result<Favorite> {
    let kind: String = row.get(1)?;
    let kind = kind.parse::<FavoriteKind>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, e.into())
    })?;
    Ok(Favorite {
        user_id: row.get(0)?,
        kind,
        name: row.get(2)?,
        added_at: row
            .get::<_, String>(3)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
