use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of the `news` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsRecord {
    pub id: i64,
    pub title: String,
    pub link: String,
    pub rubric: Option<String>,
    pub date: Option<String>,
    pub image_url: Option<String>,
    /// Canonical club names joined with `", "`; empty when nothing matched.
    pub club_tags: String,
    pub league: Option<String>,
    pub scraped_at: String,
    pub created_at: DateTime<Utc>,
}

impl NewsRecord {
    pub fn clubs(&self) -> impl Iterator<Item = &str> {
        self.club_tags
            .split(", ")
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Raw fields pulled out of one listing element. Missing fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    pub title: String,
    pub link: String,
    pub rubric: String,
    pub date: String,
    pub image_url: String,
}

/// A normalized candidate, ready for the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNews {
    pub title: String,
    pub link: String,
    pub rubric: Option<String>,
    pub date: Option<String>,
    pub image_url: Option<String>,
    pub club_tags: String,
    pub league: Option<String>,
    pub scraped_at: String,
}

/// What happens when an upserted link is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UpsertPolicy {
    /// Keep the stored row untouched.
    #[default]
    Ignore,
    /// Refresh title, rubric, date, image and scrape time in place.
    Update,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertReport {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl std::ops::AddAssign for UpsertReport {
    fn add_assign(&mut self, rhs: Self) {
        self.inserted += rhs.inserted;
        self.updated += rhs.updated;
        self.skipped += rhs.skipped;
    }
}

/// Optional criteria for news listings. All present criteria must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsFilter {
    /// Substring of `club_tags`.
    pub club: Option<String>,
    /// Exact `league`.
    pub league: Option<String>,
    /// Substring of `title`.
    pub player: Option<String>,
}

impl NewsFilter {
    pub fn club(club: impl Into<String>) -> Self {
        Self {
            club: Some(club.into()),
            ..Self::default()
        }
    }

    pub fn league(league: impl Into<String>) -> Self {
        Self {
            league: Some(league.into()),
            ..Self::default()
        }
    }

    pub fn player(player: impl Into<String>) -> Self {
        Self {
            player: Some(player.into()),
            ..Self::default()
        }
    }
}
