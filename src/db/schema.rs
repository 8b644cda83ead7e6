pub const SCHEMA: &str = r#"
-- news table
CREATE TABLE IF NOT EXISTS news (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    link TEXT UNIQUE,
    rubric TEXT,
    date TEXT,
    image_url TEXT,
    scraped_at TEXT,
    club_tags TEXT,
    league TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_news_title ON news(title);
CREATE INDEX IF NOT EXISTS idx_news_created_at ON news(created_at DESC);

-- favorites table
CREATE TABLE IF NOT EXISTS favorites (
    user_id INTEGER NOT NULL,
    type TEXT NOT NULL CHECK (type IN ('club', 'player')),
    name TEXT NOT NULL,
    added_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (user_id, type, name)
);
"#;

/// Columns that older `news` tables may lack, with the index each one gets.
pub const MIGRATED_COLUMNS: &[(&str, &str)] = &[
    (
        "club_tags",
        "CREATE INDEX IF NOT EXISTS idx_news_club_tags ON news(club_tags)",
    ),
    (
        "league",
        "CREATE INDEX IF NOT EXISTS idx_news_league ON news(league)",
    ),
];
