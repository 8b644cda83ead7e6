use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod app;
mod browse;
mod config;
mod db;
mod error;
mod models;
mod normalize;
mod scrape;
mod services;

use app::App;
use browse::{BrowseError, BrowseSession, FavoriteToggle, NewsQuery, SessionStore};
use config::Config;
use error::Result;
use models::{FavoriteKind, NewsFilter, NewsRecord, UpsertPolicy};
use scrape::{find_source, Extractor, SOURCES};
use services::{open_store, NewsCatalog};

const CARD_WIDTH: usize = 80;
const BROWSE_KEYS: &str = "n: next  p: prev  o: open  s: favorite  q: quit";

/// Football news scraper and reader
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// SQLite database file, overrides `db_path` from the config
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Owner of favorites and browse sessions
    #[arg(long, global = true, env = "FOOTBALL_NEWS_USER", default_value_t = 0)]
    user: i64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scrape one source or all of them
    Scrape {
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        pages: Option<u32>,
        #[arg(long, value_enum)]
        policy: Option<UpsertPolicy>,
        /// Drop listing titles shorter than 15 characters
        #[arg(long)]
        strict: bool,
        /// Store nothing from pages where no listing pattern matches
        #[arg(long)]
        no_anchor_scan: bool,
    },
    /// Store news from a saved listing page of a source
    Ingest {
        #[arg(long)]
        source: String,
        file: PathBuf,
        #[arg(long, value_enum)]
        policy: Option<UpsertPolicy>,
    },
    /// Latest stored news
    List {
        #[arg(long)]
        club: Option<String>,
        #[arg(long)]
        league: Option<String>,
        #[arg(long)]
        player: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    Clubs,
    Leagues,
    Count {
        #[arg(long)]
        league: Option<String>,
    },
    Stats,
    /// Dump every record to JSON and CSV
    Export {
        #[arg(long)]
        dir: Option<String>,
    },
    Favorites {
        #[command(subcommand)]
        command: FavoritesCommand,
    },
    /// Page through news one card at a time
    Browse {
        #[arg(long)]
        club: Option<String>,
        #[arg(long)]
        league: Option<String>,
        #[arg(long)]
        player: Option<String>,
        /// Browse news for your favorite clubs or players
        #[arg(long, value_enum)]
        favorites: Option<FavoriteKind>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Known sources
    Sources,
}

#[derive(Debug, Subcommand)]
enum FavoritesCommand {
    Add {
        #[arg(value_enum)]
        kind: FavoriteKind,
        name: String,
    },
    Remove {
        #[arg(value_enum)]
        kind: FavoriteKind,
        name: String,
    },
    List {
        #[arg(long, value_enum)]
        kind: Option<FavoriteKind>,
    },
    Check {
        #[arg(value_enum)]
        kind: FavoriteKind,
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(db) = &cli.db {
        config.db_path = db.to_string_lossy().to_string();
    }

    match cli.command {
        Command::Scrape {
            source,
            pages,
            policy,
            strict,
            no_anchor_scan,
        } => {
            if let Some(policy) = policy {
                config.upsert_policy = policy;
            }
            let pages = pages.unwrap_or(config.pages).max(1);

            let mut app = App::new(config).await?;
            if strict || no_anchor_scan {
                let extractor = if strict { Extractor::strict()? } else { Extractor::new()? };
                app = app.with_extractor(extractor.with_anchor_fallback(!no_anchor_scan));
            }

            let reports = match source {
                Some(key) => vec![app.scrape_source(find_source(&key)?, pages).await?],
                None => app.scrape_all(pages).await,
            };
            for report in &reports {
                println!("{report}");
            }
            println!("Total stored: {}", app.catalog().count_news(None).await);
        }

        Command::Ingest {
            source,
            file,
            policy,
        } => {
            if let Some(policy) = policy {
                config.upsert_policy = policy;
            }
            let source = find_source(&source)?;
            let html = std::fs::read_to_string(&file)?;
            let app = App::new(config).await?;
            let report = app.ingest_html(&html, source).await?;
            println!(
                "{}: {} new, {} updated, {} skipped",
                source.key, report.inserted, report.updated, report.skipped
            );
        }

        Command::List {
            club,
            league,
            player,
            limit,
        } => {
            let limit = limit.unwrap_or(config.list_limit);
            let store = open_store(&config.db_path).await;
            let news = NewsCatalog::over(store.as_ref())
                .list_news(limit, NewsFilter { club, league, player })
                .await;
            if news.is_empty() {
                println!("No news found.");
            }
            for record in &news {
                print_line(record);
            }
        }

        Command::Clubs => {
            let store = open_store(&config.db_path).await;
            for club in NewsCatalog::over(store.as_ref()).distinct_clubs().await {
                println!("{club}");
            }
        }

        Command::Leagues => {
            let store = open_store(&config.db_path).await;
            for league in NewsCatalog::over(store.as_ref()).distinct_leagues().await {
                println!("{league}");
            }
        }

        Command::Count { league } => {
            let store = open_store(&config.db_path).await;
            let count = NewsCatalog::over(store.as_ref()).count_news(league.as_deref()).await;
            println!("{count}");
        }

        Command::Stats => {
            let store = open_store(&config.db_path).await;
            let stats = NewsCatalog::over(store.as_ref()).stats().await;
            println!("Total news: {}", stats.total);
            println!("Clubs tagged: {}", stats.clubs);
            for (league, count) in &stats.per_league {
                println!("  {league}: {count}");
            }
        }

        Command::Export { dir } => {
            if let Some(dir) = dir {
                config.export_dir = dir;
            }
            let app = App::new(config).await?;
            let paths = app.export().await?;
            println!("{}", paths.json.display());
            match paths.csv {
                Some(csv) => println!("{}", csv.display()),
                None => println!("No records, CSV not written."),
            }
        }

        Command::Favorites { command } => {
            let store = open_store(&config.db_path).await;
            let catalog = NewsCatalog::over(store.as_ref());
            match command {
                FavoritesCommand::Add { kind, name } => {
                    if catalog.add_favorite(cli.user, kind, &name).await {
                        println!("Added {kind} {name}");
                    } else {
                        println!("Could not add {kind} {name}");
                    }
                }
                FavoritesCommand::Remove { kind, name } => {
                    if catalog.remove_favorite(cli.user, kind, &name).await {
                        println!("Removed {kind} {name}");
                    } else {
                        println!("Could not remove {kind} {name}");
                    }
                }
                FavoritesCommand::List { kind } => {
                    let favorites = catalog.list_favorites(cli.user, kind).await;
                    if favorites.is_empty() {
                        println!("No favorites yet.");
                    }
                    for favorite in favorites {
                        println!("{}\t{}", favorite.kind, favorite.name);
                    }
                }
                FavoritesCommand::Check { kind, name } => {
                    println!("{}", catalog.is_favorite(cli.user, kind, &name).await);
                }
            }
        }

        Command::Browse {
            club,
            league,
            player,
            favorites,
            limit,
        } => {
            let query = match (club, league, player, favorites) {
                (Some(club), _, _, _) => NewsQuery::Club(club),
                (_, Some(league), _, _) => NewsQuery::League(league),
                (_, _, Some(player), _) => NewsQuery::Player(player),
                (_, _, _, Some(FavoriteKind::Club)) => NewsQuery::FavoriteClubs,
                (_, _, _, Some(FavoriteKind::Player)) => NewsQuery::FavoritePlayers,
                _ => NewsQuery::All,
            };
            let limit = limit.unwrap_or(config.list_limit);
            let store = open_store(&config.db_path).await;
            run_browse(NewsCatalog::over(store.as_ref()), cli.user, query, limit).await?;
        }

        Command::Sources => {
            for source in SOURCES {
                println!(
                    "{:<14} {:<32} {}",
                    source.key,
                    source.name,
                    source.league.unwrap_or("(по рубрике)")
                );
            }
        }
    }

    Ok(())
}

/// `RUST_LOG` directives when set and valid, `info` otherwise.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn print_line(record: &NewsRecord) {
    let date = record.date.as_deref().unwrap_or("-");
    println!("[{date}] {}", record.title);
    let league = record.league.as_deref().unwrap_or("-");
    if record.club_tags.is_empty() {
        println!("    {league}");
    } else {
        println!("    {league} | {}", record.club_tags);
    }
    println!("    {}", record.link);
}

async fn run_browse(
    catalog: NewsCatalog<'_>,
    user_id: i64,
    query: NewsQuery,
    limit: usize,
) -> Result<()> {
    let mut sessions = SessionStore::new();

    match BrowseSession::open(&catalog, user_id, query, limit).await {
        Ok(session) => {
            println!("{}\n", session.render(CARD_WIDTH));
            sessions.insert(session);
        }
        Err(BrowseError::QueryTooShort) => {
            println!("Введите хотя бы {} символа имени игрока.", browse::MIN_PLAYER_QUERY_CHARS);
            return Ok(());
        }
        Err(e @ BrowseError::Empty(_)) => {
            println!("Извините, ничего не нашлось: {e}");
            return Ok(());
        }
    }
    println!("{BROWSE_KEYS}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(session) = sessions.get_mut(user_id) else {
            break;
        };
        match line.trim() {
            "n" => {
                if !session.next() {
                    println!("Это последняя новость.");
                    continue;
                }
            }
            "p" => {
                if !session.prev() {
                    println!("Это первая новость.");
                    continue;
                }
            }
            "o" => {
                let link = &session.current().link;
                if let Err(e) = open::that(link) {
                    tracing::warn!(error = %e, "failed to open browser");
                    println!("{link}");
                }
                continue;
            }
            "s" => {
                let target = session.favorite_target();
                match (target, session.toggle_favorite(&catalog).await) {
                    (Some((kind, name)), Some(FavoriteToggle::Added)) => {
                        println!("{kind} {name}: в избранном")
                    }
                    (Some((kind, name)), Some(FavoriteToggle::Removed)) => {
                        println!("{kind} {name}: убрано из избранного")
                    }
                    (_, Some(FavoriteToggle::Failed)) => {
                        println!("Извините, избранное сейчас недоступно.")
                    }
                    _ => println!("Нечего добавлять в избранное."),
                }
                continue;
            }
            "q" => {
                sessions.remove(user_id);
                break;
            }
            _ => {
                println!("{BROWSE_KEYS}");
                continue;
            }
        }

        if let Some(session) = sessions.get(user_id) {
            println!("{}\n", session.render(CARD_WIDTH));
        }
    }

    Ok(())
}
