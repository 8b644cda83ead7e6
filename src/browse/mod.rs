mod session;

pub use session::{
    BrowseError, BrowseSession, FavoriteToggle, NewsQuery, SessionStore, MIN_PLAYER_QUERY_CHARS,
};
