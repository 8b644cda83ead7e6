mod favorite;
mod news;

pub use favorite::{Favorite, FavoriteKind};
pub use news::{Candidate, NewNews, NewsFilter, NewsRecord, UpsertPolicy, UpsertReport};
