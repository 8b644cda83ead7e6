mod extractor;
mod fetcher;
mod sources;

pub use extractor::Extractor;
pub use fetcher::PageFetcher;
pub use sources::{find_source, Source, SOURCES};
