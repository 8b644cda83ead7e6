mod catalog;
mod export;

pub use catalog::{open_store, NewsCatalog};
pub use export::{export_records, ExportPaths};
