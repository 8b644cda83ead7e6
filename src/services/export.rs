use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::NewsRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub json: PathBuf,
    /// Not written for an empty record set.
    pub csv: Option<PathBuf>,
}

/// Writes `news_<stamp>.json` (one pretty array) and `news_<stamp>.csv` into `dir`.
pub fn export_records(records: &[NewsRecord], dir: &Path, stamp: &str) -> Result<ExportPaths> {
    std::fs::create_dir_all(dir)?;

    let json = dir.join(format!("news_{stamp}.json"));
    let writer = BufWriter::new(File::create(&json)?);
    serde_json::to_writer_pretty(writer, records)?;

    let csv = if records.is_empty() {
        None
    } else {
        let path = dir.join(format!("news_{stamp}.csv"));
        let mut writer = csv::Writer::from_path(&path)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Some(path)
    };

    tracing::info!(count = records.len(), json = %json.display(), "exported news");
    Ok(ExportPaths { json, csv })
}
