//! CSV snapshots of collected articles.
//!
//! Every run writes `all_news_<stamp>.csv` plus one file per category, all
//! sharing the run's wall-clock stamp so earlier runs are never overwritten.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::{error, info, warn};

use crate::article::Article;
use crate::error::StoreError;

pub const AGGREGATE_PREFIX: &str = "all_news_";
pub const BACKUP_FILE: &str = "news_backup.csv";
pub const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
pub const COLUMNS: [&str; 6] = ["headline", "summary", "url", "source", "category", "timestamp"];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Files written by one [`save`] call.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub aggregate: Option<PathBuf>,
    pub categories: Vec<PathBuf>,
    pub backup: Option<PathBuf>,
}

/// Persist `articles` under `output_dir`. Failures are logged, never returned.
pub fn save(articles: &[Article], output_dir: &Path) -> SaveReport {
    save_at(articles, output_dir, Local::now().naive_local())
}

pub fn save_at(articles: &[Article], output_dir: &Path, run_time: NaiveDateTime) -> SaveReport {
    let mut report = SaveReport::default();
    if articles.is_empty() {
        warn!("No articles to save.");
        return report;
    }

    let stamp = run_time.format(FILE_STAMP_FORMAT).to_string();
    let aggregate = output_dir.join(format!("{}{}.csv", AGGREGATE_PREFIX, stamp));

    if let Err(e) = write_file(&aggregate, articles, true) {
        error!("Error saving results: {}", e);
        let backup = output_dir.join(BACKUP_FILE);
        match write_file(&backup, articles, false) {
            Ok(()) => {
                info!("Saved backup file to {}", backup.display());
                report.backup = Some(backup);
            }
            Err(e) => error!("Critical failure: Could not save any results: {}", e),
        }
        return report;
    }
    info!(
        "Saved all {} articles to {}",
        articles.len(),
        aggregate.display()
    );
    report.aggregate = Some(aggregate);

    for category in distinct_categories(articles) {
        let rows: Vec<Article> = articles
            .iter()
            .filter(|a| a.category == category)
            .cloned()
            .collect();
        let path = output_dir.join(format!("{}_{}.csv", category_file_stem(category), stamp));

        match write_file(&path, &rows, true) {
            Ok(()) => {
                info!(
                    "Saved {} {} articles to {}",
                    rows.len(),
                    category,
                    path.display()
                );
                report.categories.push(path);
            }
            Err(e) => error!("Error saving category {}: {}", category, e),
        }
    }

    report
}

/// `"US Politics"` becomes `"us_politics"`.
pub fn category_file_stem(category: &str) -> String {
    category.replace(' ', "_").to_lowercase()
}

fn distinct_categories(articles: &[Article]) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::new();
    for article in articles {
        if !seen.contains(&article.category.as_str()) {
            seen.push(&article.category);
        }
    }
    seen
}

fn write_file(path: &Path, articles: &[Article], with_bom: bool) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    if with_bom {
        file.write_all(UTF8_BOM)?;
    }
    write_csv(file, articles)
}

/// Write `articles` as CSV, header first, to any writer.
pub fn write_csv<W: Write>(out: W, articles: &[Article]) -> Result<(), StoreError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(out);
    writer.write_record(COLUMNS)?;
    for article in articles {
        writer.serialize(article)?;
    }
    writer.flush()?;
    Ok(())
}

/// Saved aggregate snapshots in `dir`, newest first.
pub fn list_saved_files(dir: &Path) -> Result<Vec<String>, StoreError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(AGGREGATE_PREFIX) && name.ends_with(".csv"))
        .collect();
    files.sort_unstable_by(|a, b| b.cmp(a));
    Ok(files)
}

/// Read a snapshot previously written to `dir`.
pub fn load_file(dir: &Path, name: &str) -> Result<Vec<Article>, StoreError> {
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(StoreError::InvalidFileName(name.to_string()));
    }

    let bytes = fs::read(dir.join(name))?;
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

    let mut reader = csv::Reader::from_reader(body);
    let articles = reader.deserialize().collect::<Result<Vec<Article>, _>>()?;
    Ok(articles)
}
