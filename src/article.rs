use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::info;

/// One configured feed endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub url: String,
    pub source_name: String,
    pub category: String,
}

/// A normalized news item.
///
/// Field order matches the persisted CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub headline: String,
    pub summary: String,
    pub url: String,
    pub source: String,
    pub category: String,
    /// `YYYY-MM-DD` when the feed date could be read, otherwise the raw date text
    pub timestamp: String,
}

/// Drop repeated articles, keeping the first occurrence.
///
/// The first pass collapses articles sharing a `url` (an empty url is a key
/// like any other); the second collapses survivors sharing a `headline`.
pub fn dedupe(articles: Vec<Article>) -> Vec<Article> {
    let before = articles.len();

    let mut seen_urls = HashSet::new();
    let unique_urls: Vec<Article> = articles
        .into_iter()
        .filter(|a| seen_urls.insert(a.url.clone()))
        .collect();

    let mut seen_headlines = HashSet::new();
    let unique: Vec<Article> = unique_urls
        .into_iter()
        .filter(|a| seen_headlines.insert(a.headline.clone()))
        .collect();

    info!(
        "Removed {} duplicates, {} articles remain",
        before - unique.len(),
        unique.len()
    );
    unique
}
