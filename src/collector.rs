use reqwest::Url;
use tracing::{error, info};

use crate::article::{dedupe, Article, SourceDescriptor};
use crate::config::CategoryConfig;
use crate::error::CollectError;
use crate::fetcher::Fetcher;

/// Runs every configured source once, in order, and gathers the results.
pub struct Collector {
    fetcher: Fetcher,
}

impl Collector {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    /// Collect all `categories` in declared order and return the
    /// deduplicated articles.
    ///
    /// A failing category or source is logged and skipped; the rest of the
    /// run carries on.
    pub async fn run(&self, categories: &[CategoryConfig], window_days: i64) -> Vec<Article> {
        info!(
            "Starting to scrape {} categories for past {} days",
            categories.len(),
            window_days
        );

        let mut articles = Vec::new();
        for category in categories {
            match self.collect_category(category, window_days).await {
                Ok(found) => articles.extend(found),
                Err(e) => error!("Error scraping category {}: {}", category.name, e),
            }
        }

        info!(
            "Completed scraping all categories. Collected {} articles total.",
            articles.len()
        );
        dedupe(articles)
    }

    pub async fn collect_category(
        &self,
        category: &CategoryConfig,
        window_days: i64,
    ) -> Result<Vec<Article>, CollectError> {
        info!("Scraping category: {}", category.name);

        if category.sources.is_empty() {
            return Err(CollectError::NoSources(category.name.clone()));
        }

        let mut articles = Vec::new();
        for source in category.descriptors() {
            if let Err(e) = check_source(&source) {
                error!(
                    "Error processing feed {} for category {}: {}",
                    source.source_name, category.name, e
                );
                continue;
            }
            articles.extend(self.fetcher.fetch(&source, window_days).await);
        }
        Ok(articles)
    }
}

fn check_source(source: &SourceDescriptor) -> Result<(), CollectError> {
    let invalid = |reason: String| CollectError::InvalidSourceUrl {
        url: source.url.clone(),
        source_name: source.source_name.clone(),
        reason,
    };

    let url = Url::parse(&source.url).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}
