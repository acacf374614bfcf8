use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::article::Article;
use crate::dates::CANONICAL_FORMAT;

/// Filters applied when browsing a snapshot. Unset fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    /// Case-insensitive match against headline or summary
    #[serde(default)]
    pub search: Option<String>,
    /// Inclusive lower bound, `YYYY-MM-DD`
    #[serde(default)]
    pub from: Option<String>,
    /// Inclusive upper bound, `YYYY-MM-DD`
    #[serde(default)]
    pub to: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_day(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, CANONICAL_FORMAT).ok()
}

impl ArticleQuery {
    pub fn category(&self) -> Option<&str> {
        non_empty(&self.category)
    }

    pub fn source(&self) -> Option<&str> {
        non_empty(&self.source)
    }

    pub fn search(&self) -> Option<&str> {
        non_empty(&self.search)
    }

    fn date_range(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (
            non_empty(&self.from).and_then(parse_day),
            non_empty(&self.to).and_then(parse_day),
        )
    }

    pub fn matches(&self, article: &Article) -> bool {
        if self.category().is_some_and(|c| article.category != c) {
            return false;
        }
        if self.source().is_some_and(|s| article.source != s) {
            return false;
        }
        if let Some(needle) = self.search() {
            let needle = needle.to_lowercase();
            if !article.headline.to_lowercase().contains(&needle)
                && !article.summary.to_lowercase().contains(&needle)
            {
                return false;
            }
        }

        let (from, to) = self.date_range();
        if from.is_some() || to.is_some() {
            // Snapshots may hold raw, unparsed dates; those cannot be placed
            // in a range.
            let Some(day) = parse_day(&article.timestamp) else {
                return false;
            };
            if from.is_some_and(|f| day < f) || to.is_some_and(|t| day > t) {
                return false;
            }
        }

        true
    }

    /// Matching articles, newest timestamp first. Ties keep snapshot order.
    pub fn apply(&self, articles: &[Article]) -> Vec<Article> {
        let mut matched: Vec<Article> = articles
            .iter()
            .filter(|a| self.matches(a))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matched
    }
}

/// Distinct values available for filtering, sorted.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Facets {
    pub categories: Vec<String>,
    pub sources: Vec<String>,
}

impl Facets {
    pub fn of(articles: &[Article]) -> Self {
        let categories: BTreeSet<&str> = articles.iter().map(|a| a.category.as_str()).collect();
        let sources: BTreeSet<&str> = articles.iter().map(|a| a.source.as_str()).collect();
        Self {
            categories: categories.into_iter().map(str::to_string).collect(),
            sources: sources.into_iter().map(str::to_string).collect(),
        }
    }
}
