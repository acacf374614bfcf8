//! Raw feed entries and their conversion into [`Article`]s.

use crate::article::{Article, SourceDescriptor};
use crate::dates::{canonicalize, is_recent};
use crate::error::ExtractError;
use crate::text::clean;

const NO_TITLE: &str = "No title";

/// One content block of an entry, as handed over by the feed parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentBlock {
    pub value: Option<String>,
}

/// A loosely structured feed item. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub content: Vec<ContentBlock>,
    pub published: Option<String>,
    pub pub_date: Option<String>,
    pub updated: Option<String>,
}

impl RawEntry {
    /// The entry's date text: `published`, then `pubDate`, then `updated`.
    pub fn date_field(&self) -> Option<&str> {
        self.published
            .as_deref()
            .or(self.pub_date.as_deref())
            .or(self.updated.as_deref())
    }

    /// The entry's body text: `summary`, then `description`, then the first
    /// content block.
    pub fn body(&self) -> Result<&str, ExtractError> {
        if let Some(text) = self.summary.as_deref().or(self.description.as_deref()) {
            return Ok(text);
        }
        match self.content.first() {
            Some(block) => block
                .value
                .as_deref()
                .ok_or(ExtractError::MissingContentValue),
            None => Ok(""),
        }
    }
}

/// Outcome of extracting one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Kept(Article),
    /// Dated outside the recency window.
    Stale,
}

/// Build an [`Article`] from `entry`, or report it as stale.
///
/// Category and source always come from `source`, never from the entry.
pub fn extract(
    entry: &RawEntry,
    source: &SourceDescriptor,
    window_days: i64,
) -> Result<Extraction, ExtractError> {
    let date = entry.date_field();
    if !is_recent(date, window_days) {
        return Ok(Extraction::Stale);
    }

    let title = entry.title.as_deref().unwrap_or(NO_TITLE);
    let summary = clean(Some(entry.body()?));

    Ok(Extraction::Kept(Article {
        headline: clean(Some(title)),
        summary,
        url: entry.link.clone().unwrap_or_default(),
        source: source.source_name.clone(),
        category: source.category.clone(),
        timestamp: canonicalize(date),
    }))
}
