use thiserror::Error;

/// Failure to retrieve or parse one feed document.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed parse error: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}

/// Failure while turning a single raw entry into an article.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("content block has no value")]
    MissingContentValue,
}

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("category '{0}' has no sources configured")]
    NoSources(String),

    #[error("invalid feed URL '{url}' for {source_name}: {reason}")]
    InvalidSourceUrl {
        url: String,
        source_name: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid file name: {0}")]
    InvalidFileName(String),
}
