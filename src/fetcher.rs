use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use feed_rs::parser;
use rand::Rng;
use reqwest::Client;
use tracing::{debug, error, info, warn};

use crate::article::{Article, SourceDescriptor};
use crate::config::FetchConfig;
use crate::entry::{extract, ContentBlock, Extraction, RawEntry};
use crate::error::FetchError;
use crate::feed_dates::scan_entry_dates;

/// Retrieves and parses one feed document.
#[async_trait]
pub trait FeedClient: Send + Sync {
    async fn fetch_entries(&self, url: &str) -> Result<Vec<RawEntry>, FetchError>;
}

/// [`FeedClient`] backed by `reqwest` and `feed-rs`.
pub struct HttpFeedClient {
    client: Client,
}

impl HttpFeedClient {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FeedClient for HttpFeedClient {
    async fn fetch_entries(&self, url: &str) -> Result<Vec<RawEntry>, FetchError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        let feed = parser::parse(&bytes[..])?;
        Ok(entries_with_raw_dates(feed, &bytes))
    }
}

/// Convert parsed entries, taking each entry's date text from the document.
///
/// Falls back to the parser's own dates when the scan does not line up with
/// the parsed entries.
pub fn entries_with_raw_dates(feed: feed_rs::model::Feed, xml: &[u8]) -> Vec<RawEntry> {
    let dates = scan_entry_dates(xml);
    if dates.len() != feed.entries.len() {
        debug!(
            "Found {} dated elements for {} entries; using parsed dates",
            dates.len(),
            feed.entries.len()
        );
        return feed.entries.into_iter().map(RawEntry::from).collect();
    }

    feed.entries
        .into_iter()
        .zip(dates)
        .map(|(entry, dates)| RawEntry {
            published: dates.published,
            pub_date: dates.pub_date,
            updated: dates.updated,
            ..RawEntry::from(entry)
        })
        .collect()
}

impl From<feed_rs::model::Entry> for RawEntry {
    fn from(entry: feed_rs::model::Entry) -> Self {
        // feed-rs folds RSS <description> into `summary`. Its dates are
        // already UTC, so this is only the fallback date text.
        RawEntry {
            title: entry.title.map(|t| t.content),
            link: entry.links.into_iter().next().map(|l| l.href),
            summary: entry.summary.map(|t| t.content),
            description: None,
            content: entry
                .content
                .map(|c| vec![ContentBlock { value: c.body }])
                .unwrap_or_default(),
            published: entry.published.map(|d| d.to_rfc2822()),
            pub_date: None,
            updated: entry.updated.map(|d| d.to_rfc2822()),
        }
    }
}

/// Randomized pause taken before every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourtesyDelay {
    min: Duration,
    max: Duration,
}

impl CourtesyDelay {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
        }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    pub fn sample(&self) -> Duration {
        if self.max == self.min {
            return self.min;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

pub struct Fetcher {
    client: Arc<dyn FeedClient>,
    delay: CourtesyDelay,
}

impl Fetcher {
    pub fn new(client: Arc<dyn FeedClient>, delay: CourtesyDelay) -> Self {
        Self { client, delay }
    }

    /// Build the HTTP-backed fetcher described by `config`.
    pub fn from_config(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = HttpFeedClient::new(config)?;
        Ok(Self::new(Arc::new(client), CourtesyDelay::from_config(config)))
    }

    /// Fetch one source and extract its recent articles.
    ///
    /// Never fails: a source that cannot be fetched or parsed is logged and
    /// contributes no articles.
    pub async fn fetch(&self, source: &SourceDescriptor, window_days: i64) -> Vec<Article> {
        info!("Fetching RSS feed: {} for {}", source.url, source.source_name);

        match self.try_fetch(source, window_days).await {
            Ok(articles) => articles,
            Err(e) => {
                error!(
                    "Error fetching feed {} for {}: {}",
                    source.url, source.source_name, e
                );
                Vec::new()
            }
        }
    }

    async fn try_fetch(
        &self,
        source: &SourceDescriptor,
        window_days: i64,
    ) -> Result<Vec<Article>, FetchError> {
        let pause = self.delay.sample();
        if !pause.is_zero() {
            debug!("Waiting {:?} before requesting {}", pause, source.url);
            tokio::time::sleep(pause).await;
        }

        let entries = self.client.fetch_entries(&source.url).await?;
        if entries.is_empty() {
            warn!("No entries found in feed for {}", source.source_name);
            return Ok(Vec::new());
        }
        info!(
            "Found {} entries in feed for {}",
            entries.len(),
            source.source_name
        );

        let articles = extract_all(&entries, source, window_days);
        info!(
            "Successfully processed {} articles from {}",
            articles.len(),
            source.source_name
        );
        Ok(articles)
    }
}

/// Extract every entry, dropping stale ones and logging the ones that fail.
pub fn extract_all(
    entries: &[RawEntry],
    source: &SourceDescriptor,
    window_days: i64,
) -> Vec<Article> {
    entries
        .iter()
        .filter_map(|entry| match extract(entry, source, window_days) {
            Ok(Extraction::Kept(article)) => Some(article),
            Ok(Extraction::Stale) => None,
            Err(e) => {
                error!(
                    "Error processing entry for {}: {}",
                    source.source_name, e
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves canned entries per URL; unknown URLs fail like a dead host.
    #[derive(Default)]
    struct StubClient {
        feeds: HashMap<String, Vec<RawEntry>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FeedClient for StubClient {
        async fn fetch_entries(&self, url: &str) -> Result<Vec<RawEntry>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.feeds.get(url) {
                Some(entries) => Ok(entries.clone()),
                None => {
                    parser::parse(&b"503 Service Unavailable"[..])?;
                    Ok(Vec::new())
                }
            }
        }
    }

    fn source(url: &str) -> SourceDescriptor {
        SourceDescriptor {
            url: url.to_string(),
            source_name: "BBC World".to_string(),
            category: "Global Politics".to_string(),
        }
    }

    fn entry(title: &str, link: Option<&str>, days_old: i64) -> RawEntry {
        RawEntry {
            title: Some(title.to_string()),
            link: link.map(str::to_string),
            published: Some((Utc::now() - chrono::Duration::days(days_old)).to_rfc2822()),
            ..Default::default()
        }
    }

    mod delay_tests {
        use super::*;

        #[test]
        fn test_sample_within_bounds() {
            let delay = CourtesyDelay::new(Duration::from_millis(500), Duration::from_millis(2000));
            for _ in 0..200 {
                let pause = delay.sample();
                assert!(pause >= Duration::from_millis(500));
                assert!(pause <= Duration::from_millis(2000));
            }
        }

        #[test]
        fn test_none_is_zero() {
            assert_eq!(CourtesyDelay::none().sample(), Duration::ZERO);
        }

        #[test]
        fn test_inverted_bounds_collapse_to_min() {
            let delay = CourtesyDelay::new(Duration::from_millis(300), Duration::from_millis(100));
            assert_eq!(delay.sample(), Duration::from_millis(300));
        }

        #[test]
        fn test_from_config() {
            let delay = CourtesyDelay::from_config(&FetchConfig::default());
            assert_eq!(
                delay,
                CourtesyDelay::new(Duration::from_millis(500), Duration::from_millis(2000))
            );
        }
    }

    mod fetch_tests {
        use super::*;

        fn fetcher_with(feeds: Vec<(&str, Vec<RawEntry>)>) -> (Fetcher, Arc<StubClient>) {
            let client = Arc::new(StubClient {
                feeds: feeds
                    .into_iter()
                    .map(|(url, entries)| (url.to_string(), entries))
                    .collect(),
                calls: AtomicUsize::new(0),
            });
            (Fetcher::new(client.clone(), CourtesyDelay::none()), client)
        }

        #[tokio::test]
        async fn test_recent_entries_kept() {
            let (fetcher, client) = fetcher_with(vec![(
                "https://feeds.bbci.co.uk/news/world/rss.xml",
                vec![
                    entry("Fresh", Some("https://bbc.co.uk/1"), 0),
                    entry("Old", Some("https://bbc.co.uk/2"), 10),
                    entry("No link", None, 1),
                ],
            )]);

            let articles = fetcher
                .fetch(&source("https://feeds.bbci.co.uk/news/world/rss.xml"), 2)
                .await;

            assert_eq!(articles.len(), 2);
            assert_eq!(articles[0].headline, "Fresh");
            assert_eq!(articles[1].url, "");
            assert!(articles.iter().all(|a| a.source == "BBC World"));
            assert!(articles.iter().all(|a| a.category == "Global Politics"));
            assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn test_empty_feed_yields_nothing() {
            let (fetcher, _) = fetcher_with(vec![("https://empty.example.com/rss", Vec::new())]);

            let articles = fetcher.fetch(&source("https://empty.example.com/rss"), 2).await;
            assert!(articles.is_empty());
        }

        #[tokio::test]
        async fn test_failing_source_yields_nothing() {
            let (fetcher, client) = fetcher_with(Vec::new());

            let articles = fetcher.fetch(&source("https://down.example.com/rss"), 2).await;
            assert!(articles.is_empty());
            assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn test_bad_entry_does_not_stop_the_feed() {
            let broken = RawEntry {
                title: Some("Broken".to_string()),
                content: vec![ContentBlock { value: None }],
                ..Default::default()
            };
            let (fetcher, _) = fetcher_with(vec![(
                "https://mixed.example.com/rss",
                vec![
                    entry("Before", Some("https://a"), 0),
                    broken,
                    entry("After", Some("https://b"), 0),
                ],
            )]);

            let articles = fetcher.fetch(&source("https://mixed.example.com/rss"), 2).await;
            let headlines: Vec<_> = articles.iter().map(|a| a.headline.as_str()).collect();
            assert_eq!(headlines, vec!["Before", "After"]);
        }
    }

    mod feed_rs_conversion_tests {
        use super::*;

        #[test]
        fn test_rss_item_conversion() {
            let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
                <rss version="2.0">
                    <channel>
                        <title>World</title>
                        <link>https://news.example.com</link>
                        <description>World news</description>
                        <item>
                            <title>Summit &amp; talks</title>
                            <link>https://news.example.com/summit</link>
                            <description>&lt;p&gt;Leaders met.&lt;/p&gt;</description>
                            <pubDate>Mon, 09 Dec 2024 12:00:00 GMT</pubDate>
                        </item>
                        <item>
                            <title>No link here</title>
                        </item>
                    </channel>
                </rss>
            "#;

            let feed = parser::parse(xml.as_bytes()).unwrap();
            let entries: Vec<RawEntry> = feed.entries.into_iter().map(RawEntry::from).collect();

            assert_eq!(entries.len(), 2);
            assert_eq!(entries[0].title.as_deref(), Some("Summit & talks"));
            assert_eq!(
                entries[0].link.as_deref(),
                Some("https://news.example.com/summit")
            );
            assert!(entries[0].summary.as_deref().unwrap().contains("Leaders met."));
            assert_eq!(
                crate::dates::canonicalize(entries[0].date_field()),
                "2024-12-09"
            );

            assert_eq!(entries[1].link, None);
            assert_eq!(entries[1].date_field(), None);
        }

        #[test]
        fn test_raw_date_text_survives_conversion() {
            let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
                <rss version="2.0">
                    <channel>
                        <title>Wire</title>
                        <link>https://wire.example.com</link>
                        <description>Wire</description>
                        <item>
                            <title>Late session</title>
                            <pubDate>Mon, 09 Dec 2024 23:30:00 -0500</pubDate>
                        </item>
                        <item>
                            <title>Vague</title>
                            <pubDate>sometime last week</pubDate>
                        </item>
                    </channel>
                </rss>
            "#;

            let feed = parser::parse(xml.as_bytes()).unwrap();
            let entries = entries_with_raw_dates(feed, xml.as_bytes());

            assert_eq!(entries.len(), 2);
            assert_eq!(
                entries[0].date_field(),
                Some("Mon, 09 Dec 2024 23:30:00 -0500")
            );
            assert_eq!(
                crate::dates::canonicalize(entries[0].date_field()),
                "2024-12-09"
            );
            assert_eq!(entries[1].date_field(), Some("sometime last week"));
            assert_eq!(
                crate::dates::canonicalize(entries[1].date_field()),
                "sometime last week"
            );
        }

        #[test]
        fn test_misaligned_scan_falls_back_to_parsed_dates() {
            let xml = r#"<rss version="2.0"><channel><title>Wire</title>
                <item><title>Only</title><pubDate>Mon, 09 Dec 2024 12:00:00 +0000</pubDate></item>
                </channel></rss>"#;
            let feed = parser::parse(xml.as_bytes()).unwrap();

            let entries = entries_with_raw_dates(feed, b"<rss></rss>");

            assert_eq!(entries.len(), 1);
            assert_eq!(
                crate::dates::canonicalize(entries[0].date_field()),
                "2024-12-09"
            );
        }

        #[test]
        fn test_atom_entry_conversion() {
            let xml = r#"<?xml version="1.0" encoding="utf-8"?>
                <feed xmlns="http://www.w3.org/2005/Atom">
                    <title>Markets</title>
                    <id>urn:markets</id>
                    <updated>2024-12-09T12:00:00Z</updated>
                    <entry>
                        <title>Bonds rally</title>
                        <id>urn:bonds</id>
                        <link href="https://markets.example.com/bonds"/>
                        <updated>2024-12-09T10:00:00Z</updated>
                        <content type="html">&lt;b&gt;Yields fell&lt;/b&gt;</content>
                    </entry>
                </feed>
            "#;

            let feed = parser::parse(xml.as_bytes()).unwrap();
            let entries: Vec<RawEntry> = feed.entries.into_iter().map(RawEntry::from).collect();

            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].title.as_deref(), Some("Bonds rally"));
            assert_eq!(
                entries[0].link.as_deref(),
                Some("https://markets.example.com/bonds")
            );
            assert!(entries[0].updated.is_some());
            assert_eq!(entries[0].content.len(), 1);
            assert!(crate::text::clean(entries[0].body().ok()).contains("Yields fell"));
        }
    }
}
