use std::path::Path;
use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Local;
use serde::Deserialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::article::Article;
use crate::browse::{ArticleQuery, Facets};
use crate::collector::Collector;
use crate::config::Config;
use crate::error::StoreError;
use crate::store::{self, FILE_STAMP_FORMAT};
use crate::text::{summarize, DEFAULT_SUMMARY_LENGTH};

pub struct AppState {
    pub config: Arc<Config>,
    pub collector: Arc<Collector>,
    refreshing: RwLock<bool>,
}

impl AppState {
    pub fn new(config: Arc<Config>, collector: Arc<Collector>) -> Self {
        Self {
            config,
            collector,
            refreshing: RwLock::new(false),
        }
    }

    pub async fn is_refreshing(&self) -> bool {
        *self.refreshing.read().await
    }

    /// Claim the refresh slot. Returns false if a refresh is already running.
    async fn try_start_refresh(&self) -> bool {
        let mut refreshing = self.refreshing.write().await;
        if *refreshing {
            info!("Refresh already in progress, skipping");
            return false;
        }
        *refreshing = true;
        true
    }

    async fn collect_and_save(&self) {
        let articles = self
            .collector
            .run(&self.config.categories, self.config.window_days)
            .await;
        store::save(&articles, &self.config.output_dir);
    }

    /// Start a collection on a background task unless one is running.
    ///
    /// The refreshing flag is cleared once the work ends, even if it panics.
    pub async fn refresh_in_background(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.try_start_refresh().await {
            return None;
        }

        let state = self.clone();
        Some(tokio::spawn(async move {
            let worker = state.clone();
            let outcome = tokio::spawn(async move { worker.collect_and_save().await }).await;
            if let Err(e) = outcome {
                error!("Refresh task failed: {}", e);
            }

            // Clear refreshing flag
            *state.refreshing.write().await = false;
        }))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/export", get(export))
        .route("/refresh", post(refresh))
        .route("/refresh/status", get(refresh_status))
        .route("/health", get(health))
        .with_state(state)
}

// Template structs
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub current_file: String,
    pub files: Vec<String>,
    pub total: usize,
    pub facets: Facets,
    pub query: ArticleQuery,
    pub rows: Vec<ArticleRow>,
    pub refreshing: bool,
}

impl IndexTemplate {
    fn selected_category(&self) -> &str {
        self.query.category().unwrap_or("")
    }

    fn selected_source(&self) -> &str {
        self.query.source().unwrap_or("")
    }

    fn search_text(&self) -> &str {
        self.query.search().unwrap_or("")
    }

    fn from_text(&self) -> &str {
        self.query.from.as_deref().unwrap_or("")
    }

    fn to_text(&self) -> &str {
        self.query.to.as_deref().unwrap_or("")
    }
}

/// One table row; the summary is shortened for display.
pub struct ArticleRow {
    pub timestamp: String,
    pub category: String,
    pub source: String,
    pub headline: String,
    pub summary: String,
    pub url: String,
}

impl From<Article> for ArticleRow {
    fn from(article: Article) -> Self {
        Self {
            summary: summarize(&article.summary, DEFAULT_SUMMARY_LENGTH),
            timestamp: article.timestamp,
            category: article.category,
            source: article.source,
            headline: article.headline,
            url: article.url,
        }
    }
}

#[derive(Template)]
#[template(path = "refresh_button.html")]
pub struct RefreshButtonTemplate {
    pub refreshing: bool,
}

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

// Custom error type
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error: {}", self.0),
        )
            .into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BrowseParams {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(flatten)]
    pub query: ArticleQuery,
}

/// The requested snapshot, or the newest one when none is named.
fn load_snapshot(
    dir: &Path,
    file: Option<&str>,
) -> Result<(Option<String>, Vec<Article>), StoreError> {
    let name = match file.filter(|f| !f.is_empty()) {
        Some(name) => Some(name.to_string()),
        None => store::list_saved_files(dir)?.into_iter().next(),
    };

    match name {
        Some(name) => {
            let articles = store::load_file(dir, &name)?;
            Ok((Some(name), articles))
        }
        None => Ok((None, Vec::new())),
    }
}

// Route handlers
pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BrowseParams>,
) -> Result<impl IntoResponse, AppError> {
    let dir = &state.config.output_dir;
    let files = store::list_saved_files(dir)?;
    let (current_file, articles) = load_snapshot(dir, params.file.as_deref())?;

    let rows = params
        .query
        .apply(&articles)
        .into_iter()
        .map(ArticleRow::from)
        .collect();

    Ok(HtmlTemplate(IndexTemplate {
        current_file: current_file.unwrap_or_default(),
        files,
        total: articles.len(),
        facets: Facets::of(&articles),
        query: params.query,
        rows,
        refreshing: state.is_refreshing().await,
    }))
}

pub async fn export(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BrowseParams>,
) -> Result<impl IntoResponse, AppError> {
    let (_, articles) = load_snapshot(&state.config.output_dir, params.file.as_deref())?;
    let filtered = params.query.apply(&articles);

    let mut body = Vec::new();
    store::write_csv(&mut body, &filtered)?;

    let filename = format!(
        "filtered_news_{}.csv",
        Local::now().format(FILE_STAMP_FORMAT)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    ))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    state.refresh_in_background().await;

    // Return refreshing state immediately
    Ok(HtmlTemplate(RefreshButtonTemplate { refreshing: true }))
}

pub async fn refresh_status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let refreshing = state.is_refreshing().await;
    Ok(HtmlTemplate(RefreshButtonTemplate { refreshing }))
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
