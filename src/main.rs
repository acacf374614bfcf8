use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use news_repository::collector::Collector;
use news_repository::config::{Config, MAX_WINDOW_DAYS};
use news_repository::fetcher::Fetcher;
use news_repository::routes::{self, AppState};
use news_repository::{logging, store};

#[derive(Debug, Parser)]
#[command(
    name = "news-repository",
    version,
    about = "Collect recent news from syndicated feeds into CSV snapshots"
)]
struct Cli {
    /// Feed catalogue to use instead of the built-in one
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch every feed once and save the results (default)
    Collect {
        /// Only collect this category; may be repeated
        #[arg(long = "category")]
        categories: Vec<String>,

        /// Recency window in days
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..=MAX_WINDOW_DAYS))]
        days: Option<i64>,

        /// Directory for CSV snapshots
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Serve the browsing interface over saved snapshots
    Serve {
        #[arg(long, default_value = "0.0.0.0:3000")]
        addr: String,
    },
    /// List saved snapshots, newest first
    Files,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::embedded()?,
    };
    logging::init(&config.log_file);
    info!(
        "Loaded {} feeds in {} categories",
        config.source_count(),
        config.categories.len()
    );

    let command = cli.command.unwrap_or(Commands::Collect {
        categories: Vec::new(),
        days: None,
        output_dir: None,
    });

    match command {
        Commands::Collect {
            categories,
            days,
            output_dir,
        } => collect(config, &categories, days, output_dir).await,
        Commands::Serve { addr } => serve(config, &addr).await,
        Commands::Files => {
            for name in store::list_saved_files(&config.output_dir)? {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

async fn collect(
    config: Config,
    categories: &[String],
    days: Option<i64>,
    output_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let window_days = days.unwrap_or(config.window_days);
    let output_dir = output_dir.unwrap_or_else(|| config.output_dir.clone());

    let (selected, unknown) = config.select_categories(categories);
    for e in &unknown {
        error!("{}", e);
    }

    let collector = Collector::new(Fetcher::from_config(&config.fetch)?);
    let articles = collector.run(&selected, window_days).await;
    store::save(&articles, &output_dir);

    info!(
        "Scraping completed! Found {} articles total.",
        articles.len()
    );
    Ok(())
}

async fn serve(config: Config, addr: &str) -> anyhow::Result<()> {
    let collector = Collector::new(Fetcher::from_config(&config.fetch)?);
    let state = Arc::new(AppState::new(Arc::new(config), Arc::new(collector)));

    let app = routes::router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server starting on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
