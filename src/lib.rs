//! News Repository - a syndicated news collector
//!
//! Fetches a fixed catalogue of RSS/Atom feeds grouped by category, keeps the
//! entries published within a recent window, normalizes and deduplicates them,
//! and writes timestamped CSV snapshots that can be browsed over HTTP.

pub mod article;
pub mod browse;
pub mod collector;
pub mod config;
pub mod dates;
pub mod entry;
pub mod error;
pub mod feed_dates;
pub mod fetcher;
pub mod logging;
pub mod routes;
pub mod store;
pub mod text;
