// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod job;
pub mod listing;
pub mod metrics;
pub mod report;
pub mod sentiment;
pub mod ui;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tracing::info;

pub use crate::api::{router, AppState};
pub use crate::config::AppConfig;
pub use crate::job::{JobManager, PROGRESS_ERROR};

/// Wire the production stack: reqwest fetcher, VADER scorer, job manager.
/// Metrics are left to the caller since the recorder is process-global.
pub fn app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let fetcher = fetch::HttpFetcher::from_config(cfg).context("building http client")?;
    let scorer = sentiment::VaderAnalyzer::new();
    info!(
        listing_path = %cfg.listing_path,
        report_path = %cfg.report_path.display(),
        fetch_timeout_secs = cfg.fetch_timeout_secs,
        run_deadline_secs = cfg.run_deadline_secs,
        "app configured"
    );
    let jobs = JobManager::from_config(cfg, Arc::new(fetcher), Arc::new(scorer));
    Ok(router(AppState::new(jobs)))
}
