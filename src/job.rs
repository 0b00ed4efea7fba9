// src/job.rs
//! Background scrape-and-score jobs.
//!
//! A [`Job`] owns its progress and cancellation token; the [`JobManager`]
//! keeps the current job, refuses a second start while one is running, and
//! publishes finished reports into the shared [`ReportStore`].
//!
//! Progress lifecycle of one job:
//! `0 → 1..=99 (one step per post) → 100` on success, or `-1` on failure /
//! cancellation. 100 is only set after the report is stored.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::extract::content_for;
use crate::fetch::Fetcher;
use crate::listing::{parse_listing, ListingError};
use crate::report::{PostResult, Report, ReportStore};
use crate::sentiment::SentimentScorer;

/// Out-of-range progress value reported for failed or cancelled runs.
pub const PROGRESS_ERROR: i32 = -1;
pub const PROGRESS_DONE: i32 = 100;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("blog_jobs_started_total", "Jobs accepted by POST /.");
        describe_counter!(
            "blog_jobs_failed_total",
            "Jobs that ended in failure or cancellation."
        );
        describe_counter!("blog_posts_scored_total", "Posts fetched and scored.");
        describe_counter!(
            "blog_post_fetch_errors_total",
            "Post fetches that failed or returned a non-2xx status."
        );
        describe_gauge!("blog_job_progress", "Progress of the current job (-1 = error).");
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Done,
    Failed,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("invalid domain {domain:?}: {message}")]
    InvalidDomain { domain: String, message: String },
    #[error("listing page {url} unreachable: {message}")]
    ListingFetch { url: String, message: String },
    #[error("listing page {url} returned status {status}")]
    ListingStatus { url: String, status: u16 },
    #[error("listing page {url}: {source}")]
    Listing {
        url: String,
        #[source]
        source: ListingError,
    },
    #[error("storing report failed: {0:#}")]
    Persist(anyhow::Error),
    #[error("job cancelled")]
    Cancelled,
    #[error("job exceeded its {0:?} deadline")]
    DeadlineExceeded(Duration),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StartError {
    #[error("job {job_id} is already running")]
    AlreadyRunning { job_id: Uuid },
}

/// Prefix `http://` unless the input already names an http(s) scheme.
pub fn normalize_domain(raw: &str) -> String {
    let d = raw.trim();
    if d.starts_with("http://") || d.starts_with("https://") {
        d.to_string()
    } else {
        format!("http://{d}")
    }
}

/// `completed / total` as a truncated percentage.
pub fn percent(completed: usize, total: usize) -> i32 {
    if total == 0 {
        return PROGRESS_DONE;
    }
    ((completed * 100) / total) as i32
}

/// One run against one domain.
#[derive(Debug)]
pub struct Job {
    id: Uuid,
    domain: String,
    started_at: DateTime<Utc>,
    progress: AtomicI32,
    status: Mutex<JobStatus>,
    error: Mutex<Option<String>>,
    cancel: CancellationToken,
}

/// Point-in-time view of a job for pollers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub job_id: Uuid,
    pub domain: String,
    pub status: JobStatus,
    pub progress: i32,
    pub started_at: DateTime<Utc>,
}

impl Job {
    fn new(domain: String, cancel: CancellationToken) -> Self {
        Self {
            id: Uuid::new_v4(),
            domain,
            started_at: Utc::now(),
            progress: AtomicI32::new(0),
            status: Mutex::new(JobStatus::Running),
            error: Mutex::new(None),
            cancel,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn progress(&self) -> i32 {
        self.progress.load(Ordering::Acquire)
    }

    pub fn status(&self) -> JobStatus {
        match self.status.lock() {
            Ok(s) => *s,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Last failure message, if the job failed.
    pub fn error(&self) -> Option<String> {
        self.error.lock().ok().and_then(|e| e.clone())
    }

    pub fn is_running(&self) -> bool {
        self.status() == JobStatus::Running
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.id,
            domain: self.domain.clone(),
            status: self.status(),
            progress: self.progress(),
            started_at: self.started_at,
        }
    }

    /// Raise progress while running; never moves backwards.
    fn advance(&self, value: i32) {
        let prev = self.progress.fetch_max(value, Ordering::AcqRel);
        if value > prev {
            gauge!("blog_job_progress").set(value as f64);
        }
    }

    /// Progress is stored before the status flips, so a reader that sees a
    /// terminal status also sees the terminal progress.
    fn finish(&self, status: JobStatus, progress: i32) {
        self.progress.store(progress, Ordering::Release);
        gauge!("blog_job_progress").set(progress as f64);
        match self.status.lock() {
            Ok(mut s) => *s = status,
            Err(poisoned) => *poisoned.into_inner() = status,
        }
    }

    fn fail(&self, status: JobStatus, err: &JobError) {
        if let Ok(mut e) = self.error.lock() {
            *e = Some(err.to_string());
        }
        self.finish(status, PROGRESS_ERROR);
    }
}

/// Fetch → list → per-post fetch/extract/score → report.
pub struct JobRunner {
    fetcher: Arc<dyn Fetcher>,
    scorer: Arc<dyn SentimentScorer>,
    listing_path: String,
}

impl JobRunner {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        scorer: Arc<dyn SentimentScorer>,
        listing_path: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            scorer,
            listing_path: listing_path.into(),
        }
    }

    /// Build the report for `job`. Only listing-level problems are errors;
    /// every per-post problem ends up as placeholder content.
    pub async fn run(&self, job: &Job) -> Result<Report, JobError> {
        let base = Url::parse(job.domain()).map_err(|e| JobError::InvalidDomain {
            domain: job.domain().to_string(),
            message: e.to_string(),
        })?;
        let listing_url = base
            .join(&self.listing_path)
            .map_err(|e| JobError::InvalidDomain {
                domain: job.domain().to_string(),
                message: e.to_string(),
            })?;

        let page = self
            .fetcher
            .get(&listing_url)
            .await
            .map_err(|e| JobError::ListingFetch {
                url: listing_url.to_string(),
                message: e.to_string(),
            })?;
        if !page.is_success() {
            return Err(JobError::ListingStatus {
                url: listing_url.to_string(),
                status: page.status,
            });
        }
        let posts = parse_listing(&page.body).map_err(|source| JobError::Listing {
            url: listing_url.to_string(),
            source,
        })?;

        let total = posts.len();
        tracing::info!(target: "job", job_id = %job.id(), posts = total, "listing parsed");

        let mut results = Vec::with_capacity(total);
        for (idx, descriptor) in posts.into_iter().enumerate() {
            let (resolved_url, content) = match base.join(&descriptor.link) {
                Ok(url) => {
                    let outcome = self.fetcher.get(&url).await;
                    if !matches!(&outcome, Ok(p) if p.is_success()) {
                        counter!("blog_post_fetch_errors_total").increment(1);
                        tracing::warn!(
                            target: "job",
                            job_id = %job.id(),
                            %url,
                            status = ?outcome.as_ref().ok().map(|p| p.status),
                            error = ?outcome.as_ref().err().map(|e| e.to_string()),
                            "post fetch failed"
                        );
                    }
                    (url.to_string(), content_for(&outcome))
                }
                Err(e) => {
                    counter!("blog_post_fetch_errors_total").increment(1);
                    tracing::warn!(target: "job", job_id = %job.id(), link = %descriptor.link, error = %e, "unresolvable post link");
                    let content = format!("Error: Unable to fetch content ({e})");
                    (descriptor.link.clone(), content)
                }
            };

            let scores = self.scorer.polarity_scores(&content);
            counter!("blog_posts_scored_total").increment(1);
            results.push(PostResult {
                descriptor,
                resolved_url,
                content,
                scores,
            });

            // 100 is reserved for "report stored".
            job.advance(percent(idx + 1, total).min(PROGRESS_DONE - 1));
        }

        Ok(Report::from_results(results))
    }
}

/// Owns the current job and the report store; hands out job handles.
pub struct JobManager {
    runner: Arc<JobRunner>,
    store: Arc<ReportStore>,
    deadline: Duration,
    current: Mutex<Option<Arc<Job>>>,
    shutdown: CancellationToken,
}

impl JobManager {
    pub fn new(runner: JobRunner, store: ReportStore, deadline: Duration) -> Self {
        ensure_metrics_described();
        Self {
            runner: Arc::new(runner),
            store: Arc::new(store),
            deadline,
            current: Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn from_config(
        cfg: &AppConfig,
        fetcher: Arc<dyn Fetcher>,
        scorer: Arc<dyn SentimentScorer>,
    ) -> Self {
        Self::new(
            JobRunner::new(fetcher, scorer, cfg.listing_path.clone()),
            ReportStore::new(cfg.report_path.clone()),
            cfg.run_deadline(),
        )
    }

    pub fn store(&self) -> &ReportStore {
        &self.store
    }

    /// Launch a run in the background and return immediately.
    /// Refused while another job is still running.
    pub fn start(&self, raw_domain: &str) -> Result<Arc<Job>, StartError> {
        let mut current = match self.current.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(job) = current.as_ref().filter(|j| j.is_running()) {
            return Err(StartError::AlreadyRunning { job_id: job.id() });
        }

        let job = Arc::new(Job::new(
            normalize_domain(raw_domain),
            self.shutdown.child_token(),
        ));
        *current = Some(job.clone());
        drop(current);

        counter!("blog_jobs_started_total").increment(1);
        gauge!("blog_job_progress").set(0.0);
        tracing::info!(target: "job", job_id = %job.id(), domain = job.domain(), "job started");

        let runner = self.runner.clone();
        let store = self.store.clone();
        let deadline = self.deadline;
        let handle = job.clone();
        tokio::spawn(async move {
            drive(runner, store, handle, deadline).await;
        });
        Ok(job)
    }

    pub fn current(&self) -> Option<Arc<Job>> {
        self.current.lock().ok().and_then(|g| g.clone())
    }

    /// Look up a job handle; only the most recent job is retained.
    pub fn job(&self, id: Uuid) -> Option<Arc<Job>> {
        self.current().filter(|j| j.id() == id)
    }

    /// Cancel the running job, if any. Returns its id.
    pub fn cancel_current(&self) -> Option<Uuid> {
        let job = self.current().filter(|j| j.is_running())?;
        job.cancel();
        Some(job.id())
    }

    /// Stop every in-flight run (process shutdown).
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn report(&self) -> Option<Arc<str>> {
        self.store.latest()
    }
}

impl Drop for JobManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn drive(runner: Arc<JobRunner>, store: Arc<ReportStore>, job: Arc<Job>, deadline: Duration) {
    let outcome = tokio::select! {
        _ = job.cancel.cancelled() => Err(JobError::Cancelled),
        res = tokio::time::timeout(deadline, runner.run(&job)) => {
            res.unwrap_or(Err(JobError::DeadlineExceeded(deadline)))
        }
    };

    let report = match outcome {
        Ok(report) => report,
        Err(err) => return record_failure(&job, err),
    };

    let posts = report.results.len();
    let average = report.average_compound;
    if let Err(e) = store.publish(report.render()).await {
        return record_failure(&job, JobError::Persist(e));
    }

    job.finish(JobStatus::Done, PROGRESS_DONE);
    tracing::info!(
        target: "job",
        job_id = %job.id(),
        posts,
        average_compound = average,
        path = %store.path().display(),
        "job finished, report stored"
    );
}

fn record_failure(job: &Job, err: JobError) {
    counter!("blog_jobs_failed_total").increment(1);
    let status = match err {
        JobError::Cancelled | JobError::DeadlineExceeded(_) => JobStatus::Cancelled,
        _ => JobStatus::Failed,
    };
    tracing::warn!(target: "job", job_id = %job.id(), domain = job.domain(), error = %err, "job did not complete");
    job.fail(status, &err);
}
