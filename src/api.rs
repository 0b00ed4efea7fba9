use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::job::{JobManager, JobStatus, StartError};
use crate::ui::{self, ResultsView};

#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<JobManager>,
}

impl AppState {
    pub fn new(jobs: JobManager) -> Self {
        Self {
            jobs: Arc::new(jobs),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(form).post(start))
        .route("/progress", get(progress))
        .route("/results", get(results))
        .route("/download", get(download))
        .route("/cancel", post(cancel))
        .route("/health", get(|| async { "ok" }))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Deserialize)]
struct StartReq {
    domain: String,
}

#[derive(Deserialize)]
struct ProgressQuery {
    #[serde(default)]
    job: Option<Uuid>,
}

async fn form() -> Html<String> {
    Html(ui::form_page())
}

async fn start(State(state): State<AppState>, Json(body): Json<StartReq>) -> Response {
    match state.jobs.start(&body.domain) {
        Ok(job) => (
            StatusCode::ACCEPTED,
            Json(json!({ "status": "started", "job_id": job.id() })),
        )
            .into_response(),
        Err(StartError::AlreadyRunning { job_id }) => {
            tracing::info!(target: "api", %job_id, "start refused, job already running");
            (
                StatusCode::CONFLICT,
                Json(json!({ "status": "already_running", "job_id": job_id })),
            )
                .into_response()
        }
    }
}

async fn progress(State(state): State<AppState>, Query(q): Query<ProgressQuery>) -> Response {
    let job = match q.job {
        Some(id) => match state.jobs.job(id) {
            Some(job) => Some(job),
            None => {
                return (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "status": "unknown_job", "job_id": id })),
                )
                    .into_response()
            }
        },
        None => state.jobs.current(),
    };

    match job {
        Some(job) => Json(job.snapshot()).into_response(),
        None => Json(json!({ "progress": 0, "status": "idle" })).into_response(),
    }
}

async fn results(State(state): State<AppState>) -> Html<String> {
    if let Some(text) = state.jobs.report() {
        return Html(ui::results_page(ResultsView::Report(&text)));
    }
    let view = match state.jobs.current().map(|j| j.status()) {
        Some(JobStatus::Failed) => ResultsView::Failed,
        Some(JobStatus::Cancelled) => ResultsView::Cancelled,
        _ => ResultsView::Empty,
    };
    Html(ui::results_page(view))
}

async fn download(State(state): State<AppState>) -> Response {
    let store = state.jobs.store();
    match store.read_artifact().await {
        Ok(Some(bytes)) => {
            let disposition = format!("attachment; filename=\"{}\"", store.file_name());
            (
                [
                    (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                bytes,
            )
                .into_response()
        }
        Ok(None) => (StatusCode::NOT_FOUND, ui::NO_RESULTS).into_response(),
        Err(e) => {
            tracing::error!(target: "api", error = %format!("{e:#}"), "reading report artifact failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "report unavailable").into_response()
        }
    }
}

async fn cancel(State(state): State<AppState>) -> Response {
    match state.jobs.cancel_current() {
        Some(job_id) => {
            tracing::info!(target: "api", %job_id, "cancel requested");
            Json(json!({ "status": "cancelling", "job_id": job_id })).into_response()
        }
        None => (StatusCode::NOT_FOUND, Json(json!({ "status": "idle" }))).into_response(),
    }
}
