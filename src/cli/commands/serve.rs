//! HTTP API server for uploads and questions.
//!
//! Provides REST endpoints for uploading files, checking readiness, reading
//! transcripts and asking questions.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::DocentError;
use crate::orchestrator::Orchestrator;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Shared application state.
struct AppState {
    orchestrator: Arc<Orchestrator>,
}

/// Run the HTTP API server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    settings: Settings,
) -> anyhow::Result<()> {
    match preflight::check(Operation::Serve) {
        Ok(warnings) => {
            for warning in warnings {
                Output::warning(&warning);
            }
        }
        Err(e) => {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    }

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let max_upload_bytes = settings.server.max_upload_mb * 1024 * 1024;

    let orchestrator = Arc::new(Orchestrator::new(settings)?);
    orchestrator.startup().await;

    let app = router(orchestrator, max_upload_bytes);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Docent API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Upload", "POST /upload/");
    Output::kv("Status", "GET  /status/");
    Output::kv("Transcript", "GET  /transcript/?filename=...");
    Output::kv("Query", "POST /query/");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the API router.
fn router(orchestrator: Arc<Orchestrator>, max_upload_bytes: usize) -> Router {
    let state = Arc::new(AppState { orchestrator });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/upload/", post(upload))
        .route("/status/", get(status))
        .route("/transcript/", get(transcript))
        .route("/query/", post(query))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct TranscriptParams {
    filename: String,
}

#[derive(Deserialize)]
struct QueryForm {
    question: String,
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }
}

/// Map a pipeline error to its HTTP response.
fn error_response(e: DocentError) -> Response {
    match e {
        DocentError::Synthesis { details } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to parse LLM response".to_string(),
                details: Some(details),
            }),
        )
            .into_response(),
        e if e.is_client_error() => {
            (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e.to_string()))).into_response()
        }
        e => {
            error!("Request failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string())),
            )
                .into_response()
        }
    }
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e.body_text())))
                    .into_response()
            }
        };

        if field.name() != Some("file") {
            continue;
        }

        let Some(filename) = field.file_name().map(str::to_string) else {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Uploaded file has no name.")),
            )
                .into_response();
        };

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                return (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e.body_text())))
                    .into_response()
            }
        };

        info!("Received upload {} ({} bytes)", filename, bytes.len());

        return match state.orchestrator.upload(&filename, bytes).await {
            Ok(outcome) => Json(StatusResponse {
                status: outcome.status_message().to_string(),
            })
            .into_response(),
            Err(e) => error_response(e),
        };
    }

    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new("No file provided.")),
    )
        .into_response()
}

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = state.orchestrator.status().await;
    Json(StatusResponse {
        status: status.message().to_string(),
    })
}

async fn transcript(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TranscriptParams>,
) -> Response {
    match state.orchestrator.transcript(&params.filename).await {
        Ok(Some(entries)) => Json(entries).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Transcript not found.")),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

async fn query(State(state): State<Arc<AppState>>, Form(form): Form<QueryForm>) -> Response {
    match state.orchestrator.query(&form.question).await {
        Ok(answer) => Json(answer).into_response(),
        Err(e) => error_response(e),
    }
}
