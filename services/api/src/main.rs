//! API Service - Weekly KPI records over HTTP
//!
//! Endpoints:
//! - GET  /health  - Health check
//! - GET  /records - All stored weekly records, chronological
//! - POST /sync    - Pull the published CSV and upsert
//! - POST /upload  - Ingest an uploaded spreadsheet (xlsx/csv)
//! - POST /cleanup - Delete stored rows whose period label is invalid

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use pipeline::{period, IngestError, PeriodDiagnostic, SheetMatrix, WeeklyRecord};

mod store;

/// Published CSV export of the tracking sheet. Overridable for tests
/// and staging via SHEET_CSV_URL.
const DEFAULT_SHEET_CSV_URL: &str =
    "https://docs.google.com/spreadsheets/d/e/2PACX-1vR8xQ/pub?output=csv";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const UPLOAD_BODY_LIMIT: usize = 20 * 1024 * 1024;

// ============================================================================
// State
// ============================================================================

#[derive(Clone)]
struct AppState {
    pool: PgPool,
    client: reqwest::Client,
    sheet_csv_url: String,
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
}

#[derive(Serialize)]
struct RecordsResponse {
    success: bool,
    data: Vec<WeeklyRecord>,
    count: usize,
    periods: Vec<String>,
}

#[derive(Serialize)]
struct SyncResponse {
    success: bool,
    synced: usize,
    inserted: usize,
    updated: usize,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    success: bool,
    inserted: usize,
    updated: usize,
    total: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    duplicates_in_file: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    updated_periods: Vec<String>,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CleanupResponse {
    message: String,
    total: usize,
    deleted: usize,
    valid: usize,
    deleted_periods: Vec<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

/// 400 body for a sheet with no recognizable week columns: tells the
/// caller which headers were seen and which looked close.
#[derive(Serialize)]
struct PeriodErrorResponse {
    success: bool,
    error: String,
    diagnostic: PeriodDiagnostic,
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: message.into(),
        }),
    )
        .into_response()
}

fn period_error_body(diagnostic: PeriodDiagnostic) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(PeriodErrorResponse {
            success: false,
            error: format!(
                "no valid period columns found among {} headers; \
                 expected labels like \"18/08 a 24/08\"",
                diagnostic.columns.len()
            ),
            diagnostic,
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: "0.1.0",
    })
}

async fn records_handler(State(state): State<Arc<AppState>>) -> Response {
    match store::read_all(&state.pool).await {
        Ok(records) => {
            let periods = records.iter().map(|r| r.period.clone()).collect();
            Json(RecordsResponse {
                success: true,
                count: records.len(),
                periods,
                data: records,
            })
            .into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to read records");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "error": e.to_string(),
                    "data": [],
                })),
            )
                .into_response()
        }
    }
}

async fn sync_handler(State(state): State<Arc<AppState>>) -> Response {
    info!(url = %state.sheet_csv_url, "syncing from published sheet");

    let body = match fetch_sheet(&state).await {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, "sheet fetch failed");
            return error_body(
                StatusCode::BAD_GATEWAY,
                format!("failed to fetch published sheet: {e:#}"),
            );
        }
    };

    let matrix = match SheetMatrix::from_csv_text(&body) {
        Ok(matrix) => matrix,
        Err(e) => {
            return error_body(
                StatusCode::BAD_GATEWAY,
                format!("published sheet is not parseable CSV: {e:#}"),
            )
        }
    };

    let outcome = match pipeline::run(&matrix, chrono::Utc::now().date_naive()) {
        Ok(outcome) => outcome,
        // A transiently empty export must not wipe or block anything:
        // report it and keep the stored data as-is.
        Err(IngestError::EmptySource) => {
            warn!("published sheet came back empty; keeping stored records");
            return Json(SyncResponse {
                success: false,
                synced: 0,
                inserted: 0,
                updated: 0,
                message: "published sheet is empty; stored records kept".to_string(),
            })
            .into_response();
        }
        Err(IngestError::NoValidPeriods(diagnostic)) => return period_error_body(diagnostic),
        Err(e) => return error_body(StatusCode::BAD_GATEWAY, e.to_string()),
    };

    match store::upsert(&state.pool, &outcome.records).await {
        Ok(result) => {
            info!(
                synced = outcome.records.len(),
                inserted = result.inserted,
                updated = result.updated,
                "sync complete"
            );
            Json(SyncResponse {
                success: true,
                synced: outcome.records.len(),
                inserted: result.inserted,
                updated: result.updated,
                message: format!(
                    "synced {} weeks ({} new, {} updated)",
                    outcome.records.len(),
                    result.inserted,
                    result.updated
                ),
            })
            .into_response()
        }
        Err(e) => {
            error!(error = %e, "sync write failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    let mut file: Option<(String, Vec<u8>)> = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let name = field
                    .file_name()
                    .or(field.name())
                    .unwrap_or("upload")
                    .to_string();
                match field.bytes().await {
                    Ok(bytes) if !bytes.is_empty() => {
                        file = Some((name, bytes.to_vec()));
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        return error_body(
                            StatusCode::BAD_REQUEST,
                            format!("failed to read uploaded file: {e}"),
                        )
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                return error_body(StatusCode::BAD_REQUEST, format!("malformed multipart: {e}"))
            }
        }
    }
    let Some((filename, bytes)) = file else {
        return error_body(StatusCode::BAD_REQUEST, "no file in upload");
    };

    info!(file = %filename, size = bytes.len(), "processing upload");

    let is_csv = filename.to_lowercase().ends_with(".csv");
    let matrix = if is_csv {
        SheetMatrix::from_csv_bytes(&bytes)
    } else {
        SheetMatrix::from_workbook_bytes(&bytes)
    };
    let matrix = match matrix {
        Ok(matrix) => matrix,
        Err(e) => {
            return error_body(
                StatusCode::BAD_REQUEST,
                format!("could not read \"{filename}\" as a spreadsheet: {e:#}"),
            )
        }
    };

    let outcome = match pipeline::run(&matrix, chrono::Utc::now().date_naive()) {
        Ok(outcome) => outcome,
        Err(IngestError::EmptySource) => {
            return error_body(StatusCode::BAD_REQUEST, "uploaded sheet has no data rows")
        }
        Err(IngestError::NoValidPeriods(diagnostic)) => return period_error_body(diagnostic),
        Err(e) => return error_body(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match store::upsert(&state.pool, &outcome.records).await {
        Ok(result) => {
            info!(
                file = %filename,
                inserted = result.inserted,
                updated = result.updated,
                "upload complete"
            );
            Json(UploadResponse {
                success: true,
                inserted: result.inserted,
                updated: result.updated,
                total: outcome.records.len(),
                duplicates_in_file: outcome.report.duplicate_periods.clone(),
                updated_periods: result.updated_periods,
                message: format!(
                    "processed {} weeks from \"{}\" ({} new, {} updated)",
                    outcome.records.len(),
                    filename,
                    result.inserted,
                    result.updated
                ),
            })
            .into_response()
        }
        Err(e) => {
            error!(error = %e, "upload write failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Re-check every stored period label against the current validation
/// rules and drop the rows that no longer pass. Stray banner rows
/// ingested before a rule was tightened get swept out here.
async fn cleanup_handler(State(state): State<Arc<AppState>>) -> Response {
    let stored = match store::list_periods(&state.pool).await {
        Ok(stored) => stored,
        Err(e) => return error_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    let total = stored.len();

    let (invalid, valid): (Vec<_>, Vec<_>) = stored
        .into_iter()
        .partition(|(_, period)| !period::is_valid_period(period));
    let ids: Vec<_> = invalid.iter().map(|(id, _)| *id).collect();
    let deleted_periods: Vec<String> = invalid.into_iter().map(|(_, period)| period).collect();

    let deleted = match store::delete_by_ids(&state.pool, &ids).await {
        Ok(deleted) => deleted as usize,
        Err(e) => {
            error!(error = %e, "cleanup delete failed");
            return error_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    if deleted > 0 {
        warn!(deleted, periods = ?deleted_periods, "removed invalid records");
    }
    Json(CleanupResponse {
        message: if deleted == 0 {
            "all stored periods are valid".to_string()
        } else {
            format!("removed {deleted} records with invalid periods")
        },
        total,
        deleted,
        valid: valid.len(),
        deleted_periods,
    })
    .into_response()
}

async fn fetch_sheet(state: &AppState) -> anyhow::Result<String> {
    let response = state
        .client
        .get(&state.sheet_csv_url)
        .send()
        .await
        .context("request failed")?
        .error_for_status()
        .context("upstream returned an error status")?;
    response.text().await.context("failed to read body")
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();

    let db_url = std::env::var("DB_URL").context("DB_URL env var missing")?;
    let bind = std::env::var("API_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let sheet_csv_url =
        std::env::var("SHEET_CSV_URL").unwrap_or_else(|_| DEFAULT_SHEET_CSV_URL.to_string());

    println!("=== Indicadores Semanais API ===");
    println!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await
        .context("Failed to connect to database")?;
    store::ensure_schema(&pool)
        .await
        .context("Failed to ensure schema")?;

    println!("Database connected");

    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent("indicadores-semanais-api/0.1")
        .build()
        .context("Failed to build HTTP client")?;

    let state = Arc::new(AppState {
        pool,
        client,
        sheet_csv_url,
    });

    // CORS for the dashboard frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/records", get(records_handler))
        .route("/sync", post(sync_handler))
        .route("/upload", post(upload_handler))
        .route("/cleanup", post(cleanup_handler))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .layer(cors)
        .with_state(state);

    println!("API listening on http://{}", bind);
    println!("\nEndpoints:");
    println!("  GET  /health");
    println!("  GET  /records");
    println!("  POST /sync");
    println!("  POST /upload");
    println!("  POST /cleanup");

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
