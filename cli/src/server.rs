use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;

use tally_core::models::{
    DailyRecord, FoodEntry, MetricUpdate, NewFoodEntry, UpdateFoodEntry,
    normalize_food_entry_update, normalize_new_food_entry, validate_metric_update,
};
use tally_core::recompute::ClearedDay;
use tally_core::service::Tracker;
use tally_core::settings::{Settings, SettingsUpdate};
use tally_core::summary::DailySummary;

const BODY_LIMIT: usize = 5 * 1024 * 1024; // 5 MB

#[derive(Clone)]
struct AppState {
    tracker: Arc<Mutex<Tracker>>,
    api_key: Option<String>,
}

impl AppState {
    fn tracker(&self) -> MutexGuard<'_, Tracker> {
        self.tracker
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct CreateEntryRequest {
    date: String,
    calories: f64,
    time: Option<String>,
    description: Option<String>,
    protein_g: Option<f64>,
    place: Option<String>,
    star_flag: Option<String>,
    vl_flag: Option<String>,
    planned_slot: Option<String>,
    context_comments: Option<String>,
}

#[derive(Deserialize)]
struct UpdateEntryRequest {
    date: Option<String>,
    calories: Option<f64>,
    time: Option<String>,
    description: Option<String>,
    protein_g: Option<f64>,
    place: Option<String>,
    star_flag: Option<String>,
    vl_flag: Option<String>,
    planned_slot: Option<String>,
    context_comments: Option<String>,
}

#[derive(Deserialize)]
struct HistoryQuery {
    end: Option<String>,
    days: Option<u32>,
}

#[derive(Deserialize)]
struct ImportQuery {
    since: Option<String>,
    #[serde(default)]
    dry_run: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(err) => {
                tracing::error!("internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

fn bad_request(err: &anyhow::Error) -> ApiError {
    ApiError::BadRequest(format!("{err:#}"))
}

fn parse_date(date_str: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid date '{date_str}'. Use YYYY-MM-DD")))
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Entry handlers ---

async fn create_entry(
    State(state): State<AppState>,
    Json(req): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<FoodEntry>), ApiError> {
    let date = parse_date(&req.date)?;
    let entry = normalize_new_food_entry(NewFoodEntry {
        date,
        time: req.time,
        description: req.description,
        calories: req.calories,
        protein_g: req.protein_g,
        place: req.place,
        star_flag: req.star_flag,
        vl_flag: req.vl_flag,
        planned_slot: req.planned_slot,
        context_comments: req.context_comments,
    })
    .map_err(|e| bad_request(&e))?;

    let saved = state
        .tracker()
        .log_food(entry)
        .context("failed to log food entry")?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<FoodEntry>, ApiError> {
    let entry = state
        .tracker()
        .database()
        .find_food_entry(id)
        .context("database error")?
        .ok_or_else(|| ApiError::NotFound(format!("Food entry {id} not found")))?;
    Ok(Json(entry))
}

async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateEntryRequest>,
) -> Result<Json<FoodEntry>, ApiError> {
    let date = req.date.as_deref().map(parse_date).transpose()?;
    let update = normalize_food_entry_update(UpdateFoodEntry {
        date,
        time: req.time,
        description: req.description,
        calories: req.calories,
        protein_g: req.protein_g,
        place: req.place,
        star_flag: req.star_flag,
        vl_flag: req.vl_flag,
        planned_slot: req.planned_slot,
        context_comments: req.context_comments,
    })
    .map_err(|e| bad_request(&e))?;
    if update.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one field must be provided".to_string(),
        ));
    }

    let tracker = state.tracker();
    if tracker
        .database()
        .find_food_entry(id)
        .context("database error")?
        .is_none()
    {
        return Err(ApiError::NotFound(format!("Food entry {id} not found")));
    }
    let entry = tracker
        .update_food(id, update)
        .context("failed to update food entry")?;
    Ok(Json(entry))
}

async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.tracker().delete_food(id).context("database error")? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Food entry {id} not found")))
    }
}

async fn entries_for_date(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
) -> Result<Json<Vec<FoodEntry>>, ApiError> {
    parse_date(&date_str)?;
    let entries = state
        .tracker()
        .entries_for_date(&date_str)
        .context("database error")?;
    Ok(Json(entries))
}

// --- Daily metric handlers ---

async fn get_metrics(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
) -> Result<Json<DailyRecord>, ApiError> {
    parse_date(&date_str)?;
    let record = state
        .tracker()
        .get_record(&date_str)
        .context("database error")?
        .ok_or_else(|| ApiError::NotFound(format!("No record for {date_str}")))?;
    Ok(Json(record))
}

async fn upsert_metrics(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
    Json(update): Json<MetricUpdate>,
) -> Result<Json<DailyRecord>, ApiError> {
    parse_date(&date_str)?;
    if update.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one field must be provided".to_string(),
        ));
    }
    validate_metric_update(&update).map_err(|e| bad_request(&e))?;

    let record = state
        .tracker()
        .upsert_metrics(&date_str, &update)
        .context("failed to save metrics")?;
    Ok(Json(record))
}

async fn clear_day(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
) -> Result<Json<ClearedDay>, ApiError> {
    parse_date(&date_str)?;
    let cleared = state
        .tracker()
        .clear_day(&date_str)
        .context("failed to clear day")?;
    if cleared.record_deleted {
        Ok(Json(cleared))
    } else {
        Err(ApiError::NotFound(format!("No record for {date_str}")))
    }
}

// --- Engine handlers ---

async fn get_daily_summary(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
) -> Result<Json<DailySummary>, ApiError> {
    parse_date(&date_str)?;
    let summary = state
        .tracker()
        .get_daily_summary(&date_str)
        .context("database error")?;
    Ok(Json(summary))
}

async fn get_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<Vec<DailyRecord>>, ApiError> {
    let end = match params.end {
        Some(end) => {
            parse_date(&end)?;
            end
        }
        None => Local::now().date_naive().format("%Y-%m-%d").to_string(),
    };
    let days = params.days.unwrap_or(7);
    if days == 0 || days > 366 {
        return Err(ApiError::BadRequest(
            "days must be between 1 and 366".to_string(),
        ));
    }
    let records = state
        .tracker()
        .history(&end, days)
        .context("database error")?;
    Ok(Json(records))
}

async fn recompute_date(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
) -> Result<Json<DailyRecord>, ApiError> {
    parse_date(&date_str)?;
    let record = state
        .tracker()
        .recompute_totals(&date_str)
        .context("failed to recompute")?
        .ok_or_else(|| ApiError::NotFound(format!("No record for {date_str}")))?;
    Ok(Json(record))
}

async fn recalculate_all(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let updated = state
        .tracker()
        .recalculate_all_targets()
        .context("failed to recalculate targets")?;
    Ok(Json(serde_json::json!({ "updated": updated })))
}

// --- Settings handlers ---

async fn get_settings(State(state): State<AppState>) -> Result<Json<Settings>, ApiError> {
    let settings = state.tracker().settings().context("database error")?;
    Ok(Json(settings))
}

async fn update_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<Settings>, ApiError> {
    if update.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one field must be provided".to_string(),
        ));
    }
    let tracker = state.tracker();
    tracker
        .settings()
        .context("database error")?
        .apply(&update)
        .map_err(|e| bad_request(&e))?;
    let settings = tracker
        .update_settings(&update)
        .context("failed to update settings")?;
    Ok(Json(settings))
}

// --- Import ---

async fn import_csv(
    State(state): State<AppState>,
    Query(params): Query<ImportQuery>,
    body: String,
) -> Result<Json<serde_json::Value>, ApiError> {
    if let Some(ref since) = params.since {
        parse_date(since)?;
    }
    let tracker = state.tracker();
    // A dry run validates every row without writing.
    let preview = tracker
        .import_metrics_csv(&body, params.since.as_deref(), true)
        .map_err(|e| bad_request(&e))?;
    let summary = if params.dry_run {
        preview
    } else {
        tracker
            .import_metrics_csv(&body, params.since.as_deref(), false)
            .context("failed to import metrics")?
    };
    let value = serde_json::to_value(summary).context("failed to serialize import summary")?;
    Ok(Json(value))
}

// --- Router builder ---

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/entries", post(create_entry))
        .route(
            "/api/entries/{id}",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
        .route("/api/entries/date/{date}", get(entries_for_date))
        .route(
            "/api/metrics/{date}",
            get(get_metrics).put(upsert_metrics).delete(clear_day),
        )
        .route("/api/summary/{date}", get(get_daily_summary))
        .route("/api/history", get(get_history))
        .route("/api/settings", put(update_settings).get(get_settings))
        .route("/api/recompute/{date}", post(recompute_date))
        .route("/api/recalculate", post(recalculate_all))
        .route("/api/import", post(import_csv))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    tracker: Tracker,
    port: u16,
    bind: &str,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    let state = AppState {
        tracker: Arc::new(Mutex::new(tracker)),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        eprintln!(
            "API key: {}...{} (see api_key file in data directory)",
            &key[..4],
            &key[key.len() - 4..],
        );
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    eprintln!("Listening on http://{bind}:{port}");
    tracing::info!(%bind, port, auth = api_key.is_some(), "server started");
    axum::serve(listener, app).await?;

    Ok(())
}
