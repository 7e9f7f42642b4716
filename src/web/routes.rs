//! HTTP API endpoints.
//!
//! Thin handlers: resolve the tenant, validate the payload, call into the
//! core, and map the typed error to a status code. Submission endpoints
//! return 202 with poll URLs; progress is observed by polling.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post, put};
use axum::Router;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::Error;
use crate::lifecycle;
use crate::models::ProfileInput;
use crate::pipeline;
use crate::scrape::Platform;
use crate::state::AppState;
use crate::store::{discover_queue_count, provision};
use crate::sync;
use crate::tenant::{TenantId, resolve_tenant};
use crate::web::error::ApiError;
use crate::web::extractors::TenantHeader;

/// Creates the web server router.
pub fn create_router(state: AppState) -> Router {
    // An empty origin list means any origin (development posture).
    let cors = if state.config.allowed_origins.trim().is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<http::HeaderValue> = state
            .config
            .allowed_origins
            .split(',')
            .filter_map(|origin| origin.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/scrape-followers", post(submit_scrape))
        .route("/api/job-status/{job_id}", get(job_status))
        .route("/api/job-results/{job_id}", get(job_results))
        .route("/api/ingest", post(ingest_profiles))
        .route("/api/run-daily", post(run_daily))
        .route("/api/daily-select", post(daily_select))
        .route("/api/distribute", post(distribute))
        .route("/api/sync-campaign", post(sync_campaign))
        .route("/api/sync-statuses", post(sync_statuses))
        .route("/api/mark-unfollow", post(mark_unfollow))
        .route("/api/delete-completed", post(delete_completed))
        .route("/api/purge-telemetry", post(purge_telemetry))
        .route("/api/create-base", post(create_base))
        .route("/api/verify-base", post(verify_base))
        .route(
            "/api/tenant-settings",
            put(put_tenant_settings).get(get_tenant_settings),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "outreach",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ── scrape jobs ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SubmitScrapeRequest {
    accounts: Vec<String>,
    #[serde(default = "default_target_gender", alias = "targetGender")]
    target_gender: String,
    #[serde(default, alias = "totalScrapeCount")]
    total_scrape_count: Option<i64>,
    #[serde(default)]
    tenant_id: Option<String>,
}

fn default_target_gender() -> String {
    "male".to_string()
}

async fn submit_scrape(
    State(state): State<AppState>,
    TenantHeader(header): TenantHeader,
    Json(body): Json<SubmitScrapeRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let tenant = resolve_tenant(header.as_deref(), body.tenant_id.as_deref())?;

    let receipt = state
        .engine
        .submit(
            &tenant,
            body.accounts,
            &body.target_gender,
            body.total_scrape_count,
        )
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "success": true,
            "job_id": receipt.job_id,
            "tenant_id": tenant,
            "status_url": receipt.status_url,
            "results_url": receipt.results_url,
            "total_batches": receipt.total_batches,
            "message": "Job queued successfully. Poll status_url for progress.",
        })),
    ))
}

async fn job_status(
    State(state): State<AppState>,
    TenantHeader(header): TenantHeader,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let tenant = resolve_tenant(header.as_deref(), None)?;
    let job = state.db.jobs().fetch(&tenant, job_id).await?;

    Ok(Json(json!({
        "success": true,
        "job": job,
    })))
}

#[derive(Deserialize)]
struct ResultsParams {
    #[serde(default = "default_page")]
    page: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    1000
}

async fn job_results(
    State(state): State<AppState>,
    TenantHeader(header): TenantHeader,
    Path(job_id): Path<Uuid>,
    Query(params): Query<ResultsParams>,
) -> Result<Json<Value>, ApiError> {
    let tenant = resolve_tenant(header.as_deref(), None)?;

    if params.page < 1 {
        return Err(ApiError::bad_request("page must be >= 1"));
    }
    if params.limit < 1 || params.limit > 5000 {
        return Err(ApiError::bad_request("limit must be between 1 and 5000"));
    }

    let page = state
        .db
        .jobs()
        .fetch_results(&tenant, job_id, params.page, params.limit)
        .await?;

    Ok(Json(json!({
        "success": true,
        "job_id": job_id,
        "page": page.page,
        "limit": page.limit,
        "total": page.total,
        "profiles": page.profiles,
    })))
}

// ── ingestion ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct IngestRequest {
    profiles: Vec<ProfileInput>,
    #[serde(default)]
    tenant_id: Option<String>,
}

async fn ingest_profiles(
    State(state): State<AppState>,
    TenantHeader(header): TenantHeader,
    Json(body): Json<IngestRequest>,
) -> Result<Json<Value>, ApiError> {
    let tenant = resolve_tenant(header.as_deref(), body.tenant_id.as_deref())?;

    if body.profiles.is_empty() {
        return Ok(Json(json!({
            "success": true,
            "batch_id": Value::Null,
            "batch_count": 0,
            "total": 0,
            "inserted_raw": 0,
            "added_global": 0,
            "skipped": 0,
        })));
    }

    let batch_id = Uuid::new_v4();
    let total = body.profiles.len();
    let batch_count = total.div_ceil(1000);

    let summary = state
        .db
        .profiles()
        .ingest_batch(&tenant, &body.profiles, state.config.ingest_batch_delay)
        .await?;

    Ok(Json(json!({
        "success": true,
        "batch_id": batch_id,
        "batch_count": batch_count,
        "total": total,
        "inserted_raw": summary.inserted_raw,
        "added_global": summary.added_global,
        "skipped": summary.skipped,
    })))
}

// ── daily pipeline ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct PipelineRequest {
    #[serde(default)]
    campaign_date: Option<NaiveDate>,
    #[serde(default, alias = "profiles_per_table")]
    profiles_per_queue: Option<u32>,
    #[serde(default)]
    tenant_id: Option<String>,
}

async fn resolve_fanout(
    state: &AppState,
    tenant: &TenantId,
    profiles_per_queue: Option<u32>,
) -> (u32, u32) {
    let num_queues = discover_queue_count(
        &state.db,
        state.store.as_ref(),
        tenant,
        state.config.num_queues_default,
    )
    .await;
    let per_queue = profiles_per_queue.unwrap_or(state.config.profiles_per_queue);
    (num_queues, per_queue)
}

async fn run_daily(
    State(state): State<AppState>,
    TenantHeader(header): TenantHeader,
    Json(body): Json<PipelineRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let tenant = resolve_tenant(header.as_deref(), body.tenant_id.as_deref())?;
    let (num_queues, per_queue) = resolve_fanout(&state, &tenant, body.profiles_per_queue).await;

    let summary = pipeline::run_daily(
        &state.db,
        state.store.as_ref(),
        &tenant,
        body.campaign_date,
        num_queues,
        per_queue,
    )
    .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "success": true,
            "campaign_id": summary.campaign_id,
            "steps": summary.steps,
        })),
    ))
}

async fn daily_select(
    State(state): State<AppState>,
    TenantHeader(header): TenantHeader,
    Json(body): Json<PipelineRequest>,
) -> Result<Json<Value>, ApiError> {
    let tenant = resolve_tenant(header.as_deref(), body.tenant_id.as_deref())?;
    let (num_queues, per_queue) = resolve_fanout(&state, &tenant, body.profiles_per_queue).await;

    let outcome = pipeline::select_daily_batch(
        &state.db,
        &tenant,
        body.campaign_date,
        num_queues,
        per_queue,
    )
    .await?;

    Ok(Json(json!({
        "success": true,
        "campaign_id": outcome.campaign_id,
        "campaign_date": outcome.campaign_date,
        "total_selected": outcome.total_selected,
    })))
}

#[derive(Deserialize)]
struct DistributeRequest {
    campaign_id: Uuid,
    #[serde(default, alias = "profiles_per_table")]
    profiles_per_queue: Option<u32>,
    #[serde(default)]
    tenant_id: Option<String>,
}

async fn distribute(
    State(state): State<AppState>,
    TenantHeader(header): TenantHeader,
    Json(body): Json<DistributeRequest>,
) -> Result<Json<Value>, ApiError> {
    let tenant = resolve_tenant(header.as_deref(), body.tenant_id.as_deref())?;
    let (num_queues, per_queue) = resolve_fanout(&state, &tenant, body.profiles_per_queue).await;

    let report = pipeline::distribute(
        &state.db,
        &tenant,
        body.campaign_id,
        num_queues,
        per_queue,
    )
    .await?;

    Ok(Json(json!({
        "success": true,
        "campaign_id": body.campaign_id,
        "tables_used": report.tables_used,
        "total_distributed": report.total_distributed,
        "overflow": report.overflow,
    })))
}

// ── external sync ───────────────────────────────────────────────────

#[derive(Deserialize)]
struct SyncCampaignRequest {
    campaign_id: Uuid,
    #[serde(default)]
    tenant_id: Option<String>,
}

async fn sync_campaign(
    State(state): State<AppState>,
    TenantHeader(header): TenantHeader,
    Json(body): Json<SyncCampaignRequest>,
) -> Result<Json<Value>, ApiError> {
    let tenant = resolve_tenant(header.as_deref(), body.tenant_id.as_deref())?;

    let report =
        sync::push_campaign(&state.db, state.store.as_ref(), &tenant, body.campaign_id).await?;

    Ok(Json(json!({
        "success": true,
        "campaign_id": body.campaign_id,
        "tables_synced": report.tables_synced,
        "records_synced": report.records_synced,
        "status": report.status,
    })))
}

#[derive(Deserialize)]
struct TenantOnlyRequest {
    #[serde(default)]
    tenant_id: Option<String>,
}

async fn sync_statuses(
    State(state): State<AppState>,
    TenantHeader(header): TenantHeader,
    Json(body): Json<TenantOnlyRequest>,
) -> Result<Json<Value>, ApiError> {
    let tenant = resolve_tenant(header.as_deref(), body.tenant_id.as_deref())?;
    let (num_queues, _) = resolve_fanout(&state, &tenant, None).await;

    let synced =
        sync::pull_statuses(&state.db, state.store.as_ref(), &tenant, num_queues).await?;

    Ok(Json(json!({
        "success": true,
        "synced_count": synced,
    })))
}

// ── lifecycle ───────────────────────────────────────────────────────

async fn mark_unfollow(
    State(state): State<AppState>,
    TenantHeader(header): TenantHeader,
    Json(body): Json<TenantOnlyRequest>,
) -> Result<Json<Value>, ApiError> {
    let tenant = resolve_tenant(header.as_deref(), body.tenant_id.as_deref())?;

    let marked =
        lifecycle::mark_unfollow_due(&state.db, state.store.as_ref(), &tenant).await?;

    Ok(Json(json!({
        "success": true,
        "marked_count": marked,
    })))
}

async fn delete_completed(
    State(state): State<AppState>,
    TenantHeader(header): TenantHeader,
    Json(body): Json<TenantOnlyRequest>,
) -> Result<Json<Value>, ApiError> {
    let tenant = resolve_tenant(header.as_deref(), body.tenant_id.as_deref())?;

    let deleted =
        lifecycle::delete_completed_after_delay(&state.db, state.store.as_ref(), &tenant).await?;

    Ok(Json(json!({
        "success": true,
        "deleted_count": deleted,
    })))
}

async fn purge_telemetry(
    State(state): State<AppState>,
    TenantHeader(header): TenantHeader,
    Json(body): Json<TenantOnlyRequest>,
) -> Result<Json<Value>, ApiError> {
    let tenant = resolve_tenant(header.as_deref(), body.tenant_id.as_deref())?;

    let report = lifecycle::purge_old_telemetry(&state.db, &tenant).await?;

    Ok(Json(json!({
        "success": true,
        "purged": report,
    })))
}

// ── provisioning and settings ───────────────────────────────────────

#[derive(Deserialize)]
struct ProvisionRequest {
    #[serde(default, alias = "num_vas")]
    num_queues: Option<u32>,
    #[serde(default)]
    tenant_id: Option<String>,
}

async fn create_base(
    State(state): State<AppState>,
    TenantHeader(header): TenantHeader,
    Json(body): Json<ProvisionRequest>,
) -> Result<Json<Value>, ApiError> {
    let tenant = resolve_tenant(header.as_deref(), body.tenant_id.as_deref())?;
    let num_queues = body.num_queues.unwrap_or(state.config.num_queues_default);

    let report =
        provision::create_queue_tables(state.store.as_ref(), &tenant, num_queues).await?;

    Ok(Json(json!({
        "success": report.tables_failed == 0,
        "base_id": tenant,
        "tables_created": report.tables_created,
        "tables_skipped": report.tables_skipped,
        "tables_failed": report.tables_failed,
        "failed_tables": report.failed_tables,
    })))
}

async fn verify_base(
    State(state): State<AppState>,
    TenantHeader(header): TenantHeader,
    Json(body): Json<ProvisionRequest>,
) -> Result<Json<Value>, ApiError> {
    let tenant = resolve_tenant(header.as_deref(), body.tenant_id.as_deref())?;
    let num_queues = body.num_queues.unwrap_or(state.config.num_queues_default);

    let report =
        provision::verify_queue_tables(state.store.as_ref(), &tenant, num_queues).await?;

    Ok(Json(json!({
        "success": true,
        "base_id": tenant,
        "valid": report.valid,
        "missing": report.missing,
        "extra": report.extra,
    })))
}

#[derive(Deserialize)]
struct TenantSettingsRequest {
    #[serde(default)]
    display_name: String,
    #[serde(default = "default_platform")]
    platform: String,
    #[serde(default, alias = "num_vas")]
    num_queues: Option<i32>,
    #[serde(default)]
    tenant_id: Option<String>,
}

fn default_platform() -> String {
    "instagram".to_string()
}

async fn put_tenant_settings(
    State(state): State<AppState>,
    TenantHeader(header): TenantHeader,
    Json(body): Json<TenantSettingsRequest>,
) -> Result<Json<Value>, ApiError> {
    let tenant = resolve_tenant(header.as_deref(), body.tenant_id.as_deref())?;

    // Reject unknown platforms before they poison later scrape jobs.
    let platform = Platform::parse(&body.platform)?;
    if let Some(n) = body.num_queues {
        if n <= 0 {
            return Err(ApiError::bad_request("num_queues must be positive"));
        }
    }

    state
        .db
        .tenants()
        .upsert(&tenant, &body.display_name, platform.as_str(), body.num_queues)
        .await?;

    let settings = state.db.tenants().fetch(&tenant).await?;
    Ok(Json(json!({
        "success": true,
        "settings": settings,
    })))
}

async fn get_tenant_settings(
    State(state): State<AppState>,
    TenantHeader(header): TenantHeader,
) -> Result<Json<Value>, ApiError> {
    let tenant = resolve_tenant(header.as_deref(), None)?;

    let settings = state
        .db
        .tenants()
        .fetch(&tenant)
        .await?
        .ok_or_else(|| Error::not_found("tenant settings", tenant.to_string()))?;

    Ok(Json(json!({
        "success": true,
        "settings": settings,
    })))
}
