//! API request handlers
//!
//! Every handler takes the shared `DashboardState`, holds the dashboard lock
//! only for as long as it takes to build the response body, and answers with
//! the `{data, meta}` envelope. Exports are the exception: they return the
//! raw JSON or CSV document so it can be saved as a file.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use super::envelope::{ApiErrorResponse, ApiResponse};
use crate::clock::{ClockState, SimulationClock};
use crate::config::defaults;
use crate::engine::{DomainSummary, SharedDashboard, TickEvent};
use crate::export::{self, EntityReport, ExportFormat};
use crate::types::{
    Alert, AlertId, Category, CategoryFilter, EntityId, EntitySeed, MetricDefinition,
    ScoreDefinition, SortDirection, SortKey, ThresholdRule, ViewSpec,
};

/// Shared state for all API handlers
#[derive(Clone)]
pub struct DashboardState {
    pub dashboard: SharedDashboard,
    pub clock: Arc<Mutex<SimulationClock>>,
    /// Tick notifications, forwarded to `/events` subscribers.
    pub events: broadcast::Sender<TickEvent>,
}

impl DashboardState {
    pub fn new(dashboard: SharedDashboard, clock: SimulationClock) -> Self {
        let events = clock.events();
        Self {
            dashboard,
            clock: Arc::new(Mutex::new(clock)),
            events,
        }
    }
}

// ============================================================================
// Request / response bodies
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub generation: u64,
    pub domains: usize,
    pub clock: ClockState,
}

#[derive(Debug, Serialize)]
pub struct DomainDetail<'a> {
    #[serde(flatten)]
    pub summary: DomainSummary,
    pub live_categories: &'a [Category],
    pub metrics: &'a BTreeMap<String, MetricDefinition>,
    pub scores: &'a [ScoreDefinition],
    pub thresholds: &'a [ThresholdRule],
}

#[derive(Debug, Serialize)]
pub struct EntityDetail<'a> {
    #[serde(flatten)]
    pub report: EntityReport,
    pub alerts: &'a [Alert],
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub field: String,
    pub value: f64,
}

#[derive(Debug, Deserialize)]
pub struct BatchAdjustRequest {
    pub ids: Vec<EntityId>,
    pub field: String,
    pub value: f64,
}

#[derive(Debug, Serialize)]
pub struct AdjustResponse {
    pub entities: Vec<EntityId>,
    pub field: String,
    /// Value actually stored after clamping.
    pub value: f64,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub category: Category,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct ThresholdRequest {
    pub threshold: f64,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
    pub domain: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClockStatus {
    pub state: ClockState,
    pub period_ms: u64,
    pub generation: u64,
}

// ============================================================================
// Query parsing
// ============================================================================

/// Build a `ViewSpec` from `?search=&category=&sort=&order=&attr.<key>=`.
pub fn view_spec_from_query(params: &HashMap<String, String>) -> Result<ViewSpec, String> {
    let mut spec = ViewSpec::default();
    for (key, value) in params {
        match key.as_str() {
            "search" => spec.search = value.clone(),
            "category" | "status" => spec.category = CategoryFilter::try_from(value.clone())?,
            "sort" if !value.is_empty() => spec.sort = Some(SortKey::from(value.clone())),
            "sort" => {}
            "order" | "direction" => {
                spec.direction = match value.to_ascii_lowercase().as_str() {
                    "asc" | "ascending" => SortDirection::Ascending,
                    "desc" | "descending" => SortDirection::Descending,
                    other => return Err(format!("invalid sort order '{other}' (expected asc or desc)")),
                }
            }
            other => match other.strip_prefix("attr.") {
                Some(attr) if !attr.is_empty() => {
                    spec.attributes.insert(attr.to_string(), value.clone());
                }
                _ => return Err(format!("unknown query parameter '{other}'")),
            },
        }
    }
    Ok(spec)
}

// ============================================================================
// Read endpoints
// ============================================================================

/// GET /api/v1/health
pub async fn get_health(State(state): State<DashboardState>) -> Response {
    let clock = state.clock.lock().await.state();
    let dashboard = state.dashboard.read().await;
    ApiResponse::ok(HealthResponse {
        status: "ok",
        generation: dashboard.generation(),
        domains: dashboard.domains().len(),
        clock,
    })
}

/// GET /api/v1/domains
pub async fn list_domains(State(state): State<DashboardState>) -> Response {
    let dashboard = state.dashboard.read().await;
    ApiResponse::ok(dashboard.summaries())
}

/// GET /api/v1/domains/:domain
pub async fn get_domain(State(state): State<DashboardState>, Path(domain): Path<String>) -> Response {
    let dashboard = state.dashboard.read().await;
    match dashboard.domain(&domain) {
        Ok(engine) => ApiResponse::ok(DomainDetail {
            summary: engine.summary(),
            live_categories: engine.live_categories(),
            metrics: engine.metric_definitions(),
            scores: engine.score_definitions(),
            thresholds: engine.rules(),
        }),
        Err(e) => e.into_response(),
    }
}

/// GET /api/v1/domains/:domain/entities
pub async fn list_entities(
    State(state): State<DashboardState>,
    Path(domain): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let spec = match view_spec_from_query(&params) {
        Ok(spec) => spec,
        Err(msg) => return ApiErrorResponse::bad_request(msg),
    };
    let dashboard = state.dashboard.read().await;
    match dashboard.domain(&domain) {
        Ok(engine) => ApiResponse::ok(engine.query(&spec, Utc::now())),
        Err(e) => e.into_response(),
    }
}

/// GET /api/v1/domains/:domain/entities/:id
pub async fn get_entity(
    State(state): State<DashboardState>,
    Path((domain, id)): Path<(String, EntityId)>,
) -> Response {
    let dashboard = state.dashboard.read().await;
    let result = dashboard.domain(&domain).and_then(|engine| {
        let entity = engine.entity(id)?;
        Ok(EntityDetail {
            report: engine.report(id, Utc::now())?,
            alerts: &entity.alerts,
        })
    });
    match result {
        Ok(detail) => ApiResponse::ok(detail),
        Err(e) => e.into_response(),
    }
}

/// GET /api/v1/domains/:domain/entities/:id/history
pub async fn get_history(
    State(state): State<DashboardState>,
    Path((domain, id)): Path<(String, EntityId)>,
) -> Response {
    let dashboard = state.dashboard.read().await;
    match dashboard.domain(&domain).and_then(|engine| engine.history(id)) {
        Ok(points) => ApiResponse::ok(points),
        Err(e) => e.into_response(),
    }
}

/// GET /api/v1/domains/:domain/activity?limit=50
pub async fn get_activity(
    State(state): State<DashboardState>,
    Path(domain): Path<String>,
    Query(q): Query<LimitQuery>,
) -> Response {
    let limit = q
        .limit
        .unwrap_or(defaults::ACTIVITY_PAGE_SIZE)
        .min(defaults::ACTIVITY_LOG_CAPACITY);
    let dashboard = state.dashboard.read().await;
    match dashboard.domain(&domain) {
        Ok(engine) => ApiResponse::ok(engine.activity(limit)),
        Err(e) => e.into_response(),
    }
}

/// GET /api/v1/export?format=json|csv&domain=
pub async fn export_reports(State(state): State<DashboardState>, Query(q): Query<ExportQuery>) -> Response {
    let format = match q.format.as_deref().map(str::parse::<ExportFormat>) {
        None => ExportFormat::Json,
        Some(Ok(f)) => f,
        Some(Err(msg)) => return ApiErrorResponse::bad_request(msg),
    };
    let reports = {
        let dashboard = state.dashboard.read().await;
        match dashboard.reports(q.domain.as_deref(), Utc::now()) {
            Ok(r) => r,
            Err(e) => return e.into_response(),
        }
    };
    let content_type = match format {
        ExportFormat::Json => "application/json",
        ExportFormat::Csv => "text/csv; charset=utf-8",
    };
    match export::render(&reports, format) {
        Ok(body) => ([(header::CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => ApiErrorResponse::internal(format!("Export failed: {e}")),
    }
}

// ============================================================================
// Operator actions
// ============================================================================

/// POST /api/v1/domains/:domain/entities/:id/adjust
pub async fn adjust_entity(
    State(state): State<DashboardState>,
    Path((domain, id)): Path<(String, EntityId)>,
    Json(req): Json<AdjustRequest>,
) -> Response {
    let mut dashboard = state.dashboard.write().await;
    let result = dashboard
        .domain_mut(&domain)
        .and_then(|engine| engine.adjust(id, &req.field, req.value, Utc::now()));
    match result {
        Ok(value) => ApiResponse::ok(AdjustResponse {
            entities: vec![id],
            field: req.field,
            value,
        }),
        Err(e) => e.into_response(),
    }
}

/// POST /api/v1/domains/:domain/adjust
pub async fn adjust_batch(
    State(state): State<DashboardState>,
    Path(domain): Path<String>,
    Json(req): Json<BatchAdjustRequest>,
) -> Response {
    if req.ids.is_empty() {
        return ApiErrorResponse::bad_request("ids must not be empty");
    }
    let mut dashboard = state.dashboard.write().await;
    let result = dashboard
        .domain_mut(&domain)
        .and_then(|engine| engine.adjust_many(&req.ids, &req.field, req.value, Utc::now()));
    match result {
        Ok(value) => ApiResponse::ok(AdjustResponse {
            entities: req.ids,
            field: req.field,
            value,
        }),
        Err(e) => e.into_response(),
    }
}

/// POST /api/v1/domains/:domain/entities/:id/category
pub async fn set_category(
    State(state): State<DashboardState>,
    Path((domain, id)): Path<(String, EntityId)>,
    Json(req): Json<CategoryRequest>,
) -> Response {
    let mut dashboard = state.dashboard.write().await;
    let result = dashboard
        .domain_mut(&domain)
        .and_then(|engine| engine.set_category(id, req.category, Utc::now()));
    match result {
        Ok(previous) => ApiResponse::ok(serde_json::json!({
            "id": id,
            "previous": previous,
            "category": req.category,
        })),
        Err(e) => e.into_response(),
    }
}

/// POST /api/v1/domains/:domain/entities/:id/alerts/:alert_id/resolve
pub async fn resolve_alert(
    State(state): State<DashboardState>,
    Path((domain, id, alert_id)): Path<(String, EntityId, AlertId)>,
    Json(req): Json<ResolveRequest>,
) -> Response {
    let mut dashboard = state.dashboard.write().await;
    let result = dashboard.domain_mut(&domain).and_then(|engine| {
        engine.resolve_alert(id, alert_id, &req.comment, Utc::now())?;
        engine.entity(id)?.alert(alert_id).cloned().ok_or_else(|| {
            crate::error::EngineError::not_found(crate::error::ResourceKind::Alert, alert_id)
        })
    });
    match result {
        Ok(alert) => ApiResponse::ok(alert),
        Err(e) => e.into_response(),
    }
}

/// PUT /api/v1/domains/:domain/thresholds/:rule_id
pub async fn update_threshold(
    State(state): State<DashboardState>,
    Path((domain, rule_id)): Path<(String, String)>,
    Json(req): Json<ThresholdRequest>,
) -> Response {
    let mut dashboard = state.dashboard.write().await;
    let result = dashboard
        .domain_mut(&domain)
        .and_then(|engine| engine.update_threshold(&rule_id, req.threshold, Utc::now()));
    match result {
        Ok(previous) => ApiResponse::ok(serde_json::json!({
            "rule_id": rule_id,
            "previous": previous,
            "threshold": req.threshold,
        })),
        Err(e) => e.into_response(),
    }
}

/// POST /api/v1/domains/:domain/entities
pub async fn add_entity(
    State(state): State<DashboardState>,
    Path(domain): Path<String>,
    Json(seed): Json<EntitySeed>,
) -> Response {
    let mut dashboard = state.dashboard.write().await;
    let now = Utc::now();
    let result = dashboard.domain_mut(&domain).and_then(|engine| {
        let id = engine.add_entity(seed, now)?;
        engine.report(id, now)
    });
    match result {
        Ok(report) => ApiResponse::created(report),
        Err(e) => e.into_response(),
    }
}

/// DELETE /api/v1/domains/:domain/entities/:id
pub async fn remove_entity(
    State(state): State<DashboardState>,
    Path((domain, id)): Path<(String, EntityId)>,
) -> Response {
    let mut dashboard = state.dashboard.write().await;
    match dashboard
        .domain_mut(&domain)
        .and_then(|engine| engine.remove_entity(id, Utc::now()))
    {
        Ok(entity) => ApiResponse::ok(entity),
        Err(e) => e.into_response(),
    }
}

// ============================================================================
// Clock
// ============================================================================

async fn clock_status(state: &DashboardState, clock: &SimulationClock) -> ClockStatus {
    ClockStatus {
        state: clock.state(),
        period_ms: clock.period().as_millis() as u64,
        generation: state.dashboard.read().await.generation(),
    }
}

/// GET /api/v1/clock
pub async fn get_clock(State(state): State<DashboardState>) -> Response {
    let clock = state.clock.lock().await;
    ApiResponse::ok(clock_status(&state, &clock).await)
}

/// POST /api/v1/clock/start
pub async fn start_clock(State(state): State<DashboardState>) -> Response {
    let mut clock = state.clock.lock().await;
    if clock.start() {
        info!("[API] Clock started");
    }
    ApiResponse::ok(clock_status(&state, &clock).await)
}

/// POST /api/v1/clock/stop
pub async fn stop_clock(State(state): State<DashboardState>) -> Response {
    let mut clock = state.clock.lock().await;
    if clock.stop().await {
        info!("[API] Clock stopped");
    }
    ApiResponse::ok(clock_status(&state, &clock).await)
}

/// POST /api/v1/clock/tick
pub async fn tick_clock(State(state): State<DashboardState>) -> Response {
    let clock = state.clock.lock().await;
    ApiResponse::ok(clock.tick_now().await)
}

// ============================================================================
// Event stream
// ============================================================================

/// GET /api/v1/events (WebSocket)
pub async fn events(ws: WebSocketUpgrade, State(state): State<DashboardState>) -> Response {
    let rx = state.events.subscribe();
    ws.on_upgrade(move |socket| stream_events(socket, rx))
}

async fn stream_events(socket: WebSocket, mut rx: broadcast::Receiver<TickEvent>) {
    let (mut sender, mut receiver) = socket.split();
    debug!("[API] Event subscriber connected");

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            event = rx.recv() => match event {
                Ok(event) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(t) => t,
                        Err(e) => {
                            warn!(error = %e, "[API] Failed to serialize tick event");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "[API] Event subscriber lagging, ticks dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
    debug!("[API] Event subscriber disconnected");
}
