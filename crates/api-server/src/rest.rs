//! REST handlers for scheduling, engagement tracking, and directory
//! management.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::Json;
use serde::{Deserialize, Serialize};
use smartreach_core::clock::Clock;
use smartreach_core::directory::Directory;
use smartreach_core::types::{
    Campaign, CampaignStatus, Organization, Recipient, ScheduleFailure,
};
use smartreach_core::{AppConfig, SmartReachError};
use smartreach_delivery::{
    DispatchScheduler, InMemoryDeliveryQueue, OptimalTimeEstimator, ScheduleContext,
    TimeWindowConverter,
};
use smartreach_engagement::{AutofillEngine, EngagementStore, EngagementTracker, StartTimeSuggestion};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;
use uuid::Uuid;

/// Maximum string field length accepted at the API boundary.
const MAX_FIELD_LEN: usize = 256;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<Directory>,
    pub store: Arc<EngagementStore>,
    pub scheduler: Arc<DispatchScheduler>,
    pub tracker: Arc<EngagementTracker>,
    pub autofill: Arc<AutofillEngine>,
    pub default_timezone: String,
    pub node_id: String,
    pub start_time: Instant,
}

impl AppState {
    /// Wire every engine from configuration. The clock is injected so tests
    /// can pin "now".
    pub fn new(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        let directory = Arc::new(Directory::new());
        let store = Arc::new(EngagementStore::new());

        let estimator = Arc::new(OptimalTimeEstimator::new(
            store.clone(),
            clock.clone(),
            config.scheduler.history_scope,
        ));
        let queue = Arc::new(InMemoryDeliveryQueue::new());
        let scheduler = Arc::new(DispatchScheduler::new(
            estimator,
            store.clone(),
            queue,
            config.scheduler.max_workers,
            config.scheduler.default_link.clone(),
        ));
        let tracker = Arc::new(EngagementTracker::new(
            directory.clone(),
            store.clone(),
            clock,
            config.scheduler.default_link.clone(),
        ));
        let autofill = Arc::new(AutofillEngine::new(store.clone(), config.autofill.circular_mean));

        Self {
            directory,
            store,
            scheduler,
            tracker,
            autofill,
            default_timezone: config.window.default_timezone.clone(),
            node_id: config.node_id.clone(),
            start_time: Instant::now(),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: &str, message: String) -> ApiError {
    (status, Json(ErrorResponse { error: error.to_string(), message }))
}

fn map_error(e: SmartReachError) -> ApiError {
    match &e {
        SmartReachError::Validation(_)
        | SmartReachError::InvalidFormat(_)
        | SmartReachError::InvalidTimezone(_) => {
            metrics::counter!("api.validation_errors").increment(1);
            api_error(StatusCode::BAD_REQUEST, "invalid_request", e.to_string())
        }
        SmartReachError::NotFound(..) => api_error(StatusCode::NOT_FOUND, "not_found", e.to_string()),
        _ => api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal processing error".to_string(),
        ),
    }
}

// ─── Directory ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub company_link: Option<String>,
}

/// POST /v1/organizations
pub async fn create_organization(
    State(state): State<AppState>,
    Json(req): Json<CreateOrganizationRequest>,
) -> Result<(StatusCode, Json<Organization>), ApiError> {
    if req.name.is_empty() || req.name.len() > MAX_FIELD_LEN {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "organization name must be non-empty".to_string(),
        ));
    }
    let timezone = req.timezone.unwrap_or_else(|| state.default_timezone.clone());
    // Reject unknown zones up front so campaign authoring can't fail later.
    TimeWindowConverter::new(&timezone).map_err(map_error)?;

    let org = state
        .directory
        .create_organization(req.name, timezone, req.company_link);
    Ok((StatusCode::CREATED, Json(org)))
}

#[derive(Deserialize)]
pub struct AddRecipientRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// POST /v1/organizations/{id}/recipients
pub async fn add_recipient(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
    Json(req): Json<AddRecipientRequest>,
) -> Result<(StatusCode, Json<Recipient>), ApiError> {
    state.directory.get_organization(org_id).map_err(map_error)?;

    if !req.email.contains('@') || req.email.len() > MAX_FIELD_LEN {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            format!("invalid email address: {}", req.email),
        ));
    }

    match state.directory.add_recipient(
        org_id,
        req.email,
        req.first_name,
        req.last_name,
        req.location,
        req.timezone,
    ) {
        Ok(recipient) => Ok((StatusCode::CREATED, Json(recipient))),
        // Duplicate email within the organization.
        Err(SmartReachError::Validation(msg)) => {
            Err(api_error(StatusCode::CONFLICT, "duplicate_recipient", msg))
        }
        Err(e) => Err(map_error(e)),
    }
}

#[derive(Deserialize)]
pub struct CreateCampaignRequest {
    pub org_id: Uuid,
    pub name: String,
    pub description: String,
    pub subject: String,
    pub body: String,
    /// Authoring-local date/time, interpreted in the organization's zone.
    pub start_date: String,
    pub start_time: String,
    pub end_date: String,
    #[serde(default = "default_end_time")]
    pub end_time: String,
}

fn default_end_time() -> String {
    "23:59".to_string()
}

/// POST /v1/campaigns
pub async fn create_campaign(
    State(state): State<AppState>,
    Json(req): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<Campaign>), ApiError> {
    let org = state.directory.get_organization(req.org_id).map_err(map_error)?;
    let converter = TimeWindowConverter::new(&org.timezone).map_err(map_error)?;

    let start_utc = converter
        .to_utc(&req.start_date, &req.start_time)
        .map_err(map_error)?;
    let end_utc = converter.to_utc(&req.end_date, &req.end_time).map_err(map_error)?;
    // Window ordering is enforced at creation, not rediscovered at dispatch.
    smartreach_delivery::CampaignWindow::new(start_utc, end_utc).map_err(map_error)?;

    let campaign = state.directory.create_campaign(
        req.org_id,
        req.name,
        req.description,
        req.subject,
        req.body,
        start_utc,
        end_utc,
    );
    Ok((StatusCode::CREATED, Json(campaign)))
}

// ─── Scheduling ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ScheduleResponse {
    pub message: String,
    /// recipient email → ISO-8601 send instant.
    pub scheduled_times: BTreeMap<String, String>,
    pub failures: Vec<ScheduleFailure>,
}

/// POST /v1/campaigns/{id}/schedule — compute per-recipient optimal send
/// times and submit one delivery job each.
pub async fn schedule_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    metrics::counter!("api.schedule_requests").increment(1);

    let campaign = state.directory.get_campaign(campaign_id).map_err(map_error)?;
    let organization = state.directory.get_organization(campaign.org_id).map_err(map_error)?;
    let recipients = state.directory.recipients_for(campaign.org_id);
    let link = organization.company_link.clone();

    let outcome = state
        .scheduler
        .schedule_campaign(ScheduleContext { organization, campaign, recipients, link })
        .await
        .map_err(map_error)?;

    // An all-failed batch keeps its prior status so it is visibly not
    // scheduled.
    if !outcome.scheduled.is_empty() {
        state
            .directory
            .set_campaign_status(campaign_id, CampaignStatus::Scheduled)
            .map_err(map_error)?;
    }

    Ok(Json(ScheduleResponse {
        message: "Emails scheduled successfully".to_string(),
        scheduled_times: outcome
            .scheduled
            .into_iter()
            .map(|(email, eta)| (email, eta.to_rfc3339()))
            .collect(),
        failures: outcome.failures,
    }))
}

// ─── Tracking ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct OpenParams {
    pub email: String,
    pub organization: Uuid,
    pub campaign: Uuid,
}

#[derive(Serialize)]
pub struct OpenResponse {
    pub status: String,
    pub tracked: bool,
}

/// GET /track/open — open beacon. Always acknowledges.
pub async fn track_open(
    State(state): State<AppState>,
    Query(params): Query<OpenParams>,
) -> Json<OpenResponse> {
    let ack = state
        .tracker
        .track_open(&params.email, params.organization, params.campaign);
    Json(OpenResponse { status: "ok".to_string(), tracked: ack.tracked })
}

/// Click parameters are deliberately loose: a malformed hit must still be
/// redirected, never rejected.
#[derive(Deserialize)]
pub struct ClickParams {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub campaign: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

/// GET /track/click — tracked redirect. Always redirects.
pub async fn track_click(
    State(state): State<AppState>,
    Query(params): Query<ClickParams>,
) -> Redirect {
    let parsed = params.email.as_deref().zip(
        params
            .organization
            .as_deref()
            .and_then(|s| Uuid::parse_str(s).ok())
            .zip(params.campaign.as_deref().and_then(|s| Uuid::parse_str(s).ok())),
    );

    let outcome = match parsed {
        Some((email, (org_id, campaign_id))) => {
            state
                .tracker
                .track_click(email, org_id, campaign_id, params.link.as_deref())
        }
        None => {
            warn!("click hit with missing or malformed identifiers");
            // Redirect anyway; only the tracking is lost.
            state.tracker.track_click("", Uuid::nil(), Uuid::nil(), params.link.as_deref())
        }
    };

    Redirect::temporary(&outcome.redirect_url)
}

// ─── Autofill ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct AutofillResponse {
    pub optimal_start_time: String,
}

/// GET /v1/organizations/{id}/autofill-start-time
pub async fn autofill_start_time(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> Result<Json<AutofillResponse>, ApiError> {
    state.directory.get_organization(org_id).map_err(map_error)?;

    match state.autofill.suggest_start_time(org_id) {
        StartTimeSuggestion::Time(time) => Ok(Json(AutofillResponse { optimal_start_time: time })),
        StartTimeSuggestion::NoData => Err(api_error(
            StatusCode::NOT_FOUND,
            "no_data",
            "no opened engagement records for organization".to_string(),
        )),
    }
}

// ─── Probes ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready
pub async fn readiness() -> StatusCode {
    StatusCode::OK
}

/// GET /live
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}
