use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    ApplicationId, AppointmentUpdate, DestinationId, RequirementId, StatusUpdate, UserId,
};
use super::repository::{ApplicationRepository, NotificationPublisher, RequirementCatalog};
use super::service::{ApplicationServiceError, VisaApplicationService};
use crate::workflows::visa::feasibility::{assess_trip_feasibility, DestinationPlan};
use crate::workflows::visa::timeline::{
    classify_risk, compute_timeline, days_until, parse_entry_date, RiskLevel, TimelineError,
    VisaTimeline,
};

/// Router builder exposing HTTP endpoints for the application lifecycle and timeline tools.
pub fn application_router<R, C, N>(service: Arc<VisaApplicationService<R, C, N>>) -> Router
where
    R: ApplicationRepository + 'static,
    C: RequirementCatalog + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/visa/applications", post(create_handler::<R, C, N>))
        .route(
            "/api/v1/visa/applications/:application_id",
            get(tracking_handler::<R, C, N>),
        )
        .route(
            "/api/v1/visa/applications/:application_id/timeline",
            get(application_timeline_handler::<R, C, N>),
        )
        .route(
            "/api/v1/visa/applications/:application_id/status",
            post(status_handler::<R, C, N>),
        )
        .route(
            "/api/v1/visa/applications/:application_id/appointment",
            put(appointment_handler::<R, C, N>),
        )
        .route(
            "/api/v1/visa/applications/:application_id/completeness",
            post(completeness_handler::<R, C, N>),
        )
        .route("/api/v1/visa/timeline", post(timeline_handler))
        .route("/api/v1/visa/trips/feasibility", post(feasibility_handler))
        .with_state(service)
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateApplicationRequest {
    pub user_id: String,
    pub requirement_id: String,
    pub destination_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusChangeRequest {
    pub status: String,
    #[serde(flatten)]
    pub updates: StatusUpdate,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimelineRequest {
    #[serde(default)]
    pub entry_date: Option<String>,
    #[serde(default)]
    pub processing_time_max: Option<i64>,
    #[serde(default)]
    pub submission_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineResponse {
    #[serde(flatten)]
    pub timeline: VisaTimeline,
    pub risk: RiskLevel,
    pub days_until_latest_submission: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeasibilityRequest {
    pub destinations: Vec<DestinationPlan>,
}

pub(crate) async fn create_handler<R, C, N>(
    State(service): State<Arc<VisaApplicationService<R, C, N>>>,
    axum::Json(request): axum::Json<CreateApplicationRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: RequirementCatalog + 'static,
    N: NotificationPublisher + 'static,
{
    match service.create_or_resume(
        UserId(request.user_id),
        RequirementId(request.requirement_id),
        DestinationId(request.destination_id),
        Utc::now(),
    ) {
        Ok(creation) => {
            let status = if creation.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, axum::Json(creation.application)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn tracking_handler<R, C, N>(
    State(service): State<Arc<VisaApplicationService<R, C, N>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: RequirementCatalog + 'static,
    N: NotificationPublisher + 'static,
{
    match service.tracking(&ApplicationId(application_id), Utc::now()) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn application_timeline_handler<R, C, N>(
    State(service): State<Arc<VisaApplicationService<R, C, N>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: RequirementCatalog + 'static,
    N: NotificationPublisher + 'static,
{
    match service.timeline(&ApplicationId(application_id)) {
        Ok(timeline) => (StatusCode::OK, axum::Json(timeline)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<R, C, N>(
    State(service): State<Arc<VisaApplicationService<R, C, N>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<StatusChangeRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: RequirementCatalog + 'static,
    N: NotificationPublisher + 'static,
{
    match service.transition_by_label(
        &ApplicationId(application_id),
        &request.status,
        request.updates,
        Utc::now(),
    ) {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn appointment_handler<R, C, N>(
    State(service): State<Arc<VisaApplicationService<R, C, N>>>,
    Path(application_id): Path<String>,
    axum::Json(fields): axum::Json<AppointmentUpdate>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: RequirementCatalog + 'static,
    N: NotificationPublisher + 'static,
{
    match service.update_appointment(&ApplicationId(application_id), fields, Utc::now()) {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn completeness_handler<R, C, N>(
    State(service): State<Arc<VisaApplicationService<R, C, N>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    C: RequirementCatalog + 'static,
    N: NotificationPublisher + 'static,
{
    match service.check_completeness(&ApplicationId(application_id), Utc::now()) {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn timeline_handler(axum::Json(request): axum::Json<TimelineRequest>) -> Response {
    match timeline_response(request, Utc::now()) {
        Ok(body) => (StatusCode::OK, axum::Json(body)).into_response(),
        Err(error) => error_response(ApplicationServiceError::InvalidInput(error)),
    }
}

pub(crate) async fn feasibility_handler(
    axum::Json(request): axum::Json<FeasibilityRequest>,
) -> Response {
    let verdict = assess_trip_feasibility(&request.destinations, Utc::now());
    (StatusCode::OK, axum::Json(verdict)).into_response()
}

/// Stand-alone timeline calculation with the risk evaluated at `now`.
pub fn timeline_response(
    request: TimelineRequest,
    now: DateTime<Utc>,
) -> Result<TimelineResponse, TimelineError> {
    let entry_date = request
        .entry_date
        .as_deref()
        .map(parse_entry_date)
        .transpose()?;
    let timeline = compute_timeline(
        request.processing_time_max,
        entry_date,
        request.submission_date,
    )?;

    Ok(TimelineResponse {
        risk: classify_risk(timeline.latest_submission_date, now),
        days_until_latest_submission: days_until(timeline.latest_submission_date, now),
        timeline,
    })
}

pub(crate) fn error_status(error: &ApplicationServiceError) -> StatusCode {
    match error {
        error if error.is_not_found() => StatusCode::NOT_FOUND,
        ApplicationServiceError::InvalidTransition(_) => StatusCode::CONFLICT,
        ApplicationServiceError::InvalidInput(_) | ApplicationServiceError::Validation(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: ApplicationServiceError) -> Response {
    let status = error_status(&error);
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
