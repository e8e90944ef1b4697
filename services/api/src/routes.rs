use crate::infra::{
    deserialize_optional_date, start_of_day, AppState, InMemoryApplicationRepository,
};
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;
use tracing::info;
use visa_tracker::error::AppError;
use visa_tracker::workflows::visa::applications::{
    application_router, ApplicationDocument, ApplicationId, ApplicationRepository,
    ApplicationServiceError, NotificationPublisher, RequirementCatalog, VisaApplicationService,
};
use visa_tracker::workflows::visa::{
    assess_trip_feasibility, DestinationPlan, ItineraryImporter, TripFeasibility,
};

#[derive(Debug, Deserialize)]
pub(crate) struct ItineraryImportRequest {
    /// Raw CSV with `Destination,Visa Required,Processing Days,Entry Date` columns.
    pub(crate) itinerary_csv: String,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocumentUploadRequest {
    pub(crate) document_type: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ItineraryReportResponse {
    pub(crate) evaluated_at: DateTime<Utc>,
    pub(crate) destinations: Vec<DestinationPlan>,
    pub(crate) feasibility: TripFeasibility,
}

pub(crate) fn with_application_routes<R, C, N>(
    service: Arc<VisaApplicationService<R, C, N>>,
) -> axum::Router
where
    R: ApplicationRepository + 'static,
    C: RequirementCatalog + 'static,
    N: NotificationPublisher + 'static,
{
    application_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/visa/trips/import",
            axum::routing::post(itinerary_import_endpoint),
        )
        .route(
            "/api/v1/visa/applications/:application_id/documents",
            axum::routing::post(document_upload_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Import an itinerary CSV and assess it in one call.
pub(crate) async fn itinerary_import_endpoint(
    Json(payload): Json<ItineraryImportRequest>,
) -> Result<Json<ItineraryReportResponse>, AppError> {
    let ItineraryImportRequest {
        itinerary_csv,
        today,
    } = payload;

    let destinations = ItineraryImporter::from_reader(Cursor::new(itinerary_csv.into_bytes()))?;
    let evaluated_at = today.map(start_of_day).unwrap_or_else(Utc::now);
    let feasibility = assess_trip_feasibility(&destinations, evaluated_at);

    Ok(Json(ItineraryReportResponse {
        evaluated_at,
        destinations,
        feasibility,
    }))
}

/// Record an upload fact for an application; the file itself is stored elsewhere.
pub(crate) async fn document_upload_endpoint(
    Extension(repository): Extension<Arc<InMemoryApplicationRepository>>,
    Path(application_id): Path<String>,
    Json(payload): Json<DocumentUploadRequest>,
) -> Result<(StatusCode, Json<Vec<ApplicationDocument>>), AppError> {
    let document_type = payload.document_type.trim();
    if document_type.is_empty() {
        return Err(ApplicationServiceError::Validation(
            "document_type must not be empty".to_string(),
        )
        .into());
    }

    let id = ApplicationId(application_id);
    if repository
        .fetch(&id)
        .map_err(ApplicationServiceError::from)?
        .is_none()
    {
        return Err(ApplicationServiceError::ApplicationNotFound(id).into());
    }

    repository.record_upload(&id, document_type);
    info!(application_id = %id, document_type, "document upload recorded");

    let documents = repository
        .documents(&id)
        .map_err(ApplicationServiceError::from)?;
    Ok((StatusCode::CREATED, Json(documents)))
}
