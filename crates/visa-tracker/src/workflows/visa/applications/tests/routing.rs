use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::visa::applications::router::{
    self, timeline_response, CreateApplicationRequest, TimelineRequest,
};
use crate::workflows::visa::applications::VisaApplicationService;
use crate::workflows::visa::timeline::{RiskLevel, TimelineError};

async fn send(router: axum::Router, method: &str, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(payload) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&payload).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    router.oneshot(request).await.unwrap()
}

fn create_payload() -> Value {
    json!({
        "user_id": TRAVELER,
        "requirement_id": REQUIREMENT,
        "destination_id": DESTINATION,
    })
}

#[tokio::test]
async fn create_route_returns_created_then_existing() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let first = send(
        router.clone(),
        "POST",
        "/api/v1/visa/applications",
        Some(create_payload()),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let created = read_json_body(first).await;
    assert_eq!(created["status"], "NOT_STARTED");
    assert_eq!(created["latest_submission_date"], "2026-02-07");
    assert_eq!(created["status_history"].as_array().map(Vec::len), Some(1));

    let second = send(
        router,
        "POST",
        "/api/v1/visa/applications",
        Some(create_payload()),
    )
    .await;
    assert_eq!(second.status(), StatusCode::OK);
    let existing = read_json_body(second).await;
    assert_eq!(existing["id"], created["id"]);
}

#[tokio::test]
async fn create_route_reports_unknown_requirement() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = send(
        router,
        "POST",
        "/api/v1/visa/applications",
        Some(json!({
            "user_id": TRAVELER,
            "requirement_id": "req-unknown",
            "destination_id": DESTINATION,
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("req-unknown"));
}

#[tokio::test]
async fn create_handler_maps_repository_failures_to_internal_error() {
    let service = Arc::new(VisaApplicationService::new(
        Arc::new(UnavailableRepository),
        Arc::new(MemoryCatalog::standard()),
        Arc::new(MemoryNotifier::default()),
    ));

    let response = router::create_handler::<UnavailableRepository, MemoryCatalog, MemoryNotifier>(
        State(service),
        axum::Json(CreateApplicationRequest {
            user_id: TRAVELER.to_string(),
            requirement_id: REQUIREMENT.to_string(),
            destination_id: DESTINATION.to_string(),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn status_route_moves_application_forward() {
    let (service, _, notifier) = build_service();
    let application = create_application(&service);
    let router = router_with_service(service);

    let response = send(
        router,
        "POST",
        &format!("/api/v1/visa/applications/{}/status", application.id),
        Some(json!({
            "status": "SUBMITTED",
            "notes": "handed in at the consulate",
            "submission_date": "2026-01-10T10:00:00Z",
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "SUBMITTED");
    assert_eq!(body["expected_decision_date"], "2026-01-25T10:00:00Z");
    assert_eq!(notifier.events().len(), 1);
}

#[tokio::test]
async fn status_route_rejects_unknown_labels() {
    let (service, _, _) = build_service();
    let application = create_application(&service);
    let router = router_with_service(service);

    let response = send(
        router,
        "POST",
        &format!("/api/v1/visa/applications/{}/status", application.id),
        Some(json!({ "status": "ON_HOLD" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn status_route_conflicts_on_terminal_applications() {
    let (service, _, _) = build_service();
    let application = create_application(&service);
    let router = router_with_service(service);
    let uri = format!("/api/v1/visa/applications/{}/status", application.id);

    let cancelled = send(
        router.clone(),
        "POST",
        &uri,
        Some(json!({ "status": "CANCELLED" })),
    )
    .await;
    assert_eq!(cancelled.status(), StatusCode::OK);

    let reopened = send(router, "POST", &uri, Some(json!({ "status": "NOT_STARTED" }))).await;
    assert_eq!(reopened.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn tracking_route_returns_not_found_for_unknown_id() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = send(router, "GET", "/api/v1/visa/applications/visa-app-missing", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tracking_handler_reports_progress_and_completeness() {
    let (service, repository, _) = build_service();
    let application = create_application(&service);
    repository.upload(&application.id, uploaded("PASSPORT"));
    repository.upload(&application.id, uploaded("PHOTO"));

    let response = router::tracking_handler::<MemoryRepository, MemoryCatalog, MemoryNotifier>(
        State(Arc::new(service)),
        Path(application.id.0.clone()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["current_step"], "NOT_STARTED");
    assert_eq!(body["progress_percentage"], 20);
    assert_eq!(body["completeness"]["is_complete"], true);
    assert_eq!(body["application"]["id"], application.id.0);
}

#[tokio::test]
async fn appointment_route_books_the_application() {
    let (service, _, _) = build_service();
    let application = create_application(&service);
    let router = router_with_service(service);

    let response = send(
        router,
        "PUT",
        &format!("/api/v1/visa/applications/{}/appointment", application.id),
        Some(json!({
            "date": "2026-01-20T02:30:00Z",
            "location": "Embassy of Japan",
            "type": "biometrics",
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "APPOINTMENT_BOOKED");
    assert_eq!(body["appointment"]["type"], "biometrics");
    assert_eq!(body["appointment_date"], "2026-01-20T02:30:00Z");
}

#[tokio::test]
async fn appointment_route_rejects_empty_updates() {
    let (service, _, _) = build_service();
    let application = create_application(&service);
    let router = router_with_service(service);

    let response = send(
        router,
        "PUT",
        &format!("/api/v1/visa/applications/{}/appointment", application.id),
        Some(json!({})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn completeness_route_lists_missing_documents() {
    let (service, repository, _) = build_service();
    let application = create_application(&service);
    repository.upload(&application.id, uploaded("HOTEL_BOOKING"));
    let router = router_with_service(service);

    let response = send(
        router,
        "POST",
        &format!("/api/v1/visa/applications/{}/completeness", application.id),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["is_complete"], false);
    assert_eq!(body["total_mandatory"], 2);
    assert_eq!(body["uploaded_count"], 0);
    assert_eq!(body["missing_mandatory"], json!(["PASSPORT", "PHOTO"]));
}

#[tokio::test]
async fn application_timeline_route_needs_an_entry_date() {
    let (service, _, _) = build_service();
    let dated = create_application(&service);
    let undated = service
        .create(
            crate::workflows::visa::applications::UserId("traveler-bo".to_string()),
            crate::workflows::visa::applications::RequirementId(REQUIREMENT.to_string()),
            crate::workflows::visa::applications::DestinationId(UNDATED_DESTINATION.to_string()),
            now(),
        )
        .expect("created");
    let router = router_with_service(service);

    let ok = send(
        router.clone(),
        "GET",
        &format!("/api/v1/visa/applications/{}/timeline", dated.id),
        None,
    )
    .await;
    assert_eq!(ok.status(), StatusCode::OK);
    let body = read_json_body(ok).await;
    assert_eq!(body["processing_days"], 15);
    assert_eq!(body["recommended_submission_date"], "2026-01-24");
    assert_eq!(body["expected_decision_date"], Value::Null);

    let missing = send(
        router,
        "GET",
        &format!("/api/v1/visa/applications/{}/timeline", undated.id),
        None,
    )
    .await;
    assert_eq!(missing.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn timeline_route_computes_standalone_windows() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = send(
        router.clone(),
        "POST",
        "/api/v1/visa/timeline",
        Some(json!({ "entry_date": "2026-03-01", "processing_time_max": 10 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["latest_submission_date"], "2026-02-12");
    assert_eq!(body["recommended_submission_date"], "2026-01-29");
    assert!(body["risk"].is_string());

    let invalid = send(
        router,
        "POST",
        "/api/v1/visa/timeline",
        Some(json!({ "entry_date": "first of March" })),
    )
    .await;
    assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[test]
fn timeline_response_classifies_risk_at_the_given_instant() {
    let response = timeline_response(
        TimelineRequest {
            entry_date: Some("2026-03-01".to_string()),
            processing_time_max: None,
            submission_date: None,
        },
        now(),
    )
    .expect("timeline computed");

    assert_eq!(response.timeline.processing_days, 15);
    assert_eq!(response.days_until_latest_submission, 32);
    assert_eq!(response.risk, RiskLevel::Safe);

    let missing = timeline_response(
        TimelineRequest {
            entry_date: None,
            processing_time_max: Some(15),
            submission_date: None,
        },
        now(),
    );
    assert_eq!(missing.unwrap_err(), TimelineError::MissingEntryDate);
}

#[tokio::test]
async fn feasibility_route_flags_missed_deadlines() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = send(
        router,
        "POST",
        "/api/v1/visa/trips/feasibility",
        Some(json!({
            "destinations": [
                {
                    "destination_name": "Japan",
                    "visa_required": true,
                    "processing_time_max": 15,
                    "entry_date": "2020-03-01"
                },
                {
                    "destination_name": "Thailand",
                    "visa_required": false
                }
            ]
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "NOT_FEASIBLE");
    assert_eq!(body["risky_destinations"][0]["destination_name"], "Japan");
    assert_eq!(body["risky_destinations"][0]["risk"], "HIGH");
    assert_eq!(body["risky_destinations"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn oversized_processing_times_do_not_crash_handlers() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let timeline = send(
        router.clone(),
        "POST",
        "/api/v1/visa/timeline",
        Some(json!({
            "entry_date": "2026-03-01",
            "processing_time_max": i64::MAX,
            "submission_date": "2026-01-10T09:00:00Z"
        })),
    )
    .await;
    assert_eq!(timeline.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(timeline).await;
    assert!(body["error"]
        .as_str()
        .is_some_and(|message| message.contains("outside the supported date range")));

    let feasibility = send(
        router,
        "POST",
        "/api/v1/visa/trips/feasibility",
        Some(json!({
            "destinations": [
                {
                    "destination_name": "Antarctica",
                    "visa_required": true,
                    "processing_time_max": 100_000_000,
                    "entry_date": "2099-01-01"
                }
            ]
        })),
    )
    .await;
    assert_eq!(feasibility.status(), StatusCode::OK);
    let body = read_json_body(feasibility).await;
    assert_eq!(body["status"], "RISKY");
    assert_eq!(body["risky_destinations"][0]["destination_name"], "Antarctica");
    assert!(body["risky_destinations"][0].get("risk").map_or(true, Value::is_null));
}
