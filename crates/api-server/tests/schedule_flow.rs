//! End-to-end flow: directory setup → optimal-time scheduling → open/click
//! tracking → autofill suggestion, all through the HTTP router.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use smartreach_api::{build_router, AppState};
use smartreach_core::clock::FixedClock;
use smartreach_core::types::CampaignStatus;
use smartreach_core::AppConfig;
use std::sync::Arc;
use tower::ServiceExt;

const DEFAULT_LINK: &str = "https://smartreachai.social";

fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

fn test_app() -> (Router, Arc<FixedClock>, AppState) {
    let clock = Arc::new(FixedClock::new(utc(2025, 2, 28, 0, 0)));
    let state = AppState::new(&AppConfig::default(), clock.clone());
    (build_router(state.clone()), clock, state)
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Option<String>, Value) {
    let response = app
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get("location")
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, location, value)
}

async fn seed_org(app: &Router) -> String {
    let (status, org) = post_json(
        app,
        "/v1/organizations",
        json!({"name": "Acme", "timezone": "UTC"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let org_id = org["id"].as_str().unwrap().to_string();

    for (email, first) in [("ada@acme.test", "Ada"), ("bob@acme.test", "Bob")] {
        let (status, _) = post_json(
            app,
            &format!("/v1/organizations/{org_id}/recipients"),
            json!({"email": email, "first_name": first, "last_name": "Tester"}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    org_id
}

async fn create_campaign(app: &Router, org_id: &str, start: (&str, &str), end: (&str, &str)) -> String {
    let (status, campaign) = post_json(
        app,
        "/v1/campaigns",
        json!({
            "org_id": org_id,
            "name": "Launch",
            "description": "Product launch",
            "subject": "Big news",
            "body": "Hi [recipient_name], news from [company_name].",
            "start_date": start.0,
            "start_time": start.1,
            "end_date": end.0,
            "end_time": end.1,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    campaign["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_full_schedule_and_engagement_flow() {
    let (app, clock, state) = test_app();
    let org_id = seed_org(&app).await;

    // 1. First campaign: nobody has history, so every recipient gets the
    //    window start.
    let campaign_id =
        create_campaign(&app, &org_id, ("2025-03-01", "09:00"), ("2025-03-05", "23:00")).await;
    let (status, body) =
        post_json(&app, &format!("/v1/campaigns/{campaign_id}/schedule"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let times = body["scheduled_times"].as_object().unwrap();
    assert_eq!(times.len(), 2);
    assert_eq!(times["ada@acme.test"], "2025-03-01T09:00:00+00:00");
    assert_eq!(times["bob@acme.test"], "2025-03-01T09:00:00+00:00");
    assert!(body["failures"].as_array().unwrap().is_empty());
    let stored = state.directory.get_campaign(campaign_id.parse().unwrap()).unwrap();
    assert_eq!(stored.status, CampaignStatus::Scheduled);

    // 2. Ada opens at 12:15 and clicks at 14:30.
    clock.set(utc(2025, 3, 1, 12, 15));
    let (status, _, body) = get(
        &app,
        &format!("/track/open?email=ada@acme.test&organization={org_id}&campaign={campaign_id}"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tracked"], json!(true));

    clock.set(utc(2025, 3, 1, 14, 30));
    let (status, location, _) = get(
        &app,
        &format!(
            "/track/click?email=ada@acme.test&organization={org_id}&campaign={campaign_id}\
             &link=https://acme.example/sale"
        ),
    )
    .await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location.as_deref(), Some("https://acme.example/sale"));

    // 3. Second campaign: Ada's 14:00 click hour drives her slot; Bob still
    //    falls back to the start.
    clock.set(utc(2025, 3, 9, 0, 0));
    let second =
        create_campaign(&app, &org_id, ("2025-03-10", "09:00"), ("2025-03-15", "23:59")).await;
    let (status, body) = post_json(&app, &format!("/v1/campaigns/{second}/schedule"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let times = body["scheduled_times"].as_object().unwrap();
    assert_eq!(times["ada@acme.test"], "2025-03-10T14:00:00+00:00");
    assert_eq!(times["bob@acme.test"], "2025-03-10T09:00:00+00:00");

    // 4. Autofill reflects Ada's single open.
    let (status, _, body) =
        get(&app, &format!("/v1/organizations/{org_id}/autofill-start-time")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["optimal_start_time"], "12:15");
}

#[tokio::test]
async fn test_click_with_unknown_recipient_still_redirects() {
    let (app, _clock, _state) = test_app();
    let org_id = seed_org(&app).await;

    let (status, location, _) = get(
        &app,
        &format!(
            "/track/click?email=ghost@acme.test&organization={org_id}\
             &campaign={}",
            uuid::Uuid::new_v4()
        ),
    )
    .await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location.as_deref(), Some(DEFAULT_LINK));
}

#[tokio::test]
async fn test_click_with_malformed_ids_still_redirects() {
    let (app, _clock, _state) = test_app();
    let (status, location, _) =
        get(&app, "/track/click?email=x@y.test&organization=nope&campaign=nope").await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location.as_deref(), Some(DEFAULT_LINK));
}

#[tokio::test]
async fn test_inverted_window_rejected_at_creation() {
    let (app, _clock, _state) = test_app();
    let org_id = seed_org(&app).await;

    let (status, body) = post_json(
        &app,
        "/v1/campaigns",
        json!({
            "org_id": org_id,
            "name": "Backwards",
            "description": "",
            "subject": "s",
            "body": "b",
            "start_date": "2025-03-05",
            "start_time": "09:00",
            "end_date": "2025-03-01",
            "end_time": "09:00",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn test_failed_schedule_leaves_campaign_draft() {
    let (app, _clock, state) = test_app();

    // Organization with no recipients: scheduling fails outright.
    let (status, org) =
        post_json(&app, "/v1/organizations", json!({"name": "Empty", "timezone": "UTC"})).await;
    assert_eq!(status, StatusCode::CREATED);
    let org_id = org["id"].as_str().unwrap().to_string();

    let campaign_id =
        create_campaign(&app, &org_id, ("2025-03-01", "09:00"), ("2025-03-05", "23:00")).await;
    let (status, _) =
        post_json(&app, &format!("/v1/campaigns/{campaign_id}/schedule"), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A schedule call that accepted nothing must not flip the status.
    let stored = state.directory.get_campaign(campaign_id.parse().unwrap()).unwrap();
    assert_eq!(stored.status, CampaignStatus::Draft);
}

#[tokio::test]
async fn test_autofill_without_opens_is_no_data() {
    let (app, _clock, _state) = test_app();
    let org_id = seed_org(&app).await;

    let (status, _, body) =
        get(&app, &format!("/v1/organizations/{org_id}/autofill-start-time")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "no_data");
}

#[tokio::test]
async fn test_schedule_missing_campaign_is_404() {
    let (app, _clock, _state) = test_app();
    let (status, body) = post_json(
        &app,
        &format!("/v1/campaigns/{}/schedule", uuid::Uuid::new_v4()),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}
