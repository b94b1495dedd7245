mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use serde_json::Value;
use tower::ServiceExt;

use crate::common::{
    add_contribution, create_portfolio, fund_by_external_id, record, setup_test_db,
    sync_service, test_app_state, test_options, StaticDataset, ADMIN_TOKEN,
};

async fn build_test_router() -> (Router, sea_orm::DatabaseConnection) {
    let db = setup_test_db().await.expect("Failed to set up test DB");
    let dataset = StaticDataset::new(vec![
        record("101", 202412, "9.5", "1400.5"),
        record("101", 202508, "10.5", "1500.5"),
        record("202", 202508, "20.5", "800.25"),
    ]);

    sync_service(&db, dataset.clone(), test_options())
        .sync(None)
        .await
        .expect("Seed sync failed");

    let state = test_app_state(db.clone(), dataset);
    (gemelnet_backend::router(state), db)
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Decimals serialize as strings
fn number(value: &Value) -> f64 {
    match value {
        Value::String(s) => s.parse().unwrap(),
        other => other.as_f64().unwrap(),
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn admin_post(uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("x-admin-token", token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_list_funds_filters_by_category() {
    let (app, _db) = build_test_router().await;

    let response = app.clone().oneshot(get("/api/funds?category=stocks")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total"], 2);
    assert_eq!(json["page"], 1);
    assert_eq!(json["pageCount"], 1);
    assert_eq!(json["funds"][0]["category"], "stocks");
    assert!(json["funds"][0]["companyName"].is_string());

    let response = app.clone().oneshot(get("/api/funds?category=bonds")).await.unwrap();
    assert_eq!(body_json(response).await["total"], 0);

    let response = app.oneshot(get("/api/funds?category=crypto")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_funds_search_and_page() {
    let (app, _db) = build_test_router().await;

    let response = app.clone().oneshot(get("/api/funds?search=202")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["funds"][0]["externalId"], "202");

    let response = app.clone().oneshot(get("/api/funds?page=2")).await.unwrap();
    let json = body_json(response).await;
    assert_eq!(json["total"], 2);
    assert_eq!(json["funds"].as_array().unwrap().len(), 0);

    let response = app.oneshot(get("/api/funds?page=0")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_fund_detail() {
    let (app, db) = build_test_router().await;
    let fund = fund_by_external_id(&db, "101").await;

    let response = app
        .oneshot(get(&format!("/api/funds/{}", fund.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["externalId"], "101");
    assert_eq!(json["latestReportPeriod"], 202508);
    assert_eq!(json["snapshots"][0]["reportPeriod"], 202508);
    assert_eq!(json["snapshots"][1]["reportPeriod"], 202412);
    assert_eq!(json["chart"][0]["label"], "12/2024");
    assert_eq!(json["periodTabs"][0]["label"], "2024-2025");
}

#[tokio::test]
async fn test_get_fund_not_found() {
    let (app, _db) = build_test_router().await;

    let response = app.oneshot(get("/api/funds/9999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_fund_snapshots_range() {
    let (app, db) = build_test_router().await;
    let fund = fund_by_external_id(&db, "101").await;

    let response = app
        .clone()
        .oneshot(get(&format!("/api/funds/{}/snapshots?start=202501", fund.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let snapshots = json["snapshots"].as_array().unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0]["label"], "08/2025");

    let response = app
        .oneshot(get(&format!("/api/funds/{}/snapshots?start=202513", fund.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_portfolio_metrics() {
    let (app, db) = build_test_router().await;
    let fund_a = fund_by_external_id(&db, "101").await;
    let fund_b = fund_by_external_id(&db, "202").await;
    let today = Utc::now().date_naive();

    let (portfolio, holdings) = create_portfolio(
        &db,
        &[
            (fund_a.id, dec!(1000), Some(today - Duration::days(365))),
            (fund_b.id, dec!(3000), None),
        ],
    )
    .await;
    add_contribution(&db, holdings[0].id, dec!(100), "MONTHLY", today - Duration::days(65)).await;

    let response = app
        .oneshot(get(&format!("/api/portfolios/{}/metrics?months=12", portfolio.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    // (1000 × 10.5 + 3000 × 20.5) / 4000
    assert_eq!(number(&json["weightedReturn"]), 18.0);
    assert_eq!(number(&json["totalValue"]), 4000.0);

    let by_fund = |fund_id: i32| {
        json["holdings"]
            .as_array()
            .unwrap()
            .iter()
            .find(|h| h["fundId"] == fund_id)
            .unwrap()
            .clone()
    };

    let first = by_fund(fund_a.id);
    assert_eq!(first["profitLoss"]["status"], "estimate");
    assert_eq!(first["profitLoss"]["daysHeld"], 365);
    assert_eq!(number(&first["contributions"][0]["contributedToDate"]), 200.0);

    let second = by_fund(fund_b.id);
    assert_eq!(second["profitLoss"]["status"], "notApplicable");
}

#[tokio::test]
async fn test_portfolio_metrics_not_found() {
    let (app, _db) = build_test_router().await;

    let response = app.oneshot(get("/api/portfolios/42/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_sync_requires_token() {
    let (app, _db) = build_test_router().await;

    let response = app
        .clone()
        .oneshot(admin_post("/api/admin/gemelnet/sync", None, "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(admin_post("/api/admin/gemelnet/sync", Some("wrong"), "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_sync_runs_and_updates_status() {
    let (app, _db) = build_test_router().await;

    let response = app
        .clone()
        .oneshot(admin_post(
            "/api/admin/gemelnet/sync",
            Some(ADMIN_TOKEN),
            r#"{"keepHistory": true}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    // Everything was ingested by the seed sync
    assert_eq!(json["stats"]["fetched"], 3);
    assert_eq!(json["stats"]["snapshotsCreated"], 0);
    assert_eq!(json["stats"]["snapshotsSkipped"], 3);
    assert_eq!(json["dryRun"], false);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/gemelnet/sync-status")
                .header("x-admin-token", ADMIN_TOKEN)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["jobName"], "gemelnet_sync");
    assert_eq!(json["successCount"], 1);
    assert_eq!(json["running"], false);
    assert_eq!(json["lastStats"]["snapshotsSkipped"], 3);
}

#[tokio::test]
async fn test_admin_sync_rejects_zero_limit() {
    let (app, _db) = build_test_router().await;

    let response = app
        .oneshot(admin_post(
            "/api/admin/gemelnet/sync",
            Some(ADMIN_TOKEN),
            r#"{"limit": 0}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
