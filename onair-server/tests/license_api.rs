mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::{build_test_app, seed_premium_job, t0};
use onair_core::database::repository_ports::JobRepository;
use serde_json::{Value, json};

async fn issue(app: &common::TestApp, body: Value) -> Value {
    let response = app.server.post("/api/v1/license/issue").json(&body).await;
    response.assert_status_ok();
    response.json::<Value>()
}

#[tokio::test]
async fn issue_then_activate_binds_the_member_tier() {
    let app = build_test_app();

    let issued = issue(
        &app,
        json!({"install_id": "host-1", "secret": "s3cr3t", "tier": "Premium"}),
    )
    .await;
    assert_eq!(issued["status"], "success");
    assert_eq!(issued["data"]["tier"], "Premium");
    assert!(issued["data"].get("secret_hash").is_none());

    let response = app
        .server
        .post("/api/v1/license/activate")
        .json(&json!({"install_id": "host-1", "secret": "s3cr3t"}))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    let state = &body["data"];

    assert_eq!(state["activated_tier"], "Premium");
    assert_eq!(state["grace_started_at"], Value::Null);
    let lease: chrono::DateTime<chrono::Utc> =
        serde_json::from_value(state["lease_expires_at"].clone()).unwrap();
    assert_eq!(lease, t0() + Duration::hours(1));
}

#[tokio::test]
async fn activation_rejections_are_forbidden() {
    let app = build_test_app();
    issue(
        &app,
        json!({"install_id": "host-1", "secret": "s3cr3t", "tier": "Premium"}),
    )
    .await;

    let wrong_secret = app
        .server
        .post("/api/v1/license/activate")
        .json(&json!({"install_id": "host-1", "secret": "guess"}))
        .await;
    wrong_secret.assert_status(StatusCode::FORBIDDEN);
    let body = wrong_secret.json::<Value>();
    assert_eq!(body["error"]["status"], 403);

    let unknown = app
        .server
        .post("/api/v1/license/activate")
        .json(&json!({"install_id": "host-2", "secret": "s3cr3t"}))
        .await;
    unknown.assert_status(StatusCode::FORBIDDEN);

    app.server
        .post("/api/v1/license/revoke")
        .json(&json!({"install_id": "host-1"}))
        .await
        .assert_status_ok();
    let revoked = app
        .server
        .post("/api/v1/license/activate")
        .json(&json!({"install_id": "host-1", "secret": "s3cr3t"}))
        .await;
    revoked.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn state_is_not_found_before_activation() {
    let app = build_test_app();

    app.server
        .get("/api/v1/license/state")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.server
        .post("/api/v1/license/renew")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missed_check_ins_downgrade_on_state_read() {
    let app = build_test_app();
    let job = seed_premium_job(&app.store, t0()).await;
    issue(
        &app,
        json!({"install_id": "host-1", "secret": "s3cr3t", "tier": "Premium"}),
    )
    .await;
    app.server
        .post("/api/v1/license/activate")
        .json(&json!({"install_id": "host-1", "secret": "s3cr3t"}))
        .await
        .assert_status_ok();

    app.clock.advance(Duration::hours(7));
    let response = app.server.get("/api/v1/license/state").await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["activated_tier"], "Basic");

    let stored = app.store.get_job(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status.as_str(), "invalid");

    let backups = app
        .server
        .get("/api/v1/jobs/backups")
        .add_query_param("job_id", job.id.to_string())
        .await
        .json::<Value>();
    assert_eq!(backups["data"].as_array().unwrap().len(), 1);
    assert_eq!(backups["data"][0]["previous_tier"], "Premium");

    let activity = app
        .server
        .get("/api/v1/license/activity")
        .add_query_param("limit", 1)
        .await
        .json::<Value>();
    assert_eq!(activity["data"].as_array().unwrap().len(), 1);
    assert_eq!(activity["data"][0]["action"], "downgraded");
}

#[tokio::test]
async fn expired_member_is_forced_to_basic_on_renew() {
    let app = build_test_app();
    let job = seed_premium_job(&app.store, t0()).await;
    issue(
        &app,
        json!({
            "install_id": "host-1",
            "secret": "s3cr3t",
            "tier": "Ultimate",
            "expires_at": t0() + Duration::minutes(20),
        }),
    )
    .await;
    app.server
        .post("/api/v1/license/activate")
        .json(&json!({"install_id": "host-1", "secret": "s3cr3t"}))
        .await
        .assert_status_ok();

    app.clock.advance(Duration::minutes(20));
    let body = app
        .server
        .post("/api/v1/license/renew")
        .await
        .json::<Value>();
    assert_eq!(body["data"]["activated_tier"], "Basic");

    let restored = app
        .server
        .post(&format!("/api/v1/jobs/{}/restore", job.id))
        .await;
    restored.assert_status_ok();
    let restored = restored.json::<Value>();
    assert_eq!(restored["data"]["tier_required"], "Premium");
    assert_eq!(restored["data"]["status"], "draft");
}

#[tokio::test]
async fn metrics_count_active_members_per_tier() {
    let app = build_test_app();
    for (install_id, tier) in [("a", "Premium"), ("b", "Premium"), ("c", "Ultimate")] {
        issue(
            &app,
            json!({"install_id": install_id, "secret": "x", "tier": tier}),
        )
        .await;
    }
    app.server
        .post("/api/v1/license/revoke")
        .json(&json!({"install_id": "c"}))
        .await
        .assert_status_ok();

    let body = app.server.get("/api/v1/license/metrics").await.json::<Value>();
    assert_eq!(body["data"], json!({"Basic": 0, "Premium": 2, "Ultimate": 0}));
}

#[tokio::test]
async fn revoking_an_unknown_install_is_rejected() {
    let app = build_test_app();
    app.server
        .post("/api/v1/license/revoke")
        .json(&json!({"install_id": "ghost"}))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}
