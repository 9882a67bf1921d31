//! Integration tests for the device webhook.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use common::{error_message, test_config, TestApp};
use domain::models::{AlarmType, NewAlarmEvent};
use domain::repositories::AlarmEventRepository;
use domain::testing::ScriptedSink;
use serde_json::json;
use smokewatch_api::config::UnknownDevicePolicyKind;

const WEBHOOK: &str = "/webhook/device-event";

#[tokio::test]
async fn test_demo_account_adopts_device_and_records_alarm() {
    let app = TestApp::new();
    app.store.add_account("DEMO01").await;
    app.store.add_push_token("phone-1", "DEMO01").await;
    app.store.add_push_token("tablet-1", "DEMO01").await;

    let (status, body) = app
        .post_json(
            WEBHOOK,
            json!({
                "deviceId": "shellyplussmoke-a8032ab1",
                "smoke": true,
                "temperature": 41.5,
                "battery": 80
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["deviceId"], "shellyplussmoke-a8032ab1");
    assert_eq!(body["alarmRecorded"], true);
    assert_eq!(body["notifications"]["attempted"], 2);
    assert_eq!(body["notifications"]["succeeded"], 2);
    assert_eq!(body["notifications"]["failed"], 0);
    assert!(body.get("warning").is_none());

    let device = app.store.device("shellyplussmoke-a8032ab1").await.unwrap();
    assert_eq!(device.user_code, "DEMO01");

    let stored = app.store.status("shellyplussmoke-a8032ab1").await.unwrap();
    assert!(stored.smoke);
    assert_eq!(stored.temperature, Some(41.5));
    assert_eq!(stored.battery, Some(80));

    let alarms = app.store.alarms().await;
    assert_eq!(alarms.len(), 1);
    assert_eq!(alarms[0].alarm_type, AlarmType::Smoke);
    assert!(!alarms[0].acknowledged);

    let sent = app.sink.sent().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].1.title, "Smoke alarm");
}

#[tokio::test]
async fn test_status_without_smoke_records_no_alarm() {
    let app = TestApp::new();
    app.store.add_account("DEMO01").await;
    app.store.add_push_token("phone-1", "DEMO01").await;

    let payload = json!({"deviceId": "dev-1", "smoke": false, "battery": 90});
    let (status, body) = app.post_json(WEBHOOK, payload.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alarmRecorded"], false);
    assert!(body.get("notifications").is_none());

    // Same payload twice leaves the same snapshot.
    let first = app.store.status("dev-1").await.unwrap();
    app.post_json(WEBHOOK, payload).await;
    let second = app.store.status("dev-1").await.unwrap();
    assert_eq!(first.smoke, second.smoke);
    assert_eq!(first.battery, second.battery);
    assert_eq!(first.raw_data, second.raw_data);
    assert_eq!(app.store.status_count().await, 1);

    assert!(app.store.alarms().await.is_empty());
    assert!(app.sink.sent().await.is_empty());
}

#[tokio::test]
async fn test_missing_device_id_is_bad_request() {
    let app = TestApp::new();
    app.store.add_account("DEMO01").await;

    let (status, body) = app.post_json(WEBHOOK, json!({"smoke": true})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Device ID is required");

    let (status, body) = app.post_json(WEBHOOK, json!({"deviceId": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Device ID is required");

    assert_eq!(app.store.device_count().await, 0);
    assert_eq!(app.store.status_count().await, 0);
}

#[tokio::test]
async fn test_invalid_json_is_bad_request() {
    let app = TestApp::new();
    let (status, body) = app.post_raw(WEBHOOK, "smoke=1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).contains("Invalid JSON"));
}

#[tokio::test]
async fn test_body_without_content_type_is_accepted() {
    let app = TestApp::new();
    app.store.add_account("DEMO01").await;

    let (status, body) = app
        .post_raw(WEBHOOK, r#"{"deviceId":"dev-raw","smoke":false}"#)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(app.store.status("dev-raw").await.is_some());
}

#[tokio::test]
async fn test_zero_accounts_is_configuration_error() {
    let app = TestApp::new();

    let (status, body) = app
        .post_json(WEBHOOK, json!({"deviceId": "dev-1", "smoke": true}))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        error_message(&body),
        "Device not registered and no users available"
    );
    assert_eq!(body["code"], "configuration_error");
    assert_eq!(app.store.device_count().await, 0);
    assert_eq!(app.store.status_count().await, 0);
    assert!(app.store.alarms().await.is_empty());
}

#[tokio::test]
async fn test_reject_policy_returns_not_found() {
    let mut config = test_config();
    config.ingestion.unknown_device_policy = UnknownDevicePolicyKind::Reject;
    let app = TestApp::with_config(config);
    app.store.add_account("DEMO01").await;
    app.store.add_device("known-1", "DEMO01", "Kitchen", None).await;

    let (status, body) = app
        .post_json(WEBHOOK, json!({"deviceId": "stranger-1"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_message(&body), "Device not registered");
    assert!(app.store.device("stranger-1").await.is_none());

    let (status, _) = app.post_json(WEBHOOK, json!({"deviceId": "known-1"})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_default_account_policy() {
    let mut config = test_config();
    config.ingestion.unknown_device_policy = UnknownDevicePolicyKind::DefaultAccount;
    config.ingestion.default_account = Some("HOME02".to_string());
    let app = TestApp::with_config(config);
    app.store.add_account("DEMO01").await;
    app.store.add_account("HOME02").await;

    let (status, _) = app.post_json(WEBHOOK, json!({"deviceId": "dev-9"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.device("dev-9").await.unwrap().user_code, "HOME02");
}

#[tokio::test]
async fn test_repeated_first_contact_binds_once() {
    let app = TestApp::new();
    app.store.add_account("DEMO01").await;
    app.store.add_account("LATER2").await;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let router = app.router.clone();
        handles.push(tokio::spawn(async move {
            use axum::body::Body;
            use axum::http::Request;
            use tower::ServiceExt;
            let request = Request::builder()
                .method("POST")
                .uri(WEBHOOK)
                .header("content-type", "application/json")
                .body(Body::from(r#"{"deviceId":"race-1"}"#))
                .unwrap();
            router.oneshot(request).await.unwrap().status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    assert_eq!(app.store.device_count().await, 1);
    assert_eq!(app.store.device("race-1").await.unwrap().user_code, "DEMO01");
}

#[tokio::test]
async fn test_partial_delivery_failure_still_succeeds() {
    let sink = ScriptedSink::new()
        .failing_token("broken")
        .invalid_token("stale");
    let app = TestApp::with_sink(sink);
    app.store.add_account("DEMO01").await;
    app.store.add_push_token("good", "DEMO01").await;
    app.store.add_push_token("broken", "DEMO01").await;
    app.store.add_push_token("stale", "DEMO01").await;

    let (status, body) = app
        .post_json(WEBHOOK, json!({"deviceId": "dev-1", "smoke": true}))
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["alarmRecorded"], true);
    assert_eq!(body["notifications"]["attempted"], 3);
    assert_eq!(body["notifications"]["succeeded"], 1);
    assert_eq!(body["notifications"]["failed"], 2);

    let remaining: Vec<String> = app
        .store
        .push_tokens()
        .await
        .into_iter()
        .map(|t| t.token)
        .collect();
    assert!(!remaining.contains(&"stale".to_string()));
    assert!(remaining.contains(&"broken".to_string()));
}

#[tokio::test]
async fn test_total_delivery_failure_still_succeeds() {
    let sink = ScriptedSink::new()
        .failing_token("a")
        .slow_token("b", Duration::from_secs(5));
    let app = TestApp::with_sink(sink);
    app.store.add_account("DEMO01").await;
    app.store.add_push_token("a", "DEMO01").await;
    app.store.add_push_token("b", "DEMO01").await;

    let (status, body) = app
        .post_json(WEBHOOK, json!({"deviceId": "dev-1", "smoke": true}))
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["notifications"]["attempted"], 2);
    assert_eq!(body["notifications"]["succeeded"], 0);
    assert_eq!(body["notifications"]["failed"], 2);
    assert_eq!(app.store.alarms().await.len(), 1);
}

#[tokio::test]
async fn test_unconfigured_provider_fails_after_writes() {
    let app = TestApp::with_sink(ScriptedSink::new().unconfigured());
    app.store.add_account("DEMO01").await;
    app.store.add_push_token("phone-1", "DEMO01").await;

    let (status, body) = app
        .post_json(WEBHOOK, json!({"deviceId": "dev-1", "smoke": true}))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "configuration_error");
    assert!(error_message(&body).contains("not configured"));

    // Earlier stages are not rolled back.
    assert!(app.store.status("dev-1").await.unwrap().smoke);
    assert_eq!(app.store.alarms().await.len(), 1);
}

#[tokio::test]
async fn test_unconfigured_provider_ignored_without_alarm() {
    let app = TestApp::with_sink(ScriptedSink::new().unconfigured());
    app.store.add_account("DEMO01").await;

    let (status, _) = app
        .post_json(WEBHOOK, json!({"deviceId": "dev-1", "smoke": false}))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_alarm_write_failure_is_partial_success() {
    let app = TestApp::new();
    app.store.add_account("DEMO01").await;
    app.store.add_push_token("phone-1", "DEMO01").await;
    app.store.fail_alarm_writes(true).await;

    let (status, body) = app
        .post_json(WEBHOOK, json!({"deviceId": "dev-1", "smoke": true}))
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["alarmRecorded"], false);
    assert_eq!(body["warning"], "Status saved but alarm could not be recorded");
    assert!(app.store.status("dev-1").await.unwrap().smoke);
    assert!(app.sink.sent().await.is_empty());
}

#[tokio::test]
async fn test_status_write_failure_hides_details() {
    let app = TestApp::new();
    app.store.add_account("DEMO01").await;
    app.store.fail_status_writes(true).await;

    let (status, body) = app
        .post_json(WEBHOOK, json!({"deviceId": "dev-1", "smoke": true}))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_message(&body), "Internal server error");
    assert!(app.store.alarms().await.is_empty());
}

#[tokio::test]
async fn test_cooldown_suppresses_repeat_alarm() {
    let mut config = test_config();
    config.ingestion.alarm_cooldown_secs = 300;
    let app = TestApp::with_config(config);
    app.store.add_account("DEMO01").await;
    app.store.add_push_token("phone-1", "DEMO01").await;

    let (_, first) = app
        .post_json(
            WEBHOOK,
            json!({"deviceId": "dev-1", "smoke": true, "timestamp": 1709294400}),
        )
        .await;
    assert_eq!(first["alarmRecorded"], true);

    // Device clock claims an hour has passed; the server clock has not.
    let (status, second) = app
        .post_json(
            WEBHOOK,
            json!({"deviceId": "dev-1", "smoke": true, "timestamp": 1709298000}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["alarmRecorded"], false);
    assert_eq!(second["warning"], "Alarm suppressed by cooldown");

    // Other devices are unaffected.
    let (_, other) = app
        .post_json(WEBHOOK, json!({"deviceId": "dev-2", "smoke": true}))
        .await;
    assert_eq!(other["alarmRecorded"], true);

    assert_eq!(app.store.alarms().await.len(), 2);
    assert_eq!(app.sink.sent().await.len(), 2);
}

#[tokio::test]
async fn test_future_device_timestamp_does_not_extend_cooldown() {
    let mut config = test_config();
    config.ingestion.alarm_cooldown_secs = 300;
    let app = TestApp::with_config(config);
    app.store.add_account("DEMO01").await;
    app.store.add_device("dev-1", "DEMO01", "Kitchen", None).await;
    app.store.add_push_token("phone-1", "DEMO01").await;

    // An alarm received an hour ago from a device whose clock ran years ahead.
    let received_at = Utc::now() - ChronoDuration::hours(1);
    let skewed = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    app.store
        .insert(NewAlarmEvent {
            smoke: true,
            alarm_type: AlarmType::Smoke,
            occurred_at: skewed,
            received_at,
            ..NewAlarmEvent::test("dev-1", "DEMO01", Some("Kitchen".to_string()), received_at)
        })
        .await
        .unwrap();

    let (status, body) = app
        .post_json(WEBHOOK, json!({"deviceId": "dev-1", "smoke": true}))
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["alarmRecorded"], true);
    assert!(body.get("warning").is_none());
    assert_eq!(app.store.alarms().await.len(), 2);
    assert_eq!(app.sink.sent().await.len(), 1);
}

#[tokio::test]
async fn test_invalid_device_id_is_bad_request() {
    let app = TestApp::new();
    app.store.add_account("DEMO01").await;

    let long_id = "x".repeat(200);
    let (status, body) = app
        .post_json(WEBHOOK, json!({"deviceId": long_id, "smoke": true}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(body["code"], "bad_request");
    assert_eq!(
        error_message(&body),
        "Device ID must be at most 128 characters"
    );

    let (status, body) = app
        .post_json(WEBHOOK, json!({"deviceId": "dev 1", "smoke": true}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(error_message(&body), "Device ID must not contain whitespace");

    assert_eq!(app.store.device_count().await, 0);
    assert_eq!(app.store.status_count().await, 0);
    assert!(app.store.alarms().await.is_empty());
}

#[tokio::test]
async fn test_token_read_failure_keeps_alarm() {
    let app = TestApp::new();
    app.store.add_account("DEMO01").await;
    app.store.add_push_token("phone-1", "DEMO01").await;
    app.store.fail_token_reads(true).await;

    let (status, body) = app
        .post_json(WEBHOOK, json!({"deviceId": "dev-1", "smoke": true}))
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["alarmRecorded"], true);
    assert_eq!(
        body["notifications"],
        json!({"attempted": 0, "succeeded": 0, "failed": 0})
    );
    assert_eq!(
        body["warning"],
        "Alarm recorded but notifications could not be sent"
    );
    assert_eq!(app.store.alarms().await.len(), 1);
    assert!(app.sink.sent().await.is_empty());
}

#[tokio::test]
async fn test_shelly_gen2_notification_shape() {
    let app = TestApp::new();
    app.store.add_account("DEMO01").await;

    let (status, body) = app
        .post_json(
            WEBHOOK,
            json!({
                "src": "shellyplussmoke-a8032ab1",
                "method": "NotifyStatus",
                "params": {
                    "ts": 1709294400.25,
                    "smoke:0": {"id": 0, "alarm": true, "mute": false},
                    "devicepower:0": {"battery": {"V": 2.9, "percent": 15}},
                    "wifi": {"rssi": -67}
                }
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["deviceId"], "shellyplussmoke-a8032ab1");
    assert_eq!(body["alarmRecorded"], true);

    let stored = app.store.status("shellyplussmoke-a8032ab1").await.unwrap();
    assert!(stored.smoke);
    assert_eq!(stored.battery, Some(15));
    assert!(!stored.battery_ok);
    assert_eq!(stored.signal, Some(67));
}

#[tokio::test]
async fn test_response_carries_request_id() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let app = TestApp::new();
    app.store.add_account("DEMO01").await;
    let request = Request::builder()
        .method("POST")
        .uri(WEBHOOK)
        .header("content-type", "application/json")
        .header("x-request-id", "shelly-req-42")
        .body(Body::from(r#"{"deviceId":"dev-1"}"#))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "shelly-req-42");
}
