//! Integration tests for the table gate API.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use session_store::{Clock, ManualClock};
use std::sync::{Arc, Mutex};
use table_gate::{
    api::{create_router, AppState},
    Config, GateStores, Notifier, RegistrationWorkflow,
};
use tower::ServiceExt;

const SIG_T1: &str = "c8cc753f98275ec8ddf9f8291434b1680fc371358199a8f3ae9382621692e204";
const STAFF: &str = "919000000001";
const CUSTOMER: &str = "919876543210";

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    fn recipients(&self) -> Vec<String> {
        let mut phones: Vec<String> = self
            .sent
            .lock()
            .unwrap()
            .iter()
            .map(|(phone, _)| phone.clone())
            .collect();
        phones.sort();
        phones
    }

    fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, phone: &str, text: &str) -> bool {
        self.sent
            .lock()
            .unwrap()
            .push((phone.to_string(), text.to_string()));
        true
    }
}

struct TestApp {
    router: Router,
    clock: ManualClock,
    notifier: Arc<RecordingNotifier>,
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.venue.name = "Spice Route".into();
    config.venue.staff_phones = vec![STAFF.into()];
    config.token.secret = "k".into();
    config.token.public_base_url = Some("https://menu.example.com".into());
    config.storage.persist = false;
    config
}

/// Router over in-memory stores, clock at Monday 12:00 venue time.
fn create_test_app(config: Config) -> TestApp {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 4, 6, 30, 0).unwrap());
    let shared: Arc<dyn Clock> = Arc::new(clock.clone());
    let notifier = Arc::new(RecordingNotifier::default());

    let stores = GateStores::in_memory(&config, shared.clone());
    let workflow = RegistrationWorkflow::new(&config, stores, shared, notifier.clone()).unwrap();
    let router = create_router(AppState::new(workflow, config));

    TestApp {
        router,
        clock,
        notifier,
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };

    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn register_request(table: &str, phone: &str, signature: &str) -> Request<Body> {
    json_request(
        "POST",
        "/register",
        serde_json::json!({
            "tableNumber": table,
            "phoneNumber": phone,
            "signature": signature,
        }),
    )
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app(test_config());

    let (status, json) = send(&app, get("/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["venue"], "Spice Route");
    assert_eq!(json["tables"], 10);
    assert_eq!(json["hours"], "09:00 - 23:00");
    assert_eq!(json["isOpen"], true);
    assert_eq!(json["activeSessions"], 0);
}

#[tokio::test]
async fn test_qr_urls() {
    let app = create_test_app(test_config());

    let (status, json) = send(&app, get("/api/qr-urls")).await;

    assert_eq!(status, StatusCode::OK);
    let urls = json["urls"].as_array().unwrap();
    assert_eq!(urls.len(), 10);
    assert_eq!(urls[0]["table"], "T1");
    assert_eq!(
        urls[0]["url"],
        format!("https://menu.example.com/scan/T1?sig={}", SIG_T1)
    );
}

#[tokio::test]
async fn test_scan_valid_and_forged() {
    let app = create_test_app(test_config());

    let (status, json) = send(&app, get(&format!("/scan/T1?sig={}", SIG_T1))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["tableNumber"], "T1");

    let (status, json) = send(&app, get("/scan/T1?sig=deadbeef")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "INVALID_TOKEN");

    let (_, json) = send(&app, get("/scan/T1")).await;
    assert_eq!(json["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_eleven_scans_from_one_ip() {
    let app = create_test_app(test_config());
    let uri = format!("/scan/T1?sig={}", SIG_T1);
    let scan = || {
        Request::builder()
            .uri(&uri)
            .header("x-forwarded-for", "198.51.100.9")
            .body(Body::empty())
            .unwrap()
    };

    for _ in 0..10 {
        let (_, json) = send(&app, scan()).await;
        assert_eq!(json["success"], true);
    }

    let (status, json) = send(&app, scan()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["code"], "RATE_LIMITED");

    app.clock.advance(chrono::Duration::seconds(61));
    let (_, json) = send(&app, scan()).await;
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn test_register_approve_flow() {
    let app = create_test_app(test_config());

    let (status, json) = send(&app, register_request("T1", "9876543210", SIG_T1)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["action"], "PENDING");
    assert_eq!(app.notifier.recipients(), vec![STAFF, CUSTOMER]);

    let (_, json) = send(&app, register_request("T1", "9876543210", SIG_T1)).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["action"], "EXISTING");

    let (_, json) = send(&app, get(&format!("/api/session/validate/{}", CUSTOMER))).await;
    assert_eq!(json["valid"], false);
    assert_eq!(json["reason"], "PENDING_APPROVAL");

    app.notifier.clear();
    let (status, json) = send(&app, post(&format!("/api/admin/approve/{}", CUSTOMER))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Session approved for T1");
    assert_eq!(app.notifier.recipients(), vec![STAFF, CUSTOMER]);

    let (_, json) = send(&app, get(&format!("/api/session/validate/{}", CUSTOMER))).await;
    assert_eq!(json["valid"], true);
    assert_eq!(json["table"], "T1");
    assert_eq!(json["status"], "ORDERING");
    assert!(json["expiresAt"].is_i64());

    let (status, json) = send(&app, post(&format!("/api/admin/approve/{}", CUSTOMER))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "NOT_PENDING");
}

#[tokio::test]
async fn test_register_auto_approve() {
    let mut config = test_config();
    config.venue.auto_approve = true;
    let app = create_test_app(config);

    let (_, json) = send(&app, register_request("T1", "9876543210", SIG_T1)).await;
    assert_eq!(json["action"], "APPROVED");
    assert_eq!(app.notifier.recipients(), vec![CUSTOMER]);
}

#[tokio::test]
async fn test_register_declines_are_structured() {
    let app = create_test_app(test_config());

    let (status, json) = send(
        &app,
        json_request("POST", "/register", serde_json::json!({ "tableNumber": "T1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], "MISSING_FIELDS");
    assert_eq!(json["error"], "Missing information. Please try again.");

    let (_, json) = send(&app, register_request("T1", "12345", SIG_T1)).await;
    assert_eq!(json["code"], "INVALID_PHONE");

    let (_, json) = send(&app, register_request("T1", "9876543210", "00ff")).await;
    assert_eq!(json["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_register_when_closed() {
    let app = create_test_app(test_config());
    app.clock.advance(chrono::Duration::hours(12));

    let (_, json) = send(&app, register_request("T1", "9876543210", SIG_T1)).await;
    assert_eq!(json["code"], "CLOSED");
    assert_eq!(json["error"], "We are currently closed. Hours: 09:00 - 23:00");

    let (_, json) = send(&app, get(&format!("/api/session/validate/{}", CUSTOMER))).await;
    assert_eq!(json["reason"], "CLOSED");
}

#[tokio::test]
async fn test_block_revokes_session() {
    let mut config = test_config();
    config.venue.auto_approve = true;
    let app = create_test_app(config);

    send(&app, register_request("T1", "9876543210", SIG_T1)).await;

    let (status, _) = send(&app, post(&format!("/api/admin/block/{}", CUSTOMER))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(&app, get("/api/admin/blocked")).await;
    assert_eq!(json["blocked"], serde_json::json!([CUSTOMER]));

    let (_, json) = send(&app, get("/api/admin/sessions")).await;
    assert_eq!(json["count"], 0);

    let (_, json) = send(&app, register_request("T1", "9876543210", SIG_T1)).await;
    assert_eq!(json["code"], "BLOCKED");

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/admin/block/{}", CUSTOMER))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(&app, get("/api/admin/blocked")).await;
    assert_eq!(json["blocked"], serde_json::json!([]));
}

#[tokio::test]
async fn test_table_status_and_occupancy() {
    let app = create_test_app(test_config());

    send(&app, register_request("T1", "9876543210", SIG_T1)).await;

    let (_, json) = send(&app, register_request("T1", "9123456780", SIG_T1)).await;
    assert_eq!(json["code"], "TABLE_OCCUPIED");

    let (_, json) = send(&app, get("/api/admin/table-status")).await;
    let tables = json["tables"].as_array().unwrap();
    assert_eq!(tables.len(), 10);
    assert_eq!(tables[0]["table"], "T1");
    assert_eq!(tables[0]["status"], "PENDING_APPROVAL");
    assert_eq!(tables[0]["phone"], "9198xxxxx210");
    assert_eq!(tables[1]["status"], "FREE");
    assert!(tables[1]["phone"].is_null());
}

#[tokio::test]
async fn test_status_update_and_end_session() {
    let mut config = test_config();
    config.venue.auto_approve = true;
    let app = create_test_app(config);

    send(&app, register_request("T1", "9876543210", SIG_T1)).await;

    let uri = format!("/api/session/status/{}", CUSTOMER);
    let (_, json) = send(&app, json_request("PUT", &uri, serde_json::json!({ "status": "PAID" }))).await;
    assert_eq!(json["success"], true);

    let (status, json) =
        send(&app, json_request("PUT", &uri, serde_json::json!({ "status": "LOST" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_STATUS");

    // Paid sessions stay visible past expiry.
    app.clock.advance(chrono::Duration::hours(4));
    let (_, json) = send(&app, get("/api/admin/sessions")).await;
    assert_eq!(json["count"], 1);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/session/end/{}", CUSTOMER))
        .body(Body::empty())
        .unwrap();
    let (_, json) = send(&app, request).await;
    assert_eq!(json["success"], true);

    let (_, json) = send(&app, get("/api/admin/sessions")).await;
    assert_eq!(json["count"], 0);

    let (status, json) = send(&app, post(&format!("/api/admin/end-session/{}", "919111111111"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_reject_unknown_phone() {
    let app = create_test_app(test_config());

    let (status, json) = send(&app, post("/api/admin/reject/919111111111")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_public_config() {
    let app = create_test_app(test_config());

    let (status, json) = send(&app, get("/api/session/config")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["venueName"], "Spice Route");
    assert_eq!(json["staffPhones"], serde_json::json!([STAFF]));
    assert_eq!(json["totalTables"], 10);
    assert_eq!(json["openingTime"], "09:00");
    assert_eq!(json["autoApprove"], false);
}
