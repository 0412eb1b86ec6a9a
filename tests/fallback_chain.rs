//! Fallback Chain Integration Tests
//!
//! Runs the real provider adapters against local stub servers and checks that
//! the API manager walks the configured chain:
//! 1. Sell-only providers are skipped for buy orders
//! 2. Rejections fall through to the next provider
//! 3. Status, cancel and health route to the named provider
//!
//! No external network access; every provider is an axum router on 127.0.0.1.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use oswbit::adapters::storage::MemoryOrderStore;
use oswbit::application::{
    AmountLimits, ExchangeRequest, LifecycleTracker, OrderIntake, PollSummary, StatusPoller,
};
use oswbit::config::{build_api_manager, find_pspware, Config};
use oswbit::domain::{OperatorRoster, OrderStatus};
use oswbit::ports::mocks::RecordingNotifier;
use oswbit::ports::{OrderSide, OrderStore, ProviderError, ProviderErrorKind};

// ============================================================================
// Test Fixtures
// ============================================================================

/// Requests a stub server received: (path, api key header, body)
#[derive(Clone, Default)]
struct Recorded(Arc<Mutex<Vec<(String, Option<String>, Value)>>>);

impl Recorded {
    fn push(&self, path: &str, headers: &HeaderMap, key_header: &str, body: Value) {
        let key = headers
            .get(key_header)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.0.lock().unwrap().push((path.to_string(), key, body));
    }

    fn all(&self) -> Vec<(String, Option<String>, Value)> {
        self.0.lock().unwrap().clone()
    }
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Greengo stub that has no requisites for anybody
async fn greengo_without_requisites(recorded: Recorded) -> String {
    let app = Router::new()
        .route(
            "/order/create",
            post(|State(rec): State<Recorded>, headers: HeaderMap, Json(body): Json<Value>| async move {
                rec.push("/order/create", &headers, "Api-Secret", body);
                Json(json!({"success": false, "error": "no requisites available"}))
            }),
        )
        .route(
            "/directions",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"message": "maintenance"}))) }),
        )
        .with_state(recorded);
    serve(app).await
}

/// PSPWare stub that accepts every order and reports it paid
async fn pspware_accepting(recorded: Recorded) -> String {
    let app = Router::new()
        .route(
            "/orders",
            post(|State(rec): State<Recorded>, headers: HeaderMap, Json(body): Json<Value>| async move {
                rec.push("/orders", &headers, "X-API-KEY", body);
                Json(json!({
                    "id": 77,
                    "status": "success",
                    "card": "2200 7000 0000 0077",
                    "recipient": "Petr P.",
                    "bankName": "Tinkoff"
                }))
            }),
        )
        .route(
            "/orders/:id",
            get(|Path(id): Path<String>| async move {
                Json(json!({"id": id, "status": "paid"}))
            }),
        )
        .route(
            "/orders/:id/cancel",
            post(|Path(id): Path<String>| async move {
                (
                    StatusCode::CONFLICT,
                    Json(json!({"id": id, "detail": "order already paid"})),
                )
            }),
        )
        .route("/health", get(|| async { Json(json!({"status": "ok"})) }))
        .with_state(recorded);
    serve(app).await
}

/// PSPWare stub whose order lookup echoes the creation acknowledgement
async fn pspware_unpaid() -> String {
    let order = || json!({"id": 77, "status": "success", "card": "2200 7000 0000 0077"});
    let app = Router::new()
        .route("/orders", post(move || async move { Json(order()) }))
        .route("/orders/:id", get(move || async move { Json(order()) }));
    serve(app).await
}

/// PSPWare stub that pays out up to 10 000 RUB
async fn pspware_withdrawals(recorded: Recorded) -> String {
    let app = Router::new()
        .route(
            "/withdrawal",
            post(|State(rec): State<Recorded>, headers: HeaderMap, Json(body): Json<Value>| async move {
                rec.push("/withdrawal", &headers, "X-API-KEY", body.clone());
                if body["sum"].as_f64().unwrap_or_default() > 10_000.0 {
                    return (StatusCode::BAD_REQUEST, Json(json!({"message": "Insufficient balance"})));
                }
                if body["address"] == "blocked" {
                    return (StatusCode::FORBIDDEN, Json(json!({})));
                }
                (
                    StatusCode::OK,
                    Json(json!({
                        "id": "w-1",
                        "address": body["address"],
                        "sum": body["sum"],
                        "status": "pending",
                        "merchantId": "m-1",
                        "createdAt": "2026-10-19T10:00:00Z",
                        "updatedAt": "2026-10-19T10:00:00Z"
                    })),
                )
            }),
        )
        .with_state(recorded);
    serve(app).await
}

/// NicePay stub that accepts every order under a fixed id
async fn nicepay_accepting(recorded: Recorded) -> String {
    let app = Router::new()
        .route(
            "/payment/request",
            post(|State(rec): State<Recorded>, headers: HeaderMap, Json(body): Json<Value>| async move {
                rec.push("/payment/request", &headers, "Accept", body);
                Json(json!({
                    "resultCode": "0000",
                    "data": {"merchantOrderId": "X", "paymentUrl": "https://pay.local/X"}
                }))
            }),
        )
        .with_state(recorded);
    serve(app).await
}

fn config(providers: &str) -> Config {
    let content = format!(
        r#"
[operators]
admin_id = 1
operator_chat_id = -100

[http]
timeout_secs = 5

{providers}
"#
    );
    let config: Config = toml::from_str(&content).unwrap();
    config.validate().unwrap();
    config
}

// ============================================================================
// Fallback
// ============================================================================

#[tokio::test]
async fn test_sell_only_skipped_failure_falls_through_to_third() {
    let psp_calls = Recorded::default();
    let greengo_calls = Recorded::default();
    let nicepay_calls = Recorded::default();

    let psp_url = pspware_accepting(psp_calls.clone()).await;
    let greengo_url = greengo_without_requisites(greengo_calls.clone()).await;
    let nicepay_url = nicepay_accepting(nicepay_calls.clone()).await;

    let config = config(&format!(
        r#"
[[providers]]
name = "A"
kind = "pspware"
base_url = "{psp_url}"
sell_capable = true
buy_capable = false
api_key = "psp-key"
merchant_id = "m-1"

[[providers]]
name = "B"
kind = "greengo"
base_url = "{greengo_url}"
api_secret = "gg-secret"

[[providers]]
name = "C"
kind = "nicepay"
base_url = "{nicepay_url}"
merchant_key = "mk"
merchant_token_key = "tk"
"#
    ));
    let manager = build_api_manager(&config).unwrap();

    let resp = manager.create_order(5000, "sbp", "2610190001", false).await;

    assert!(resp.success);
    assert_eq!(resp.provider_name.as_deref(), Some("C"));
    let data = resp.data.unwrap();
    assert_eq!(data.id, "X");
    assert_eq!(data.payment_url.as_deref(), Some("https://pay.local/X"));

    // A never called, B tried once, C tried once
    assert!(psp_calls.all().is_empty());

    let greengo = greengo_calls.all();
    assert_eq!(greengo.len(), 1);
    assert_eq!(greengo[0].1.as_deref(), Some("gg-secret"));
    assert_eq!(greengo[0].2["from_amount"], "5000");
    assert_eq!(greengo[0].2["payment_method"], "sbp");

    let nicepay = nicepay_calls.all();
    assert_eq!(nicepay.len(), 1);
    assert_eq!(nicepay[0].2["merchantOrderId"], "2610190001");
    assert_eq!(nicepay[0].2["amount"], 5000);
    assert_eq!(
        nicepay[0].2["merchantToken"],
        oswbit::adapters::nicepay::merchant_token("mk", "2610190001", Some(5000), "tk")
    );
}

#[tokio::test]
async fn test_mapping_and_requisites_from_pspware() {
    let greengo_calls = Recorded::default();
    let psp_calls = Recorded::default();
    let greengo_url = greengo_without_requisites(greengo_calls.clone()).await;
    let psp_url = pspware_accepting(psp_calls.clone()).await;

    let config = config(&format!(
        r#"
[[providers]]
name = "Greengo"
kind = "greengo"
base_url = "{greengo_url}"
api_secret = "s"
pay_type_mapping = {{ card = "card_rub" }}

[[providers]]
name = "PSPWare"
kind = "pspware"
base_url = "{psp_url}"
sell_capable = true
api_key = "psp-key"
merchant_id = "m-1"
pay_type_mapping = {{ card = "c2c" }}
"#
    ));
    let manager = build_api_manager(&config).unwrap();

    let resp = manager.create_order(7500, "card", "2610190002", false).await;
    assert_eq!(resp.provider_name.as_deref(), Some("PSPWare"));

    let data = resp.data.unwrap();
    assert_eq!(data.id, "77");
    assert_eq!(data.requisite, "2200 7000 0000 0077");
    assert_eq!(data.owner, "Petr P.");
    assert_eq!(data.bank, "Tinkoff");

    assert_eq!(greengo_calls.all()[0].2["payment_method"], "card_rub");

    let psp = psp_calls.all();
    assert_eq!(psp[0].1.as_deref(), Some("psp-key"));
    assert_eq!(psp[0].2["order_type"], "PAY-IN");
    assert_eq!(psp[0].2["pay_types"], json!(["c2c"]));
    assert_eq!(psp[0].2["merchant_id"], "m-1");
    assert_eq!(psp[0].2["order_id"], "2610190002");
}

#[tokio::test]
async fn test_sell_order_goes_out_as_payout() {
    let greengo_calls = Recorded::default();
    let psp_calls = Recorded::default();
    let greengo_url = greengo_without_requisites(greengo_calls.clone()).await;
    let psp_url = pspware_accepting(psp_calls.clone()).await;

    let config = config(&format!(
        r#"
[[providers]]
name = "Greengo"
kind = "greengo"
base_url = "{greengo_url}"
api_secret = "s"

[[providers]]
name = "PSPWare"
kind = "pspware"
base_url = "{psp_url}"
sell_capable = true
api_key = "k"
merchant_id = "m-1"
"#
    ));
    let manager = build_api_manager(&config).unwrap();

    let resp = manager.create_order(20_000, "sbp", "2610190003", true).await;
    assert!(resp.success);
    assert!(greengo_calls.all().is_empty());

    let body = &psp_calls.all()[0].2;
    assert_eq!(body["order_type"], "PAY-OUT");
    assert_eq!(body["bank"], "any-bank");
    assert!(body.get("pay_types").is_none());
    assert!(body.get("geos").is_none());
}

#[tokio::test]
async fn test_everything_down_is_exhausted() {
    let greengo_url = greengo_without_requisites(Recorded::default()).await;

    let config = config(&format!(
        r#"
[[providers]]
name = "Greengo"
kind = "greengo"
base_url = "{greengo_url}"
api_secret = "s"

[[providers]]
name = "Unreachable"
kind = "greengo"
base_url = "http://127.0.0.1:9"
api_secret = "s"
"#
    ));
    let manager = build_api_manager(&config).unwrap();

    let resp = manager.create_order(5000, "sbp", "2610190004", false).await;
    assert!(!resp.success);
    assert_eq!(resp.error.as_deref(), Some("all providers failed"));
    assert!(resp.provider_name.is_none());
    assert_eq!(resp.error_kind, Some(ProviderErrorKind::Exhausted));
}

// ============================================================================
// Routing by provider name
// ============================================================================

#[tokio::test]
async fn test_status_cancel_and_health_route_by_name() {
    let greengo_url = greengo_without_requisites(Recorded::default()).await;
    let psp_url = pspware_accepting(Recorded::default()).await;

    let config = config(&format!(
        r#"
[[providers]]
name = "Greengo"
kind = "greengo"
base_url = "{greengo_url}"
api_secret = "s"

[[providers]]
name = "PSPWare"
kind = "pspware"
base_url = "{psp_url}"
api_key = "k"
merchant_id = "m-1"

[[providers]]
name = "NicePay"
kind = "nicepay"
merchant_key = "mk"
merchant_token_key = "tk"
"#
    ));
    let manager = build_api_manager(&config).unwrap();

    let status = manager.get_status("77", "PSPWare").await;
    assert!(status.success);
    assert_eq!(status.data.unwrap().status, "paid");

    let cancel = manager.cancel("77", "PSPWare").await;
    assert!(!cancel.success);
    assert_eq!(cancel.error.as_deref(), Some("order already paid"));
    assert_eq!(cancel.error_kind, Some(ProviderErrorKind::Rejected));

    let unknown = manager.get_status("77", "OnlyPays").await;
    assert_eq!(unknown.error.as_deref(), Some("OnlyPays not found"));

    let health = manager.health_check().await;
    assert_eq!(health.len(), 3);
    assert!(health["PSPWare"].success);
    assert!(!health["Greengo"].success);
    assert_eq!(health["NicePay"].error_kind, Some(ProviderErrorKind::Unsupported));
}

// ============================================================================
// Polling
// ============================================================================

#[tokio::test]
async fn test_unpaid_pspware_order_stays_pending_when_polled() {
    let psp_url = pspware_unpaid().await;
    let config = config(&format!(
        r#"
[[providers]]
name = "PSPWare"
kind = "pspware"
base_url = "{psp_url}"
api_key = "k"
merchant_id = "m-1"
"#
    ));
    let manager = Arc::new(build_api_manager(&config).unwrap());
    let store = Arc::new(MemoryOrderStore::new());
    let notifier = RecordingNotifier::new();

    let intake = OrderIntake::new(
        manager.clone(),
        store.clone(),
        Arc::new(notifier.clone()),
        AmountLimits::default(),
    );
    let order = intake
        .create_exchange_order(ExchangeRequest {
            user_id: 555,
            amount: 5000,
            payment_type: "sbp".to_string(),
            btc_address: "bc1qclient".to_string(),
            amount_btc: rust_decimal_macros::dec!(0.0005),
            side: OrderSide::Buy,
        })
        .await
        .unwrap();
    assert_eq!(order.provider_ref(), "77");

    let tracker = Arc::new(LifecycleTracker::new(
        store.clone(),
        Arc::new(notifier.clone()),
        OperatorRoster::new(1, -100, []),
    ));
    let poller = StatusPoller::new(manager, tracker);

    let summary = poller.tick().await.unwrap();
    assert_eq!(summary, PollSummary { checked: 1, ..Default::default() });
    assert_eq!(
        store.get(order.id).await.unwrap().unwrap().status,
        OrderStatus::Pending
    );
    assert!(notifier.sent().is_empty());
}

// ============================================================================
// Merchant
// ============================================================================

#[tokio::test]
async fn test_pspware_withdrawal() {
    let recorded = Recorded::default();
    let psp_url = pspware_withdrawals(recorded.clone()).await;
    let config = config(&format!(
        r#"
[[providers]]
name = "PSPWare"
kind = "pspware"
base_url = "{psp_url}"
api_key = "k"
merchant_id = "m-1"
"#
    ));
    let client = find_pspware(&config).unwrap();

    let withdrawal = client
        .withdrawal("TXYZaddress", rust_decimal_macros::dec!(2500.5))
        .await
        .unwrap();
    assert_eq!(withdrawal.id, Some(json!("w-1")));
    assert_eq!(withdrawal.address.as_deref(), Some("TXYZaddress"));
    assert_eq!(withdrawal.sum, Some(rust_decimal_macros::dec!(2500.5)));
    assert_eq!(withdrawal.status.as_deref(), Some("pending"));
    assert_eq!(withdrawal.merchant_id, Some(json!("m-1")));
    assert!(withdrawal.created_at.is_some());

    let requests = recorded.all();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "/withdrawal");
    assert_eq!(requests[0].1.as_deref(), Some("k"));
    assert_eq!(requests[0].2, json!({"address": "TXYZaddress", "sum": 2500.5}));

    match client.withdrawal("TXYZaddress", rust_decimal_macros::dec!(50000)).await {
        Err(ProviderError::Rejected { status, message }) => {
            assert_eq!(status, Some(400));
            assert_eq!(message, "Insufficient balance");
        }
        other => panic!("Expected rejection, got {:?}", other),
    }

    match client.withdrawal("blocked", rust_decimal_macros::dec!(10)).await {
        Err(ProviderError::Rejected { status, message }) => {
            assert_eq!(status, Some(403));
            assert_eq!(message, "Unknown error");
        }
        other => panic!("Expected rejection, got {:?}", other),
    }
}
