use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use common::model::{CommissionType, ExchangeType, Side, TradeOrder};
use fiscal_receipt::{
    EvotorClient, FiscalConfig, FiscalProfile, FiscalProvider, Operation, ReceiptError, ReceiptIssuer,
    ReceiptOverrides, ReceiptPayload, Registration, TaxRegime,
};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

type Captured = Arc<Mutex<Vec<(String, String, Value)>>>;

async fn get_token(Json(body): Json<Value>) -> Json<Value> {
    if body["login"] == "bad" {
        return Json(json!({ "error": { "code": 12, "text": "Invalid login" }, "token": null }));
    }
    assert_eq!(body["pass"], "secret");
    Json(json!({ "token": "tok-1", "error": null }))
}

async fn register(
    State(captured): State<Captured>,
    Path((group, operation)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    assert_eq!(headers.get("Token").and_then(|v| v.to_str().ok()), Some("tok-1"));
    match group.as_str() {
        "broken" => (StatusCode::BAD_REQUEST, Json(json!({ "error": { "text": "Invalid payload" } }))),
        "refusing" => (StatusCode::OK, Json(json!({ "status": "fail", "error": { "text": "Cashbox offline" } }))),
        _ => {
            captured.lock().unwrap().push((group, operation, body));
            (StatusCode::OK, Json(json!({ "uuid": "uuid-1", "status": "wait", "error": null })))
        }
    }
}

async fn spawn_provider() -> (String, Captured) {
    let captured: Captured = Arc::default();
    let app = Router::new()
        .route("/getToken", post(get_token))
        .route("/:group/:operation", post(register))
        .with_state(captured.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), captured)
}

fn order(side: Side) -> TradeOrder {
    TradeOrder {
        id: 5,
        user_id: 1,
        external_id: "ext-5".to_string(),
        exchange_type: ExchangeType::Bybit,
        side,
        price: dec!(5),
        quantity: dec!(10),
        cost: dec!(51),
        commission: dec!(0),
        commission_type: CommissionType::Percent,
        bank_detail_id: None,
        screenshot: None,
        receipt: None,
        created_at: Utc::now(),
    }
}

fn profile(login: &str, group_code: &str) -> FiscalProfile {
    FiscalProfile {
        login: login.to_string(),
        password: "secret".to_string(),
        group_code: group_code.to_string(),
        inn: "7700000000".to_string(),
        payment_address: "https://shop.example.com".to_string(),
        tax_regime: TaxRegime::Osn,
        email: Some("shop@example.com".to_string()),
    }
}

async fn issuer() -> (ReceiptIssuer, Captured) {
    let (base_url, captured) = spawn_provider().await;
    let client = EvotorClient::new(FiscalConfig::default().with_base_url(base_url)).unwrap();
    (ReceiptIssuer::new(Arc::new(client)), captured)
}

#[tokio::test]
async fn test_sell_order_is_registered_as_sell() {
    let (issuer, captured) = issuer().await;
    let overrides = ReceiptOverrides {
        contact: Some("89991234567".to_string()),
        ..Default::default()
    };

    let issued = issuer.issue(&order(Side::Sell), &profile("good", "group-1"), &overrides).await.unwrap();

    assert_eq!(issued.uuid.as_deref(), Some("uuid-1"));
    assert_eq!(issued.price, dec!(5.1));
    assert_eq!(issued.sum, dec!(51));

    let calls = captured.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (group, operation, body) = &calls[0];
    assert_eq!(group, "group-1");
    assert_eq!(operation, "sell");
    assert_eq!(body["receipt"]["client"]["phone"], "+79991234567");
    assert_eq!(body["receipt"]["company"]["email"], "shop@example.com");
}

#[tokio::test]
async fn test_buy_order_is_registered_as_buy() {
    let (issuer, captured) = issuer().await;

    issuer
        .issue(&order(Side::Buy), &profile("good", "group-1"), &ReceiptOverrides::default())
        .await
        .unwrap();

    assert_eq!(captured.lock().unwrap()[0].1, "buy");
}

#[tokio::test]
async fn test_token_error_field_fails_authentication() {
    let (issuer, captured) = issuer().await;

    let err = issuer
        .issue(&order(Side::Sell), &profile("bad", "group-1"), &ReceiptOverrides::default())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Auth error"));
    assert!(captured.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_http_error_carries_body() {
    let (issuer, _) = issuer().await;

    let err = issuer
        .issue(&order(Side::Sell), &profile("good", "broken"), &ReceiptOverrides::default())
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("HTTP 400"));
    assert!(message.contains("Invalid payload"));
}

#[tokio::test]
async fn test_in_band_failure() {
    let (issuer, _) = issuer().await;

    let err = issuer
        .issue(&order(Side::Sell), &profile("good", "refusing"), &ReceiptOverrides::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ReceiptError::Provider(_)));
    assert!(err.to_string().contains("Cashbox offline"));
}

struct UnreachableProvider;

#[async_trait]
impl FiscalProvider for UnreachableProvider {
    async fn get_token(&self, _login: &str, _password: &str) -> Result<String, ReceiptError> {
        Err(ReceiptError::Provider("Network error: connection refused".to_string()))
    }

    async fn register(
        &self,
        _token: &str,
        _group_code: &str,
        _operation: Operation,
        _payload: &ReceiptPayload,
    ) -> Result<Registration, ReceiptError> {
        unreachable!("register must not be called without a token")
    }
}

#[tokio::test]
async fn test_transport_failure_surfaces_as_provider_error() {
    let issuer = ReceiptIssuer::new(Arc::new(UnreachableProvider));

    let err = issuer
        .issue(&order(Side::Sell), &profile("good", "group-1"), &ReceiptOverrides::default())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("connection refused"));
}
