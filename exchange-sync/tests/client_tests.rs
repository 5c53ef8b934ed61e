use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use common::model::Side;
use exchange_sync::signing::sign;
use exchange_sync::{BybitConnector, ExchangeConnector, ExchangeError, ExchangeSyncConfig};
use serde_json::{json, Value};

const KEY: &str = "key-12345";
const SECRET: &str = "secret-12345";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or_default()
}

/// Rejects requests whose signature does not match the documented scheme
fn verify(headers: &HeaderMap, body: &str) -> bool {
    let expected = sign(
        SECRET,
        header(headers, "X-BAPI-TIMESTAMP"),
        header(headers, "X-BAPI-API-KEY"),
        header(headers, "X-BAPI-RECV-WINDOW"),
        body,
    )
    .unwrap();
    header(headers, "X-BAPI-SIGN") == expected && header(headers, "X-BAPI-RECV-WINDOW") == "10000"
}

async fn pending(headers: HeaderMap, body: String) -> (StatusCode, String) {
    if !verify(&headers, &body) {
        return (StatusCode::UNAUTHORIZED, "bad signature".to_string());
    }
    let request: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(request, json!({ "page": 1, "size": 20 }));

    let response = json!({
        "ret_code": 0,
        "ret_msg": "SUCCESS",
        "result": { "count": 1, "items": [
            { "id": "P-1", "side": 1, "price": "95.10", "notifyTokenQuantity": "10",
              "amount": "951", "createDate": "1700000000000", "orderStatus": 10 }
        ]}
    });
    (StatusCode::OK, response.to_string())
}

async fn history(headers: HeaderMap, body: String) -> (StatusCode, String) {
    if !verify(&headers, &body) {
        return (StatusCode::UNAUTHORIZED, "bad signature".to_string());
    }
    let response = json!({ "ret_code": 10003, "ret_msg": "API key is invalid.", "result": {} });
    (StatusCode::OK, response.to_string())
}

async fn spawn_exchange(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_signed_post_and_envelope_handling() {
    let base_url = spawn_exchange(
        Router::new()
            .route("/v5/p2p/order/pending/simplifyList", post(pending))
            .route("/v5/p2p/order/simplifyList", post(history)),
    )
    .await;

    let connector = BybitConnector::new(ExchangeSyncConfig::default().with_base_url(base_url)).unwrap();
    let source = connector.connect(KEY, SECRET);

    let items = source.pending_orders(1, 20).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].external_id(), Some("P-1"));
    assert_eq!(Side::from_exchange_code(items[0].side.as_deref()), Side::Sell);

    match source.order_history(1, 20).await {
        Err(ExchangeError::Api { code, message }) => {
            assert_eq!(code, 10003);
            assert!(message.contains("invalid"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_http_status_is_reported() {
    let base_url = spawn_exchange(Router::new().route(
        "/v5/p2p/order/pending/simplifyList",
        post(|| async { (StatusCode::FORBIDDEN, "access denied") }),
    ))
    .await;

    let connector = BybitConnector::new(ExchangeSyncConfig::default().with_base_url(base_url)).unwrap();
    let err = connector.connect(KEY, SECRET).pending_orders(1, 20).await.unwrap_err();

    match err {
        ExchangeError::Status { status, body } => {
            assert_eq!(status, 403);
            assert_eq!(body, "access denied");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
