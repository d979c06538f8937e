mod common;

use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use storefront_session::application_port::*;
use storefront_session::domain_model::*;
use storefront_session::domain_port::*;
use storefront_session::infra::*;

fn seeded_store() -> Arc<MemoryTokenStore> {
    Arc::new(MemoryTokenStore::with_pair(TokenPair {
        access_token: AccessToken("old".to_string()),
        refresh_token: RefreshToken("ref0".to_string()),
    }))
}

#[tokio::test]
async fn refreshes_over_http_and_replays_with_new_token() {
    let mut server = mockito::Server::new_async().await;

    let stale = server
        .mock("GET", "/api/orders")
        .match_header("authorization", "Bearer old")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code":401,"message":"token expired"}"#)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refreshtoken")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({"refreshToken": "ref0"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code":200,"data":{"accessToken":"new1","refreshToken":"ref1"}}"#)
        .expect(1)
        .create_async()
        .await;
    let fresh = server
        .mock("GET", "/api/orders")
        .match_header("authorization", "Bearer new1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code":200,"data":[{"id":1}]}"#)
        .expect(1)
        .create_async()
        .await;

    let store = seeded_store();
    let transport = Arc::new(ReqwestTransport::new(Duration::from_secs(5)).unwrap());
    let client = common::client(&server.url(), transport, store.clone());

    let orders: serde_json::Value = client.session.get_json("/api/orders").await.unwrap();

    assert_eq!(orders, json!([{"id": 1}]));
    assert_eq!(
        store.access_token().await.unwrap(),
        Some(AccessToken("new1".to_string()))
    );
    assert_eq!(
        store.refresh_token().await.unwrap(),
        Some(RefreshToken("ref1".to_string()))
    );
    stale.assert_async().await;
    refresh.assert_async().await;
    fresh.assert_async().await;
    client.shutdown().await;
}

#[tokio::test]
async fn rejected_refresh_over_http_ends_the_session() {
    let mut server = mockito::Server::new_async().await;

    let _stale = server
        .mock("GET", "/api/cart")
        .with_status(401)
        .with_body(r#"{"code":401,"message":"token expired"}"#)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/auth/refreshtoken")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code":401,"message":"refresh token revoked"}"#)
        .expect(1)
        .create_async()
        .await;

    let store = seeded_store();
    let transport = Arc::new(ReqwestTransport::new(Duration::from_secs(5)).unwrap());
    let client = common::client(&server.url(), transport, store.clone());
    let mut events = client.auth_state.subscribe_events();

    let error = client
        .session
        .get_json::<serde_json::Value>("/api/cart")
        .await
        .unwrap_err();

    match error {
        ApiError::SessionExpired(RefreshError::Rejected(message)) => {
            assert_eq!(message, "refresh token revoked")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.access_token().await.unwrap(), None);
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::Expired { ref redirect_to, .. } if redirect_to == "/login"
    ));
    refresh.assert_async().await;
    client.shutdown().await;
}

async fn mock_refresh(server: &mut mockito::Server) -> mockito::Mock {
    server
        .mock("POST", "/auth/refreshtoken")
        .match_body(Matcher::Json(json!({"refreshToken": "ref0"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code":200,"data":{"accessToken":"new1","refreshToken":"ref1"}}"#)
        .expect(1)
        .create_async()
        .await
}

#[tokio::test]
async fn post_is_replayed_with_the_same_body_after_refresh() {
    let mut server = mockito::Server::new_async().await;
    let order = json!({"productId": 7, "quantity": 2});

    let stale = server
        .mock("POST", "/api/orders")
        .match_header("authorization", "Bearer old")
        .match_body(Matcher::Json(order.clone()))
        .with_status(401)
        .with_body(r#"{"code":401,"message":"token expired"}"#)
        .expect(1)
        .create_async()
        .await;
    let refresh = mock_refresh(&mut server).await;
    let fresh = server
        .mock("POST", "/api/orders")
        .match_header("authorization", "Bearer new1")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(order.clone()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code":200,"data":{"orderId":"o-1"}}"#)
        .expect(1)
        .create_async()
        .await;

    let transport = Arc::new(ReqwestTransport::new(Duration::from_secs(5)).unwrap());
    let client = common::client(&server.url(), transport, seeded_store());

    let created: serde_json::Value = client.session.post_json("/api/orders", &order).await.unwrap();

    assert_eq!(created, json!({"orderId": "o-1"}));
    stale.assert_async().await;
    refresh.assert_async().await;
    fresh.assert_async().await;
    client.shutdown().await;
}

#[tokio::test]
async fn delete_is_replayed_after_refresh() {
    let mut server = mockito::Server::new_async().await;

    let stale = server
        .mock("DELETE", "/api/cart/items/3")
        .match_header("authorization", "Bearer old")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = mock_refresh(&mut server).await;
    let fresh = server
        .mock("DELETE", "/api/cart/items/3")
        .match_header("authorization", "Bearer new1")
        .with_status(204)
        .expect(1)
        .create_async()
        .await;

    let transport = Arc::new(ReqwestTransport::new(Duration::from_secs(5)).unwrap());
    let client = common::client(&server.url(), transport, seeded_store());

    client.session.delete("/api/cart/items/3").await.unwrap();

    stale.assert_async().await;
    refresh.assert_async().await;
    fresh.assert_async().await;
    client.shutdown().await;
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let transport = ReqwestTransport::new(Duration::from_secs(2)).unwrap();
    let request = ApiRequest::get("http://127.0.0.1:9/api/products");

    assert!(matches!(
        transport.execute(&request).await,
        Err(TransportError::Connection(_)) | Err(TransportError::Timeout)
    ));
}
