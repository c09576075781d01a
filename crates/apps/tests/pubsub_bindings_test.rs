// Pub/sub and binding apps

use std::time::Duration;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use testapps::bindings::{self, StartResponse};
use testapps::pubsub;
use testapps_sidecar::{SidecarClient, SidecarConfig};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/cloudevents+json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn sidecar(server: &MockServer) -> SidecarClient {
    SidecarClient::new(SidecarConfig::new(server.uri())).unwrap()
}

// =============================================================================
// Subscriber
// =============================================================================

#[tokio::test]
async fn test_subscriber_lists_numbers_topic() {
    let (status, body) = send(
        pubsub::subscriber_app(),
        Request::builder()
            .uri("/dapr/subscribe")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let subscriptions: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        subscriptions,
        json!([{ "pubsubname": "pubsub", "topic": "numbers", "route": "/numbers" }])
    );
}

#[tokio::test]
async fn test_subscriber_accepts_json_event() {
    let event = json!({
        "id": "1",
        "source": "pub",
        "type": "com.dapr.event.sent",
        "datacontenttype": "application/json",
        "topic": "numbers",
        "pubsubname": "pubsub",
        "data": { "number": 7 }
    });

    let (status, body) = send(pubsub::subscriber_app(), post_json("/numbers", event)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        serde_json::from_slice::<Value>(&body).unwrap(),
        json!({ "status": "SUCCESS" })
    );
}

#[tokio::test]
async fn test_subscriber_accepts_json_string_payload() {
    let event = json!({ "data": "{\"number\": 8}" });
    let (_, body) = send(pubsub::subscriber_app(), post_json("/numbers", event)).await;
    assert_eq!(
        serde_json::from_slice::<Value>(&body).unwrap(),
        json!({ "status": "SUCCESS" })
    );
}

#[tokio::test]
async fn test_subscriber_retries_unparseable_event() {
    let request = Request::builder()
        .method("POST")
        .uri("/numbers")
        .body(Body::from("not a cloud event"))
        .unwrap();

    let (status, body) = send(pubsub::subscriber_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        serde_json::from_slice::<Value>(&body).unwrap(),
        json!({ "status": "RETRY" })
    );
}

// =============================================================================
// Publisher
// =============================================================================

#[tokio::test]
async fn test_publisher_sends_increasing_numbers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1.0/publish/pubsub/numbers"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = sidecar(&server);
    let token = CancellationToken::new();
    let publisher = {
        let token = token.clone();
        tokio::spawn(async move {
            pubsub::publish_numbers(&client, Duration::from_millis(10), token).await
        })
    };

    loop {
        let received = server.received_requests().await.unwrap_or_default();
        if received.len() >= 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    token.cancel();
    let published = publisher.await.unwrap().unwrap();
    assert!(published >= 3);

    let received = server.received_requests().await.unwrap();
    let numbers: Vec<Value> = received
        .iter()
        .take(3)
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect();
    assert_eq!(
        numbers,
        vec![json!({ "number": 1 }), json!({ "number": 2 }), json!({ "number": 3 })]
    );
}

#[tokio::test]
async fn test_publisher_stops_on_sidecar_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = pubsub::publish_numbers(
        &sidecar(&server),
        Duration::from_millis(10),
        CancellationToken::new(),
    )
    .await;

    assert!(result.is_err());
}

// =============================================================================
// Bindings
// =============================================================================

#[tokio::test]
async fn test_start_invokes_output_binding() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1.0/bindings/testbinding"))
        .and(body_json(json!({ "operation": "create", "data": "HELLO" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = send(
        bindings::web_app(sidecar(&server)),
        Request::builder()
            .method("POST")
            .uri("/start")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let response: StartResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(response.status, "OK");
    assert!(response.error.is_none());
}

#[tokio::test]
async fn test_start_reports_binding_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1.0/bindings/testbinding"))
        .respond_with(ResponseTemplate::new(500).set_body_string("no such binding"))
        .mount(&server)
        .await;

    let (status, body) = send(
        bindings::web_app(sidecar(&server)),
        Request::builder()
            .method("POST")
            .uri("/start")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let response: StartResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(response.status, "failed");
    assert!(response
        .error
        .unwrap()
        .starts_with("Failed to invoke binding: "));
}

#[tokio::test]
async fn test_input_binding_accepts_messages_and_probes() {
    let (status, _) = send(
        bindings::binding_app(),
        Request::builder()
            .method("POST")
            .uri("/testbinding")
            .body(Body::from("\"HELLO\""))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        bindings::binding_app(),
        Request::builder()
            .method("OPTIONS")
            .uri("/testbinding")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        bindings::binding_app(),
        Request::builder()
            .uri("/elsewhere")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
