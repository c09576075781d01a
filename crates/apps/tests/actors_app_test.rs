// Actors app routes against a mocked sidecar

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use testapps::actors::{self, actor_id, ActorCallCounts, ActorsState};
use testapps_sidecar::{SidecarClient, SidecarConfig};
use tower::ServiceExt;
use wiremock::matchers::{body_json, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NUM_ACTORS: usize = 5;

fn app(server: &MockServer, counts: Arc<ActorCallCounts>) -> Router {
    let sidecar = SidecarClient::new(SidecarConfig::new(server.uri())).unwrap();
    actors::app(ActorsState::new(sidecar, counts).with_num_actors(NUM_ACTORS))
}

async fn call(app: Router, http_method: &str, uri: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(http_method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_register_reminder_on_every_actor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(
            r"^/v1\.0/actors/testActorType/my-actor-id-\d+/reminders/my-reminder-\d+$",
        ))
        .and(body_json(json!({ "dueTime": "1s", "period": "1s" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(NUM_ACTORS as u64)
        .mount(&server)
        .await;

    let (status, body) = call(
        app(&server, Arc::new(ActorCallCounts::new())),
        "POST",
        "/register-reminder",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Reminders registered");
}

#[tokio::test]
async fn test_register_reminder_tolerates_sidecar_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(NUM_ACTORS as u64)
        .mount(&server)
        .await;

    let (status, body) = call(
        app(&server, Arc::new(ActorCallCounts::new())),
        "POST",
        "/register-reminder",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Reminders registered");
}

#[tokio::test]
async fn test_unregister_reminder_on_every_actor() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path_regex(
            r"^/v1\.0/actors/testActorType/my-actor-id-\d+/reminders/my-reminder-\d+$",
        ))
        .respond_with(ResponseTemplate::new(204))
        .expect(NUM_ACTORS as u64)
        .mount(&server)
        .await;

    let (status, body) = call(
        app(&server, Arc::new(ActorCallCounts::new())),
        "POST",
        "/unregister-reminder",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Reminders unregistered");
}

#[tokio::test]
async fn test_register_and_unregister_timers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(
            r"^/v1\.0/actors/testActorType/my-actor-id-\d+/timers/my-timer-\d+$",
        ))
        .respond_with(ResponseTemplate::new(204))
        .expect(NUM_ACTORS as u64)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path_regex(
            r"^/v1\.0/actors/testActorType/my-actor-id-\d+/timers/my-timer-\d+$",
        ))
        .respond_with(ResponseTemplate::new(204))
        .expect(NUM_ACTORS as u64)
        .mount(&server)
        .await;

    let counts = Arc::new(ActorCallCounts::new());
    let (_, body) = call(app(&server, counts.clone()), "POST", "/register-timer").await;
    assert_eq!(body, "Timers registered");

    let (_, body) = call(app(&server, counts), "POST", "/unregister-timer").await;
    assert_eq!(body, "Timers unregistered");
}

#[tokio::test]
async fn test_actor_method_counts_calls_until_cleared() {
    let server = MockServer::start().await;
    let counts = Arc::new(ActorCallCounts::new());

    for _ in 0..3 {
        let (status, _) = call(
            app(&server, counts.clone()),
            "PUT",
            "/actors/testActorType/my-actor-id-2/method/remind/my-reminder-2",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    call(
        app(&server, counts.clone()),
        "PUT",
        "/actors/testActorType/my-actor-id-0/method/timer/timerMethod",
    )
    .await;

    assert_eq!(counts.snapshot().get(&actor_id(2)), Some(&3));
    assert_eq!(counts.histogram(NUM_ACTORS).get(&0), Some(&3));

    let (status, body) = call(app(&server, counts.clone()), "POST", "/clear-stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Stats cleared");
    assert!(counts.snapshot().is_empty());
}

#[tokio::test]
async fn test_actor_config_lists_actor_type() {
    let server = MockServer::start().await;
    let (status, body) = call(
        app(&server, Arc::new(ActorCallCounts::new())),
        "GET",
        "/dapr/config",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let config: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(config, json!({ "entities": ["testActorType"] }));
}

#[tokio::test]
async fn test_shutdown_forwards_to_sidecar() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1.0/shutdown"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = call(
        app(&server, Arc::new(ActorCallCounts::new())),
        "POST",
        "/shutdown",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Sidecar shutdown");
}

#[tokio::test]
async fn test_shutdown_failure_is_500() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1.0/shutdown"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (status, body) = call(
        app(&server, Arc::new(ActorCallCounts::new())),
        "POST",
        "/shutdown",
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let server = MockServer::start().await;
    let (status, _) = call(
        app(&server, Arc::new(ActorCallCounts::new())),
        "GET",
        "/missing",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
