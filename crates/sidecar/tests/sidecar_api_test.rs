// Sidecar client against a mock sidecar

use std::collections::HashMap;
use std::time::Duration;

use serde_json::json;
use testapps_durable::{ClientError, RuntimeStatus, ScheduleOptions, WorkflowClient};
use testapps_sidecar::{
    ReminderRequest, SidecarClient, SidecarConfig, SidecarError, SidecarWorkflowClient,
    TimerRequest,
};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client(server: &MockServer) -> SidecarClient {
    SidecarClient::new(SidecarConfig::new(server.uri()).with_api_token("secret")).unwrap()
}

#[tokio::test]
async fn test_register_reminder_sends_token_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1.0/actors/testActorType/my-actor-id-1/reminders/my-reminder-1"))
        .and(header("dapr-api-token", "secret"))
        .and(body_json(json!({ "dueTime": "1s", "period": "1s" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .await
        .register_actor_reminder(
            "testActorType",
            "my-actor-id-1",
            "my-reminder-1",
            &ReminderRequest::new("1s", "1s"),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_register_reminder_with_ttl_and_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1.0/actors/testActorType/my-actor-id-2/reminders/my-reminder-2"))
        .and(body_json(json!({
            "dueTime": "1s",
            "period": "1s",
            "ttl": "10s",
            "data": { "n": 2 }
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let reminder = ReminderRequest::new("1s", "1s")
        .with_ttl("10s")
        .with_data(json!({ "n": 2 }));
    client(&server)
        .await
        .register_actor_reminder("testActorType", "my-actor-id-2", "my-reminder-2", &reminder)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unregister_reminder_uses_delete() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1.0/actors/testActorType/a/reminders/r"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .await
        .unregister_actor_reminder("testActorType", "a", "r")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_register_timer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1.0/actors/testActorType/a/timers/t"))
        .and(body_json(json!({ "dueTime": "1s", "period": "1s", "callback": "tick" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .await
        .register_actor_timer("testActorType", "a", "t", &TimerRequest::new("1s", "1s", "tick"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1.0/actors/testActorType/a/reminders/r"))
        .respond_with(ResponseTemplate::new(500).set_body_string("actors not ready"))
        .mount(&server)
        .await;

    let err = client(&server)
        .await
        .register_actor_reminder("testActorType", "a", "r", &ReminderRequest::new("1s", "1s"))
        .await
        .unwrap_err();

    match err {
        SidecarError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "actors not ready");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_publish_event() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1.0/publish/pubsub/numbers"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "number": 1 })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .await
        .publish_event("pubsub", "numbers", &json!({ "number": 1 }), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_invoke_binding_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1.0/bindings/testbinding"))
        .and(body_json(json!({ "operation": "create", "data": "HELLO" })))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let body = client(&server)
        .await
        .invoke_binding("testbinding", "create", json!("HELLO"), HashMap::new())
        .await
        .unwrap();

    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn test_shutdown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1.0/shutdown"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).await.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_outbound_health() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0/healthz/outbound"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    client(&server)
        .await
        .wait_for_outbound_health(Duration::from_secs(5))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_outbound_health_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0/healthz/outbound"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client(&server)
        .await
        .wait_for_outbound_health(Duration::from_millis(300))
        .await
        .unwrap_err();

    assert!(matches!(err, SidecarError::Timeout(..)));
}

#[tokio::test]
async fn test_workflow_schedule_and_wait() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1.0/workflows/dapr/TestWorkflow/start"))
        .and(query_param("instanceID", "wf-1"))
        .and(body_json(json!("hello")))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "instanceID": "wf-1" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1.0/workflows/dapr/wf-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "instanceID": "wf-1",
            "workflowName": "TestWorkflow",
            "createdAt": "2024-01-01T00:00:00Z",
            "lastUpdatedAt": "2024-01-01T00:00:01Z",
            "runtimeStatus": "COMPLETED",
            "properties": { "dapr.workflow.output": "\"done\"" }
        })))
        .mount(&server)
        .await;

    let workflows = SidecarWorkflowClient::new(client(&server).await)
        .with_poll_interval(Duration::from_millis(10));

    let id = workflows
        .schedule_new_workflow(
            "TestWorkflow",
            ScheduleOptions::new()
                .with_instance_id("wf-1")
                .with_input(&"hello")
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(id, "wf-1");

    let metadata = workflows
        .wait_for_workflow_completion(&id, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(metadata.runtime_status, RuntimeStatus::Completed);
    assert_eq!(metadata.output::<String>().unwrap().as_deref(), Some("done"));
}

#[tokio::test]
async fn test_workflow_wait_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0/workflows/dapr/wf-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "instanceID": "wf-2",
            "runtimeStatus": "RUNNING"
        })))
        .mount(&server)
        .await;

    let workflows = SidecarWorkflowClient::new(client(&server).await)
        .with_poll_interval(Duration::from_millis(10));

    let err = workflows
        .wait_for_workflow_completion("wf-2", Duration::from_millis(100))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Timeout(id) if id == "wf-2"));
}

#[tokio::test]
async fn test_workflow_wait_bounds_slow_status_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0/workflows/dapr/wf-slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "instanceID": "wf-slow", "runtimeStatus": "RUNNING" }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let sidecar = SidecarClient::new(
        SidecarConfig::new(server.uri()).with_timeout(Duration::from_secs(3)),
    )
    .unwrap();
    let workflows = SidecarWorkflowClient::new(sidecar);

    let started = std::time::Instant::now();
    let err = workflows
        .wait_for_workflow_completion("wf-slow", Duration::from_secs(1))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Timeout(id) if id == "wf-slow"));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_workflow_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0/workflows/dapr/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let workflows = SidecarWorkflowClient::new(client(&server).await);
    let err = workflows.fetch_workflow_metadata("missing").await.unwrap_err();

    assert!(matches!(err, ClientError::NotFound(_)));
}

#[tokio::test]
async fn test_workflow_terminate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1.0/workflows/dapr/wf-3/terminate"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let workflows = SidecarWorkflowClient::new(client(&server).await);
    workflows.terminate_workflow("wf-3", None).await.unwrap();
}
