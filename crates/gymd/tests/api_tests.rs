//! API integration tests.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use axum_test::TestServer;
use gymd_protocol::{EnvironmentInfo, ResetResponse, SessionList, StepResponse};
use serde_json::{Value, json};
use tower::ServiceExt;

mod common;
use common::{FLAKY_RESET, INF_OBSERVATION, NAN_REWARD, test_app, test_app_with, test_registry};

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(method)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .method(Method::GET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_root_banner() {
    let response = test_app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["message"].is_string());
    assert!(json["docs"].is_string());
}

#[tokio::test]
async fn test_tasks_are_sorted() {
    let response = test_app()
        .oneshot(Request::builder().uri("/tasks").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let tasks: Vec<String> = serde_json::from_value(json["tasks"].clone()).unwrap();
    let mut sorted = tasks.clone();
    sorted.sort();
    assert_eq!(tasks, sorted);
    assert!(tasks.contains(&"Dummy-v0".to_string()));
    assert!(tasks.contains(&"PerceptualDecisionMaking-v0".to_string()));
}

#[tokio::test]
async fn test_create_environment_returns_created() {
    let response = test_app()
        .oneshot(json_request(
            Method::POST,
            "/environments",
            json!({"task_name": "Dummy-v0", "kwargs": {"obs_shape": [2, 3]}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert!(json["session_id"].is_string());
    assert_eq!(json["task_name"], "Dummy-v0");
    assert_eq!(json["observation_space"], json!({"shape": [2, 3], "dtype": "float32"}));
    assert_eq!(json["action_space"], json!({"n": 2, "shape": []}));
    assert_eq!(json["state"], "created");
}

#[tokio::test]
async fn test_create_unknown_task_is_bad_request() {
    let response = test_app()
        .oneshot(json_request(
            Method::POST,
            "/environments",
            json!({"task_name": "NoSuchTask-v0"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert!(json["error"].as_str().unwrap().contains("NoSuchTask-v0"));
}

#[tokio::test]
async fn test_oversized_observation_is_bad_request() {
    let response = test_app()
        .oneshot(json_request(
            Method::POST,
            "/environments",
            json!({"task_name": "Dummy-v0", "kwargs": {"obs_shape": [100_000_000_000u64]}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert!(json["error"].as_str().unwrap().contains("obs_shape"));
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let response = test_app()
        .oneshot(json_request(Method::POST, "/environments", json!({"kwargs": {}})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let app = test_app();

    for request in [
        Request::builder()
            .uri("/environments/missing")
            .body(Body::empty())
            .unwrap(),
        Request::builder()
            .uri("/environments/missing")
            .method(Method::DELETE)
            .body(Body::empty())
            .unwrap(),
        Request::builder()
            .uri("/environments/missing/reset")
            .method(Method::POST)
            .body(Body::empty())
            .unwrap(),
        json_request(
            Method::POST,
            "/environments/missing/step",
            json!({"action": 0}),
        ),
    ] {
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["code"], "NOT_FOUND");
    }
}

#[tokio::test]
async fn test_session_lifecycle() {
    let server = TestServer::new(test_app()).unwrap();

    let response = server
        .post("/environments")
        .json(&json!({"task_name": "Dummy-v0", "kwargs": {"episode_length": 3}}))
        .await;
    response.assert_status(StatusCode::CREATED);
    let info: EnvironmentInfo = response.json();
    let base = format!("/environments/{}", info.session_id);

    let reset: ResetResponse = server.post(&format!("{base}/reset")).await.json();
    assert_eq!(reset.observation, vec![0.0, 0.0]);
    assert!(reset.info.is_empty());

    let mut last = None;
    for _ in 0..3 {
        let step: StepResponse = server
            .post(&format!("{base}/step"))
            .json(&json!({"session_id": info.session_id, "action": 0}))
            .await
            .json();
        last = Some(step);
    }
    let last = last.unwrap();
    assert!(last.truncated);
    assert_eq!(last.reward, 1.0);
    assert_eq!(last.info["step"], json!(3));

    let fetched: EnvironmentInfo = server.get(&base).await.json();
    assert_eq!(fetched.state.to_string(), "active");
    assert_eq!(fetched.episodes, 1);
    assert_eq!(fetched.steps, 3);

    let listed: SessionList = server.get("/environments").await.json();
    assert_eq!(listed.sessions.len(), 1);
    assert_eq!(listed.sessions[0].session_id, info.session_id);

    let deleted = server.delete(&base).await;
    deleted.assert_status_ok();
    deleted.assert_json(&json!({"message": "Environment deleted successfully"}));

    server.get(&base).await.assert_status(StatusCode::NOT_FOUND);
    server
        .post(&format!("{base}/step"))
        .json(&json!({"action": 0}))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reset_accepts_seed() {
    let server = TestServer::new(test_app()).unwrap();
    let info: EnvironmentInfo = server
        .post("/environments")
        .json(&json!({"task_name": "PerceptualDecisionMaking-v0"}))
        .await
        .json();
    let reset_uri = format!("/environments/{}/reset", info.session_id);

    let first: ResetResponse = server.post(&reset_uri).json(&json!({"seed": 11})).await.json();
    let second: ResetResponse = server.post(&reset_uri).json(&json!({"seed": 11})).await.json();
    assert_eq!(first, second);
    assert_eq!(first.observation.len(), 3);

    server
        .post(&reset_uri)
        .json(&json!({"seed": "eleven"}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_step_error_statuses() {
    let server = TestServer::new(test_app()).unwrap();
    let info: EnvironmentInfo = server
        .post("/environments")
        .json(&json!({"task_name": "PerceptualDecisionMaking-v0"}))
        .await
        .json();
    let step_uri = format!("/environments/{}/step", info.session_id);

    // Stepping before reset is an environment failure.
    let response = server.post(&step_uri).json(&json!({"action": 0})).await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "INTERNAL_ERROR");
    assert!(body["error"].as_str().unwrap().contains("reset"));

    server
        .post(&format!("/environments/{}/reset", info.session_id))
        .await
        .assert_status_ok();

    server
        .post(&step_uri)
        .json(&json!({"action": 5}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .post(&step_uri)
        .json(&json!({"session_id": "someone-else", "action": 0}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let step: StepResponse = server.post(&step_uri).json(&json!({"action": 0})).await.json();
    assert_eq!(step.observation.len(), 3);
    assert!(step.info.contains_key("new_trial"));
}

#[tokio::test]
async fn test_runtime_failure_leaves_session_usable() {
    let server = TestServer::new(test_app()).unwrap();
    let info: EnvironmentInfo = server
        .post("/environments")
        .json(&json!({"task_name": FLAKY_RESET}))
        .await
        .json();
    let reset_uri = format!("/environments/{}/reset", info.session_id);

    server
        .post(&reset_uri)
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    server.post(&reset_uri).await.assert_status_ok();
}

#[tokio::test]
async fn test_capacity_is_service_unavailable() {
    let server = TestServer::new(test_app_with(test_registry(Some(1)))).unwrap();

    server
        .post("/environments")
        .json(&json!({"task_name": "Dummy-v0"}))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .post("/environments")
        .json(&json!({"task_name": "Dummy-v0"}))
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_nan_reward_is_labelled() {
    let server = TestServer::new(test_app()).unwrap();
    let info: EnvironmentInfo = server
        .post("/environments")
        .json(&json!({"task_name": NAN_REWARD}))
        .await
        .json();
    let base = format!("/environments/{}", info.session_id);
    server.post(&format!("{base}/reset")).await.assert_status_ok();

    let response = server.post(&format!("{base}/step")).json(&json!({"action": 0})).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["reward"], json!("NaN"));

    let step: StepResponse = serde_json::from_value(body).unwrap();
    assert!(step.reward.is_nan());
}

#[tokio::test]
async fn test_infinite_observation_is_labelled() {
    let server = TestServer::new(test_app()).unwrap();
    let info: EnvironmentInfo = server
        .post("/environments")
        .json(&json!({"task_name": INF_OBSERVATION}))
        .await
        .json();
    let base = format!("/environments/{}", info.session_id);

    let reset: Value = server.post(&format!("{base}/reset")).await.json();
    assert_eq!(reset["observation"], json!(["inf", 0.0, "-inf"]));
    let reset: ResetResponse = serde_json::from_value(reset).unwrap();
    assert_eq!(reset.observation[0], f64::INFINITY);

    let step: StepResponse = server
        .post(&format!("{base}/step"))
        .json(&json!({"action": 0}))
        .await
        .json();
    assert_eq!(step.observation, vec![f64::INFINITY, 0.0, f64::NEG_INFINITY]);
    assert_eq!(step.reward, 0.0);
}
