mod common;

use common::TestApp;
use exterior_service::config::FloorPlanConfig;
use exterior_service::services::providers::gradio::GradioFloorPlanProvider;
use exterior_service::services::providers::mock::MockImageToImageProvider;
use exterior_service::services::MemoryStorage;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn spawn_against(space: &MockServer) -> TestApp {
    let floor_plan = GradioFloorPlanProvider::new(&FloorPlanConfig {
        space: "mrblackk/floor-plan-generation".to_string(),
        endpoint: "/predict".to_string(),
        host: Some(space.uri()),
        hf_api_base: "http://unused.invalid".to_string(),
        hf_token: None,
    });

    TestApp::spawn_with(
        Arc::new(MemoryStorage::new()),
        Arc::new(MockImageToImageProvider::new(json!(null))),
        Arc::new(floor_plan),
    )
    .await
}

#[tokio::test]
async fn get_plan_proxies_prompt_to_gradio_space() {
    let space = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/call/predict"))
        .and(body_json(json!({ "data": ["open plan kitchen, two bedrooms"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "event_id": "abc" })))
        .expect(1)
        .mount(&space)
        .await;

    Mock::given(method("GET"))
        .and(path("/call/predict/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "event: complete\ndata: [{\"path\": \"/tmp/gradio/plan.png\"}]\n\n",
            "text/event-stream",
        ))
        .mount(&space)
        .await;

    let app = spawn_against(&space).await;
    let response = app
        .client
        .post(format!("{}/get-plan", app.address))
        .json(&json!({ "prompt": "open plan kitchen, two bedrooms" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!([{ "path": "/tmp/gradio/plan.png" }]));
}

#[tokio::test]
async fn get_plan_hides_upstream_errors() {
    let space = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Space is sleeping"))
        .mount(&space)
        .await;

    let app = spawn_against(&space).await;
    let response = app
        .client
        .post(format!("{}/get-plan", app.address))
        .json(&json!({ "prompt": "studio" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Something went wrong" }));
}
