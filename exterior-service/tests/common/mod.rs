#![allow(dead_code)]

use exterior_service::config::ExteriorConfig;
use exterior_service::services::providers::mock::{
    MockFloorPlanProvider, MockImageToImageProvider,
};
use exterior_service::services::providers::{FloorPlanProvider, ImageToImageProvider};
use exterior_service::services::{MemoryStorage, ObjectStore};
use exterior_service::startup::{AppState, Application};
use serde_json::{json, Value};
use std::sync::Arc;

pub const MOCK_OUTPUT: &str = "https://replicate.delivery/pbxt/mock/output_1.png";

pub fn mock_output() -> Value {
    json!([
        "https://replicate.delivery/pbxt/mock/output_0.png",
        MOCK_OUTPUT
    ])
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Spawns the service on a random port with the given clients.
    pub async fn spawn_with(
        storage: Arc<dyn ObjectStore>,
        image_model: Arc<dyn ImageToImageProvider>,
        floor_plan: Arc<dyn FloorPlanProvider>,
    ) -> Self {
        std::env::set_var("REPLICATE_API_TOKEN", "r8_test");

        let mut config = ExteriorConfig::load().expect("Failed to load configuration");
        config.common.port = 0; // Random port for testing

        let app = Application::build_with_state(
            config,
            AppState {
                storage,
                image_model,
                floor_plan,
            },
        )
        .await
        .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept connections
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
        }
    }

    /// Memory storage, a succeeding image model and an enabled floor-plan mock.
    pub async fn spawn() -> (Self, Arc<MemoryStorage>, Arc<MockImageToImageProvider>) {
        let storage = Arc::new(MemoryStorage::new());
        let model = Arc::new(MockImageToImageProvider::new(mock_output()));
        let app = Self::spawn_with(
            storage.clone(),
            model.clone(),
            Arc::new(MockFloorPlanProvider::new(true)),
        )
        .await;
        (app, storage, model)
    }

    pub async fn post_exterior(&self, form: reqwest::multipart::Form) -> reqwest::Response {
        self.client
            .post(format!("{}/upload-exterior", self.address))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

pub fn image_part() -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3])
        .file_name("house.png")
        .mime_str("image/png")
        .unwrap()
}

/// The structured fields used throughout the upload tests.
pub fn styled_form() -> reqwest::multipart::Form {
    reqwest::multipart::Form::new()
        .part("image", image_part())
        .text("exteriorStyle", "modern")
        .text("environment", "desert")
        .text("time", "sunset")
        .text("materials", r#"["wood","glass"]"#)
}
