//! Test utilities for integration tests
use std::time::Duration;

use medipulse::chat::{Controller, ControllerBuilder};
use medipulse::client::SessionClient;
use medipulse::core::{Features, LocalStore};
use medipulse::render::MessageLog;
use mockito::{Matcher, Mock, ServerGuard};
use serde_json::Value;

pub type TestChat = Controller<SessionClient, MessageLog>;

/// Creates a controller talking to a mock backend at `url` with an
/// in-memory local store and no restart delay.
pub async fn test_chat(url: &str, features: Features) -> TestChat {
    let store = LocalStore::in_memory()
        .await
        .expect("Failed to open in-memory store");
    let client =
        SessionClient::new(url, Duration::from_secs(5)).expect("Failed to build http client");

    ControllerBuilder::new(client, MessageLog::new(), store)
        .features(features)
        .restart_delay(Duration::from_millis(0))
        .build()
}

/// Mock a POST endpoint that expects `request` as its JSON body.
pub async fn mock_post(server: &mut ServerGuard, path: &str, request: Value, response: Value) -> Mock {
    server
        .mock("POST", path)
        .match_body(Matcher::Json(request))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(response.to_string())
        .create_async()
        .await
}
