use hood_agent::adapters::openai::ChatClient;
use hood_agent::core::pin_map;
use hood_agent::domain::ports::ScreenshotProvider;
use hood_agent::{AgentSettings, ConversationalAgent, Result, VisionAgent};
use httpmock::prelude::*;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Live capture is never reached in these tests.
struct NoBrowser;

#[async_trait::async_trait]
impl ScreenshotProvider for NoBrowser {
    async fn capture_pin_map(&self, _address: &str) -> Result<PathBuf> {
        unreachable!("live capture requested")
    }

    async fn capture_region_map(&self) -> Result<PathBuf> {
        unreachable!("live capture requested")
    }
}

fn write_fixtures(dir: &Path) -> (PathBuf, PathBuf) {
    let region = pin_map::synthesize_region_map(800, 600);
    let pinned = pin_map::synthesize_pin_map(&region, 200, 150);

    let region_path = dir.join("region_map.png");
    let pin_path = dir.join("pin_map.png");
    region.save(&region_path).unwrap();
    pinned.save(&pin_path).unwrap();
    (pin_path, region_path)
}

fn completion(message: Value) -> Value {
    json!({
        "id": "chatcmpl-1",
        "model": "mock",
        "choices": [{"index": 0, "message": message, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

#[tokio::test]
async fn test_tool_round_trip_with_real_http() {
    let temp_dir = TempDir::new().unwrap();
    let (pin_path, region_path) = write_fixtures(temp_dir.path());

    let chat_server = MockServer::start();
    let vision_server = MockServer::start();

    let arguments = json!({
        "pin_map_path": pin_path.display().to_string(),
        "legend_map_path": region_path.display().to_string()
    })
    .to_string();

    let tool_request_mock = chat_server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("authorization", "Bearer chat-key")
            .body_contains("\"tools\"");
        then.status(200).json_body(completion(json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_abc",
                "type": "function",
                "function": {"name": "analyze_neighborhood", "arguments": arguments}
            }]
        })));
    });

    let final_mock = chat_server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .body_contains("\"role\":\"tool\"");
        then.status(200).json_body(completion(json!({
            "role": "assistant",
            "content": "That spot is in a Tourist area."
        })));
    });

    let vision_mock = vision_server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("authorization", "Bearer vision-key")
            .body_contains("data:image/png;base64,");
        then.status(200).json_body(completion(json!({
            "role": "assistant",
            "content": "Neighborhood type: Tourist\nColor observed: red\nConfidence: high"
        })));
    });

    let chat = ChatClient::new(chat_server.url("/v1"), "chat-key", "chat-model");
    let vision = VisionAgent::new(ChatClient::new(
        vision_server.url("/v1"),
        "vision-key",
        "vision-model",
    ));
    let mut agent = ConversationalAgent::new(chat, vision, NoBrowser, AgentSettings::default());

    let reply = agent
        .chat("What kind of neighborhood is the pin in?")
        .await
        .unwrap();

    assert_eq!(reply, "That spot is in a Tourist area.");
    tool_request_mock.assert();
    final_mock.assert();
    vision_mock.assert();

    let tool_message = agent
        .history()
        .iter()
        .find(|m| m.tool_call_id.as_deref() == Some("call_abc"))
        .unwrap();
    let result: Value = serde_json::from_str(tool_message.text_content().unwrap()).unwrap();
    assert_eq!(result["success"], true);
    assert_eq!(result["model_used"], "vision-model");
    assert_eq!(result["neighborhood_type"], "Tourist");
    assert_eq!(result["neighborhood_info"]["color"], "red");
}

#[tokio::test]
async fn test_vision_http_error_is_reported_to_the_model() {
    let temp_dir = TempDir::new().unwrap();
    let (pin_path, region_path) = write_fixtures(temp_dir.path());

    let chat_server = MockServer::start();
    let vision_server = MockServer::start();

    vision_server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(429).body("rate limited");
    });

    let vision = VisionAgent::new(ChatClient::new(vision_server.url("/v1"), "k", "vision-model"));
    let agent = ConversationalAgent::new(
        ChatClient::new(chat_server.url("/v1"), "k", "chat-model"),
        vision,
        NoBrowser,
        AgentSettings::default(),
    );

    let result = agent.analyze_neighborhood(&pin_path, &region_path).await;

    assert!(!result.success);
    assert_eq!(result.model_used, "vision-model");
    let error = result.error.unwrap();
    assert!(error.contains("429"));
    assert!(error.contains("rate limited"));
}

#[tokio::test]
async fn test_demo_mode_sends_demo_prompt_without_tools() {
    let chat_server = MockServer::start();
    let demo_mock = chat_server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .body_contains("\"max_tokens\":500")
            .body_contains("Mission District");
        then.status(200).json_body(completion(json!({
            "role": "assistant",
            "content": "First I would take a Google Maps screenshot..."
        })));
    });

    let settings = AgentSettings {
        demo_mode: true,
        ..AgentSettings::default()
    };
    let mut agent = ConversationalAgent::new(
        ChatClient::new(chat_server.url("/v1"), "k", "chat-model"),
        VisionAgent::new(ChatClient::new(chat_server.url("/v1"), "k", "vision-model")),
        NoBrowser,
        settings,
    );

    let reply = agent
        .chat("Can you analyze what type of neighborhood the Mission District is in San Francisco?")
        .await
        .unwrap();

    demo_mock.assert();
    assert!(reply.starts_with("First I would take"));
    assert_eq!(agent.history().len(), 2);
}
