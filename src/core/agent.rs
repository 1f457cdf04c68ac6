//! Conversational front-end: a tool-calling chat model that drives screenshots and vision.

use crate::adapters::openai::api::{ChatMessage, ChatRequest, ToolCall};
use crate::adapters::openai::{first_message, first_message_text};
use crate::config::toml_config::AppConfig;
use crate::core::tools::{tool_definitions, ToolOutcome, ToolRequest};
use crate::core::vision::VisionAgent;
use crate::domain::model::{AnalysisResult, CaptureMethod, ScreenshotResult};
use crate::domain::ports::{ChatBackend, ScreenshotProvider};
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

const SYSTEM_PROMPT: &str = r#"You are a helpful assistant that can take screenshots of maps and analyze San Francisco neighborhoods.

You have access to these tools:
1. take_google_maps_screenshot - Take screenshots of Google Maps for any location
2. take_hoodmaps_screenshot - Take screenshots of HoodMaps showing SF neighborhood zones
3. analyze_neighborhood - Use AI vision to analyze what type of neighborhood a location is

Your workflow for neighborhood analysis:
1. Take a Google Maps screenshot of the requested location
2. Take a HoodMaps screenshot to get the reference map with neighborhood zones
3. Use the vision AI to analyze both images and determine the neighborhood type

Be conversational and helpful. Explain what you're doing step by step."#;

const DEMO_SYSTEM_PROMPT: &str = r#"You are a helpful assistant that specializes in analyzing San Francisco neighborhoods.

When asked about neighborhood analysis, explain that you would normally:
1. Take screenshots of Google Maps for the location
2. Take screenshots of HoodMaps with neighborhood zones
3. Use AI vision to analyze both images
4. Provide detailed neighborhood classification

Be conversational and helpful. Explain your planned approach for the request."#;

pub const DEMO_FALLBACK_RESPONSE: &str = r#"I'd be happy to analyze the Mission District neighborhood for you!

Here's what I would normally do:
1. Take a Google Maps screenshot of the Mission District area
2. Capture a HoodMaps reference showing SF neighborhood zones
3. Use AI vision to analyze both images and determine the neighborhood type
4. Provide you with detailed insights about the area's characteristics

The Mission District is known for being a vibrant, diverse neighborhood with a rich Latino heritage, great food scene, and mix of residential and commercial areas. Would you like me to proceed with the detailed analysis?"#;

const DEMO_LOCATION: &str = "Mission District, San Francisco";

/// Sampling and screenshot defaults for the conversational agent.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    pub demo_mode: bool,
    /// Used when the model omits `use_test_image`.
    pub use_test_images: bool,
    pub test_pin_map: PathBuf,
    pub test_region_map: PathBuf,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1000,
            demo_mode: false,
            use_test_images: true,
            test_pin_map: PathBuf::from("test_images/sf_map_with_pin.png"),
            test_region_map: PathBuf::from("test_images/region_map.png"),
        }
    }
}

impl AgentSettings {
    pub fn from_config(config: &AppConfig, demo_mode: bool) -> Self {
        Self {
            temperature: config.chat.temperature,
            max_tokens: config.chat.max_tokens,
            demo_mode,
            use_test_images: config.screenshots.use_test_images,
            test_pin_map: PathBuf::from(&config.screenshots.test_pin_map),
            test_region_map: PathBuf::from(&config.screenshots.test_region_map),
        }
    }
}

pub struct ConversationalAgent<B: ChatBackend, S: ScreenshotProvider> {
    chat_backend: B,
    vision: VisionAgent<B>,
    screenshots: S,
    settings: AgentSettings,
    history: Vec<ChatMessage>,
}

impl<B: ChatBackend, S: ScreenshotProvider> ConversationalAgent<B, S> {
    pub fn new(chat_backend: B, vision: VisionAgent<B>, screenshots: S, settings: AgentSettings) -> Self {
        tracing::info!(
            "🤖 Conversational agent ready (chat: {}, vision: {}, demo: {})",
            chat_backend.model(),
            vision.model(),
            settings.demo_mode
        );
        Self {
            chat_backend,
            vision,
            screenshots,
            settings,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn reset_conversation(&mut self) {
        self.history.clear();
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    fn conversation_request(&self) -> ChatRequest {
        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.push(ChatMessage::system(SYSTEM_PROMPT));
        messages.extend(self.history.iter().cloned());

        ChatRequest::new(self.chat_backend.model(), messages)
            .temperature(self.settings.temperature)
            .max_tokens(self.settings.max_tokens)
    }

    /// One user turn. Tool calls requested by the model are executed before the final answer.
    /// A failed turn leaves the history as it was before the call.
    pub async fn chat(&mut self, user_message: &str) -> Result<String> {
        let turn_start = self.history.len();
        let reply = self.run_turn(user_message).await;
        if reply.is_err() {
            self.history.truncate(turn_start);
        }
        reply
    }

    async fn run_turn(&mut self, user_message: &str) -> Result<String> {
        self.history.push(ChatMessage::user(user_message));

        if self.settings.demo_mode {
            return Ok(self.demo_chat(user_message).await);
        }

        let request = self.conversation_request().tools(tool_definitions());
        let response = match self.chat_backend.complete(request).await {
            Ok(response) => response,
            Err(e) if e.to_string().to_lowercase().contains("tool") => {
                tracing::warn!("⚠️ Endpoint rejected tool calling ({}), using demo chat", e);
                return Ok(self.demo_chat(user_message).await);
            }
            Err(e) => return Err(e),
        };

        let message = first_message(response)?;
        let tool_calls = message.tool_calls().to_vec();

        if tool_calls.is_empty() {
            let content = message.content.unwrap_or_default();
            self.history.push(ChatMessage::assistant(content.clone()));
            return Ok(content);
        }

        tracing::info!("🔧 Model requested {} tool call(s)", tool_calls.len());
        self.history
            .push(ChatMessage::assistant_tool_calls(message.content, tool_calls.clone()));

        for call in &tool_calls {
            let result = self.execute_tool_call(call).await;
            self.history.push(ChatMessage::tool(call.id.clone(), result));
        }

        let final_response = self.chat_backend.complete(self.conversation_request()).await?;
        let final_message = first_message_text(final_response)?;
        self.history.push(ChatMessage::assistant(final_message.clone()));
        Ok(final_message)
    }

    /// Plain conversation without tools. Never fails: a canned answer covers endpoint errors.
    pub async fn demo_chat(&mut self, user_message: &str) -> String {
        let request = ChatRequest::new(
            self.chat_backend.model(),
            vec![
                ChatMessage::system(DEMO_SYSTEM_PROMPT),
                ChatMessage::user(user_message),
            ],
        )
        .temperature(self.settings.temperature)
        .max_tokens(500);

        let reply = match self.chat_backend.complete(request).await.and_then(first_message_text) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("⚠️ Demo chat failed ({}), using fallback response", e);
                DEMO_FALLBACK_RESPONSE.to_string()
            }
        };

        self.history.push(ChatMessage::assistant(reply.clone()));
        reply
    }

    pub async fn take_google_maps_screenshot(&self, location: &str, use_test_image: bool) -> ScreenshotResult {
        if use_test_image {
            return ScreenshotResult::captured(
                self.settings.test_pin_map.display().to_string(),
                CaptureMethod::TestImage,
            )
            .at_location(location);
        }

        tracing::info!("📸 Capturing Google Maps screenshot for {}", location);
        match self.screenshots.capture_pin_map(location).await {
            Ok(path) => ScreenshotResult::captured(path.display().to_string(), CaptureMethod::Browser),
            Err(e) => {
                tracing::error!("❌ Google Maps screenshot failed: {}", e);
                ScreenshotResult::failed(e)
            }
        }
        .at_location(location)
    }

    pub async fn take_hoodmaps_screenshot(&self, use_test_image: bool) -> ScreenshotResult {
        if use_test_image {
            return ScreenshotResult::captured(
                self.settings.test_region_map.display().to_string(),
                CaptureMethod::TestImage,
            );
        }

        tracing::info!("📸 Capturing HoodMaps screenshot");
        match self.screenshots.capture_region_map().await {
            Ok(path) => ScreenshotResult::captured(path.display().to_string(), CaptureMethod::Browser),
            Err(e) => {
                tracing::error!("❌ HoodMaps screenshot failed: {}", e);
                ScreenshotResult::failed(e)
            }
        }
    }

    pub async fn analyze_neighborhood(&self, pin_map_path: &Path, legend_map_path: &Path) -> AnalysisResult {
        self.vision
            .analyze_with_reference(legend_map_path, pin_map_path)
            .await
    }

    async fn dispatch(&self, request: ToolRequest) -> ToolOutcome {
        match request {
            ToolRequest::GoogleMapsScreenshot {
                location,
                use_test_image,
            } => ToolOutcome::Screenshot(
                self.take_google_maps_screenshot(
                    &location,
                    use_test_image.unwrap_or(self.settings.use_test_images),
                )
                .await,
            ),
            ToolRequest::HoodmapsScreenshot { use_test_image } => ToolOutcome::Screenshot(
                self.take_hoodmaps_screenshot(use_test_image.unwrap_or(self.settings.use_test_images))
                    .await,
            ),
            ToolRequest::AnalyzeNeighborhood {
                pin_map_path,
                legend_map_path,
            } => ToolOutcome::Analysis(
                self.analyze_neighborhood(Path::new(&pin_map_path), Path::new(&legend_map_path))
                    .await,
            ),
        }
    }

    /// Run one tool call and render its result as JSON for the model.
    pub async fn execute_tool_call(&self, call: &ToolCall) -> String {
        tracing::info!("🔧 Executing tool: {}", call.function.name);
        tracing::debug!("Tool arguments: {}", call.function.arguments);

        let outcome = match ToolRequest::from_call(call) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => {
                tracing::warn!("⚠️ Tool call rejected: {}", e);
                ToolOutcome::from(e)
            }
        };

        if !outcome.success() {
            tracing::warn!("⚠️ Tool {} reported failure", call.function.name);
        }
        outcome.to_json()
    }

    /// Screenshot both maps from the test images, classify, and format a report.
    pub async fn demo_vision_analysis(&self) -> String {
        tracing::info!("📸 Taking Google Maps screenshot...");
        let google = self.take_google_maps_screenshot(DEMO_LOCATION, true).await;
        tracing::info!("📸 Taking HoodMaps screenshot...");
        let hood = self.take_hoodmaps_screenshot(true).await;

        let (Some(pin_map), Some(legend_map)) = (google.screenshot_path, hood.screenshot_path) else {
            return "❌ Vision analysis encountered an error:\nscreenshots unavailable".to_string();
        };

        tracing::info!("🔍 Analyzing with {} vision...", self.vision.model());
        let analysis = self
            .analyze_neighborhood(Path::new(&pin_map), Path::new(&legend_map))
            .await;

        if analysis.success {
            let classification = analysis
                .neighborhood_type
                .map(|t| t.to_string())
                .unwrap_or_else(|| "Unknown".to_string());

            format!(
                "✅ Vision Analysis Complete!\n\n\
                 🏘️ **Neighborhood Classification:** {}\n\n\
                 📋 **Detailed Analysis:**\n{}\n\n\
                 🤖 **Models Used:**\n- Conversational: {}\n- Vision: {}",
                classification,
                analysis.raw_analysis.unwrap_or_default(),
                self.chat_backend.model(),
                analysis.model_used
            )
        } else {
            format!(
                "❌ Vision analysis encountered an error:\n{}\n\n\
                 The workflow is set up correctly, but there was an issue with the vision component.",
                analysis.error.unwrap_or_else(|| "Unknown error".to_string())
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::openai::api::{ChatResponse, FunctionCall, Role};
    use crate::utils::error::AgentError;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct ScriptedBackend {
        replies: Arc<Mutex<VecDeque<Result<Value>>>>,
        requests: Arc<Mutex<Vec<ChatRequest>>>,
    }

    impl ScriptedBackend {
        fn reply(self, message: Value) -> Self {
            self.replies
                .lock()
                .unwrap()
                .push_back(Ok(json!({"choices": [{"message": message}]})));
            self
        }

        fn fail(self, error: AgentError) -> Self {
            self.replies.lock().unwrap().push_back(Err(error));
            self
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: ChatRequest) -> Result<ChatResponse> {
            self.requests.lock().unwrap().push(request);
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected extra request")?;
            Ok(serde_json::from_value(reply).unwrap())
        }
    }

    struct FailingCapture;

    #[async_trait]
    impl ScreenshotProvider for FailingCapture {
        async fn capture_pin_map(&self, _address: &str) -> Result<PathBuf> {
            Err(AgentError::BrowserError {
                message: "no chrome".to_string(),
            })
        }

        async fn capture_region_map(&self) -> Result<PathBuf> {
            Ok(PathBuf::from("/tmp/hoodmaps_screenshot.png"))
        }
    }

    fn agent(
        chat: ScriptedBackend,
        vision: ScriptedBackend,
        settings: AgentSettings,
    ) -> ConversationalAgent<ScriptedBackend, FailingCapture> {
        ConversationalAgent::new(chat, VisionAgent::new(vision), FailingCapture, settings)
    }

    fn tool_call(id: &str, name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_plain_reply_is_recorded() {
        let chat = ScriptedBackend::default().reply(json!({"content": "Hello there!"}));
        let mut agent = agent(chat.clone(), ScriptedBackend::default(), AgentSettings::default());

        let reply = agent.chat("hi").await.unwrap();

        assert_eq!(reply, "Hello there!");
        assert_eq!(agent.history().len(), 2);
        assert_eq!(agent.history()[0].role, Role::User);
        assert_eq!(agent.history()[1].text_content(), Some("Hello there!"));

        let request = &chat.requests()[0];
        assert_eq!(request.tools.len(), 3);
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_tokens, Some(1000));
        assert_eq!(request.messages[0].role, Role::System);
    }

    #[tokio::test]
    async fn test_tool_calls_run_in_order_then_final_answer() {
        let chat = ScriptedBackend::default()
            .reply(json!({
                "content": null,
                "tool_calls": [
                    {"id": "call_1", "type": "function", "function": {"name": "take_hoodmaps_screenshot", "arguments": "{}"}},
                    {"id": "call_2", "type": "function", "function": {"name": "take_google_maps_screenshot", "arguments": "{\"location\": \"Mission District\", \"use_test_image\": false}"}}
                ]
            }))
            .reply(json!({"content": "Done: the Mission looks Hip."}));
        let mut agent = agent(chat.clone(), ScriptedBackend::default(), AgentSettings::default());

        let reply = agent.chat("What is the Mission like?").await.unwrap();
        assert_eq!(reply, "Done: the Mission looks Hip.");

        let history = agent.history();
        assert_eq!(history.len(), 5);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].tool_calls.as_ref().unwrap().len(), 2);
        assert_eq!(history[2].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(history[3].tool_call_id.as_deref(), Some("call_2"));

        let hood: Value = serde_json::from_str(history[2].text_content().unwrap()).unwrap();
        assert_eq!(hood["method"], "test_image");
        assert_eq!(hood["screenshot_path"], "test_images/region_map.png");

        let google: Value = serde_json::from_str(history[3].text_content().unwrap()).unwrap();
        assert_eq!(google["success"], false);
        assert_eq!(google["location"], "Mission District");
        assert!(google["error"].as_str().unwrap().contains("no chrome"));

        let requests = chat.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].tools.is_empty());
        assert_eq!(requests[1].messages.len(), 1 + 4);
    }

    #[tokio::test]
    async fn test_tool_rejection_falls_back_to_demo_chat() {
        let chat = ScriptedBackend::default()
            .fail(AgentError::ModelStatusError {
                status: 400,
                body: "\"auto\" tool choice requires --enable-auto-tool-choice".to_string(),
            })
            .reply(json!({"content": "I would take screenshots first."}));
        let mut agent = agent(chat.clone(), ScriptedBackend::default(), AgentSettings::default());

        let reply = agent.chat("Analyze SoMa").await.unwrap();

        assert_eq!(reply, "I would take screenshots first.");
        let demo_request = &chat.requests()[1];
        assert_eq!(demo_request.max_tokens, Some(500));
        assert!(demo_request.tools.is_empty());
        assert_eq!(demo_request.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_other_errors_propagate() {
        let chat = ScriptedBackend::default().fail(AgentError::ModelStatusError {
            status: 401,
            body: "invalid api key".to_string(),
        });
        let mut agent = agent(chat, ScriptedBackend::default(), AgentSettings::default());

        let err = agent.chat("hi").await.unwrap_err();
        assert!(matches!(err, AgentError::ModelStatusError { status: 401, .. }));
        assert!(agent.history().is_empty());
    }

    #[tokio::test]
    async fn test_failed_turn_does_not_leave_dangling_user_message() {
        let chat = ScriptedBackend::default()
            .fail(AgentError::ModelStatusError {
                status: 503,
                body: "overloaded".to_string(),
            })
            .reply(json!({"content": "Back online."}));
        let mut agent = agent(chat.clone(), ScriptedBackend::default(), AgentSettings::default());

        assert!(agent.chat("first try").await.is_err());
        assert_eq!(agent.chat("second try").await.unwrap(), "Back online.");

        let retry = &chat.requests()[1];
        let roles: Vec<Role> = retry.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User]);
        assert_eq!(agent.history().len(), 2);
    }

    #[tokio::test]
    async fn test_demo_mode_uses_fallback_when_endpoint_is_down() {
        let chat = ScriptedBackend::default().fail(AgentError::ModelResponseError {
            message: "connection refused".to_string(),
        });
        let settings = AgentSettings {
            demo_mode: true,
            ..AgentSettings::default()
        };
        let mut agent = agent(chat, ScriptedBackend::default(), settings);

        let reply = agent.chat("Tell me about the Mission").await.unwrap();

        assert_eq!(reply, DEMO_FALLBACK_RESPONSE);
        assert_eq!(agent.history().len(), 2);

        agent.reset_conversation();
        assert!(agent.history().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_reports_failure_json() {
        let agent = agent(
            ScriptedBackend::default(),
            ScriptedBackend::default(),
            AgentSettings::default(),
        );
        let result = agent
            .execute_tool_call(&tool_call("call_9", "order_pizza", "{}"))
            .await;

        let value: Value = serde_json::from_str(&result).unwrap();
        assert_eq!(value, json!({"success": false, "error": "Unknown function: order_pizza"}));
    }

    #[tokio::test]
    async fn test_live_region_capture_uses_provider() {
        let agent = agent(
            ScriptedBackend::default(),
            ScriptedBackend::default(),
            AgentSettings::default(),
        );
        let result = agent.take_hoodmaps_screenshot(false).await;
        assert!(result.success);
        assert_eq!(result.method, Some(CaptureMethod::Browser));
        assert_eq!(
            result.screenshot_path.as_deref(),
            Some("/tmp/hoodmaps_screenshot.png")
        );
    }

    #[tokio::test]
    async fn test_demo_vision_analysis_report() {
        let dir = tempfile::tempdir().unwrap();
        let pin = dir.path().join("pin.png");
        let region = dir.path().join("region.png");
        image::RgbImage::new(8, 8).save(&pin).unwrap();
        image::RgbImage::new(8, 8).save(&region).unwrap();

        let vision =
            ScriptedBackend::default().reply(json!({"content": "Neighborhood type: Hip (yellow)"}));
        let settings = AgentSettings {
            test_pin_map: pin,
            test_region_map: region,
            ..AgentSettings::default()
        };
        let agent = agent(ScriptedBackend::default(), vision, settings);

        let report = agent.demo_vision_analysis().await;

        assert!(report.contains("**Neighborhood Classification:** Hip"));
        assert!(report.contains("Neighborhood type: Hip (yellow)"));
        assert!(report.contains("- Vision: scripted"));
    }

    #[tokio::test]
    async fn test_demo_vision_analysis_reports_error() {
        let settings = AgentSettings {
            test_pin_map: PathBuf::from("/nonexistent/pin.png"),
            test_region_map: PathBuf::from("/nonexistent/region.png"),
            ..AgentSettings::default()
        };
        let agent = agent(ScriptedBackend::default(), ScriptedBackend::default(), settings);

        let report = agent.demo_vision_analysis().await;
        assert!(report.starts_with("❌ Vision analysis encountered an error:"));
    }
}
