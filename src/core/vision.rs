//! Vision classifier: asks a multimodal chat model which neighborhood zone a pin sits in.

use crate::adapters::openai::api::{ChatMessage, ChatRequest, ContentPart};
use crate::adapters::openai::first_message_text;
use crate::core::preprocess::{encode_file, encode_for_vision};
use crate::domain::classify::classify_label;
use crate::domain::model::AnalysisResult;
use crate::domain::ports::ChatBackend;
use crate::utils::error::{AgentError, Result};
use std::path::{Path, PathBuf};

const MAP_READER_PROMPT: &str = "You are an expert at reading maps and identifying neighborhood zones. Focus on the pin location and the colored zone it falls within. Be precise and specific.";

const SINGLE_MAP_PROMPT: &str = r#"This is a San Francisco neighborhood map with colored zones and a legend at the bottom showing:
- Offices (blue) - Business districts
- Rich (green) - Wealthy residential areas
- Hip (yellow) - Trendy, artistic neighborhoods
- Tourist (red) - Tourist areas
- Uni (dark blue) - University/student areas
- Normies (gray) - Regular residential neighborhoods

I can see a pin/marker on this map. Please:
1. Identify where the pin is located
2. Determine which colored zone the pin falls within
3. Match that zone to the legend category

Please respond with:
- Neighborhood type: [exact category from legend - must be one of: Offices, Rich, Hip, Tourist, Uni, Normies]
- Color observed: [color name]
- Location description: [brief description of where the pin is]
- Confidence: [high/medium/low]"#;

const REFERENCE_PROMPT: &str = r#"You are given two images of San Francisco.

Image 1 is a reference map of neighborhood zones with a color legend:
- Offices (blue) - Business districts
- Rich (green) - Wealthy residential areas
- Hip (yellow) - Trendy, artistic neighborhoods
- Tourist (red) - Tourist areas
- Uni (dark blue) - University/student areas
- Normies (gray) - Regular residential neighborhoods

Image 2 is a map of the same city with a pin/marker on the location of interest.

Please:
1. Find where the pin in image 2 is located
2. Find the same location on the reference map in image 1
3. Determine which colored zone that location falls within and match it to the legend

Please respond with:
- Neighborhood type: [exact category from legend - must be one of: Offices, Rich, Hip, Tourist, Uni, Normies]
- Color observed: [color name]
- Location description: [brief description of where the pin is]
- Confidence: [high/medium/low]"#;

const IS_MAP_PROMPT: &str = "Is this a map? Answer with one word: yes or no";
const COLORS_PROMPT: &str =
    "What are the main colors visible in this map? List only color names, separated by commas.";
const HAS_PIN_PROMPT: &str =
    "Is there a pin, marker, or pointer visible on this map? Answer: yes or no";

fn final_step_prompt(colors_found: &str, has_pin: bool) -> String {
    format!(
        r#"This is a neighborhood map. The colors represent:
- Blue = Offices
- Green = Rich
- Yellow = Hip
- Red = Tourist
- Dark Blue = Uni
- Gray = Normies

Colors found in image: {colors_found}
Pin detected: {has_pin}

Based on this information, what type of neighborhood is marked or most prominent?
Answer with just the neighborhood type name."#
    )
}

fn says_yes(answer: &str) -> bool {
    answer.to_lowercase().contains("yes")
}

/// Multimodal classifier over any OpenAI-compatible backend.
pub struct VisionAgent<B: ChatBackend> {
    backend: B,
    temperature: f32,
    max_tokens: u32,
    debug_dir: Option<PathBuf>,
}

impl<B: ChatBackend> VisionAgent<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            temperature: 0.1,
            max_tokens: 300,
            debug_dir: None,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Where step-by-step preprocessing drops its intermediate images.
    pub fn with_debug_dir(mut self, debug_dir: Option<PathBuf>) -> Self {
        self.debug_dir = debug_dir;
        self
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn ask(&self, messages: Vec<ChatMessage>, max_tokens: u32) -> Result<String> {
        let request = ChatRequest::new(self.backend.model(), messages)
            .temperature(self.temperature)
            .max_tokens(max_tokens);
        first_message_text(self.backend.complete(request).await?)
    }

    async fn ask_about_image(&self, prompt: &str, image_b64: &str, max_tokens: u32) -> Result<String> {
        let message = ChatMessage::user_parts(vec![
            ContentPart::text(prompt),
            ContentPart::png_base64(image_b64),
        ]);
        self.ask(vec![message], max_tokens).await
    }

    fn classified(&self, raw: String) -> AnalysisResult {
        let neighborhood_type = classify_label(&raw);
        match neighborhood_type {
            Some(t) => tracing::info!("🏘️ Classified as {} ({})", t, t.info().color),
            None => tracing::warn!("⚠️ No neighborhood label found in model answer"),
        }
        AnalysisResult::from_analysis(self.backend.model(), raw, neighborhood_type)
    }

    fn folded(&self, result: Result<AnalysisResult>) -> AnalysisResult {
        result.unwrap_or_else(|e| {
            tracing::error!("❌ Vision analysis failed: {}", e);
            AnalysisResult::failure(self.backend.model(), e)
        })
    }

    /// Classify a single map that carries zones, legend and pin together.
    pub async fn analyze(&self, map_path: &Path) -> AnalysisResult {
        tracing::info!("🔍 Analyzing {} with {}", map_path.display(), self.model());
        let result = self.try_analyze(map_path).await;
        self.folded(result)
    }

    async fn try_analyze(&self, map_path: &Path) -> Result<AnalysisResult> {
        let image_b64 = encode_file(map_path)?;
        let messages = vec![
            ChatMessage::system(MAP_READER_PROMPT),
            ChatMessage::user_parts(vec![
                ContentPart::text(SINGLE_MAP_PROMPT),
                ContentPart::png_base64(&image_b64),
            ]),
        ];
        let raw = self.ask(messages, self.max_tokens).await?;
        Ok(self.classified(raw))
    }

    /// Compare a legend map against a pinned map; the legend image goes first.
    pub async fn analyze_with_reference(&self, legend_map_path: &Path, pin_map_path: &Path) -> AnalysisResult {
        tracing::info!(
            "🔍 Analyzing {} against reference {} with {}",
            pin_map_path.display(),
            legend_map_path.display(),
            self.model()
        );
        let result = self.try_analyze_with_reference(legend_map_path, pin_map_path).await;
        self.folded(result)
    }

    async fn try_analyze_with_reference(
        &self,
        legend_map_path: &Path,
        pin_map_path: &Path,
    ) -> Result<AnalysisResult> {
        let legend_b64 = encode_file(legend_map_path)?;
        let pin_b64 = encode_file(pin_map_path)?;
        let messages = vec![
            ChatMessage::system(MAP_READER_PROMPT),
            ChatMessage::user_parts(vec![
                ContentPart::text(REFERENCE_PROMPT),
                ContentPart::png_base64(&legend_b64),
                ContentPart::png_base64(&pin_b64),
            ]),
        ];
        let raw = self.ask(messages, self.max_tokens).await?;
        Ok(self.classified(raw))
    }

    /// Four small questions over a preprocessed image, for weaker vision models.
    pub async fn analyze_step_by_step(&self, map_path: &Path) -> AnalysisResult {
        tracing::info!("🔍 Step-by-step analysis of {}", map_path.display());
        let result = self.try_step_by_step(map_path).await;
        self.folded(result)
    }

    async fn try_step_by_step(&self, map_path: &Path) -> Result<AnalysisResult> {
        let (image_b64, metadata) = encode_for_vision(map_path, self.debug_dir.as_deref())?;
        tracing::debug!("Image processed: {:?}", metadata);

        let is_map = says_yes(&self.ask_about_image(IS_MAP_PROMPT, &image_b64, 10).await?);
        if !is_map {
            return Err(AgentError::ModelResponseError {
                message: "Image does not appear to be a map".to_string(),
            });
        }

        let colors_found = self.ask_about_image(COLORS_PROMPT, &image_b64, 50).await?;
        let has_pin = says_yes(&self.ask_about_image(HAS_PIN_PROMPT, &image_b64, 10).await?);
        tracing::debug!("Colors: {}, pin: {}", colors_found.trim(), has_pin);

        let final_answer = self
            .ask_about_image(&final_step_prompt(&colors_found, has_pin), &image_b64, 50)
            .await?;

        let raw = format!(
            "Step 1 (is map): {}\nStep 2 (colors): {}\nStep 3 (has pin): {}\nFinal: {}",
            is_map, colors_found, has_pin, final_answer
        );
        let neighborhood_type = classify_label(&final_answer);
        Ok(AnalysisResult::from_analysis(self.backend.model(), raw, neighborhood_type)
            .with_metadata(metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::openai::api::{ChatResponse, MessageContent};
    use crate::domain::model::NeighborhoodType;
    use async_trait::async_trait;
    use image::DynamicImage;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedBackend {
        replies: Mutex<VecDeque<Result<String>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        fn model(&self) -> &str {
            "scripted-vision"
        }

        async fn complete(&self, request: ChatRequest) -> Result<ChatResponse> {
            self.requests.lock().unwrap().push(request);
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected extra request")?;
            Ok(serde_json::from_value(serde_json::json!({
                "choices": [{"message": {"content": reply}}]
            }))
            .unwrap())
        }
    }

    fn image_parts(request: &ChatRequest) -> usize {
        request
            .messages
            .iter()
            .filter_map(|m| match &m.content {
                Some(MessageContent::Parts(parts)) => Some(parts),
                _ => None,
            })
            .flatten()
            .filter(|p| matches!(p, ContentPart::ImageUrl { .. }))
            .count()
    }

    fn map_fixture(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        DynamicImage::new_rgb8(400, 300).save(&path).unwrap();
        path
    }

    #[tokio::test]
    async fn test_analyze_classifies_answer() {
        let dir = tempfile::tempdir().unwrap();
        let map = map_fixture(dir.path(), "map.png");
        let agent = VisionAgent::new(ScriptedBackend::new(vec![Ok(
            "Neighborhood type: Hip\nColor observed: yellow".to_string(),
        )]));

        let result = agent.analyze(&map).await;

        assert!(result.success);
        assert_eq!(result.model_used, "scripted-vision");
        assert_eq!(result.neighborhood_type, Some(NeighborhoodType::Hip));
        assert_eq!(result.neighborhood_info.unwrap().color, "yellow");

        let requests = agent.backend().requests();
        assert_eq!(requests[0].temperature, Some(0.1));
        assert_eq!(requests[0].max_tokens, Some(300));
        assert_eq!(image_parts(&requests[0]), 1);
    }

    #[tokio::test]
    async fn test_reference_sends_legend_then_pin() {
        let dir = tempfile::tempdir().unwrap();
        let legend = dir.path().join("legend.png");
        let pin = dir.path().join("pin.png");
        DynamicImage::new_rgb8(10, 10).save(&legend).unwrap();
        DynamicImage::new_rgb8(20, 20).save(&pin).unwrap();

        let agent = VisionAgent::new(ScriptedBackend::new(vec![Ok(
            "The pin falls in a red Tourist zone".to_string(),
        )]));
        let result = agent.analyze_with_reference(&legend, &pin).await;
        assert_eq!(result.neighborhood_type, Some(NeighborhoodType::Tourist));

        let requests = agent.backend().requests();
        let parts = match &requests[0].messages[1].content {
            Some(MessageContent::Parts(parts)) => parts.clone(),
            other => panic!("expected parts, got {other:?}"),
        };
        let urls: Vec<String> = parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::ImageUrl { image_url } => Some(image_url.url.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0], format!("data:image/png;base64,{}", encode_file(&legend).unwrap()));
        assert_eq!(urls[1], format!("data:image/png;base64,{}", encode_file(&pin).unwrap()));
    }

    #[tokio::test]
    async fn test_unlabelled_answer_is_success_without_type() {
        let dir = tempfile::tempdir().unwrap();
        let map = map_fixture(dir.path(), "map.png");
        let agent = VisionAgent::new(ScriptedBackend::new(vec![Ok(
            "I cannot see any marker.".to_string(),
        )]));

        let result = agent.analyze(&map).await;
        assert!(result.success);
        assert!(result.neighborhood_type.is_none());
        assert!(result.neighborhood_info.is_none());
    }

    #[tokio::test]
    async fn test_backend_error_is_folded() {
        let dir = tempfile::tempdir().unwrap();
        let map = map_fixture(dir.path(), "map.png");
        let agent = VisionAgent::new(ScriptedBackend::new(vec![Err(
            AgentError::ModelStatusError {
                status: 500,
                body: "overloaded".to_string(),
            },
        )]));

        let result = agent.analyze(&map).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("500"));
        assert!(result.raw_analysis.is_none());
    }

    #[tokio::test]
    async fn test_missing_image_is_folded() {
        let agent = VisionAgent::new(ScriptedBackend::new(vec![]));
        let result = agent
            .analyze_with_reference(Path::new("/nonexistent/legend.png"), Path::new("/nonexistent/pin.png"))
            .await;
        assert!(!result.success);
        assert!(result.error.is_some());
        assert!(agent.backend().requests().is_empty());
    }

    #[tokio::test]
    async fn test_step_by_step_runs_four_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let map = map_fixture(dir.path(), "map.png");
        let agent = VisionAgent::new(ScriptedBackend::new(vec![
            Ok("Yes".to_string()),
            Ok("red, green, blue".to_string()),
            Ok("yes".to_string()),
            Ok("Rich".to_string()),
        ]));

        let result = agent.analyze_step_by_step(&map).await;

        assert!(result.success);
        assert_eq!(result.neighborhood_type, Some(NeighborhoodType::Rich));
        let raw = result.raw_analysis.unwrap();
        assert!(raw.contains("Step 1 (is map): true"));
        assert!(raw.contains("Step 2 (colors): red, green, blue"));
        assert!(raw.contains("Step 3 (has pin): true"));
        assert!(raw.ends_with("Final: Rich"));
        assert_eq!(result.metadata.unwrap().processed_size, Some((360, 240)));

        let limits: Vec<Option<u32>> = agent
            .backend()
            .requests()
            .iter()
            .map(|r| r.max_tokens)
            .collect();
        assert_eq!(limits, vec![Some(10), Some(50), Some(10), Some(50)]);
    }

    #[tokio::test]
    async fn test_step_by_step_stops_when_not_a_map() {
        let dir = tempfile::tempdir().unwrap();
        let map = map_fixture(dir.path(), "cat.png");
        let agent = VisionAgent::new(ScriptedBackend::new(vec![Ok("No".to_string())]));

        let result = agent.analyze_step_by_step(&map).await;

        assert!(!result.success);
        assert!(result
            .error
            .unwrap()
            .contains("Image does not appear to be a map"));
        assert_eq!(agent.backend().requests().len(), 1);
    }
}
