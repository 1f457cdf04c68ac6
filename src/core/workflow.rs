//! Address workflow: extract an address from the conversation, capture both maps, classify.

use crate::adapters::openai::api::{ChatMessage, ChatRequest};
use crate::adapters::openai::first_message_text;
use crate::core::vision::VisionAgent;
use crate::domain::model::{AddressExtraction, WorkflowOutcome};
use crate::domain::ports::{ChatBackend, ScreenshotProvider};
use crate::utils::error::{AgentError, Result};
use std::collections::BTreeMap;

const EXTRACTION_PROMPT: &str = r#"You extract street addresses from conversations with users.
Read every user message and return a single JSON object with these fields:
- "street": street name and number, or null
- "city": city name, or null
- "state": state or province, or null
- "country": country, or null
- "full_address": the most complete address string you can build
- "confidence": number between 0 and 1, how sure you are the address is complete and unambiguous
- "clarifying_question": when confidence is low, one short question that would resolve the ambiguity, else null
Return only the JSON object."#;

const DEFAULT_FOLLOW_UP: &str = "Please provide more address information";

/// Strip an optional ```json fence around a model answer.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

pub fn parse_extraction(answer: &str) -> Result<AddressExtraction> {
    serde_json::from_str(strip_code_fence(answer)).map_err(|e| AgentError::ModelResponseError {
        message: format!("address extraction was not valid JSON: {}", e),
    })
}

pub struct AddressWorkflow<B: ChatBackend, S: ScreenshotProvider> {
    extractor: B,
    vision: VisionAgent<B>,
    screenshots: S,
    confidence_threshold: f64,
    user_messages: Vec<String>,
}

impl<B: ChatBackend, S: ScreenshotProvider> AddressWorkflow<B, S> {
    pub fn new(extractor: B, vision: VisionAgent<B>, screenshots: S, confidence_threshold: f64) -> Self {
        Self {
            extractor,
            vision,
            screenshots,
            confidence_threshold,
            user_messages: Vec::new(),
        }
    }

    /// Ask the model for a structured address built from every user message so far.
    pub async fn extract_address(&mut self, message: &str) -> Result<AddressExtraction> {
        self.user_messages.push(message.to_string());

        let conversation = self
            .user_messages
            .iter()
            .map(|m| format!("User: {}", m))
            .collect::<Vec<_>>()
            .join("\n");

        let request = ChatRequest::new(
            self.extractor.model(),
            vec![
                ChatMessage::system(EXTRACTION_PROMPT),
                ChatMessage::user(conversation),
            ],
        )
        .temperature(0.0)
        .max_tokens(300)
        .json_response();

        let answer = first_message_text(self.extractor.complete(request).await?)?;
        let extraction = parse_extraction(&answer)?;
        tracing::debug!(
            "Extracted '{}' (confidence {:.2})",
            extraction.full_address,
            extraction.confidence
        );
        Ok(extraction)
    }

    pub async fn process_user_message(&mut self, message: &str) -> Result<WorkflowOutcome> {
        tracing::info!("💬 Processing message: {}", message);
        let address = self.extract_address(message).await?;

        if address.confidence <= self.confidence_threshold {
            tracing::info!(
                "❓ Address confidence {:.2} below threshold {:.2}",
                address.confidence,
                self.confidence_threshold
            );
            return Ok(WorkflowOutcome::NeedsMoreInfo {
                message: address
                    .clarifying_question
                    .filter(|q| !q.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_FOLLOW_UP.to_string()),
            });
        }

        tracing::info!("📍 Address extracted: {}", address.full_address);

        let mut errors = BTreeMap::new();
        let region_map = self
            .screenshots
            .capture_region_map()
            .await
            .map_err(|e| errors.insert("region_map".to_string(), e.to_string()))
            .ok();
        let pin_map = self
            .screenshots
            .capture_pin_map(&address.full_address)
            .await
            .map_err(|e| errors.insert("pin_map".to_string(), e.to_string()))
            .ok();

        let (Some(region_map), Some(pin_map)) = (region_map, pin_map) else {
            tracing::error!("❌ Screenshot capture failed: {:?}", errors);
            return Ok(WorkflowOutcome::ScreenshotsFailed {
                address,
                errors,
                message: "Failed to capture screenshots".to_string(),
            });
        };

        let analysis = self.vision.analyze_with_reference(&region_map, &pin_map).await;
        let message = match analysis.neighborhood_type {
            Some(t) => format!(
                "Address '{}' is located in a {} neighborhood ({})",
                address.full_address,
                t,
                t.info().color
            ),
            None => format!("Address '{}' could not be classified", address.full_address),
        };

        tracing::info!("✅ {}", message);
        Ok(WorkflowOutcome::Complete {
            address,
            analysis,
            message,
        })
    }
}
