use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The six neighborhood labels, in the order the classifier checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeighborhoodType {
    Offices,
    Rich,
    Hip,
    Tourist,
    Uni,
    Normies,
}

impl NeighborhoodType {
    pub const ALL: [NeighborhoodType; 6] = [
        NeighborhoodType::Offices,
        NeighborhoodType::Rich,
        NeighborhoodType::Hip,
        NeighborhoodType::Tourist,
        NeighborhoodType::Uni,
        NeighborhoodType::Normies,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NeighborhoodType::Offices => "Offices",
            NeighborhoodType::Rich => "Rich",
            NeighborhoodType::Hip => "Hip",
            NeighborhoodType::Tourist => "Tourist",
            NeighborhoodType::Uni => "Uni",
            NeighborhoodType::Normies => "Normies",
        }
    }

    pub fn info(&self) -> NeighborhoodInfo {
        let (color, description) = match self {
            NeighborhoodType::Offices => ("blue", "Business district, corporate area"),
            NeighborhoodType::Rich => ("green", "Wealthy residential area"),
            NeighborhoodType::Hip => ("yellow", "Trendy, artistic neighborhoods"),
            NeighborhoodType::Tourist => ("red", "Tourist hotspots, attractions"),
            NeighborhoodType::Uni => ("dark blue", "University area, student housing"),
            NeighborhoodType::Normies => ("gray", "Regular residential neighborhoods"),
        };
        NeighborhoodInfo {
            color: color.to_string(),
            description: description.to_string(),
        }
    }
}

impl fmt::Display for NeighborhoodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborhoodInfo {
    pub color: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_size: Option<(u32, u32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_size: Option<(u32, u32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_kb: Option<f64>,
}

/// Outcome of one vision classification. Failures are carried in `error`
/// rather than returned as `Err`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub success: bool,
    pub model_used: String,
    pub raw_analysis: Option<String>,
    pub neighborhood_type: Option<NeighborhoodType>,
    pub neighborhood_info: Option<NeighborhoodInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ImageMetadata>,
    pub error: Option<String>,
}

impl AnalysisResult {
    pub fn from_analysis(
        model_used: impl Into<String>,
        raw_analysis: String,
        neighborhood_type: Option<NeighborhoodType>,
    ) -> Self {
        Self {
            success: true,
            model_used: model_used.into(),
            raw_analysis: Some(raw_analysis),
            neighborhood_type,
            neighborhood_info: neighborhood_type.map(|t| t.info()),
            metadata: None,
            error: None,
        }
    }

    pub fn failure(model_used: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            success: false,
            model_used: model_used.into(),
            raw_analysis: None,
            neighborhood_type: None,
            neighborhood_info: None,
            metadata: None,
            error: Some(error.to_string()),
        }
    }

    pub fn with_metadata(mut self, metadata: ImageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMethod {
    TestImage,
    Browser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<CaptureMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScreenshotResult {
    pub fn captured(path: impl Into<String>, method: CaptureMethod) -> Self {
        Self {
            success: true,
            screenshot_path: Some(path.into()),
            location: None,
            method: Some(method),
            captured_at: Some(Utc::now()),
            error: None,
        }
    }

    pub fn failed(error: impl fmt::Display) -> Self {
        Self {
            success: false,
            screenshot_path: None,
            location: None,
            method: None,
            captured_at: None,
            error: Some(error.to_string()),
        }
    }

    pub fn at_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// 模型常以 `null` 表示「還沒有地址」，視同缺值
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Address pulled out of free-form user messages by the chat model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressExtraction {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub full_address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarifying_question: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkflowOutcome {
    Complete {
        address: AddressExtraction,
        analysis: AnalysisResult,
        message: String,
    },
    ScreenshotsFailed {
        address: AddressExtraction,
        errors: BTreeMap<String, String>,
        message: String,
    },
    NeedsMoreInfo {
        message: String,
    },
}

impl WorkflowOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            WorkflowOutcome::Complete { .. } => "complete",
            WorkflowOutcome::ScreenshotsFailed { .. } => "screenshots_failed",
            WorkflowOutcome::NeedsMoreInfo { .. } => "needs_more_info",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            WorkflowOutcome::Complete { message, .. }
            | WorkflowOutcome::ScreenshotsFailed { message, .. }
            | WorkflowOutcome::NeedsMoreInfo { message } => message,
        }
    }
}
