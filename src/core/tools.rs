//! The three tools the conversational model may call, and their typed arguments.

use crate::adapters::openai::api::{FunctionDef, ToolCall, ToolDefinition};
use crate::domain::model::{AnalysisResult, ScreenshotResult};
use crate::utils::error::{AgentError, Result};
use serde::Deserialize;
use serde_json::json;

pub const TAKE_GOOGLE_MAPS_SCREENSHOT: &str = "take_google_maps_screenshot";
pub const TAKE_HOODMAPS_SCREENSHOT: &str = "take_hoodmaps_screenshot";
pub const ANALYZE_NEIGHBORHOOD: &str = "analyze_neighborhood";

fn function_tool(name: &str, description: &str, parameters: serde_json::Value) -> ToolDefinition {
    ToolDefinition {
        tool_type: "function".to_string(),
        function: FunctionDef {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        },
    }
}

/// Tool catalogue sent with every tool-enabled chat request.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        function_tool(
            TAKE_GOOGLE_MAPS_SCREENSHOT,
            "Take a screenshot of Google Maps for a given location",
            json!({
                "type": "object",
                "properties": {
                    "location": {
                        "type": "string",
                        "description": "The location to screenshot (address or place name)"
                    },
                    "use_test_image": {
                        "type": "boolean",
                        "description": "Whether to use test images instead of actual screenshots",
                        "default": true
                    }
                },
                "required": ["location"]
            }),
        ),
        function_tool(
            TAKE_HOODMAPS_SCREENSHOT,
            "Take a screenshot of HoodMaps for San Francisco neighborhood analysis",
            json!({
                "type": "object",
                "properties": {
                    "use_test_image": {
                        "type": "boolean",
                        "description": "Whether to use test images instead of actual screenshots",
                        "default": true
                    }
                }
            }),
        ),
        function_tool(
            ANALYZE_NEIGHBORHOOD,
            "Analyze neighborhood type from maps using vision AI",
            json!({
                "type": "object",
                "properties": {
                    "pin_map_path": {
                        "type": "string",
                        "description": "Path to the map with pin location"
                    },
                    "legend_map_path": {
                        "type": "string",
                        "description": "Path to the reference map with neighborhood zones"
                    }
                },
                "required": ["pin_map_path", "legend_map_path"]
            }),
        ),
    ]
}

#[derive(Debug, Deserialize)]
struct GoogleMapsArgs {
    location: String,
    #[serde(default)]
    use_test_image: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct HoodmapsArgs {
    #[serde(default)]
    use_test_image: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeArgs {
    pin_map_path: String,
    legend_map_path: String,
}

/// A parsed tool call. `use_test_image: None` means the caller's default applies.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    GoogleMapsScreenshot {
        location: String,
        use_test_image: Option<bool>,
    },
    HoodmapsScreenshot {
        use_test_image: Option<bool>,
    },
    AnalyzeNeighborhood {
        pin_map_path: String,
        legend_map_path: String,
    },
}

fn parse_args<T: for<'de> Deserialize<'de>>(name: &str, arguments: &str) -> Result<T> {
    let arguments = if arguments.trim().is_empty() {
        "{}"
    } else {
        arguments
    };
    serde_json::from_str(arguments).map_err(|e| AgentError::ToolError {
        message: format!("invalid arguments for {}: {}", name, e),
    })
}

impl ToolRequest {
    pub fn parse(name: &str, arguments: &str) -> Result<Self> {
        match name {
            TAKE_GOOGLE_MAPS_SCREENSHOT => {
                let args: GoogleMapsArgs = parse_args(name, arguments)?;
                Ok(ToolRequest::GoogleMapsScreenshot {
                    location: args.location,
                    use_test_image: args.use_test_image,
                })
            }
            TAKE_HOODMAPS_SCREENSHOT => {
                let args: HoodmapsArgs = parse_args(name, arguments)?;
                Ok(ToolRequest::HoodmapsScreenshot {
                    use_test_image: args.use_test_image,
                })
            }
            ANALYZE_NEIGHBORHOOD => {
                let args: AnalyzeArgs = parse_args(name, arguments)?;
                Ok(ToolRequest::AnalyzeNeighborhood {
                    pin_map_path: args.pin_map_path,
                    legend_map_path: args.legend_map_path,
                })
            }
            other => Err(AgentError::UnknownToolError {
                name: other.to_string(),
            }),
        }
    }

    pub fn from_call(call: &ToolCall) -> Result<Self> {
        Self::parse(&call.function.name, &call.function.arguments)
    }
}

/// What a tool call produced, rendered back to the model as JSON.
#[derive(Debug, Clone)]
pub enum ToolOutcome {
    Screenshot(ScreenshotResult),
    Analysis(AnalysisResult),
    Failed(String),
}

impl ToolOutcome {
    pub fn success(&self) -> bool {
        match self {
            ToolOutcome::Screenshot(r) => r.success,
            ToolOutcome::Analysis(r) => r.success,
            ToolOutcome::Failed(_) => false,
        }
    }

    pub fn to_json(&self) -> String {
        let rendered = match self {
            ToolOutcome::Screenshot(r) => serde_json::to_string_pretty(r),
            ToolOutcome::Analysis(r) => serde_json::to_string_pretty(r),
            ToolOutcome::Failed(error) => return failure_json(error),
        };
        rendered.unwrap_or_else(|e| failure_json(&e.to_string()))
    }
}

impl From<AgentError> for ToolOutcome {
    fn from(e: AgentError) -> Self {
        ToolOutcome::Failed(e.to_string())
    }
}

fn failure_json(error: &str) -> String {
    let value = json!({"success": false, "error": error});
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}
