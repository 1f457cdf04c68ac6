use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Image processing error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Model endpoint returned {status}: {body}")]
    ModelStatusError { status: u16, body: String },

    #[error("Unexpected model response: {message}")]
    ModelResponseError { message: String },

    #[error("Failed to geocode: {status}")]
    GeocodeError { status: String },

    #[error("Browser automation failed: {message}")]
    BrowserError { message: String },

    #[error("Map page server error: {message}")]
    ServerError { message: String },

    #[error("Unknown function: {name}")]
    UnknownToolError { name: String },

    #[error("Tool call failed: {message}")]
    ToolError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Model,
    Capture,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl AgentError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AgentError::ApiError(_) | AgentError::GeocodeError { .. } => ErrorCategory::Network,
            AgentError::ConfigError { .. }
            | AgentError::MissingConfigError { .. }
            | AgentError::InvalidConfigValueError { .. }
            | AgentError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            AgentError::ModelStatusError { .. }
            | AgentError::ModelResponseError { .. }
            | AgentError::UnknownToolError { .. }
            | AgentError::ToolError { .. } => ErrorCategory::Model,
            AgentError::BrowserError { .. } | AgentError::ServerError { .. } => {
                ErrorCategory::Capture
            }
            AgentError::SerializationError(_) | AgentError::ImageError(_) => ErrorCategory::Data,
            AgentError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 遠端服務暫時失敗，重跑通常可以解決
            ErrorCategory::Network | ErrorCategory::Model => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Capture | ErrorCategory::Data => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            AgentError::ApiError(_) => {
                "Check network connectivity and that the model endpoint is reachable".to_string()
            }
            AgentError::IoError(_) => {
                "Check that the file exists and that you have permission to access it".to_string()
            }
            AgentError::SerializationError(_) => {
                "The service returned data in an unexpected shape; re-run with --verbose to inspect it"
                    .to_string()
            }
            AgentError::ImageError(_) => {
                "Make sure the screenshot is a valid PNG or JPEG image".to_string()
            }
            AgentError::ConfigError { .. } | AgentError::ConfigValidationError { .. } => {
                "Review the TOML configuration file".to_string()
            }
            AgentError::MissingConfigError { field } => {
                format!("Set {} in the environment or the configuration file", field)
            }
            AgentError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of '{}' in the configuration file", field)
            }
            AgentError::ModelStatusError { status, .. } if *status == 401 || *status == 403 => {
                "Check the API key (OPENAI_API_KEY or api_key in the configuration)".to_string()
            }
            AgentError::ModelStatusError { .. } | AgentError::ModelResponseError { .. } => {
                "Verify the model name and base_url, or try a different model".to_string()
            }
            AgentError::GeocodeError { .. } => {
                "Use a more specific address and check GOOGLE_MAP_API_KEY".to_string()
            }
            AgentError::BrowserError { .. } => {
                "Install Chrome/Chromium or set HOOD_AGENT_CHROME_PATH".to_string()
            }
            AgentError::ServerError { .. } => {
                "Make sure maps.html_port is free or pick another port".to_string()
            }
            AgentError::UnknownToolError { .. } | AgentError::ToolError { .. } => {
                "The model produced an invalid tool call; try rephrasing the request".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach a remote service: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Model => format!("The language model call failed: {}", self),
            ErrorCategory::Capture => format!("Could not capture the map screenshot: {}", self),
            ErrorCategory::Data => format!("Could not process the data: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// 對應 CLI 的結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
