use crate::utils::error::{AgentError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_ADDRESS: &str = "208 Anza St, San Francisco, CA";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub chat: ModelEndpoint,
    pub vision: VisionConfig,
    pub maps: MapsConfig,
    pub screenshots: ScreenshotConfig,
    pub workflow: WorkflowConfig,
    pub logging: LoggingConfig,
}

/// One OpenAI-compatible endpoint plus sampling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelEndpoint {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: Option<u64>,
}

impl Default for ModelEndpoint {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1".to_string(),
            model: "/models/DeepSeek-R1-Distill-Llama-8B".to_string(),
            api_key: None,
            temperature: 0.7,
            max_tokens: 1000,
            timeout_seconds: None,
        }
    }
}

impl ModelEndpoint {
    /// 設定檔 → OPENAI_API_KEY → "fake"（自架端點不驗證金鑰）
    pub fn resolved_api_key(&self) -> String {
        resolve_secret(self.api_key.as_deref(), "OPENAI_API_KEY")
            .unwrap_or_else(|| "fake".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: Option<u64>,
    /// Use the preprocess + multi-question analysis instead of a single prompt.
    pub step_by_step: bool,
    pub debug_dir: Option<String>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            temperature: 0.1,
            max_tokens: 300,
            timeout_seconds: None,
            step_by_step: false,
            debug_dir: None,
        }
    }
}

impl VisionConfig {
    pub fn endpoint(&self) -> ModelEndpoint {
        ModelEndpoint {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout_seconds: self.timeout_seconds,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapsConfig {
    pub google_api_key: Option<String>,
    pub geocode_endpoint: String,
    pub hoodmaps_url: String,
    pub html_port: u16,
    pub zoom: u8,
    pub output_dir: String,
    pub chrome_path: Option<String>,
    pub server_warmup_ms: u64,
    pub page_settle_ms: u64,
    pub toggle_settle_ms: u64,
    pub navigation_timeout_seconds: u64,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            google_api_key: None,
            geocode_endpoint: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
            hoodmaps_url: "https://hoodmaps.com/san-francisco-neighborhood-map".to_string(),
            html_port: 8080,
            zoom: 13,
            output_dir: ".".to_string(),
            chrome_path: None,
            server_warmup_ms: 2000,
            page_settle_ms: 5000,
            toggle_settle_ms: 3000,
            navigation_timeout_seconds: 30,
        }
    }
}

impl MapsConfig {
    pub fn resolved_google_api_key(&self) -> Option<String> {
        resolve_secret(self.google_api_key.as_deref(), "GOOGLE_MAP_API_KEY")
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        Path::new(&self.output_dir).join(file_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotConfig {
    /// Default for `use_test_image` when the model leaves it out.
    pub use_test_images: bool,
    pub test_pin_map: String,
    pub test_region_map: String,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            use_test_images: true,
            test_pin_map: "test_images/sf_map_with_pin.png".to_string(),
            test_region_map: "test_images/region_map.png".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub confidence_threshold: f64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// "compact" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "compact".to_string(),
        }
    }
}

/// 未被替換的 ${VAR} 視為未設定
fn resolve_secret(configured: Option<&str>, env_var: &str) -> Option<String> {
    configured
        .map(str::trim)
        .filter(|value| !value.is_empty() && !value.starts_with("${"))
        .map(str::to_string)
        .or_else(|| std::env::var(env_var).ok().filter(|v| !v.trim().is_empty()))
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AgentError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 有指定檔案就載入，否則使用預設值
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AgentError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OPENAI_API_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AgentError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_endpoint("chat", &self.chat)?;
        validate_endpoint("vision", &self.vision.endpoint())?;

        validation::validate_url("maps.geocode_endpoint", &self.maps.geocode_endpoint)?;
        validation::validate_url("maps.hoodmaps_url", &self.maps.hoodmaps_url)?;
        validation::validate_path("maps.output_dir", &self.maps.output_dir)?;
        validation::validate_range("maps.zoom", self.maps.zoom, 1, 21)?;

        validation::validate_image_path("screenshots.test_pin_map", &self.screenshots.test_pin_map)?;
        validation::validate_image_path(
            "screenshots.test_region_map",
            &self.screenshots.test_region_map,
        )?;

        validation::validate_range(
            "workflow.confidence_threshold",
            self.workflow.confidence_threshold,
            0.0,
            1.0,
        )?;

        match self.logging.format.to_ascii_lowercase().as_str() {
            "compact" | "json" => Ok(()),
            _ => Err(AgentError::InvalidConfigValueError {
                field: "logging.format".to_string(),
                value: self.logging.format.clone(),
                reason: "Supported formats: compact, json".to_string(),
            }),
        }
    }
}

fn validate_endpoint(section: &str, endpoint: &ModelEndpoint) -> Result<()> {
    validation::validate_url(&format!("{}.base_url", section), &endpoint.base_url)?;
    validation::validate_non_empty_string(&format!("{}.model", section), &endpoint.model)?;
    validation::validate_range(
        &format!("{}.temperature", section),
        endpoint.temperature,
        0.0,
        2.0,
    )?;
    validation::validate_positive_number(&format!("{}.max_tokens", section), endpoint.max_tokens, 1)
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
