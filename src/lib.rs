pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, RunMode};

pub use adapters::browser::BrowserCapture;
pub use adapters::openai::ChatClient;
pub use config::AppConfig;
pub use core::{AddressWorkflow, AgentSettings, ConversationalAgent, VisionAgent};
pub use domain::model::{AnalysisResult, NeighborhoodType, WorkflowOutcome};
pub use utils::error::{AgentError, Result};
