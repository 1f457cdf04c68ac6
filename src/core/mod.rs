pub mod agent;
pub mod pin_map;
pub mod preprocess;
pub mod tools;
pub mod vision;
pub mod workflow;

pub use agent::{AgentSettings, ConversationalAgent};
pub use vision::VisionAgent;
pub use workflow::AddressWorkflow;
