use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Chat loop with tool calling
    Interactive,
    /// One canned question answered in demo mode
    Conversation,
    /// Classify the configured test images
    Vision,
    /// Address extraction → screenshots → classification loop
    Workflow,
}

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "hood-agent")]
#[command(about = "Classify San Francisco addresses into neighborhood types with chat and vision models")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long, value_enum, default_value = "interactive")]
    pub mode: RunMode,

    /// Answer without tool calls (explain the plan instead)
    #[arg(long)]
    pub demo: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = CliConfig::parse_from(["hood-agent"]);
        assert_eq!(cli.mode, RunMode::Interactive);
        assert!(cli.config.is_none());
        assert!(!cli.demo);
    }

    #[test]
    fn test_mode_and_config() {
        let cli = CliConfig::parse_from(["hood-agent", "--mode", "vision", "-c", "agent.toml", "-v"]);
        assert_eq!(cli.mode, RunMode::Vision);
        assert_eq!(cli.config.as_deref(), Some("agent.toml"));
        assert!(cli.verbose);
    }
}
