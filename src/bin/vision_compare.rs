use anyhow::Context;
use clap::Parser;
use hood_agent::adapters::openai::api::{ChatMessage, ChatRequest};
use hood_agent::adapters::openai::first_message_text;
use hood_agent::domain::ports::ChatBackend;
use hood_agent::utils::logger;
use hood_agent::{AnalysisResult, AppConfig, ChatClient, VisionAgent};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vision-compare")]
#[command(about = "Compare basic and step-by-step vision analysis of the same map")]
struct Args {
    /// Map image to analyze
    #[arg(default_value = "test_images/pin_map.png")]
    image: PathBuf,

    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Only check that the vision endpoint answers a text prompt
    #[arg(long)]
    ping: bool,

    /// Directory for preprocessing debug images
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn print_result(title: &str, result: &AnalysisResult) {
    println!("\n{}", title);
    println!("{}", "-".repeat(50));
    println!("Model: {}", result.model_used);
    println!("Success: {}", result.success);

    if !result.success {
        println!("❌ Error: {}", result.error.as_deref().unwrap_or("Unknown error"));
        return;
    }

    println!("Analysis: {}", result.raw_analysis.as_deref().unwrap_or_default());
    match result.neighborhood_type {
        Some(t) => println!("✅ Detected neighborhood: {} ({})", t, t.info().description),
        None => println!("⚠️  Failed to detect neighborhood type"),
    }
    if let Some(metadata) = &result.metadata {
        println!("Image: {:?} -> {:?}", metadata.original_size, metadata.processed_size);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let config = AppConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    let client = ChatClient::from_endpoint(&config.vision.endpoint())?;

    if args.ping {
        let request = ChatRequest::new(
            client.model(),
            vec![ChatMessage::user("Tell me a short joke about maps.")],
        )
        .max_tokens(30);
        let reply = first_message_text(client.complete(request).await?)
            .context("vision endpoint did not answer")?;
        println!("✅ {} answered: {}", client.model(), reply.trim());
        return Ok(());
    }

    anyhow::ensure!(args.image.exists(), "{} not found", args.image.display());

    let agent = VisionAgent::new(client)
        .with_sampling(config.vision.temperature, config.vision.max_tokens)
        .with_debug_dir(args.debug_dir.or(config.vision.debug_dir.map(PathBuf::from)));

    let basic = agent.analyze(&args.image).await;
    print_result("Basic analysis", &basic);

    let stepwise = agent.analyze_step_by_step(&args.image).await;
    print_result("Step-by-step analysis", &stepwise);

    Ok(())
}
