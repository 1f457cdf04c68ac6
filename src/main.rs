use clap::Parser;
use hood_agent::adapters::browser::BrowserCapture;
use hood_agent::utils::{logger, validation::Validate};
use hood_agent::{
    AddressWorkflow, AgentError, AgentSettings, AppConfig, ChatClient, CliConfig,
    ConversationalAgent, RunMode, VisionAgent,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

const CONVERSATION_PROMPT: &str =
    "Can you analyze what type of neighborhood the Mission District is in San Francisco?";

fn report_and_exit(e: &AgentError) -> ! {
    tracing::error!(
        "❌ hood-agent failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    std::process::exit(e.exit_code());
}

fn vision_agent(config: &AppConfig) -> hood_agent::Result<VisionAgent<ChatClient>> {
    let client = ChatClient::from_endpoint(&config.vision.endpoint())?;
    Ok(VisionAgent::new(client)
        .with_sampling(config.vision.temperature, config.vision.max_tokens)
        .with_debug_dir(config.vision.debug_dir.as_ref().map(PathBuf::from)))
}

fn conversational_agent(
    config: &AppConfig,
    demo_mode: bool,
) -> hood_agent::Result<ConversationalAgent<ChatClient, BrowserCapture>> {
    Ok(ConversationalAgent::new(
        ChatClient::from_endpoint(&config.chat)?,
        vision_agent(config)?,
        BrowserCapture::new(config.maps.clone()),
        AgentSettings::from_config(config, demo_mode),
    ))
}

/// 從 stdin 讀一行；EOF 回傳 None
async fn prompt_line(
    lines: &mut tokio::io::Lines<BufReader<tokio::io::Stdin>>,
    prompt: &str,
) -> hood_agent::Result<Option<String>> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?.map(|line| line.trim().to_string()))
}

async fn run_interactive(config: &AppConfig, demo_mode: bool) -> hood_agent::Result<()> {
    let mut agent = conversational_agent(config, demo_mode)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("SF Neighborhood Analysis System");
    println!("Interactive mode (type 'quit' to exit)");

    while let Some(input) = prompt_line(&mut lines, "\nYou: ").await? {
        if matches!(input.to_lowercase().as_str(), "quit" | "exit" | "bye") {
            break;
        }
        if input.is_empty() {
            continue;
        }

        match agent.chat(&input).await {
            Ok(reply) => println!("Agent: {}", reply),
            Err(e) => {
                tracing::error!("❌ Chat turn failed: {}", e);
                eprintln!("❌ {}", e.user_friendly_message());
            }
        }
    }

    Ok(())
}

async fn run_conversation(config: &AppConfig) -> hood_agent::Result<()> {
    let mut agent = conversational_agent(config, true)?;

    println!("User: {}", CONVERSATION_PROMPT);
    let reply = agent.chat(CONVERSATION_PROMPT).await?;
    println!("Agent: {}", reply);

    println!("\n{}", agent.demo_vision_analysis().await);
    Ok(())
}

async fn run_vision(config: &AppConfig) -> hood_agent::Result<()> {
    let vision = vision_agent(config)?;
    let pin_map = Path::new(&config.screenshots.test_pin_map);
    let region_map = Path::new(&config.screenshots.test_region_map);

    println!(
        "Analyzing: {} vs {}",
        pin_map.display(),
        region_map.display()
    );

    let result = if config.vision.step_by_step {
        vision.analyze_step_by_step(pin_map).await
    } else {
        vision.analyze_with_reference(region_map, pin_map).await
    };

    if result.success {
        let label = result
            .neighborhood_type
            .map(|t| t.to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        println!("Neighborhood type: {}", label);
        println!(
            "Analysis: {}",
            result.raw_analysis.as_deref().unwrap_or("No analysis")
        );
    } else {
        println!(
            "Vision analysis failed: {}",
            result.error.as_deref().unwrap_or("Unknown error")
        );
    }
    Ok(())
}

async fn run_workflow(config: &AppConfig) -> hood_agent::Result<()> {
    let mut workflow = AddressWorkflow::new(
        ChatClient::from_endpoint(&config.chat)?,
        vision_agent(config)?,
        BrowserCapture::new(config.maps.clone()),
        config.workflow.confidence_threshold,
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Multi-Agent Address Classification System");
    println!("Type 'quit' to exit");
    println!("{}", "-".repeat(50));

    while let Some(input) = prompt_line(&mut lines, "\nYou: ").await? {
        if input.eq_ignore_ascii_case("quit") {
            break;
        }
        if input.is_empty() {
            continue;
        }

        match workflow.process_user_message(&input).await {
            Ok(outcome) => println!("\nSystem: {}", serde_json::to_string_pretty(&outcome)?),
            Err(e) => {
                tracing::error!("❌ Workflow step failed: {}", e);
                eprintln!("❌ {}", e.user_friendly_message());
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 設定檔載入失敗時仍需要日誌輸出
    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(cli.verbose);
            report_and_exit(&e);
        }
    };

    // 初始化日誌
    logger::init_logger(cli.verbose, &config.logging.format);

    tracing::info!("🚀 Starting hood-agent ({:?} mode)", cli.mode);
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        report_and_exit(&e);
    }

    let result = match cli.mode {
        RunMode::Interactive => run_interactive(&config, cli.demo).await,
        RunMode::Conversation => run_conversation(&config).await,
        RunMode::Vision => run_vision(&config).await,
        RunMode::Workflow => run_workflow(&config).await,
    };

    match result {
        Ok(()) => tracing::info!("👋 hood-agent finished"),
        Err(e) => report_and_exit(&e),
    }
}
