use anyhow::Context;
use clap::Parser;
use hood_agent::adapters::browser::BrowserCapture;
use hood_agent::config::toml_config::DEFAULT_ADDRESS;
use hood_agent::domain::ports::ScreenshotProvider;
use hood_agent::utils::logger;
use hood_agent::AppConfig;

#[derive(Parser)]
#[command(name = "capture-maps")]
#[command(about = "Capture the HoodMaps region map and a Google Maps pin map for an address")]
struct Args {
    /// Address to drop the pin on
    #[arg(default_value = DEFAULT_ADDRESS)]
    address: String,

    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Only capture the Google Maps pin map
    #[arg(long)]
    skip_region: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let config = AppConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    let capture = BrowserCapture::new(config.maps);

    if !args.skip_region {
        println!("📸 Capturing HoodMaps region map...");
        let region = capture
            .capture_region_map()
            .await
            .context("HoodMaps capture failed")?;
        println!("   ✅ {}", region.display());
    }

    println!("📸 Capturing Google Maps pin map for {}...", args.address);
    let pin = capture
        .capture_pin_map(&args.address)
        .await
        .with_context(|| format!("pin map capture failed for '{}'", args.address))?;
    println!("   ✅ {}", pin.display());

    Ok(())
}
