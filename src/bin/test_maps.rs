use anyhow::Context;
use clap::Parser;
use hood_agent::core::pin_map;
use hood_agent::utils::logger;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "test-maps")]
#[command(about = "Write synthetic neighborhood maps, or add a pin to an existing map")]
struct Args {
    /// Existing map to add a pin to; synthetic maps are written when omitted
    #[arg(long)]
    source: Option<PathBuf>,

    /// Pin x coordinate (pixels)
    #[arg(long, default_value_t = 1400)]
    x: i64,

    /// Pin y coordinate (pixels)
    #[arg(long, default_value_t = 900)]
    y: i64,

    #[arg(short, long, default_value = "test_images")]
    output_dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("cannot create {}", args.output_dir.display()))?;

    if let Some(source) = &args.source {
        let output = args.output_dir.join("sf_map_with_pin.png");
        pin_map::add_pin_to_map(source, &output, args.x, args.y)
            .with_context(|| format!("cannot add pin to {}", source.display()))?;
        println!("Created {} with pin at ({}, {})", output.display(), args.x, args.y);
        return Ok(());
    }

    // 紅色區塊內放針，方便驗證分類結果
    let region = pin_map::synthesize_region_map(800, 600);
    let pinned = pin_map::synthesize_pin_map(&region, 200, 150);

    let region_path = args.output_dir.join("region_map.png");
    let pin_path = args.output_dir.join("pin_map.png");
    region.save(&region_path).context("cannot write region map")?;
    pinned.save(&pin_path).context("cannot write pin map")?;

    println!("Created {}", region_path.display());
    println!("Created {} (pin in the red zone)", pin_path.display());
    Ok(())
}
