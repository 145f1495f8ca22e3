//! bbq10-touch CLI
//!
//! Configuration checks and device discovery for bbq10-touch.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "bbq10-touch")]
#[command(about = "Touch sensor tooling for BBQ10 keyboards")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/bbq10-touch/config.kdl")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration file
    Validate,

    /// List available input devices
    Devices,
}

fn main() -> miette::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&cli.config).into_owned().into();
    tracing::debug!("Using configuration at {}", config_path.display());

    match cli.command {
        Commands::Validate => cmd_validate(&config_path),
        Commands::Devices => cmd_devices(),
    }
}

fn cmd_validate(config_path: &Path) -> miette::Result<()> {
    println!("Validating configuration: {}", config_path.display());

    let config = bbq10_touch_config::parse_config(config_path)?;
    let filter = &config.touch.filter;

    println!("Configuration is valid!");
    println!("  Keyboard: {}", config.keyboard.as_deref().unwrap_or("<unset>"));
    println!("  Sensor:   {}", config.sensor_name().unwrap_or("<unset>"));
    println!("  Activation: {:?}", config.touch.activation);
    println!("  Input as:   {:?}", config.touch.input_as);
    println!(
        "  Filter: threshold={} gain-x={} gain-y={} decay-tick={}ns min-interval={}ms",
        filter.threshold,
        filter.gain_x,
        filter.gain_y,
        filter.decay_tick_ns,
        filter.min_emit_interval_ms
    );

    if config.keyboard.is_none() {
        println!("  Warning: no `keyboard` set, the daemon will refuse to start");
    }

    Ok(())
}

fn cmd_devices() -> miette::Result<()> {
    println!("Available input devices:\n");

    let devices =
        bbq10_touch::device::enumerate_devices().map_err(|e| miette::miette!("{:#}", e))?;

    for device in &devices {
        let device_type = match (device.keyboard, device.relative_motion) {
            (true, true) => "keyboard+motion",
            (true, false) => "keyboard",
            (false, true) => "motion",
            (false, false) => "other",
        };

        println!("  {} [{}]", device.name, device_type);
        println!("    Path: {}", device.path.display());
        println!("    ID:   {}", device.vendor_product());
        println!();
    }

    if devices.is_empty() {
        println!("  (none readable, try running as root or joining the input group)");
    }

    Ok(())
}
