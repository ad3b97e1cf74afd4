use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use wirekit::{Factory, Manifest};
use wirekit_bootstrap::{AppConfig, CliArgs, OutputFormat};

mod platform;
mod report;

use platform::DescriptorPlatform;

/// WireKit CLI - resolve an application manifest into providers, components and routes
#[derive(Parser)]
#[command(name = "wirekit-cli")]
#[command(about = "WireKit CLI - resolve an application manifest into providers, components and routes")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Manifest file (.yaml, .yml or .json), overrides config
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Root module name, overrides the manifest's root
    #[arg(long)]
    root: Option<String>,

    /// Output format: tree, json or yaml
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Print the assembled route tree
    Routes,
    /// Resolve the whole application and report a summary
    Check,
    /// List providers and components with their resolved dependencies
    Providers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        manifest: cli.manifest.as_ref().map(|p| p.to_string_lossy().to_string()),
        root: cli.root.clone(),
        format: cli.format,
        verbose: cli.verbose,
    };

    // Layered config:
    // 1) defaults -> 2) YAML (if provided) -> 3) env (WIREKIT__*) -> 4) CLI overrides
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.clone().unwrap_or_default();
    wirekit_bootstrap::init_logging(&logging_config, &log_base_dir(cli.config.as_deref()));

    if cli.print_config {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    let command = cli.command.unwrap_or(Commands::Routes);
    let output = run(&config, command).await?;
    print!("{output}");
    Ok(())
}

/// Relative log files live next to the config file, or in the working directory.
fn log_base_dir(config: Option<&Path>) -> PathBuf {
    config
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

async fn resolve(config: &AppConfig) -> Result<Factory> {
    let path = config.manifest_path()?;
    let mut manifest = Manifest::load(&path)
        .with_context(|| format!("Failed to load manifest {}", path.display()))?;
    if let Some(root) = &config.manifest.root {
        manifest.root = root.clone();
    }
    tracing::info!(manifest = %path.display(), root = %manifest.root, "Resolving application");

    let compiled = manifest
        .into_registry()
        .with_context(|| format!("Invalid manifest {}", path.display()))?;
    let platform = Arc::new(DescriptorPlatform::new(compiled.registry.clone()));
    let mut factory = Factory::new(compiled.registry, platform);
    factory
        .create(compiled.root)
        .await
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    Ok(factory)
}

async fn run(config: &AppConfig, command: Commands) -> Result<String> {
    let factory = resolve(config).await?;
    let format = config.output.format;

    match command {
        Commands::Routes => report::emit(&factory.routes().to_vec(), format, |routes| {
            report::route_tree(routes)
        }),
        Commands::Check => report::emit(&report::check_summary(&factory), format, report::summary_line),
        Commands::Providers => report::emit(&report::providers_report(&factory), format, report::providers_tree),
    }
}
