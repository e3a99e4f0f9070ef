mod cli;
mod logging;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

use sc_av::{ConversionInput, SilkConverter, ToolRegistry};
use sc_core::config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(cli.config.as_deref())?;
    cli.apply(&mut config);

    match cli.command.clone().unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let _guard = logging::init(&config)?;
            tracing::info!("Starting audio converter v{}", env!("CARGO_PKG_VERSION"));
            log_config_source(&cli);
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(sc_server::start(config))?;
            Ok(())
        }
        Commands::Convert { input } => {
            let _guard = logging::init(&config)?;
            log_config_source(&cli);
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert_once(config, &input))
        }
        Commands::CheckTools => check_tools(&config),
        Commands::Validate => validate_config(&cli, &config),
        Commands::Version => {
            println!("silkcast {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn log_config_source(cli: &Cli) {
    match &cli.config {
        Some(path) if path.exists() => tracing::info!("Loaded config from {}", path.display()),
        Some(path) => tracing::warn!("No config file at {}; using defaults", path.display()),
        None => tracing::debug!("No config file given; using defaults"),
    }
}

async fn convert_once(config: Config, input: &str) -> Result<()> {
    config.storage.ensure_dirs()?;
    let tools = Arc::new(ToolRegistry::discover(&config.tools));
    let converter = SilkConverter::new(tools, &config)?;

    let output = converter
        .convert(ConversionInput::from_location(input))
        .await?;

    tracing::info!("Converted {} in {:.2}s", input, output.elapsed.as_secs_f64());
    println!("{}", output.path.display());
    Ok(())
}

fn check_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.tools);
    let mut all_ok = true;

    for tool in tools.check_all() {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }
        println!(" - {} [{:?}]", tool.path.display(), tool.source);
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
        Ok(())
    } else {
        anyhow::bail!("Some tools are missing. Conversions will fail until they are installed.")
    }
}

fn validate_config(cli: &Cli, config: &Config) -> Result<()> {
    match &cli.config {
        Some(p) if p.exists() => println!("Validating config: {}", p.display()),
        Some(p) => println!("No config file at {}, using defaults", p.display()),
        None => println!("No config file specified, using defaults"),
    }

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Uploads: {}", config.storage.upload_dir.display());
    println!("  Outputs: {}", config.storage.output_dir.display());
    println!("  Logs: {}", config.storage.log_dir.display());

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("✓ Configuration is valid");
    } else {
        for warning in &warnings {
            println!("! {warning}");
        }
    }
    Ok(())
}
