mod args;
mod cmd;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sentinel_core::config::AgentConfig;
use sentinel_core::SentinelError;

use args::ConfigArgs;

#[derive(Parser)]
#[command(
    name = "sentinel",
    about = "Autonomous treasury agent: executes due TreasuryVault payout policies",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Defaults to `run`
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the vault and execute due policies until Ctrl-C
    Run,

    /// Run a single evaluation cycle and print the report
    Once,

    /// Validate configuration, vault reachability and agent authorization
    Check,
}

fn main() {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run);

    let default_level = match (&command, cli.json) {
        (Commands::Run, _) => tracing::Level::INFO,
        (_, true) => tracing::Level::WARN,
        (_, false) => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = load_config(&cli.config).and_then(|config| match command {
        Commands::Run => cmd::run::run(config),
        Commands::Once => cmd::once::run(config, cli.json),
        Commands::Check => cmd::check::run(config, cli.json),
    });

    if let Err(e) = result {
        match e.downcast_ref::<SentinelError>() {
            Some(SentinelError::InvalidConfig(issues)) => {
                eprintln!("error: configuration validation failed:");
                for issue in issues {
                    eprintln!("  - {issue}");
                }
            }
            _ => eprintln!("error: {e:#}"),
        }
        std::process::exit(1);
    }
}

fn load_config(args: &ConfigArgs) -> Result<AgentConfig> {
    Ok(AgentConfig::from_raw(&args.to_raw())?)
}
