//! CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use stackprobe_cli::{Cli, CliError, Commands, handlers};

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    // Logs go to stderr so the report on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Commands::Run {
            config,
            output_dir,
            no_write,
        } => handlers::run::execute(config.as_deref(), &output_dir, !no_write).await,
        Commands::CheckConfig { config } => handlers::check_config::execute(config.as_deref()),
        Commands::DefaultConfig => handlers::default_config::execute(),
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            err.downcast_ref::<CliError>().map_or(1, CliError::exit_code)
        }
    };
    std::process::exit(code);
}
