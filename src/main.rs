//! Lesson Forge - lesson plan and presentation generator
//!
#![doc = "Main entry point for the Lesson Forge server and operator commands."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lesson_forge::cli::{Cli, Commands};
use lesson_forge::commands;
use lesson_forge::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Serve { .. } => {
            commands::run_serve(config).await?;
            Ok(())
        }
        Commands::Generate {
            user,
            prompt,
            kind,
            images,
        } => {
            tracing::debug!("Generating {} for {}", kind, user);
            commands::run_generate(&config, &user, &prompt, &kind, images).await?;
            Ok(())
        }
        Commands::Credits { command } => {
            commands::handle_credits(&config, command)?;
            Ok(())
        }
        Commands::History { command } => {
            commands::handle_history(&config, command)?;
            Ok(())
        }
    }
}

/// Initialize the tracing subscriber
///
/// `RUST_LOG` wins when set; otherwise `--verbose` switches the crate to
/// debug level.
fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "lesson_forge=debug,tower_http=debug"
    } else {
        "lesson_forge=info,tower_http=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
