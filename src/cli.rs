//! Command-line interface definition for Lesson Forge
//!
//! This module defines the CLI structure using clap's derive API,
//! providing the `serve` command for the web service and a few operator
//! commands for generating documents, managing credits and inspecting history.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Lesson Forge - lesson plan and presentation generator
///
/// Serves the dashboard, login and auth callback pages plus the JSON API,
/// and provides operator commands against the same ledger database.
#[derive(Parser, Debug, Clone)]
#[command(name = "lesson-forge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Override the ledger database path
    #[arg(long, env = "LESSON_FORGE_DB")]
    pub database: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Lesson Forge
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Interface to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Generate a document for a user, charging their balance
    Generate {
        /// Account id to charge
        #[arg(short, long)]
        user: String,

        /// Prompt text
        #[arg(long)]
        prompt: String,

        /// Content type: lesson or presentation
        #[arg(short, long, default_value = "lesson")]
        kind: String,

        /// Request images in the generated content
        #[arg(long)]
        images: bool,
    },

    /// Inspect or adjust credit balances
    Credits {
        /// Credits subcommand
        #[command(subcommand)]
        command: CreditsCommand,
    },

    /// Inspect generation history
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

/// Credit management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum CreditsCommand {
    /// Show the balance of an account
    Show {
        /// Account id
        #[arg(short, long)]
        user: String,
    },

    /// Add credits to an account (e.g. after an external bundle purchase)
    Grant {
        /// Account id
        #[arg(short, long)]
        user: String,

        /// Number of credits to add
        #[arg(short, long)]
        amount: u32,

        /// Email to record if the account is new
        #[arg(long)]
        email: Option<String>,
    },
}

/// History subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List generations for an account, newest first
    List {
        /// Account id
        #[arg(short, long)]
        user: String,

        /// Maximum number of rows
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            database: None,
            verbose: false,
            json_logs: false,
            command: Commands::Serve {
                host: None,
                port: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Serve {
                host: None,
                port: None
            }
        ));
    }

    #[test]
    fn test_cli_parse_serve_with_port() {
        let cli = Cli::try_parse_from(["lesson-forge", "serve", "--port", "3000"]).unwrap();
        if let Commands::Serve { host, port } = cli.command {
            assert_eq!(host, None);
            assert_eq!(port, Some(3000));
        } else {
            panic!("Expected Serve command");
        }
    }

    #[test]
    fn test_cli_parse_generate() {
        let cli = Cli::try_parse_from([
            "lesson-forge",
            "generate",
            "--user",
            "u-1",
            "--prompt",
            "Past tense for A2 learners",
            "--kind",
            "presentation",
            "--images",
        ])
        .unwrap();
        if let Commands::Generate {
            user,
            prompt,
            kind,
            images,
        } = cli.command
        {
            assert_eq!(user, "u-1");
            assert_eq!(prompt, "Past tense for A2 learners");
            assert_eq!(kind, "presentation");
            assert!(images);
        } else {
            panic!("Expected Generate command");
        }
    }

    #[test]
    fn test_cli_parse_generate_defaults_to_lesson() {
        let cli =
            Cli::try_parse_from(["lesson-forge", "generate", "-u", "u-1", "--prompt", "x"])
                .unwrap();
        if let Commands::Generate { kind, images, .. } = cli.command {
            assert_eq!(kind, "lesson");
            assert!(!images);
        } else {
            panic!("Expected Generate command");
        }
    }

    #[test]
    fn test_cli_parse_credits_grant() {
        let cli = Cli::try_parse_from([
            "lesson-forge",
            "credits",
            "grant",
            "--user",
            "u-1",
            "--amount",
            "50",
        ])
        .unwrap();
        match cli.command {
            Commands::Credits {
                command:
                    CreditsCommand::Grant {
                        user,
                        amount,
                        email,
                    },
            } => {
                assert_eq!(user, "u-1");
                assert_eq!(amount, 50);
                assert_eq!(email, None);
            }
            _ => panic!("Expected Credits Grant command"),
        }
    }

    #[test]
    fn test_cli_parse_history_list_default_limit() {
        let cli = Cli::try_parse_from(["lesson-forge", "history", "list", "-u", "u-1"]).unwrap();
        match cli.command {
            Commands::History {
                command: HistoryCommand::List { user, limit },
            } => {
                assert_eq!(user, "u-1");
                assert_eq!(limit, 20);
            }
            _ => panic!("Expected History List command"),
        }
    }

    #[test]
    fn test_cli_parse_global_database_flag() {
        let cli = Cli::try_parse_from([
            "lesson-forge",
            "--database",
            "/tmp/forge.db",
            "credits",
            "show",
            "-u",
            "u-1",
        ])
        .unwrap();
        assert_eq!(cli.database, Some(PathBuf::from("/tmp/forge.db")));
    }

    #[test]
    fn test_cli_rejects_missing_command() {
        assert!(Cli::try_parse_from(["lesson-forge"]).is_err());
    }
}
