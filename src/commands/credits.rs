use crate::cli::CreditsCommand;
use crate::config::Config;
use crate::error::Result;
use crate::storage::SqliteStorage;
use colored::Colorize;

/// Handle credit commands
pub fn handle_credits(config: &Config, command: CreditsCommand) -> Result<()> {
    let storage = SqliteStorage::from_config(&config.database)?;

    match command {
        CreditsCommand::Show { user } => match storage.account(&user)? {
            Some(account) => {
                println!(
                    "{} has {} credit(s)",
                    account.id.cyan(),
                    account.credit_balance.to_string().bold()
                );
                if let Some(email) = account.email {
                    println!("  email:   {}", email);
                }
                println!(
                    "  created: {}",
                    account.created_at.format("%Y-%m-%d %H:%M")
                );
            }
            None => {
                println!("{}", format!("No account found for {}.", user).yellow());
            }
        },
        CreditsCommand::Grant {
            user,
            amount,
            email,
        } => {
            let balance = storage.grant(&user, amount, email.as_deref())?;
            tracing::info!(user_id = %user, amount, "Granted credits");
            println!(
                "{}",
                format!("Granted {} credit(s) to {}; balance is now {}", amount, user, balance).green()
            );
        }
    }

    Ok(())
}
