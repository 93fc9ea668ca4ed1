use crate::cli::HistoryCommand;
use crate::config::Config;
use crate::error::Result;
use crate::storage::SqliteStorage;
use colored::Colorize;
use prettytable::{format, Table};

/// Longest prompt shown in a table cell before it is cut
const PROMPT_COLUMN_WIDTH: usize = 48;

/// Handle history commands
pub fn handle_history(config: &Config, command: HistoryCommand) -> Result<()> {
    let storage = SqliteStorage::from_config(&config.database)?;

    match command {
        HistoryCommand::List { user, limit } => {
            let items = storage.list_history(&user, Some(limit))?;

            if items.is_empty() {
                println!("{}", format!("No generations found for {}.", user).yellow());
                return Ok(());
            }

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

            table.add_row(prettytable::row![
                "ID".bold(),
                "Type".bold(),
                "Prompt".bold(),
                "Created".bold(),
                "File".bold()
            ]);

            for item in items {
                let id_short: String = item.id.chars().take(8).collect();
                let created = item.created_at.format("%Y-%m-%d %H:%M").to_string();

                table.add_row(prettytable::row![
                    id_short.cyan(),
                    item.content_type.label(),
                    truncate(&item.prompt, PROMPT_COLUMN_WIDTH),
                    created,
                    item.file_path
                ]);
            }

            println!("\nGeneration history for {}:", user.bold());
            table.printstd();
            println!();
        }
    }

    Ok(())
}

/// Cut `text` to at most `max` characters, marking the cut with `...`
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate("Weather words", 48), "Weather words");
    }

    #[test]
    fn test_truncate_counts_characters() {
        let long = "é".repeat(60);
        let cut = truncate(&long, 10);
        assert_eq!(cut.chars().count(), 10);
        assert!(cut.ends_with("..."));
    }
}
