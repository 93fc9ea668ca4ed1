use crate::config::Config;
use crate::error::Result;
use crate::generation::{ContentType, GenerationRequest, GenerationService};
use crate::storage::SqliteStorage;
use colored::Colorize;

/// Run one generation from the command line, charging `user`
///
/// # Arguments
///
/// * `config` - Loaded configuration
/// * `user` - Account to charge
/// * `prompt` - Prompt text
/// * `kind` - `lesson` or `presentation` (legacy `pdf`/`ppt` accepted)
/// * `include_images` - Ask for image suggestions
///
/// # Errors
///
/// Returns error if the kind is unknown or the generation fails
pub async fn run_generate(
    config: &Config,
    user: &str,
    prompt: &str,
    kind: &str,
    include_images: bool,
) -> Result<()> {
    let content_type: ContentType = kind.parse()?;
    let storage = SqliteStorage::from_config(&config.database)?;
    let service = GenerationService::from_config(config, storage)?;

    let request = GenerationRequest::new(prompt, content_type, include_images);
    println!(
        "Forging a {} for {} ({} credit(s))...",
        content_type.label().to_lowercase(),
        user.cyan(),
        service.quote(&request)
    );

    let outcome = service.generate(user, &request, None).await?;

    println!("{}", "Done.".green().bold());
    println!("  file:    {}", outcome.file_url);
    println!("  history: {}", outcome.item.id);
    println!("  balance: {}", outcome.balance);
    Ok(())
}
