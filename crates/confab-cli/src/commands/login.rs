use anyhow::{Context, Result};
use colored::Colorize;
use confab_infrastructure::ConfabPaths;
use confab_infrastructure::storage::{SecretConfig, SecretStorage};
use rustyline::DefaultEditor;

pub fn run(paths: &ConfabPaths) -> Result<()> {
    let storage = SecretStorage::with_path(paths.secret_file()?);

    let mut rl = DefaultEditor::new()?;
    let token = rl.readline("API token: ").context("No token entered")?;
    let token = token.trim();
    if token.is_empty() {
        anyhow::bail!("The API token must not be empty");
    }

    storage.save(&SecretConfig {
        api_token: Some(token.to_string()),
    })?;
    tracing::info!("[Config] Stored API token");
    println!(
        "{}",
        format!("Token saved to {}", storage.path().display()).bright_green()
    );
    Ok(())
}
