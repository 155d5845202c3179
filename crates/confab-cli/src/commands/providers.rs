use crate::context::AppContext;
use anyhow::Result;
use colored::Colorize;
use confab_core::provider::HandshakePhase;

pub async fn list(ctx: &AppContext) -> Result<()> {
    let handshake = ctx.handshake()?;
    let providers = handshake.refresh().await?;

    if providers.is_empty() {
        println!("{}", "No providers available.".bright_black());
        return Ok(());
    }

    for provider in providers {
        let status = if provider.connected {
            "connected".bright_green()
        } else {
            "not connected".bright_black()
        };
        println!(
            "{:<16} {:<24} {:<8} {}",
            provider.name.bright_cyan(),
            provider.display_name,
            provider.auth_type.to_string(),
            status
        );
    }
    Ok(())
}

pub async fn connect(ctx: &AppContext, name: &str) -> Result<()> {
    let handshake = ctx.handshake()?;
    let auth_url = handshake.start(name).await?;

    println!("{}", "Open this URL to authorize access:".bright_yellow());
    println!("  {}", auth_url.underline());
    println!(
        "{}",
        format!(
            "Then run: confab providers callback {} --code <CODE> --state <STATE>",
            name
        )
        .bright_black()
    );
    Ok(())
}

pub async fn callback(ctx: &AppContext, name: &str, code: &str, state: &str) -> Result<()> {
    let handshake = ctx.handshake()?;
    let connection = handshake.exchange(name, code, state).await?;

    if let HandshakePhase::Connected = handshake.phase(name).await {
        println!(
            "{}",
            format!("Connected {}", connection.display_name).bright_green()
        );
    }
    Ok(())
}

pub async fn disconnect(ctx: &AppContext, name: &str) -> Result<()> {
    let handshake = ctx.handshake()?;
    handshake.disconnect(name).await?;
    println!("{}", format!("Disconnected {}", name).bright_green());
    Ok(())
}
