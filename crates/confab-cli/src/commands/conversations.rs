use crate::context::AppContext;
use anyhow::Result;
use colored::Colorize;

pub async fn list(ctx: &AppContext) -> Result<()> {
    let session = ctx.chat_session()?;
    let conversations = session.list_conversations().await?;

    if conversations.is_empty() {
        println!("{}", "No conversations yet.".bright_black());
        return Ok(());
    }

    for conversation in conversations {
        println!(
            "{}  {}  {}",
            conversation.id.bright_cyan(),
            conversation.title.bold(),
            format!(
                "{} messages, updated {}",
                conversation.message_count,
                conversation.updated_at.format("%Y-%m-%d %H:%M")
            )
            .bright_black()
        );
        if let Some(preview) = &conversation.last_message_preview {
            println!("    {}", preview.bright_black());
        }
    }
    Ok(())
}

pub async fn delete(ctx: &AppContext, id: &str) -> Result<()> {
    let session = ctx.chat_session()?;
    session.delete_conversation(id).await?;
    println!("{}", format!("Deleted conversation {}", id).bright_green());
    Ok(())
}
