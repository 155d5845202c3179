use colored::Colorize;
use confab_core::ConfabError;
use confab_core::conversation::{Message, MessageRole};

pub fn print_message(message: &Message) {
    match message.role {
        MessageRole::User => {
            for line in message.content.lines() {
                println!("{}", format!("> {}", line).green());
            }
        }
        MessageRole::Assistant => {
            if let Some(metadata) = &message.metadata {
                for call in &metadata.tool_calls {
                    println!("{}", format!("[tool: {}]", call.name).bright_black());
                }
            }
            for line in message.content.lines() {
                println!("{}", line.bright_blue());
            }
        }
    }
}

/// Prints an error with a hint on what the user can do about it.
pub fn print_error(error: &ConfabError) {
    eprintln!("{}", format!("Error: {}", error).red());
    if error.is_auth() {
        eprintln!("{}", "Run `confab login` to store a valid API token.".yellow());
    } else if error.is_transient() {
        eprintln!("{}", "The request can be retried.".yellow());
    }
}
