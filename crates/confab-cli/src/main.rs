use anyhow::Result;
use clap::{Parser, Subcommand};
use confab_infrastructure::ConfabPaths;
use std::path::PathBuf;

mod commands;
mod context;
mod logging;

use context::AppContext;

#[derive(Parser)]
#[command(name = "confab")]
#[command(about = "confab - conversational assistant client", long_about = None)]
struct Cli {
    /// Keep config, cache and logs under this directory instead of the
    /// platform defaults
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Echo debug logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat
    Chat {
        /// Resume an existing conversation
        #[arg(short, long)]
        conversation: Option<String>,
    },
    /// Manage conversations
    Conversations {
        #[command(subcommand)]
        action: ConversationAction,
    },
    /// Manage provider connections
    Providers {
        #[command(subcommand)]
        action: ProviderAction,
    },
    /// Store the API token in the secret file
    Login,
}

#[derive(Subcommand)]
enum ConversationAction {
    /// List conversations, most recent first
    List,
    /// Delete a conversation and all of its messages
    Delete { id: String },
}

#[derive(Subcommand)]
enum ProviderAction {
    /// List providers and their connection status
    List,
    /// Begin connecting a provider; prints the authorization URL
    Connect { name: String },
    /// Finish connecting a provider with the values from the redirect
    Callback {
        name: String,
        #[arg(long)]
        code: String,
        #[arg(long)]
        state: String,
    },
    /// Disconnect a provider
    Disconnect { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = ConfabPaths::new(cli.root);
    let _log_guard = logging::init(&paths.logs_dir()?, cli.verbose)?;

    match cli.command {
        Commands::Login => commands::login::run(&paths),
        command => run(command, &AppContext::load(paths)?).await,
    }
}

async fn run(command: Commands, ctx: &AppContext) -> Result<()> {
    match command {
        Commands::Chat { conversation } => commands::chat::run(ctx, conversation).await,
        Commands::Conversations { action } => match action {
            ConversationAction::List => commands::conversations::list(ctx).await,
            ConversationAction::Delete { id } => commands::conversations::delete(ctx, &id).await,
        },
        Commands::Providers { action } => match action {
            ProviderAction::List => commands::providers::list(ctx).await,
            ProviderAction::Connect { name } => commands::providers::connect(ctx, &name).await,
            ProviderAction::Callback { name, code, state } => {
                commands::providers::callback(ctx, &name, &code, &state).await
            }
            ProviderAction::Disconnect { name } => commands::providers::disconnect(ctx, &name).await,
        },
        Commands::Login => commands::login::run(&ctx.paths),
    }
}
