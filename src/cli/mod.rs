use anyhow::Result;
use clap::{Parser, Subcommand};
use rustyline::DefaultEditor;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod chat;
pub mod history;

use crate::client::Language;
use crate::core::AppConfig;

#[derive(Subcommand)]
enum HistoryCommand {
    /// List saved chats, most recent first
    List {},
    /// Show a saved chat and its summary
    View { id: String },
    /// Delete a saved chat
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long, action, default_value = "false")]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum Command {
    /// Start a chat session with the MediPulse assistant
    Chat {
        /// Language to start the conversation in (en or ar)
        #[arg(long)]
        lang: Option<Language>,
        /// Don't offer to save summaries
        #[arg(long, action, default_value = "false")]
        no_history: bool,
        /// Disable switching language mid-conversation
        #[arg(long, action, default_value = "false")]
        no_language_toggle: bool,
        /// Ask for a language before starting
        #[arg(long, action, default_value = "false")]
        ask_language: bool,
    },
    /// Manage saved chat summaries
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=warn", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Ask a yes/no question on the terminal.
pub fn confirm(rl: &mut DefaultEditor, question: &str, default: bool) -> Result<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    let answer = rl.readline(&format!("{} {} ", question, hint))?;
    let answer = answer.trim().to_lowercase();
    if answer.is_empty() {
        return Ok(default);
    }
    Ok(matches!(answer.as_str(), "y" | "yes"))
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();
    init_tracing();

    let mut config = AppConfig::default();

    // Handle each sub command
    match args.command {
        Some(Command::Chat {
            lang,
            no_history,
            no_language_toggle,
            ask_language,
        }) => {
            if let Some(lang) = lang {
                config.default_language = lang;
            }
            config.features.history &= !no_history;
            config.features.language_toggle &= !no_language_toggle;
            config.features.upfront_language_prompt |= ask_language;
            chat::run(config).await?;
        }
        Some(Command::History { command }) => match command {
            HistoryCommand::List {} => history::list(&config).await?,
            HistoryCommand::View { id } => history::view(&config, &id).await?,
            HistoryCommand::Delete { id, yes } => history::delete(&config, &id, yes).await?,
        },
        None => {}
    }

    Ok(())
}
