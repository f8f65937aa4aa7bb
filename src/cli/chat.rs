use anyhow::{Error, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use super::confirm;
use super::history::{print_record, print_records};
use crate::chat::{Controller, ControllerBuilder, TurnOutcome};
use crate::client::{Language, SessionClient};
use crate::core::{AppConfig, LocalStore};
use crate::render::TerminalRenderer;
use crate::ui::{Affordance, summary_text};

type TerminalChat = Controller<SessionClient, TerminalRenderer<std::io::Stdout>>;

const HELP: &str = "Commands:
  /end            finish the chat and show a summary
  /save           save the last summary to history
  /new            start a new chat
  /lang <en|ar>   switch language
  /history        list saved chats
  /view <id>      show a saved chat
  /delete <id>    delete a saved chat
  /quit           exit
When options are shown, type a number or the option itself.";

enum Flow {
    Continue,
    Quit,
}

/// Resolve input to an option by its number (1-based) or label.
fn option_index(options: &[String], input: &str) -> Option<usize> {
    if let Ok(n) = input.parse::<usize>() {
        if n >= 1 && n <= options.len() {
            return Some(n - 1);
        }
    }
    options.iter().position(|o| o.eq_ignore_ascii_case(input))
}

fn prompt(affordance: &Affordance) -> String {
    match affordance {
        Affordance::Options { options, .. } => format!("[1-{}] >>> ", options.len()),
        Affordance::FreeText { .. } => String::from(">>> "),
    }
}

fn choose_language(rl: &mut DefaultEditor) -> Result<Language> {
    loop {
        let answer = rl.readline("Choose a language / اختر اللغة [en/ar]: ")?;
        match answer.parse() {
            Ok(language) => return Ok(language),
            Err(e) => println!("{}", e),
        }
    }
}

async fn end_chat(chat: &TerminalChat, rl: &mut DefaultEditor) -> Result<()> {
    if chat.end_chat().await? != TurnOutcome::Completed {
        return Ok(());
    }
    if let Some(summary) = chat.summary() {
        println!("\n{}\n", summary_text(&summary));
    }
    if chat.features().history && confirm(rl, "Save this summary to history?", true)? {
        let record = chat.save_summary().await?;
        println!("Saved as {}", record.id);
    }
    chat.close_modal();
    println!("Type /new to start another chat or /quit to exit.");
    Ok(())
}

async fn delete_record(chat: &TerminalChat, rl: &mut DefaultEditor, id: &str) -> Result<()> {
    chat.request_delete(id)?;
    if confirm(rl, &format!("Delete chat {}?", id), false)? {
        if chat.confirm_delete().await? {
            println!("Deleted {}", id);
        } else {
            println!("No saved chat with id {}", id);
        }
    } else {
        println!("Cancelled");
    }
    chat.close_modal();
    Ok(())
}

async fn handle_command(
    chat: &TerminalChat,
    rl: &mut DefaultEditor,
    command: &str,
) -> Result<Flow, Error> {
    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.next();

    match (name, arg) {
        ("quit" | "exit", _) => return Ok(Flow::Quit),
        ("help", _) => println!("{}", HELP),
        ("end", _) => end_chat(chat, rl).await?,
        ("save", _) => {
            let record = chat.save_summary().await?;
            println!("Saved as {}", record.id);
        }
        ("new", _) => {
            chat.new_chat().await?;
        }
        ("lang", Some(lang)) => {
            let language: Language = lang.parse()?;
            if chat.set_language(language).await? == TurnOutcome::Ignored
                && !chat.features().language_toggle
            {
                println!("Switching language is disabled");
            }
        }
        ("history", _) => {
            let records = chat.list_history().await?;
            print_records(&records);
            chat.close_modal();
        }
        ("view", Some(id)) => {
            let record = chat.view_record(id).await?;
            print_record(&record);
            chat.close_modal();
        }
        ("delete", Some(id)) => delete_record(chat, rl, id).await?,
        _ => println!("Unknown command. Type /help for a list of commands."),
    }
    Ok(Flow::Continue)
}

pub async fn run(config: AppConfig) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let store = LocalStore::open(&config.db_path).await?;
    let client = SessionClient::new(&config.api_base_url, config.request_timeout)?;
    let chat = ControllerBuilder::new(client, TerminalRenderer::stdout(), store)
        .features(config.features)
        .language(config.default_language)
        .restart_delay(config.restart_delay)
        .build();

    println!("MediPulse. Type /help for commands.");
    println!("This is informational only. Always consult a licensed physician.\n");

    if chat.boot().await?.is_none() {
        let language = choose_language(&mut rl)?;
        chat.choose_language(language).await?;
    }

    loop {
        let readline = rl.readline(&prompt(&chat.affordance()));
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                if let Some(command) = line.strip_prefix('/') {
                    match handle_command(&chat, &mut rl, command).await {
                        Ok(Flow::Quit) => break,
                        Ok(Flow::Continue) => {}
                        Err(e) => println!("Error: {}", e),
                    }
                    continue;
                }

                let outcome = match option_index(&chat.options(), line) {
                    Some(i) => chat.choose_option(i).await?,
                    None => chat.submit(line).await?,
                };
                if outcome == TurnOutcome::Dropped {
                    println!("The chat isn't active. Type /new to start a new one.");
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
