use anyhow::Result;
use rustyline::DefaultEditor;

use super::confirm;
use crate::core::{AppConfig, LocalStore};
use crate::history::{ChatRecord, HistoryStore, RecordMeta, Role};
use crate::ui::summary_text;

pub fn print_records(records: &[RecordMeta]) {
    if records.is_empty() {
        println!("No saved chats");
        return;
    }
    for r in records {
        println!(
            "{}  {}  [{}]  {}",
            r.id,
            r.timestamp.format("%Y-%m-%d %H:%M"),
            r.language,
            r.preview
        );
    }
}

pub fn print_record(record: &ChatRecord) {
    println!(
        "# Chat {} ({})\n",
        record.id,
        record.timestamp.format("%Y-%m-%d %H:%M")
    );
    println!("{}\n", summary_text(&record.summary_html));
    for msg in &record.conversation {
        let who = match msg.role {
            Role::User => "You",
            Role::Assistant => "MediPulse",
        };
        println!("{}: {}", who, msg.content);
    }
}

async fn open(config: &AppConfig) -> Result<HistoryStore> {
    let store = LocalStore::open(&config.db_path).await?;
    Ok(HistoryStore::new(store))
}

pub async fn list(config: &AppConfig) -> Result<()> {
    let records = open(config).await?.list().await?;
    print_records(&records);
    Ok(())
}

pub async fn view(config: &AppConfig, id: &str) -> Result<()> {
    let record = open(config).await?.view(id).await?;
    print_record(&record);
    Ok(())
}

pub async fn delete(config: &AppConfig, id: &str, yes: bool) -> Result<()> {
    let history = open(config).await?;
    if !yes {
        let mut rl = DefaultEditor::new()?;
        if !confirm(&mut rl, &format!("Delete chat {}?", id), false)? {
            println!("Cancelled");
            return Ok(());
        }
    }
    if history.delete(id).await? {
        println!("Deleted {}", id);
    } else {
        println!("No saved chat with id {}", id);
    }
    Ok(())
}
