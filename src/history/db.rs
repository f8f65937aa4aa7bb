use anyhow::{Context, Error, Result};
use chrono::Utc;
use uuid::Uuid;

use super::models::{ChatRecord, NewRecord, RecordMeta, RecordNotFound};
use crate::core::LocalStore;
use crate::core::db::CHAT_HISTORY_KEY;
use crate::ui::summary_text;

const PREVIEW_LEN: usize = 80;

fn parse_records(raw: Option<String>) -> Result<Vec<ChatRecord>, Error> {
    match raw {
        Some(json) => serde_json::from_str(&json).context("Corrupt chat history"),
        None => Ok(Vec::new()),
    }
}

/// Millisecond timestamp plus a random suffix, regenerated until it
/// doesn't collide with a stored id.
fn generate_id(existing: &[ChatRecord]) -> String {
    loop {
        let suffix = Uuid::new_v4().simple().to_string();
        let id = format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..8]);
        if !existing.iter().any(|r| r.id == id) {
            return id;
        }
    }
}

fn preview(record: &ChatRecord) -> String {
    let text = summary_text(&record.summary_html);
    let first_line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    if first_line.chars().count() > PREVIEW_LEN {
        let truncated: String = first_line.chars().take(PREVIEW_LEN).collect();
        format!("{}...", truncated)
    } else {
        first_line.to_string()
    }
}

/// Saved chat records, stored oldest first as a JSON array under the
/// `chatHistory` key.
#[derive(Clone)]
pub struct HistoryStore {
    store: LocalStore,
}

impl HistoryStore {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    async fn load(&self) -> Result<Vec<ChatRecord>, Error> {
        parse_records(self.store.get(CHAT_HISTORY_KEY).await?)
    }

    pub async fn save(&self, record: NewRecord) -> Result<ChatRecord, Error> {
        let saved = self
            .store
            .update(CHAT_HISTORY_KEY, move |raw| {
                let mut records = parse_records(raw)?;
                let saved = ChatRecord {
                    id: generate_id(&records),
                    timestamp: Utc::now(),
                    language: record.language,
                    summary_html: record.summary_html,
                    conversation: record.conversation,
                };
                records.push(saved.clone());
                Ok((Some(serde_json::to_string(&records)?), saved))
            })
            .await?;

        tracing::info!("Saved chat record {}", saved.id);
        Ok(saved)
    }

    /// Most recent first.
    pub async fn list(&self) -> Result<Vec<RecordMeta>, Error> {
        let records = self.load().await?;
        let metas = records
            .iter()
            .rev()
            .map(|r| RecordMeta {
                id: r.id.clone(),
                timestamp: r.timestamp,
                language: r.language,
                preview: preview(r),
            })
            .collect();
        Ok(metas)
    }

    pub async fn view(&self, id: &str) -> Result<ChatRecord, Error> {
        self.load()
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| RecordNotFound(id.to_string()).into())
    }

    /// Removes the record with `id`. Returns `false` if there was
    /// nothing to remove.
    pub async fn delete(&self, id: &str) -> Result<bool, Error> {
        let id = id.to_owned();
        let removed = self
            .store
            .update(CHAT_HISTORY_KEY, move |raw| {
                let had_history = raw.is_some();
                let mut records = parse_records(raw)?;
                let before = records.len();
                records.retain(|r| r.id != id);
                let removed = records.len() != before;
                let next = if had_history {
                    Some(serde_json::to_string(&records)?)
                } else {
                    None
                };
                Ok((next, removed))
            })
            .await?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Language;
    use crate::history::{ChatMessage, Role};

    fn new_record(summary: &str) -> NewRecord {
        NewRecord {
            language: Language::En,
            summary_html: summary.to_string(),
            conversation: vec![
                ChatMessage::new(Role::Assistant, "What brings you here?"),
                ChatMessage::new(Role::User, "headache for 3 days"),
            ],
        }
    }

    async fn history() -> HistoryStore {
        HistoryStore::new(LocalStore::in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn it_saves_and_views_a_record() -> Result<()> {
        let history = history().await;
        let saved = history.save(new_record("<p>Tension headache</p>")).await?;

        let viewed = history.view(&saved.id).await?;
        assert_eq!(viewed, saved);
        assert_eq!(viewed.conversation.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn it_lists_most_recent_first() -> Result<()> {
        let history = history().await;
        let first = history.save(new_record("<p>first</p>")).await?;
        let second = history.save(new_record("<p>second</p>")).await?;

        let ids: Vec<String> = history.list().await?.into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        Ok(())
    }

    #[tokio::test]
    async fn it_generates_unique_ids() -> Result<()> {
        let history = history().await;
        let mut ids = Vec::new();
        for i in 0..20 {
            ids.push(history.save(new_record(&format!("<p>{}</p>", i))).await?.id);
        }
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());
        Ok(())
    }

    #[tokio::test]
    async fn it_deletes_exactly_one_record_and_keeps_order() -> Result<()> {
        let history = history().await;
        let a = history.save(new_record("<p>a</p>")).await?;
        let b = history.save(new_record("<p>b</p>")).await?;
        let c = history.save(new_record("<p>c</p>")).await?;

        assert!(history.delete(&b.id).await?);
        let ids: Vec<String> = history.list().await?.into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![c.id.clone(), a.id.clone()]);

        // Deleting again is a no-op
        assert!(!history.delete(&b.id).await?);
        assert_eq!(history.list().await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn it_reports_missing_records() -> Result<()> {
        let history = history().await;
        assert!(!history.delete("nope").await?);

        let err = history.view("nope").await.unwrap_err();
        assert!(err.downcast_ref::<RecordNotFound>().is_some());
        Ok(())
    }

    #[tokio::test]
    async fn it_previews_the_summary() -> Result<()> {
        let history = history().await;
        let long = format!("<p>{}</p>", "a".repeat(200));
        history.save(new_record(&long)).await?;
        history
            .save(new_record("<h3>Possible conditions</h3><p>Migraine</p>"))
            .await?;

        let metas = history.list().await?;
        assert_eq!(metas[0].preview, "### Possible conditions");
        assert_eq!(metas[1].preview.chars().count(), PREVIEW_LEN + 3);
        Ok(())
    }
}
