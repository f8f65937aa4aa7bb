use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{Error, Result, anyhow, bail};
use uuid::Uuid;

use super::models::{Phase, Session, Transcript, TurnOutcome};
use crate::client::{BotReply, ChatBackend, ClientError, Language};
use crate::core::db::{LANGUAGE_KEY, PATIENT_ID_KEY, SESSION_ID_KEY};
use crate::core::{Features, LocalStore};
use crate::history::{ChatRecord, HistoryStore, NewRecord, RecordMeta, Role};
use crate::render::Renderer;
use crate::ui::{Affordance, Modal, Shell};

const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(3);

/// Holds the busy flag for as long as it lives so every exit path
/// releases it.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Inner<R> {
    renderer: R,
    shell: Shell,
    session: Session,
    phase: Phase,
    transcript: Transcript,
    summary: Option<String>,
    patient_id: Option<String>,
}

impl<R: Renderer> Inner<R> {
    fn refresh_affordance(&mut self) {
        let affordance = self.shell.affordance();
        self.renderer.show_affordance(&affordance);
    }

    fn show_reply(&mut self, reply: &BotReply) {
        self.transcript.push(Role::Assistant, &reply.text);
        self.renderer.render_bot(&reply.text);
        self.shell.show_prompt(&reply.prompt, reply.stage);
        self.renderer.render_options(&reply.prompt.options);
        self.refresh_affordance();
    }

    fn show_error(&mut self, err: &ClientError) {
        self.renderer.render_bot(&format!("⚠️ Error: {}", err));
    }

    /// Put back whatever options were showing before a failed request
    fn restore_options(&mut self) {
        let options = self.shell.options().to_vec();
        self.renderer.render_options(&options);
    }
}

/// Drives a chat session: bootstrap, turns, language switching,
/// ending the chat and saving summaries.
///
/// All operations take `&self`. At most one backend request is in
/// flight at a time; anything submitted meanwhile is dropped.
///
/// Use `ControllerBuilder` to construct a `Controller`.
pub struct Controller<B: ChatBackend, R: Renderer> {
    backend: B,
    store: LocalStore,
    history: Option<HistoryStore>,
    features: Features,
    default_language: Language,
    restart_delay: Duration,
    busy: AtomicBool,
    inner: Mutex<Inner<R>>,
}

impl<B: ChatBackend, R: Renderer> Controller<B, R> {
    fn inner(&self) -> MutexGuard<'_, Inner<R>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn history(&self) -> Result<&HistoryStore, Error> {
        self.history
            .as_ref()
            .ok_or(anyhow!("Chat history is disabled"))
    }

    pub fn phase(&self) -> Phase {
        self.inner().phase
    }

    pub fn session(&self) -> Session {
        self.inner().session.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn features(&self) -> Features {
        self.features
    }

    pub fn patient_id(&self) -> Option<String> {
        self.inner().patient_id.clone()
    }

    pub fn summary(&self) -> Option<String> {
        self.inner().summary.clone()
    }

    pub fn modal(&self) -> Option<Modal> {
        self.inner().shell.modal().cloned()
    }

    pub fn affordance(&self) -> Affordance {
        self.inner().shell.affordance()
    }

    pub fn options(&self) -> Vec<String> {
        self.inner().shell.options().to_vec()
    }

    pub fn transcript(&self) -> Transcript {
        self.inner().transcript.clone()
    }

    /// Inspect the renderer, e.g. to read a `MessageLog`.
    pub fn with_renderer<T>(&self, f: impl FnOnce(&R) -> T) -> T {
        f(&self.inner().renderer)
    }

    pub fn close_modal(&self) -> Option<Modal> {
        self.inner().shell.close()
    }

    /// Page load. Restores the last language and either starts a
    /// session or, when configured, asks for a language first in
    /// which case `None` is returned and `choose_language` continues.
    pub async fn boot(&self) -> Result<Option<TurnOutcome>, Error> {
        let patient_id = self
            .store
            .update(PATIENT_ID_KEY, |current| {
                let id = current.unwrap_or_else(|| Uuid::new_v4().to_string());
                Ok((Some(id.clone()), id))
            })
            .await?;
        let language = self
            .store
            .get(LANGUAGE_KEY)
            .await?
            .and_then(|l| l.parse().ok())
            .unwrap_or(self.default_language);

        {
            let mut inner = self.inner();
            inner.patient_id = Some(patient_id);
            inner.session.language = language;
            inner.shell.set_language(language);
            inner.refresh_affordance();
            if self.features.upfront_language_prompt {
                inner.shell.open(Modal::LanguageChoice);
                return Ok(None);
            }
        }

        Ok(Some(self.start(language).await?))
    }

    /// Answer to the language-choice modal. Ignored unless that modal
    /// is open.
    pub async fn choose_language(&self, language: Language) -> Result<TurnOutcome, Error> {
        {
            let mut inner = self.inner();
            if inner.shell.modal() != Some(&Modal::LanguageChoice) {
                return Ok(TurnOutcome::Ignored);
            }
            inner.shell.close();
            inner.session.language = language;
            inner.shell.set_language(language);
            inner.refresh_affordance();
        }
        self.store.set(LANGUAGE_KEY, language.code()).await?;
        self.start(language).await
    }

    /// Drop the current session and start a fresh one.
    pub async fn new_chat(&self) -> Result<TurnOutcome, Error> {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            return Ok(TurnOutcome::Dropped);
        };
        let language = {
            let mut inner = self.inner();
            inner.session.session_id = None;
            inner.shell.close();
            inner.session.language
        };
        self.store.remove(SESSION_ID_KEY).await?;
        self.start_locked(language).await
    }

    async fn start(&self, language: Language) -> Result<TurnOutcome, Error> {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            tracing::debug!("Start dropped, a request is already outstanding");
            return Ok(TurnOutcome::Dropped);
        };
        self.start_locked(language).await
    }

    /// Bootstrap a session. The caller must hold the busy flag.
    async fn start_locked(&self, language: Language) -> Result<TurnOutcome, Error> {
        let loading = {
            let mut inner = self.inner();
            inner.phase = Phase::Starting;
            inner.transcript = Transcript::new();
            inner.summary = None;
            inner.shell.reset_prompt();
            inner.renderer.render_options(&[]);
            inner.renderer.append_loading()
        };

        let result = self.backend.start(Some(language)).await;
        self.inner().renderer.remove_loading(loading);

        let start = match result {
            Ok(start) => start,
            Err(err) => {
                tracing::warn!("Failed to start chat session: {}", err);
                let mut inner = self.inner();
                inner.show_error(&err);
                inner.phase = Phase::Uninitialized;
                return Ok(TurnOutcome::Failed);
            }
        };

        tracing::info!(
            "Started session {} in {}",
            start.session_id,
            start.language
        );
        {
            let mut inner = self.inner();
            inner.session = Session {
                session_id: Some(start.session_id.clone()),
                language: start.language,
            };
            inner.shell.set_language(start.language);
            inner.show_reply(&start.reply);
            inner.phase = Phase::Idle;
        }

        // The session is usable even if persisting it fails
        self.store.set(SESSION_ID_KEY, &start.session_id).await?;
        self.store.set(LANGUAGE_KEY, start.language.code()).await?;
        Ok(TurnOutcome::Completed)
    }

    /// Send one user message and render the reply.
    pub async fn submit(&self, text: &str) -> Result<TurnOutcome, Error> {
        let message = text.trim();
        if message.is_empty() {
            return Ok(TurnOutcome::Ignored);
        }
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            tracing::debug!("Submission dropped, a request is already outstanding");
            return Ok(TurnOutcome::Dropped);
        };

        let (session_id, loading) = {
            let mut inner = self.inner();
            let session_id = match (&inner.phase, &inner.session.session_id) {
                (Phase::Idle, Some(id)) => id.clone(),
                _ => return Ok(TurnOutcome::Dropped),
            };
            inner.phase = Phase::Sending;
            inner.transcript.push(Role::User, message);
            inner.renderer.render_user(message);
            inner.renderer.render_options(&[]);
            (session_id, inner.renderer.append_loading())
        };

        let result = self.backend.send_turn(&session_id, message).await;

        let notice = {
            let mut inner = self.inner();
            inner.renderer.remove_loading(loading);
            match result {
                Ok(reply) => {
                    inner.show_reply(&reply);
                    inner.phase = Phase::Idle;
                    return Ok(TurnOutcome::Completed);
                }
                Err(ClientError::SessionExpired(notice)) => notice,
                Err(err) => {
                    tracing::warn!("Chat turn failed: {}", err);
                    inner.show_error(&err);
                    inner.restore_options();
                    inner.phase = Phase::Idle;
                    return Ok(TurnOutcome::Failed);
                }
            }
        };

        self.restart(&notice).await
    }

    /// Submit the label of option `index` exactly as if it were typed.
    pub async fn choose_option(&self, index: usize) -> Result<TurnOutcome, Error> {
        let label = self.inner().shell.options().get(index).cloned();
        match label {
            Some(label) => self.submit(&label).await,
            None => Ok(TurnOutcome::Ignored),
        }
    }

    /// The backend forgot the session. Clear it, show the notice and
    /// start over after `restart_delay`. The caller must hold the
    /// busy flag so nothing else is sent in the meantime.
    async fn restart(&self, notice: &str) -> Result<TurnOutcome, Error> {
        tracing::warn!("Session expired: {}", notice);
        let language = {
            let mut inner = self.inner();
            inner.session.session_id = None;
            inner.phase = Phase::Starting;
            inner.renderer.render_options(&[]);
            inner.renderer.render_bot(&format!("⚠️ {}", notice));
            inner.session.language
        };
        self.store.remove(SESSION_ID_KEY).await?;

        tokio::time::sleep(self.restart_delay).await;

        match self.start_locked(language).await? {
            TurnOutcome::Completed => Ok(TurnOutcome::Restarted),
            other => Ok(other),
        }
    }

    /// Switch the conversation language. Without a session the choice
    /// is only applied locally and used for the next start.
    pub async fn set_language(&self, language: Language) -> Result<TurnOutcome, Error> {
        if !self.features.language_toggle {
            tracing::warn!("Language toggle is disabled");
            return Ok(TurnOutcome::Ignored);
        }
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            return Ok(TurnOutcome::Dropped);
        };

        let (current, session_id) = {
            let inner = self.inner();
            (inner.session.language, inner.session.session_id.clone())
        };
        if current == language {
            return Ok(TurnOutcome::Ignored);
        }

        let confirmed = match session_id {
            Some(session_id) => {
                let loading = self.inner().renderer.append_loading();
                let result = self.backend.set_language(&session_id, language).await;
                let mut inner = self.inner();
                inner.renderer.remove_loading(loading);
                match result {
                    Ok(confirmed) => confirmed,
                    Err(err) => {
                        tracing::warn!("Failed to change language: {}", err);
                        inner.show_error(&err);
                        return Ok(TurnOutcome::Failed);
                    }
                }
            }
            None => language,
        };

        self.store.set(LANGUAGE_KEY, confirmed.code()).await?;
        let mut inner = self.inner();
        inner.session.language = confirmed;
        inner.shell.set_language(confirmed);
        inner.refresh_affordance();
        Ok(TurnOutcome::Completed)
    }

    /// Finish the conversation and open the summary.
    pub async fn end_chat(&self) -> Result<TurnOutcome, Error> {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            return Ok(TurnOutcome::Dropped);
        };

        let (session_id, language, loading) = {
            let mut inner = self.inner();
            let session_id = match (&inner.phase, &inner.session.session_id) {
                (Phase::Idle, Some(id)) => id.clone(),
                _ => return Ok(TurnOutcome::Dropped),
            };
            inner.phase = Phase::Ending;
            inner.renderer.render_options(&[]);
            let language = inner.session.language;
            (session_id, language, inner.renderer.append_loading())
        };

        let result = self.backend.end_chat(&session_id, Some(language)).await;

        let notice = {
            let mut inner = self.inner();
            inner.renderer.remove_loading(loading);
            match result {
                Ok(summary) => {
                    tracing::info!("Ended session {}", session_id);
                    inner.summary = Some(summary.clone());
                    inner.shell.open(Modal::Summary { html: summary });
                    inner.phase = Phase::Ended;
                    return Ok(TurnOutcome::Completed);
                }
                Err(ClientError::SessionExpired(notice)) => notice,
                Err(err) => {
                    tracing::warn!("Failed to end chat: {}", err);
                    inner.show_error(&err);
                    inner.restore_options();
                    inner.phase = Phase::Idle;
                    return Ok(TurnOutcome::Failed);
                }
            }
        };

        self.restart(&notice).await
    }

    /// Persist the last summary together with the conversation.
    pub async fn save_summary(&self) -> Result<ChatRecord, Error> {
        let history = self.history()?;
        let record = {
            let inner = self.inner();
            let Some(summary) = inner.summary.clone() else {
                bail!("There is no summary to save yet");
            };
            NewRecord {
                language: inner.session.language,
                summary_html: summary,
                conversation: inner.transcript.messages(),
            }
        };
        history.save(record).await
    }

    pub async fn list_history(&self) -> Result<Vec<RecordMeta>, Error> {
        let records = self.history()?.list().await?;
        self.inner().shell.open(Modal::HistoryList);
        Ok(records)
    }

    pub async fn view_record(&self, id: &str) -> Result<ChatRecord, Error> {
        let record = self.history()?.view(id).await?;
        self.inner().shell.open(Modal::HistoryView {
            id: id.to_string(),
        });
        Ok(record)
    }

    /// Deleting is irreversible so it happens in two steps: this opens
    /// the confirmation and `confirm_delete` carries it out.
    pub fn request_delete(&self, id: &str) -> Result<(), Error> {
        self.history()?;
        self.inner().shell.open(Modal::ConfirmDelete {
            id: id.to_string(),
        });
        Ok(())
    }

    pub async fn confirm_delete(&self) -> Result<bool, Error> {
        let history = self.history()?;
        let id = match self.inner().shell.modal() {
            Some(Modal::ConfirmDelete { id }) => id.clone(),
            _ => bail!("No deletion is awaiting confirmation"),
        };
        let removed = history.delete(&id).await?;
        self.inner().shell.open(Modal::HistoryList);
        Ok(removed)
    }
}

pub struct ControllerBuilder<B: ChatBackend, R: Renderer> {
    backend: B,
    renderer: R,
    store: LocalStore,
    features: Features,
    default_language: Language,
    restart_delay: Duration,
}

impl<B: ChatBackend, R: Renderer> ControllerBuilder<B, R> {
    pub fn new(backend: B, renderer: R, store: LocalStore) -> Self {
        Self {
            backend,
            renderer,
            store,
            features: Features::default(),
            default_language: Language::default(),
            restart_delay: DEFAULT_RESTART_DELAY,
        }
    }

    pub fn features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }

    pub fn language(mut self, language: Language) -> Self {
        self.default_language = language;
        self
    }

    pub fn restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    pub fn build(self) -> Controller<B, R> {
        let history = if self.features.history {
            Some(HistoryStore::new(self.store.clone()))
        } else {
            None
        };

        Controller {
            backend: self.backend,
            store: self.store,
            history,
            features: self.features,
            default_language: self.default_language,
            restart_delay: self.restart_delay,
            busy: AtomicBool::new(false),
            inner: Mutex::new(Inner {
                renderer: self.renderer,
                shell: Shell::new(self.default_language),
                session: Session::new(self.default_language),
                phase: Phase::Uninitialized,
                transcript: Transcript::new(),
                summary: None,
                patient_id: None,
            }),
        }
    }
}
