use super::{LoadingId, Renderer, Sender};
use crate::ui::Affordance;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub sender: Sender,
    pub text: String,
    pub is_loading: bool,
    loading_id: Option<LoadingId>,
}

/// In-memory chat log. Entries are only ever appended except for
/// loading placeholders which are removed once their request settles.
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Vec<Entry>,
    options: Vec<String>,
    affordance: Option<Affordance>,
    next_loading: u64,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Rendered messages without loading placeholders.
    pub fn messages(&self) -> Vec<(Sender, &str)> {
        self.entries
            .iter()
            .filter(|e| !e.is_loading)
            .map(|e| (e.sender, e.text.as_str()))
            .collect()
    }

    pub fn last_bot(&self) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.sender == Sender::Bot && !e.is_loading)
            .map(|e| e.text.as_str())
    }

    pub fn loading_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_loading).count()
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn affordance(&self) -> Option<&Affordance> {
        self.affordance.as_ref()
    }

    fn push(&mut self, sender: Sender, text: &str) {
        self.entries.push(Entry {
            sender,
            text: text.to_string(),
            is_loading: false,
            loading_id: None,
        });
    }
}

impl Renderer for MessageLog {
    fn render_user(&mut self, text: &str) {
        self.push(Sender::User, text);
    }

    fn render_bot(&mut self, text: &str) {
        self.push(Sender::Bot, text);
    }

    fn append_loading(&mut self) -> LoadingId {
        let id = LoadingId(self.next_loading);
        self.next_loading += 1;
        self.entries.push(Entry {
            sender: Sender::Bot,
            text: String::new(),
            is_loading: true,
            loading_id: Some(id),
        });
        id
    }

    fn remove_loading(&mut self, id: LoadingId) {
        self.entries.retain(|e| e.loading_id != Some(id));
    }

    fn render_options(&mut self, options: &[String]) {
        self.options = options.to_vec();
    }

    fn show_affordance(&mut self, affordance: &Affordance) {
        self.affordance = Some(affordance.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_appends_in_order() {
        let mut log = MessageLog::new();
        log.render_bot("How can I help?");
        log.render_user("headache");

        assert_eq!(
            log.messages(),
            vec![(Sender::Bot, "How can I help?"), (Sender::User, "headache")]
        );
        assert_eq!(log.last_bot(), Some("How can I help?"));
    }

    #[test]
    fn it_removes_only_the_matching_placeholder() {
        let mut log = MessageLog::new();
        let first = log.append_loading();
        log.render_user("hi");
        let second = log.append_loading();
        assert_eq!(log.loading_count(), 2);

        log.remove_loading(first);
        assert_eq!(log.loading_count(), 1);
        assert_eq!(log.entries()[1].loading_id, Some(second));

        // Removing twice is harmless
        log.remove_loading(first);
        log.remove_loading(second);
        assert_eq!(log.loading_count(), 0);
        assert_eq!(log.messages(), vec![(Sender::User, "hi")]);
    }

    #[test]
    fn it_replaces_options() {
        let mut log = MessageLog::new();
        log.render_options(&[String::from("Yes"), String::from("No")]);
        log.render_options(&[String::from("Front")]);
        assert_eq!(log.options(), &[String::from("Front")]);

        log.render_options(&[]);
        assert!(log.options().is_empty());
    }
}
