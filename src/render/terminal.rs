use std::collections::HashSet;
use std::io::Write;

use super::{LoadingId, Renderer};
use crate::ui::{Affordance, Direction};

const BOT_NAME: &str = "MediPulse";
const RTL_MARK: char = '\u{200F}';
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Prints the conversation to a terminal (or any writer).
pub struct TerminalRenderer<W: Write + Send> {
    out: W,
    direction: Direction,
    pending: HashSet<LoadingId>,
    next_loading: u64,
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            direction: Direction::Ltr,
            pending: HashSet::new(),
            next_loading: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        let result = self
            .out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush());
        if let Err(e) = result {
            tracing::warn!("Failed writing to terminal: {}", e);
        }
    }

    fn line(&self, text: &str) -> String {
        match self.direction {
            Direction::Rtl => format!("{}{}", RTL_MARK, text),
            Direction::Ltr => text.to_string(),
        }
    }
}

impl TerminalRenderer<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> Renderer for TerminalRenderer<W> {
    // The line editor already echoed what the user typed
    fn render_user(&mut self, _text: &str) {}

    fn render_bot(&mut self, text: &str) {
        let line = self.line(&format!("{}: {}", BOT_NAME, text));
        self.emit(&format!("{}\n", line));
    }

    fn append_loading(&mut self) -> LoadingId {
        let id = LoadingId(self.next_loading);
        self.next_loading += 1;
        self.pending.insert(id);
        self.emit(&format!("{} is typing...", BOT_NAME));
        id
    }

    fn remove_loading(&mut self, id: LoadingId) {
        if self.pending.remove(&id) {
            self.emit(CLEAR_LINE);
        }
    }

    fn render_options(&mut self, options: &[String]) {
        if options.is_empty() {
            return;
        }
        let choices = options
            .iter()
            .enumerate()
            .map(|(i, o)| format!("[{}] {}", i + 1, o))
            .collect::<Vec<String>>()
            .join("  ");
        let line = self.line(&choices);
        self.emit(&format!("  {}\n", line));
    }

    fn show_affordance(&mut self, affordance: &Affordance) {
        self.direction = affordance.direction();
    }
}
