//! Displaying the conversation.
//!
//! The controller only talks to a `Renderer`. `MessageLog` keeps the
//! rendered state in memory and `TerminalRenderer` prints it.
mod log;
mod terminal;

pub use self::log::*;
pub use self::terminal::*;

use crate::ui::Affordance;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LoadingId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

pub trait Renderer: Send {
    fn render_user(&mut self, text: &str);

    fn render_bot(&mut self, text: &str);

    /// Show a placeholder while a request is outstanding.
    fn append_loading(&mut self) -> LoadingId;

    fn remove_loading(&mut self, id: LoadingId);

    /// Replace the current option set. An empty slice clears it.
    fn render_options(&mut self, options: &[String]);

    fn show_affordance(&mut self, _affordance: &Affordance) {}
}
