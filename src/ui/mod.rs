//! Presentation state for the chat widget: modals, text direction and
//! the input affordance.
mod shell;

pub use shell::*;
