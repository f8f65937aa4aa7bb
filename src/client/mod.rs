//! Client for the MediPulse chat backend.
mod core;
mod public;

pub use self::core::*;
pub use self::public::*;
