//! The conversation controller and the state it tracks.
mod controller;
mod models;

pub use self::controller::*;
pub use self::models::*;
