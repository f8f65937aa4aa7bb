//! Saved conversations and their summaries.
mod db;
mod models;

pub use self::db::*;
pub use self::models::*;
