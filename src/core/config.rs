use std::env;
use std::time::Duration;

use crate::client::Language;

/// Capability flags that select which widget behaviors are enabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Features {
    pub history: bool,
    pub language_toggle: bool,
    pub upfront_language_prompt: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            history: true,
            language_toggle: true,
            upfront_language_prompt: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_base_url: String,
    pub storage_path: String,
    pub db_path: String,
    pub default_language: Language,
    pub request_timeout: Duration,
    pub restart_delay: Duration,
    pub features: Features,
}

fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(val) => matches!(
            val.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for AppConfig {
    fn default() -> Self {
        let host = "127.0.0.1";
        let port = "4000";
        let api_base_url =
            env::var("MEDIPULSE_API_URL").unwrap_or(format!("http://{}:{}", host, port));
        let storage_path = env::var("MEDIPULSE_STORAGE_PATH").unwrap_or("./".to_string());
        let db_path = format!("{}/medipulse.db", storage_path.trim_end_matches('/'));
        let default_language = env::var("MEDIPULSE_LANGUAGE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();
        let request_timeout = Duration::from_secs(env_u64("MEDIPULSE_REQUEST_TIMEOUT_SECS", 30));
        let restart_delay = Duration::from_millis(env_u64("MEDIPULSE_RESTART_DELAY_MS", 3000));
        let defaults = Features::default();
        let features = Features {
            history: env_flag("MEDIPULSE_HISTORY", defaults.history),
            language_toggle: env_flag("MEDIPULSE_LANGUAGE_TOGGLE", defaults.language_toggle),
            upfront_language_prompt: env_flag(
                "MEDIPULSE_ASK_LANGUAGE",
                defaults.upfront_language_prompt,
            ),
        };

        Self {
            api_base_url,
            storage_path,
            db_path,
            default_language,
            request_timeout,
            restart_delay,
            features,
        }
    }
}
