use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::Context;
use client_core::{ClientOptions, StalePolicy};
use tracing::warn;
use url::Url;

pub const SETTINGS_FILE: &str = "fragctl.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub stale_policy: StalePolicy,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_ms: Some(30_000),
            stale_policy: StalePolicy::DiscardStale,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn client_options(&self) -> anyhow::Result<ClientOptions> {
        let base_url = self
            .base_url
            .as_deref()
            .map(|raw| Url::parse(raw).with_context(|| format!("invalid base url '{raw}'")))
            .transpose()?;
        Ok(ClientOptions {
            base_url,
            stale_policy: self.stale_policy,
        })
    }

    /// `None` (or a zero setting) leaves requests without a deadline.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, env);

    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, String>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            warn!("ignoring malformed {SETTINGS_FILE}: {err}");
            return;
        }
    };

    if let Some(v) = file_cfg.get("base_url") {
        settings.base_url = Some(v.clone());
    }
    if let Some(v) = file_cfg.get("request_timeout_ms") {
        set_timeout(settings, v);
    }
    if let Some(v) = file_cfg.get("stale_policy") {
        set_stale_policy(settings, v);
    }
    if let Some(v) = file_cfg.get("log_filter") {
        settings.log_filter = v.clone();
    }
}

fn apply_env(settings: &mut Settings, env: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env("FRAGCTL_BASE_URL") {
        settings.base_url = Some(v);
    }
    if let Some(v) = env("APP__BASE_URL") {
        settings.base_url = Some(v);
    }

    if let Some(v) = env("FRAGCTL_REQUEST_TIMEOUT_MS") {
        set_timeout(settings, &v);
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_MS") {
        set_timeout(settings, &v);
    }

    if let Some(v) = env("FRAGCTL_STALE_POLICY") {
        set_stale_policy(settings, &v);
    }
    if let Some(v) = env("APP__STALE_POLICY") {
        set_stale_policy(settings, &v);
    }

    if let Some(v) = env("RUST_LOG") {
        settings.log_filter = v;
    }
    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

fn set_timeout(settings: &mut Settings, raw: &str) {
    match raw.trim().parse::<u64>() {
        Ok(ms) => settings.request_timeout_ms = Some(ms),
        Err(_) => warn!("request_timeout_ms '{raw}' is not a number; keeping {:?}", settings.request_timeout_ms),
    }
}

fn set_stale_policy(settings: &mut Settings, raw: &str) {
    match parse_stale_policy(raw) {
        Some(policy) => settings.stale_policy = policy,
        None => warn!("unknown stale_policy '{raw}'; keeping {:?}", settings.stale_policy),
    }
}

pub fn parse_stale_policy(raw: &str) -> Option<StalePolicy> {
    match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "discard_stale" => Some(StalePolicy::DiscardStale),
        "last_completion_wins" => Some(StalePolicy::LastCompletionWins),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
