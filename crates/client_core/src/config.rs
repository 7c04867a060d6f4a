use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "equalify.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    pub api_url: String,
    pub graphql_url: String,
    pub resend_cooldown_seconds: u32,
    pub request_timeout_seconds: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.equalify.dev".into(),
            graphql_url: "https://graphql.equalify.dev/v1/graphql".into(),
            resend_cooldown_seconds: 60,
            request_timeout_seconds: 30,
        }
    }
}

impl ClientSettings {
    pub fn resend_cooldown(&self) -> u32 {
        self.resend_cooldown_seconds
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn api_base(&self) -> anyhow::Result<Url> {
        parse_base_url(&self.api_url).with_context(|| format!("invalid api url '{}'", self.api_url))
    }

    pub fn graphql_endpoint(&self) -> anyhow::Result<Url> {
        Url::parse(&self.graphql_url)
            .with_context(|| format!("invalid graphql url '{}'", self.graphql_url))
    }
}

pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE))
}

pub fn load_settings_from(path: &Path) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file_overrides(&mut settings, &raw);
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file_overrides(settings: &mut ClientSettings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        tracing::warn!("ignoring malformed settings file");
        return;
    };

    if let Some(v) = file_cfg.get("api_url").and_then(toml::Value::as_str) {
        settings.api_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("graphql_url").and_then(toml::Value::as_str) {
        settings.graphql_url = v.to_string();
    }
    if let Some(v) = file_cfg
        .get("resend_cooldown_seconds")
        .and_then(toml::Value::as_integer)
        .and_then(|v| u32::try_from(v).ok())
    {
        settings.resend_cooldown_seconds = v;
    }
    if let Some(v) = file_cfg
        .get("request_timeout_seconds")
        .and_then(toml::Value::as_integer)
        .and_then(|v| u64::try_from(v).ok())
    {
        settings.request_timeout_seconds = v;
    }
}

fn apply_env_overrides(settings: &mut ClientSettings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("EQUALIFY_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = var("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = var("EQUALIFY_GRAPHQL_URL") {
        settings.graphql_url = v;
    }
    if let Some(v) = var("APP__GRAPHQL_URL") {
        settings.graphql_url = v;
    }

    if let Some(v) = var("APP__RESEND_COOLDOWN_SECONDS") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.resend_cooldown_seconds = parsed;
        }
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECONDS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_seconds = parsed;
        }
    }
}

/// Base URLs need a trailing slash so `Url::join` appends instead of replacing the last segment.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, url::ParseError> {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("{trimmed}/"))
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
