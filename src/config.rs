//! Editor configuration
//!
//! Author: Moroya Sakamoto

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const ENV_API_BASE_URL: &str = "FORM_API_BASE_URL";
pub const ENV_EDITOR_MODE: &str = "FORM_EDITOR_MODE";
pub const ENV_RENUMBER_ON_SUBMIT: &str = "FORM_RENUMBER_ON_SUBMIT";

const DEFAULT_API_BASE_URL: &str = "http://localhost:3001/api";

/// Editor settings; every field has a default
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Base URL of the lookup and form endpoints
    pub api_base_url: String,
    /// Serve lookups from the built-in development lists
    pub development_lookups: bool,
    /// Recompute `sortOrder` from sibling position before submitting
    pub renumber_on_submit: bool,
    /// HTTP request timeout
    pub request_timeout_secs: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::from(DEFAULT_API_BASE_URL),
            development_lookups: false,
            renumber_on_submit: true,
            request_timeout_secs: 30,
        }
    }
}

impl EditorConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Defaults overridden through a custom environment lookup
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = get_env(ENV_API_BASE_URL).filter(|u| !u.trim().is_empty()) {
            config.api_base_url = url;
        }
        if let Some(mode) = get_env(ENV_EDITOR_MODE) {
            config.development_lookups = mode.trim().eq_ignore_ascii_case("development");
        }
        if let Some(flag) = get_env(ENV_RENUMBER_ON_SUBMIT).and_then(|v| parse_bool(&v)) {
            config.renumber_on_submit = flag;
        }
        config
    }

    /// Parse a JSON document; missing keys keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `base` joined with `path`, exactly one slash between them
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
