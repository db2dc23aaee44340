use std::time::Duration;

use crate::quiz::Topic;
use crate::story::DEFAULT_MODEL;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a whole number of seconds, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{name} must be true or false, got {value:?}")]
    InvalidFlag { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub dialogue_db: String,
    pub http_timeout: Duration,
    pub randomize_questions: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let http_timeout = match get("HTTP_TIMEOUT_SECS") {
            Some(value) => value
                .trim()
                .parse()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidNumber {
                    name: "HTTP_TIMEOUT_SECS",
                    value,
                })?,
            None => Duration::from_secs(15),
        };

        let randomize_questions = match get("QUIZ_RANDOMIZE") {
            Some(value) => parse_flag(&value).ok_or(ConfigError::InvalidFlag {
                name: "QUIZ_RANDOMIZE",
                value,
            })?,
            None => false,
        };

        Ok(Self {
            gemini_api_key: get("GEMINI_API_KEY").or_else(|| get("API_KEY")),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            dialogue_db: get("DIALOGUE_DB").unwrap_or_else(|| "db.sqlite".to_string()),
            http_timeout,
            randomize_questions,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Applies `SHEET_URL_<ID>` and `SHEET_GID_<ID>` overrides to the topic table.
pub fn apply_sheet_overrides(
    topics: &mut [Topic],
    lookup: impl Fn(&str) -> Option<String>,
) {
    for topic in topics {
        let key = topic.id.to_uppercase();
        if let Some(url) = lookup(&format!("SHEET_URL_{}", key)).filter(|v| !v.trim().is_empty()) {
            topic.sheet_url = url.trim().to_string();
        }
        if let Some(gid) = lookup(&format!("SHEET_GID_{}", key)).filter(|v| !v.trim().is_empty()) {
            topic.worksheet_gid = Some(gid.trim().to_string());
        }
    }
}
