use serde::{Deserialize, Serialize};

use crate::models;

pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_RESPONDER_DELAY_MS: u64 = 1000;

/// Values read from the process environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EnvDefaults {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_attachment_bytes: Option<u64>,
    pub responder_delay_ms: Option<u64>,
}

impl EnvDefaults {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let parse_u64 = |key: &str| {
            let raw = get(key)?;
            match raw.trim().parse::<u64>() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(key, value = %raw, "ignoring non-numeric setting");
                    None
                }
            }
        };
        Self {
            api_key: get("GEMINI_API_KEY"),
            model: get("FILECHAT_MODEL"),
            max_attachment_bytes: parse_u64("FILECHAT_MAX_ATTACHMENT_BYTES"),
            responder_delay_ms: parse_u64("FILECHAT_RESPONDER_DELAY_MS"),
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CliOverrides {
    pub model: Option<String>,
    pub max_attachment_bytes: Option<u64>,
    pub responder_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EffectiveSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub max_attachment_bytes: u64,
    pub responder_delay_ms: u64,
}

pub fn resolve_effective_settings(env: &EnvDefaults, cli: &CliOverrides) -> EffectiveSettings {
    let requested = cli.model.clone().or_else(|| env.model.clone());
    let model = match requested {
        Some(id) if models::find_model(&id).is_some() => id,
        Some(id) => {
            let fallback = models::default_model().id;
            tracing::warn!(requested = %id, fallback, "unknown model, using catalog default");
            fallback.to_string()
        }
        None => models::default_model().id.to_string(),
    };

    EffectiveSettings {
        api_key: env.api_key.clone(),
        model,
        max_attachment_bytes: cli
            .max_attachment_bytes
            .or(env.max_attachment_bytes)
            .unwrap_or(DEFAULT_MAX_ATTACHMENT_BYTES),
        responder_delay_ms: cli
            .responder_delay_ms
            .or(env.responder_delay_ms)
            .unwrap_or(DEFAULT_RESPONDER_DELAY_MS),
    }
}
