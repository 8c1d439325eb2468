use crate::id::{DEFAULT_ALPHABET, DEFAULT_LENGTH, DEFAULT_MAX_ATTEMPTS};
use anyhow::{Context, Result};
use axum::http::HeaderValue;
use std::{collections::HashSet, num::NonZeroU32};

/// Origins allowed to call the API from a browser when `CORS_ORIGINS` is unset.
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173";

/// `POST /shorten` requests allowed per client per minute.
const DEFAULT_SHORTEN_RATE_LIMIT: u32 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind the HTTP server to, e.g. "0.0.0.0"
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Public base URL used when formatting short links, e.g. "https://go.example.com"
    /// Never has a trailing slash.
    pub base_url: String,

    /// Default identifier length. Escalation adds one character, so the
    /// accepted range keeps escalated identifiers resolvable.
    pub id_length: usize,

    /// Collision retries per identifier length.
    pub id_max_attempts: usize,

    /// Symbols identifiers are drawn from.
    pub id_alphabet: String,

    /// Browser origins allowed by CORS.
    pub cors_origins: Vec<HeaderValue>,

    /// Per-client `POST /shorten` quota per minute. `None` disables limiting.
    pub shorten_rate_limit: Option<NonZeroU32>,

    /// Take the client address from X-Forwarded-For / X-Real-IP. Only enable
    /// behind a proxy that sets these headers itself.
    pub trust_proxy: bool,
}

impl AppConfig {
    /// Load configuration from environment variables (populated by dotenvy before this is called).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup, e.g. a map in tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".into())
            .parse::<u16>()
            .context("PORT must be a valid port number (1–65535)")?;

        let base_url = lookup("BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_owned();

        let id_length = lookup("SHORT_ID_LENGTH")
            .map(|v| v.parse::<usize>())
            .transpose()
            .context("SHORT_ID_LENGTH must be a number")?
            .unwrap_or(DEFAULT_LENGTH);
        if !(6..=9).contains(&id_length) {
            anyhow::bail!("SHORT_ID_LENGTH must be between 6 and 9, got {id_length}");
        }

        let id_max_attempts = lookup("SHORT_ID_MAX_ATTEMPTS")
            .map(|v| v.parse::<usize>())
            .transpose()
            .context("SHORT_ID_MAX_ATTEMPTS must be a number")?
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);
        if id_max_attempts == 0 {
            anyhow::bail!("SHORT_ID_MAX_ATTEMPTS must be at least 1");
        }

        let id_alphabet = lookup("SHORT_ID_ALPHABET").unwrap_or_else(|| DEFAULT_ALPHABET.into());
        validate_alphabet(&id_alphabet)?;

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.into())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                if origin == "*" {
                    anyhow::bail!("CORS_ORIGINS must list explicit origins, not '*'");
                }
                HeaderValue::from_str(origin)
                    .with_context(|| format!("CORS_ORIGINS entry '{origin}' is not a valid origin"))
            })
            .collect::<Result<Vec<_>>>()?;

        // 0 turns the limiter off.
        let shorten_rate_limit = lookup("SHORTEN_RATE_LIMIT_PER_MINUTE")
            .map(|v| v.parse::<u32>())
            .transpose()
            .context("SHORTEN_RATE_LIMIT_PER_MINUTE must be a number")?
            .map_or(NonZeroU32::new(DEFAULT_SHORTEN_RATE_LIMIT), NonZeroU32::new);

        let trust_proxy = lookup("TRUST_PROXY")
            .map(|v| v.parse::<bool>())
            .transpose()
            .context("TRUST_PROXY must be true or false")?
            .unwrap_or(false);

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            base_url,
            id_length,
            id_max_attempts,
            id_alphabet,
            cors_origins,
            shorten_rate_limit,
            trust_proxy,
        })
    }

    /// Full short URL for `identifier`.
    pub fn short_url(&self, identifier: &str) -> String {
        format!("{}/{}", self.base_url, identifier)
    }
}

fn validate_alphabet(alphabet: &str) -> Result<()> {
    if !alphabet
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        anyhow::bail!("SHORT_ID_ALPHABET may only contain ASCII letters, digits, '-' and '_'");
    }

    let unique: HashSet<char> = alphabet.chars().collect();
    if unique.len() != alphabet.len() {
        anyhow::bail!("SHORT_ID_ALPHABET must not repeat characters");
    }
    if unique.len() < 2 {
        anyhow::bail!("SHORT_ID_ALPHABET needs at least 2 characters");
    }

    Ok(())
}
