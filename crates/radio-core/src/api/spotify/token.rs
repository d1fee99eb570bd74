use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_LIFETIME_SECS: i64 = 3600;

/// Persisted OAuth token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Unix timestamp (seconds).
    pub expires_at: i64,
}

impl Token {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// Body of `POST /api/token`.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    /// Refresh responses may omit `refresh_token`; the previous one stays
    /// valid in that case.
    pub fn into_token(self, previous_refresh: Option<&str>, now: i64) -> Token {
        let refresh_token = self
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| previous_refresh.map(str::to_string))
            .unwrap_or_default();
        Token {
            access_token: self.access_token,
            refresh_token,
            expires_at: now + self.expires_in.unwrap_or(DEFAULT_LIFETIME_SECS),
        }
    }
}

pub fn load_token(path: &Path) -> Result<Option<Token>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read token file {:?}", path))?;
    let token = serde_json::from_str(&data).context("Failed to parse token file")?;
    Ok(Some(token))
}

pub fn save_token(path: &Path, token: &Token) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(token)?)
        .with_context(|| format!("Failed to write token file {:?}", path))?;
    Ok(())
}
