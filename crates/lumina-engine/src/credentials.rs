use anyhow::Result;

use crate::config::non_empty_env;
use crate::errors::CredentialError;

const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Host-provided access to the API key.
///
/// `resolve_key` is called right before every upstream request so that a key
/// selected mid-session is picked up without rebuilding the client.
pub trait CredentialSource: Send + Sync {
    fn has_selected_key(&self) -> bool;

    /// Runs the key-selection flow. Returns whether a key is now selected.
    fn select_key(&self) -> Result<bool>;

    fn resolve_key(&self) -> Result<String>;
}

/// Reads the key from the process environment on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl EnvCredentials {
    pub fn key_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        API_KEY_VARS.iter().find_map(|key| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        })
    }
}

impl CredentialSource for EnvCredentials {
    fn has_selected_key(&self) -> bool {
        Self::key_from_lookup(non_empty_env).is_some()
    }

    fn select_key(&self) -> Result<bool> {
        Ok(self.has_selected_key())
    }

    fn resolve_key(&self) -> Result<String> {
        Self::key_from_lookup(non_empty_env).ok_or_else(|| CredentialError::Missing.into())
    }
}

#[derive(Debug, Clone)]
pub struct StaticCredentials {
    key: String,
}

impl StaticCredentials {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl CredentialSource for StaticCredentials {
    fn has_selected_key(&self) -> bool {
        !self.key.trim().is_empty()
    }

    fn select_key(&self) -> Result<bool> {
        Ok(self.has_selected_key())
    }

    fn resolve_key(&self) -> Result<String> {
        if !self.has_selected_key() {
            return Err(CredentialError::Missing.into());
        }
        Ok(self.key.trim().to_string())
    }
}
