//! Secret resolution for credentials referenced from the config file.
//!
//! A [`SecretRef`] names up to three sources, tried in priority order:
//!
//! 1. **Direct value** - `"key": { "value": "eyJ..." }`, handy for local testing
//! 2. **File reference** - `"key": { "file": "/run/secrets/supabase_key" }`
//! 3. **Env var reference** - `"key": { "env": "SUPABASE_KEY" }`

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fs;

/// Error type for secret resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need one of: direct value, file path, or env var name)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

/// Where to find a secret. Empty strings count as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretRef {
    #[serde(default, skip_serializing)]
    pub value: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub env: Option<String>,
}

impl SecretRef {
    pub fn from_env(name: &str) -> Self {
        Self {
            env: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn resolve(&self) -> Result<SecretString, SecretError> {
        resolve_secret(
            self.value.as_deref(),
            self.file.as_deref(),
            self.env.as_deref(),
        )
    }
}

/// Resolves a secret from the first non-empty source: direct value, then
/// file contents, then environment variable. File and env values are trimmed.
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString, SecretError> {
    if let Some(value) = direct.filter(|v| !v.is_empty()) {
        return Ok(SecretString::from(value.to_string()));
    }

    if let Some(path) = file_path.filter(|p| !p.is_empty()) {
        let expanded = expand_home(path);
        return match fs::read_to_string(&expanded) {
            Ok(content) => Ok(SecretString::from(content.trim().to_string())),
            Err(e) => Err(SecretError::FileReadError {
                path: expanded,
                source: e,
            }),
        };
    }

    if let Some(var_name) = env_var.filter(|n| !n.is_empty()) {
        return match std::env::var(var_name) {
            Ok(value) => Ok(SecretString::from(value.trim().to_string())),
            Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                name: var_name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: var_name.to_string(),
            }),
        };
    }

    Err(SecretError::NoSourceProvided)
}

/// Expands a leading `~` to the user's home directory. `~user/path` is not
/// supported.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            let home = home.to_string_lossy();
            if path == "~" {
                return home.into_owned();
            }
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}
