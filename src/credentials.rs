//! Credential bootstrap.
//!
//! Credentials arrive as a JSON blob in an environment variable. They are
//! parsed into an explicit [`Credentials`] value that is handed to the
//! service client, and optionally copied to the well-known file location used
//! by other Earth Engine tooling.

use crate::error::ConfigError;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Parsed Earth Engine user credentials.
#[derive(Clone)]
pub struct Credentials {
    pub refresh_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Default cloud project stored alongside the token.
    pub project: Option<String>,
    /// The object as received, unknown fields included.
    raw: Map<String, Value>,
}

#[derive(Deserialize)]
struct CredentialFields {
    refresh_token: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    project: Option<String>,
}

// Secrets stay out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("project", &self.project)
            .finish()
    }
}

impl Credentials {
    /// Parse a credential JSON object. `source` names the origin for errors.
    pub fn parse(json: &str, source: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidCredentials {
            var: source.to_string(),
            reason,
        };

        let value: Value = serde_json::from_str(json).map_err(|e| invalid(e.to_string()))?;
        let Value::Object(raw) = value else {
            return Err(invalid("expected a JSON object".to_string()));
        };

        let fields: CredentialFields = serde_json::from_value(Value::Object(raw.clone()))
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            refresh_token: fields.refresh_token,
            client_id: fields.client_id,
            client_secret: fields.client_secret,
            project: fields.project,
            raw,
        })
    }

    /// Read credentials from the environment variable `var`.
    pub fn from_env(var: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(var, |name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary variable lookup.
    pub fn from_lookup<F>(var: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(var) {
            Some(json) if !json.trim().is_empty() => {
                debug!("Found credentials in {}", var);
                Self::parse(&json, var)
            }
            _ => Err(ConfigError::MissingCredentials {
                var: var.to_string(),
            }),
        }
    }

    /// Write the credential object to `path`, creating parent directories.
    ///
    /// The output is stable for identical input, so repeated calls leave the
    /// file unchanged.
    pub fn persist(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::CredentialWrite {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let content = serde_json::to_string_pretty(&self.raw)
            .map_err(|e| write_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        std::fs::write(path, content).map_err(write_err)?;

        info!("Credentials written to {}", path.display());
        Ok(())
    }
}
