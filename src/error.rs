//! Error types for the analysis pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal configuration problems, raised before any analysis starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("credentials not found: environment variable {var} is not set")]
    MissingCredentials { var: String },

    #[error("credentials in {var} are not a valid JSON object: {reason}")]
    InvalidCredentials { var: String, reason: String },

    #[error("failed to write credentials to {}: {source}", path.display())]
    CredentialWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no Earth Engine project configured (use --project, EE_PROJECT or [service].project)")]
    MissingProject,

    #[error("failed to create HTTP client: {0}")]
    HttpClient(String),

    #[error("invalid points file {}: {reason}", path.display())]
    PointsFile { path: PathBuf, reason: String },
}

/// Failures while talking to the imagery service. All of them abort the run.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("cannot connect to {0}")]
    Connect(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("Earth Engine API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Failures while serializing or loading a result table.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid result file: {0}")]
    Invalid(String),
}
