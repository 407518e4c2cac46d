//! Error types for diffsage modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the diff export pipeline.
///
/// Only directory preparation is fatal. Per-file failures are reported
/// through the output sink and never surface here.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to prepare output directory {path}: {source}")]
    PrepareOutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("git diff failed for {file} (exit code {code}): {stderr}")]
    DiffFailed {
        file: String,
        code: i32,
        stderr: String,
    },

    #[error("Failed to write diff for {file}: {source}")]
    WriteFailed {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Diff worker for {file} terminated unexpectedly: {reason}")]
    WorkerFailed { file: String, reason: String },
}

/// Errors from choosing what to analyze.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TargetError {
    #[error("Invalid revision '{0}': revisions must not start with '-'")]
    OptionLikeRevision(String),
}

/// Errors from the Ollama model server.
#[derive(Error, Debug)]
pub enum OllamaError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Unable to connect to Ollama server at {url}: {reason}")]
    Connection { url: String, reason: String },

    #[error("Ollama request timed out after {0} seconds")]
    Timeout(u64),

    #[error("API Error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Ollama returned a malformed response: {0}")]
    MalformedResponse(String),
}

/// Errors from the default-model config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error decoding JSON from config file {path}: {source}. File might be corrupted.")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[source] serde_json::Error),
}

/// Errors from interactive prompts.
#[derive(Error, Debug)]
pub enum SelectError {
    #[error("Prompt was interrupted")]
    Interrupted,

    #[error("No valid selection after {0} attempts")]
    TooManyAttempts(usize),

    #[error("Terminal prompt failed: {0}")]
    Terminal(#[source] dialoguer::Error),

    #[error(transparent)]
    InvalidTarget(#[from] TargetError),
}

impl From<dialoguer::Error> for SelectError {
    fn from(err: dialoguer::Error) -> Self {
        match err {
            dialoguer::Error::IO(ref io) if io.kind() == std::io::ErrorKind::Interrupted => {
                SelectError::Interrupted
            }
            other => SelectError::Terminal(other),
        }
    }
}
