//! diffsage - export per-file git diffs and summarize them with a local LLM.
//!
//! # Overview
//!
//! diffsage lists the files changed in the working tree or in a commit,
//! writes one unified diff per file into an output directory using a
//! bounded pool of workers, then sends each diff to an Ollama server and
//! collects a short natural-language summary per file, suitable as
//! commit-message or review material.

pub mod analysis;
pub mod config;
pub mod error;
pub mod export;
pub mod git;
pub mod ollama;
pub mod output;
pub mod select;

// Re-export commonly used types
pub use analysis::{AnalysisReport, AnalysisResult, ERROR_PREFIX};
pub use error::{ConfigError, ExportError, OllamaError, SelectError, TargetError};
pub use export::{DiffRecord, ExportedDiff};
pub use git::{ChangeTarget, CommandOutput, CommandRunner, GitRunner};
pub use ollama::{ModelInfo, ModelServer, OllamaClient};
pub use output::{CaptureSink, ConsoleSink, OutputSink, Tone};
