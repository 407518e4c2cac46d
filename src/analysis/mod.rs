//! Sending exported diffs to the model server and collecting summaries.
//!
//! Analysis never fails as a whole: every per-file problem (unreadable
//! file, connection refused, non-200 status, malformed body) becomes a
//! result string starting with [`ERROR_PREFIX`].

pub mod prompt;

use tracing::{debug, warn};

use crate::error::OllamaError;
use crate::export::ExportedDiff;
use crate::ollama::ModelServer;
use crate::output::OutputSink;

pub use prompt::{DEFAULT_SYSTEM_PROMPT, build_chat_request, build_user_prompt};

/// Reserved prefix marking a failed analysis.
pub const ERROR_PREFIX: &str = "Error:";

/// Whether an analysis string denotes a failure.
pub fn is_error_text(text: &str) -> bool {
    text.starts_with(ERROR_PREFIX)
}

/// Analysis outcome for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    /// Repository path of the analyzed file.
    pub filename: String,
    /// Summary text, or an error string starting with [`ERROR_PREFIX`].
    pub outcome: String,
}

impl AnalysisResult {
    pub fn is_error(&self) -> bool {
        is_error_text(&self.outcome)
    }
}

/// All results of one analysis pass, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisReport {
    pub results: Vec<AnalysisResult>,
}

impl AnalysisReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| !r.is_error()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.results.iter().filter(|r| r.is_error())
    }

    pub fn successes(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.results.iter().filter(|r| !r.is_error())
    }
}

/// Analyze a single exported diff file.
///
/// Returns the trimmed model reply, or an `Error:`-prefixed description of
/// what went wrong. Never panics or propagates errors.
pub async fn analyze_diff(
    server: &dyn ModelServer,
    model: &str,
    exported: &ExportedDiff,
    system_prompt: Option<&str>,
) -> String {
    let filename = exported.file.as_str();
    let diff_file = exported.path.as_path();

    let diff = match tokio::fs::read(diff_file).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return format!("{} Diff file not found: {}", ERROR_PREFIX, diff_file.display());
        }
        Err(e) => {
            return format!(
                "{} Failed to read diff file {}: {}",
                ERROR_PREFIX,
                diff_file.display(),
                e
            );
        }
    };

    let request = build_chat_request(model, system_prompt, filename, &diff);
    debug!("Analyzing {} ({} bytes of diff)", filename, diff.len());

    match server.chat(&request).await {
        Ok(content) => content.trim().to_string(),
        Err(OllamaError::Status { status, body }) => format!(
            "{} API Error ({}) analyzing {}. Details: {}",
            ERROR_PREFIX, status, filename, body
        ),
        Err(e @ (OllamaError::Connection { .. } | OllamaError::Timeout(_))) => format!(
            "{} Network or API request failed for {}: {}",
            ERROR_PREFIX, filename, e
        ),
        Err(e) => format!(
            "{} An unexpected error occurred processing {}: {}",
            ERROR_PREFIX,
            diff_file.display(),
            e
        ),
    }
}

/// Analyze every diff file sequentially, reporting progress to `sink`.
pub async fn analyze_diffs(
    server: &dyn ModelServer,
    model: &str,
    diffs: &[ExportedDiff],
    system_prompt: Option<&str>,
    sink: &dyn OutputSink,
) -> AnalysisReport {
    let total = diffs.len();
    let mut report = AnalysisReport::default();

    for (i, exported) in diffs.iter().enumerate() {
        let filename = exported.file.clone();
        sink.info(&format!("[{}/{}] Analyzing: {}", i + 1, total, filename));

        let outcome = analyze_diff(server, model, exported, system_prompt).await;
        if is_error_text(&outcome) {
            warn!("Analysis failed for {}: {}", filename, outcome);
            sink.error(&format!("Analysis failed for: {}", filename));
        } else {
            sink.success(&format!("Analysis successful for: {}", filename));
        }

        report.results.push(AnalysisResult { filename, outcome });
    }

    print_summary(&report, sink);
    report
}

/// Print success/failure counts and the list of failed files.
pub fn print_summary(report: &AnalysisReport, sink: &dyn OutputSink) {
    sink.info(&format!("\n{} Analysis Summary {}", "=".repeat(30), "=".repeat(30)));
    sink.success(&format!("Successfully analyzed: {} files", report.succeeded()));

    if report.failed() > 0 {
        sink.error(&format!("Failed to analyze: {} files", report.failed()));
        sink.warn("Files with errors:");
        for failure in report.failures() {
            sink.warn(&format!("  - {}: {}", failure.filename, failure.outcome));
        }
    }

    sink.info(&"=".repeat(78));
}

/// Print each successful analysis under its file name.
pub fn print_results(report: &AnalysisReport, sink: &dyn OutputSink) {
    for result in report.successes() {
        sink.info(&format!("\n── {} ──\n{}", result.filename, result.outcome));
    }
}
