//! Interactive model and target selection.
//!
//! The parsing and resolution rules are plain functions so they can be
//! tested without a terminal; the `prompt_*` functions wrap them with
//! dialoguer.

use dialoguer::{Confirm, Input, Select};

use crate::error::SelectError;
use crate::git::ChangeTarget;
use crate::ollama::ModelInfo;
use crate::output::OutputSink;

/// How many invalid answers the model prompt tolerates before giving up.
pub const MAX_SELECTION_ATTEMPTS: usize = 5;

/// Interpretation of one answer to the model prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelChoice {
    Selected(String),
    Quit,
    Invalid(String),
}

/// Parse an answer: a 1-based index into `models`, or `q` to quit.
pub fn parse_model_choice(input: &str, models: &[ModelInfo]) -> ModelChoice {
    let input = input.trim();
    if input.eq_ignore_ascii_case("q") {
        return ModelChoice::Quit;
    }

    match input.parse::<usize>() {
        Ok(n) if (1..=models.len()).contains(&n) => ModelChoice::Selected(models[n - 1].name.clone()),
        Ok(_) => ModelChoice::Invalid("Invalid number".to_string()),
        Err(_) => ModelChoice::Invalid("Please enter a valid number".to_string()),
    }
}

/// Where the model for this run comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelResolution {
    /// Given on the command line; used as-is.
    Explicit(String),
    /// Saved default that is still installed.
    SavedDefault(String),
    /// Ask the user. Carries the saved default if it is no longer installed.
    Prompt { stale_default: Option<String> },
}

/// Resolve the model: explicit flag, then saved default, then prompt.
pub fn resolve_model(
    explicit: Option<&str>,
    saved_default: Option<&str>,
    available: &[ModelInfo],
) -> ModelResolution {
    if let Some(name) = explicit.map(str::trim).filter(|n| !n.is_empty()) {
        return ModelResolution::Explicit(name.to_string());
    }

    match saved_default {
        Some(name) if available.iter().any(|m| m.name == name) => {
            ModelResolution::SavedDefault(name.to_string())
        }
        Some(name) => ModelResolution::Prompt {
            stale_default: Some(name.to_string()),
        },
        None => ModelResolution::Prompt {
            stale_default: None,
        },
    }
}

/// Print the numbered model table.
pub fn display_models(models: &[ModelInfo], sink: &dyn OutputSink) {
    if models.is_empty() {
        sink.warn("No models installed on the system");
        return;
    }

    let width = models
        .iter()
        .map(|m| m.name.len())
        .max()
        .unwrap_or(0)
        .max("Model Name".len());

    sink.info(&format!("{:>4}  {:<width$}  {:>10}", "No.", "Model Name", "Size"));
    for (i, model) in models.iter().enumerate() {
        sink.info(&format!(
            "{:>4}  {:<width$}  {:>7.2} GB",
            i + 1,
            model.name,
            model.size_gb()
        ));
    }
}

/// Run the model selection loop, re-prompting on invalid input.
///
/// `ask` produces one raw answer per call. Returns `Ok(None)` when the user
/// quits or there are no models.
pub fn select_model_with<F>(
    models: &[ModelInfo],
    sink: &dyn OutputSink,
    mut ask: F,
) -> Result<Option<String>, SelectError>
where
    F: FnMut() -> Result<String, SelectError>,
{
    if models.is_empty() {
        return Ok(None);
    }

    for _ in 0..MAX_SELECTION_ATTEMPTS {
        let answer = ask()?;
        match parse_model_choice(&answer, models) {
            ModelChoice::Selected(name) => return Ok(Some(name)),
            ModelChoice::Quit => return Ok(None),
            ModelChoice::Invalid(reason) => sink.error(&reason),
        }
    }

    Err(SelectError::TooManyAttempts(MAX_SELECTION_ATTEMPTS))
}

/// Ask the user to pick a model on the terminal.
pub fn prompt_model(
    models: &[ModelInfo],
    sink: &dyn OutputSink,
) -> Result<Option<String>, SelectError> {
    select_model_with(models, sink, || {
        Input::<String>::new()
            .with_prompt("Please select a model (enter number or 'q' to quit)")
            .interact_text()
            .map_err(SelectError::from)
    })
}

/// Ask whether to persist `model` as the default.
pub fn confirm_save_default(model: &str) -> Result<bool, SelectError> {
    Confirm::new()
        .with_prompt(format!(
            "Would you like to save '{}' as the default model for future runs?",
            model
        ))
        .default(true)
        .interact()
        .map_err(SelectError::from)
}

/// Ask whether to analyze uncommitted changes or a specific commit.
///
/// Returns `Ok(None)` when a commit was chosen but no hash entered.
pub fn prompt_target(latest_commit: Option<&str>) -> Result<Option<ChangeTarget>, SelectError> {
    let choice = Select::new()
        .with_prompt("Analyze")
        .items(&["Current uncommitted changes", "Specific commit"])
        .default(0)
        .interact()?;

    if choice == 0 {
        return Ok(Some(ChangeTarget::Uncommitted));
    }

    let mut input = Input::<String>::new()
        .with_prompt("Enter commit hash to analyze")
        .allow_empty(true);
    if let Some(hash) = latest_commit {
        input = input.default(hash.to_string());
    }
    let hash = input.interact_text()?;

    let target = ChangeTarget::from_revision(Some(&hash))?;
    Ok(match target {
        ChangeTarget::Uncommitted => None,
        revision => Some(revision),
    })
}
