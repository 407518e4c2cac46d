//! diffsage - CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use diffsage::analysis::{analyze_diffs, print_results};
use diffsage::config::{ConfigStore, DEFAULT_CONFIG_PATH};
use diffsage::error::SelectError;
use diffsage::export::{DEFAULT_OUTPUT_DIR, export_diffs};
use diffsage::git::{ChangeTarget, CommandRunner, GitRunner, git_available, latest_commit_hash};
use diffsage::ollama::{BASE_URL_ENV_VAR, ModelInfo, ModelServer, OllamaClient, resolve_base_url};
use diffsage::output::{ConsoleSink, OutputSink};
use diffsage::select::{
    ModelResolution, confirm_save_default, display_models, prompt_model, prompt_target,
    resolve_model,
};

/// Export git diffs and send them to an Ollama model for analysis.
#[derive(Parser, Debug)]
#[command(name = "diffsage")]
#[command(about = "Export git diffs and send them to an Ollama model for analysis")]
#[command(version)]
struct Cli {
    /// Ollama model to use for this run (overrides the saved default)
    #[arg(short, long)]
    model: Option<String>,

    /// Commit to analyze (defaults to an interactive choice)
    #[arg(short, long)]
    commit: Option<String>,

    /// Directory for the temporary diff files (cleared on every run)
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output: PathBuf,

    /// Number of parallel workers generating diff files
    #[arg(long, default_value_t = 4)]
    threads: usize,

    /// Custom system prompt for the analysis
    #[arg(long)]
    prompt: Option<String>,

    /// Interactively select and save an Ollama model as the default, then exit
    #[arg(long)]
    set_default_model: bool,

    /// List installed Ollama models and exit
    #[arg(long)]
    list_models: bool,

    /// Path to the default-model config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Ollama API base URL
    #[arg(long, env = BASE_URL_ENV_VAR)]
    ollama_url: Option<String>,

    /// Repository to run git in (defaults to the current directory)
    #[arg(long)]
    repo: Option<PathBuf>,

    /// Only print the summary, not each file's analysis
    #[arg(long)]
    quiet_results: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let sink: Arc<dyn OutputSink> = Arc::new(ConsoleSink);

    tokio::select! {
        result = run(cli, Arc::clone(&sink)) => match result {
            Ok(code) => code,
            Err(e) if is_cancellation(&e) => {
                sink.warn("Operation cancelled by user.");
                ExitCode::SUCCESS
            }
            Err(e) => {
                sink.error(&format!("Fatal error: {:#}", e));
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            sink.warn("\nOperation cancelled by user.");
            // A prompt may still hold a blocking thread; don't wait for it.
            std::process::exit(0);
        }
    }
}

/// Initialize stderr logging. `RUST_LOG` takes precedence over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "diffsage=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn is_cancellation(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<SelectError>(), Some(SelectError::Interrupted))
}

async fn run(cli: Cli, sink: Arc<dyn OutputSink>) -> Result<ExitCode> {
    // Step 1: Check prerequisites
    if !git_available() {
        bail!("Git command not found. Is Git installed and in your PATH?");
    }

    let runner = match &cli.repo {
        Some(dir) => GitRunner::in_dir(dir),
        None => GitRunner::new(),
    };

    let client = OllamaClient::new(&resolve_base_url(cli.ollama_url.as_deref()))
        .context("Failed to create Ollama client")?;
    let store = ConfigStore::new(&cli.config);

    // Step 2: Discover models
    sink.info("Checking available Ollama models...");
    let models = match client.list_models().await {
        Ok(models) => models,
        Err(e) => {
            sink.error(&e.to_string());
            Vec::new()
        }
    };

    if models.is_empty() {
        bail!(
            "No Ollama models found. Please ensure Ollama is running at {} and models are downloaded.",
            client.base_url()
        );
    }

    if cli.list_models {
        display_models(&models, sink.as_ref());
        return Ok(ExitCode::SUCCESS);
    }

    if cli.set_default_model {
        return set_default_model(&store, models, sink).await;
    }

    // Step 3: Resolve the model
    let Some(model) = choose_model(&cli, &store, models, Arc::clone(&sink)).await? else {
        sink.warn("No model selected for analysis. Exiting.");
        return Ok(ExitCode::SUCCESS);
    };
    sink.success(&format!("Proceeding with analysis using model: {}", model));

    // Step 4: Resolve the analysis target
    let target = match cli.commit.as_deref() {
        Some(rev) => ChangeTarget::from_revision(Some(rev))?,
        None => {
            let latest = latest_commit_hash(&runner).await;
            match blocking(move || prompt_target(latest.as_deref())).await? {
                Some(target) => target,
                None => {
                    sink.warn("No commit hash provided for analysis. Exiting.");
                    return Ok(ExitCode::SUCCESS);
                }
            }
        }
    };
    sink.info(&format!("Analysis target set to: {}", target));

    if cli.prompt.is_some() {
        sink.info("Using custom system prompt.");
    }

    // Step 5: Export diffs
    sink.info("\nStep 1: Exporting Git Diffs");
    let runner: Arc<dyn CommandRunner> = Arc::new(runner);
    let diff_files = export_diffs(runner, &target, &cli.output, cli.threads, Arc::clone(&sink))
        .await
        .context("Failed to export git diffs")?;

    if diff_files.is_empty() {
        sink.warn("No diff files were generated. Nothing to analyze.");
        return Ok(ExitCode::SUCCESS);
    }

    // Step 6: Analyze
    sink.info(&format!(
        "\nStep 2: Analyzing {} Diff Files using '{}'",
        diff_files.len(),
        model
    ));
    let report = analyze_diffs(
        &client,
        &model,
        &diff_files,
        cli.prompt.as_deref(),
        sink.as_ref(),
    )
    .await;

    if !cli.quiet_results {
        print_results(&report, sink.as_ref());
    }

    sink.success("Analysis process complete!");
    Ok(ExitCode::SUCCESS)
}

/// Handle `--set-default-model`: pick a model, save it, exit.
async fn set_default_model(
    store: &ConfigStore,
    models: Vec<ModelInfo>,
    sink: Arc<dyn OutputSink>,
) -> Result<ExitCode> {
    sink.info("Set Default Ollama Model");
    display_models(&models, sink.as_ref());

    let prompt_sink = Arc::clone(&sink);
    match blocking(move || prompt_model(&models, prompt_sink.as_ref())).await? {
        Some(model) => {
            store
                .save_default_model(&model)
                .context("Failed to save default model")?;
            sink.success(&format!(
                "Default model '{}' saved to {}",
                model,
                store.path().display()
            ));
            sink.success(
                "Configuration complete. You can now run the analyzer without specifying a model.",
            );
            Ok(ExitCode::SUCCESS)
        }
        None => {
            sink.warn("No model selected. Default model not changed.");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Resolve the model: `--model`, then the saved default, then a prompt.
async fn choose_model(
    cli: &Cli,
    store: &ConfigStore,
    models: Vec<ModelInfo>,
    sink: Arc<dyn OutputSink>,
) -> Result<Option<String>> {
    let saved = match store.load_default_model() {
        Ok(saved) => saved,
        Err(e) => {
            sink.warn(&e.to_string());
            None
        }
    };

    match resolve_model(cli.model.as_deref(), saved.as_deref(), &models) {
        ModelResolution::Explicit(model) => {
            sink.info(&format!("Using model specified via command line: {}", model));
            Ok(Some(model))
        }
        ModelResolution::SavedDefault(model) => {
            sink.info(&format!(
                "Using default model from {}: {}",
                store.path().display(),
                model
            ));
            Ok(Some(model))
        }
        ModelResolution::Prompt { stale_default } => {
            if let Some(stale) = stale_default {
                sink.warn(&format!(
                    "Default model '{}' not found among available models. It might have been removed.",
                    stale
                ));
                sink.info("Falling back to interactive model selection.");
            }

            sink.info("Select an Ollama Model for this analysis");
            display_models(&models, sink.as_ref());

            let prompt_sink = Arc::clone(&sink);
            let Some(model) = blocking(move || prompt_model(&models, prompt_sink.as_ref())).await?
            else {
                return Ok(None);
            };

            let name = model.clone();
            if blocking(move || confirm_save_default(&name)).await? {
                match store.save_default_model(&model) {
                    Ok(()) => sink.success(&format!(
                        "Default model '{}' saved to {}",
                        model,
                        store.path().display()
                    )),
                    Err(e) => sink.error(&e.to_string()),
                }
            }

            Ok(Some(model))
        }
    }
}

/// Run a terminal prompt off the async runtime so Ctrl-C stays responsive.
async fn blocking<T, F>(prompt: F) -> Result<T>
where
    F: FnOnce() -> Result<T, SelectError> + Send + 'static,
    T: Send + 'static,
{
    let answer = tokio::task::spawn_blocking(prompt)
        .await
        .context("Prompt task failed")?;
    Ok(answer?)
}
