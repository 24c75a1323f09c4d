use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use prscribe_core::{
    ErrorReport, OutputFormat, PrscribeConfig, PublishPolicy, ReviewError, ReviewOutcome,
    ReviewRequest, TemplateKind,
};
use prscribe_review::github::GitHubClient;
use prscribe_review::llm::InferenceClient;
use prscribe_review::pipeline::ReviewOrchestrator;
use prscribe_review::prompt::{PromptBuilder, TemplateStore};

const CONFIG_FILE: &str = ".prscribe.toml";

#[derive(Parser)]
#[command(
    name = "prscribe",
    version,
    about = "AI-authored reviews for GitHub pull requests",
    long_about = "prscribe fetches a pull request diff from GitHub, wraps it in a prompt template,\n\
                  asks a text-generation backend for a review, and optionally posts the review\n\
                  back to the pull request as a comment.\n\n\
                  Examples:\n  \
                    prscribe review octocat/Hello-World 123          Print a review\n  \
                    prscribe review octocat/Hello-World 123 --post   Review and post a comment\n  \
                    prscribe review owner/repo 7 --kind qa-automation  QA-focused review\n  \
                    prscribe templates                               List prompt templates\n  \
                    prscribe init                                    Create .prscribe.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .prscribe.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Review text followed by a status line (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Generate an AI review for a pull request
    #[command(
        long_about = "Generate an AI review for a pull request.\n\n\
        Input is validated before any network call. The diff is fetched from GitHub,\n\
        substituted into the selected prompt template, and sent to the inference backend.\n\
        With --post the review is added to the pull request as a new comment.\n\n\
        Examples:\n  prscribe review octocat/Hello-World 123\n  prscribe review owner/repo 42 --post --strict-publish\n  prscribe review owner/repo 42 --template security.txt",
        allow_negative_numbers = true
    )]
    Review {
        /// Repository in owner/repo form
        repository: String,

        /// Pull request number
        pr_number: i64,

        /// Prompt template file name (default: review.default_template)
        #[arg(long, conflicts_with = "kind")]
        template: Option<String>,

        /// Built-in template kind (general, qa-automation)
        #[arg(long)]
        kind: Option<TemplateKind>,

        /// Post the review as a pull request comment
        #[arg(
            long,
            long_help = "Post the review as a new pull request comment.\n\n\
                Requires GITHUB_TOKEN or GH_TOKEN. Every successful run creates another comment."
        )]
        post: bool,

        /// Fail the command if posting fails after the review was generated
        #[arg(long)]
        strict_publish: bool,
    },
    /// List available prompt templates
    Templates,
    /// Create a default .prscribe.toml configuration file
    #[command(long_about = "Create a default .prscribe.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .prscribe.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

const DEFAULT_CONFIG: &str = r#"# prscribe configuration
# Environment variables override these values:
#   GITHUB_TOKEN / GH_TOKEN, PRSCRIBE_GITHUB_URL,
#   PRSCRIBE_INFERENCE_URL, PRSCRIBE_INFERENCE_TOKEN, PRSCRIBE_MODEL

[github]
# base_url = "https://api.github.com"
# connect_timeout_secs = 15
# request_timeout_secs = 30

[inference]
# Ollama-style non-streaming generate endpoint
# api_url = "http://localhost:11434/api/generate"
# model = "openchat:latest"
# connect_timeout_secs = 15
# request_timeout_secs = 60

[review]
# default_template = "prompt-template.txt"
# Directory of additional *.txt templates containing {DIFF_CONTENT}
# template_dir = "prompts"
# What to do when posting fails after generation: "partial" or "strict"
# publish_policy = "partial"
"#;

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<PrscribeConfig> {
    let config = match path {
        Some(path) => PrscribeConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                PrscribeConfig::from_file(default_path)?
            } else {
                PrscribeConfig::default()
            }
        }
    };
    let config = config.with_env_overrides();
    config.validate()?;
    tracing::debug!(
        github = %config.github.base_url,
        inference = %config.inference.api_url,
        model = %config.inference.model,
        template = %config.review.default_template,
        policy = %config.review.publish_policy,
        "configuration resolved"
    );
    Ok(config)
}

fn spinner(message: &str) -> Option<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Some(pb)
}

fn print_outcome(outcome: &ReviewOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(outcome).into_diagnostic()?);
        }
        OutputFormat::Markdown => print!("{}", outcome.to_markdown()),
        OutputFormat::Text => println!("{outcome}"),
    }
    Ok(())
}

/// Render a failed review and exit non-zero. Text output goes through miette.
fn report_failure(err: ReviewError, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let report = ErrorReport::from_error(&err);
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        }
        OutputFormat::Markdown => print!("{}", ReviewOutcome::from_error(&err).to_markdown()),
        OutputFormat::Text => {
            if let Some(review) = err.review_text() {
                println!("{}", review.trim_end());
            }
            return Err(err.into());
        }
    }
    std::process::exit(1);
}

async fn run_review(
    config: &PrscribeConfig,
    request: ReviewRequest,
    policy: PublishPolicy,
    format: OutputFormat,
) -> Result<()> {
    let store = Arc::new(TemplateStore::from_config(&config.review)?);
    let orchestrator = ReviewOrchestrator::new(
        GitHubClient::new(&config.github)?,
        InferenceClient::new(&config.inference)?,
        PromptBuilder::new(store),
        &config.review,
    )
    .with_publish_policy(policy);

    let spinner = spinner(&format!(
        "Reviewing {}#{}...",
        request.repository, request.pr_number
    ));
    let result = orchestrator.run(&request).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    match result {
        Ok(outcome) => print_outcome(&outcome, format),
        Err(err) => report_failure(err, format),
    }
}

fn list_templates(config: &PrscribeConfig, format: OutputFormat) -> Result<()> {
    let store = TemplateStore::from_config(&config.review)?;
    let default = config.review.default_template.as_str();
    match format {
        OutputFormat::Json => {
            let templates: Vec<serde_json::Value> = store
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "name": t.name(),
                        "description": t.description(),
                        "default": t.name() == default,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&templates).into_diagnostic()?);
        }
        OutputFormat::Markdown => {
            println!("| Template | Description |");
            println!("|---|---|");
            for t in store.iter() {
                let marker = if t.name() == default { " (default)" } else { "" };
                println!("| `{}`{marker} | {} |", t.name(), t.description());
            }
        }
        OutputFormat::Text => {
            for t in store.iter() {
                let marker = if t.name() == default { "*" } else { " " };
                println!("{marker} {:<40} {}", t.name(), t.description());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Review {
            repository,
            pr_number,
            template,
            kind,
            post,
            strict_publish,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let policy = if strict_publish {
                PublishPolicy::Strict
            } else {
                config.review.publish_policy
            };
            let template = template.or_else(|| kind.map(|k| k.file_name().to_string()));

            let mut request = ReviewRequest::new(repository, pr_number).with_post_comment(post);
            if let Some(template) = template {
                request = request.with_template(template);
            }
            run_review(&config, request, policy, cli.format).await?;
        }
        Command::Templates => {
            let config = load_config(cli.config.as_deref())?;
            list_templates(&config, cli.format)?;
        }
        Command::Init => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "prscribe", &mut std::io::stdout());
        }
    }

    Ok(())
}
