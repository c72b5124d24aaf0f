//! CLI binary for generating and validating ASCII output.

mod config;
mod render;

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use glyph_generate::{Orientation, RetryConfig, RetryOrchestrator};
use glyph_llm::{ChatCompletionsAdapter, Collaborator, ScriptedGenerator};
use glyph_types::{is_sentinel, Mode, ProviderError};
use glyph_validate::{measure_art_quality, AsciiValidator};

use crate::config::AppConfig;
use crate::render::{report_error, StreamPrinter};

#[derive(Parser)]
#[command(name = "glyph", version, about = "Validated ASCII art, charts, diagrams, and logos")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct GenerateArgs {
    /// What to draw
    #[arg(required = true, num_args = 1..)]
    prompt: Vec<String>,

    /// Print fragments as they arrive
    #[arg(short, long)]
    stream: bool,

    /// Regeneration attempts after the first (default: GLYPH_MAX_RETRIES or 2)
    #[arg(long)]
    max_retries: Option<usize>,

    /// Use canned output instead of calling the API
    #[arg(long)]
    offline: bool,

    /// Treat warnings as failures
    #[arg(long)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw ASCII art
    Art(GenerateArgs),

    /// Render a text logo
    Logo(GenerateArgs),

    /// Draw a chart with box and block characters
    Chart(GenerateArgs),

    /// Draw a flowchart
    Diagram {
        #[command(flatten)]
        args: GenerateArgs,

        /// Flow direction: top-to-bottom or left-to-right
        #[arg(long, default_value = "top-to-bottom")]
        orientation: String,
    },

    /// Validate existing output from a file or stdin
    Validate {
        /// File to read (stdin when omitted)
        path: Option<PathBuf>,

        /// Mode whose rules apply
        #[arg(short, long, default_value = "art")]
        mode: String,

        /// Treat warnings as failures
        #[arg(long)]
        strict: bool,

        /// Print a JSON report
        #[arg(long)]
        json: bool,

        /// Print the cleaned text
        #[arg(long)]
        clean: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Art(args) => cmd_generate(Mode::Art, args, Orientation::default()).await?,
        Commands::Logo(args) => cmd_generate(Mode::Logo, args, Orientation::default()).await?,
        Commands::Chart(args) => cmd_generate(Mode::Chart, args, Orientation::default()).await?,
        Commands::Diagram { args, orientation } => {
            cmd_generate(Mode::Diagram, args, Orientation::from_name(&orientation)).await?
        }
        Commands::Validate {
            path,
            mode,
            strict,
            json,
            clean,
        } => cmd_validate(path.as_deref(), &mode, strict, json, clean)?,
    }

    Ok(())
}

fn build_collaborator(config: &AppConfig, mode: Mode, offline: bool) -> anyhow::Result<Collaborator> {
    if offline {
        return Ok(Collaborator::streaming(ScriptedGenerator::demo(mode)));
    }
    let adapter = ChatCompletionsAdapter::new(config.require_api_key()?.to_string())
        .with_base_url(config.base_url.clone())
        .with_model(config.model.clone())
        .with_timeout(config.timeout_secs);
    tracing::debug!(model = adapter.model(), base_url = %config.base_url, "using chat completions");
    Ok(Collaborator::streaming(adapter))
}

async fn cmd_generate(mode: Mode, args: GenerateArgs, orientation: Orientation) -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    let collaborator = build_collaborator(&config, mode, args.offline)?;
    let retry = RetryConfig {
        max_retries: args.max_retries.unwrap_or(config.max_retries),
        strict: args.strict,
    };
    let mut orchestrator = RetryOrchestrator::new(collaborator, mode)
        .with_orientation(orientation)
        .with_config(retry)
        .with_rate_limiter(Arc::new(config.rate_limiter()));

    let prompt = args.prompt.join(" ");
    tracing::info!(%mode, stream = args.stream, max_retries = retry.max_retries, "generating");

    let failed = if args.stream {
        stream_to_terminal(&mut orchestrator, &prompt).await?
    } else {
        let generation = orchestrator.generate(&prompt).await;
        if is_sentinel(&generation.content) {
            let error = ProviderError::from_sentinel(&generation.content).unwrap_or(ProviderError::Other {
                code: "UNKNOWN_ERROR".into(),
                message: generation.content.clone(),
            });
            report_error(&mut std::io::stderr(), &error)?;
            true
        } else {
            println!("{}", generation.content);
            if !generation.success {
                eprintln!(
                    "[WARN] Output still has problems after {} attempts",
                    generation.attempts
                );
            }
            false
        }
    };

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

/// Print fragments until the run ends or the user interrupts. Returns whether it failed.
async fn stream_to_terminal(orchestrator: &mut RetryOrchestrator, prompt: &str) -> anyhow::Result<bool> {
    let mut run = orchestrator.generate_stream(prompt);
    let mut printer = StreamPrinter::new(std::io::stdout(), std::io::stderr());

    loop {
        let fragment = tokio::select! {
            fragment = run.next() => fragment,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\n[WARN] Interrupted");
                return Ok(true);
            }
        };
        let Some(fragment) = fragment else { break };
        printer.print(&fragment)?;
    }

    let failed = printer.finish()?;
    if let Some(generation) = run.result() {
        if !generation.success && !failed {
            eprintln!(
                "[WARN] Output still has problems after {} attempts",
                generation.attempts
            );
        }
    }
    Ok(failed)
}

fn cmd_validate(
    path: Option<&std::path::Path>,
    mode: &str,
    strict: bool,
    json: bool,
    clean: bool,
) -> anyhow::Result<()> {
    let content = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let validator = AsciiValidator::for_name(mode);
    let (cleaned, outcome) = validator.validate_and_clean(&content, strict, false);
    let quality = (validator.mode() == Mode::Art).then(|| measure_art_quality(&cleaned));

    if json {
        let mut report = serde_json::json!({
            "mode": validator.mode(),
            "is_valid": outcome.is_valid(),
            "errors": outcome.errors(),
            "warnings": outcome.warnings(),
        });
        if let Some(quality) = &quality {
            report["quality"] = serde_json::to_value(quality)?;
        }
        if clean {
            report["cleaned"] = serde_json::Value::String(cleaned.clone());
        }
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if outcome.errors().is_empty() && outcome.warnings().is_empty() {
            println!("Content is valid");
        }
        for error in outcome.errors() {
            println!("[ERROR] {error}");
        }
        for warning in outcome.warnings() {
            println!("[WARN] {warning}");
        }
        if let Some(quality) = &quality {
            println!("Quality: {}/100 ({})", quality.score, quality.grade);
        }
        if clean {
            println!("{cleaned}");
        }
    }

    if !outcome.is_valid() {
        std::process::exit(1);
    }
    Ok(())
}
