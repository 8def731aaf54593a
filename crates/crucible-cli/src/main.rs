//! Crucible CLI - iterative multi-agent generation against a local backend
//!
//! Usage:
//!   crucible init [dir]                Write a default crucible.toml
//!   crucible health                    Probe the generation backend
//!   crucible run <requirements>        Run the loop and export the best result
//!   crucible stream -m <model> <text>  Stream one generation to stdout

mod export;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crucible_agent::{AgentContext, AgentRoster, Gateway};
use crucible_core::{CrucibleConfig, Role, SamplingParameters};
use crucible_orchestrator::{Orchestrator, OrchestratorConfig};
use futures::StreamExt;
use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "crucible")]
#[command(author, version, about = "Iterative multi-agent code generation")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory holding crucible.toml
    #[arg(short, long, default_value = ".")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default crucible.toml
    Init {
        /// Target directory (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Probe the generation backend and list its models
    Health,

    /// Run the generation loop on a set of requirements
    Run {
        /// Requirements text
        #[arg(required_unless_present = "file")]
        requirements: Option<String>,

        /// Read requirements from a file instead
        #[arg(short, long, value_name = "FILE", conflicts_with = "requirements")]
        file: Option<PathBuf>,

        /// Project name (directory under the output dir)
        #[arg(short, long)]
        project: Option<String>,

        /// Maximum iterations (1-20)
        #[arg(short = 'n', long)]
        max_iterations: Option<usize>,

        /// Quality threshold (50-100)
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Target language for the generated code
        #[arg(short, long)]
        language: Option<String>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Stream a single generation to stdout
    Stream {
        /// Model to use
        #[arg(short, long, default_value = "mistral")]
        model: String,

        /// Sampling temperature
        #[arg(long, default_value = "0.7")]
        temperature: f32,

        /// Prompt text
        prompt: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { path } => cmd_init(path),
        Commands::Health => cmd_health(load_config(&cli.config)?).await,
        Commands::Run {
            requirements,
            file,
            project,
            max_iterations,
            threshold,
            language,
            output,
        } => {
            let mut config = load_config(&cli.config)?;
            if let Some(n) = max_iterations {
                config.run.max_iterations = n;
            }
            if let Some(t) = threshold {
                config.run.quality_threshold = t;
            }
            if let Some(language) = language {
                config.run.target_language = language;
            }
            if let Some(output) = output {
                config.run.output_dir = output;
            }
            config.validate().context("Invalid run settings")?;

            let requirements = match (requirements, file) {
                (_, Some(path)) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read requirements from {}", path.display()))?,
                (Some(text), None) => text,
                (None, None) => bail!("No requirements given"),
            };
            cmd_run(config, requirements, project).await
        }
        Commands::Stream {
            model,
            temperature,
            prompt,
        } => cmd_stream(load_config(&cli.config)?, model, temperature, prompt).await,
    }
}

fn load_config(dir: &std::path::Path) -> Result<CrucibleConfig> {
    CrucibleConfig::load_or_default(dir)
        .with_context(|| format!("Failed to load configuration from {}", dir.display()))
}

fn cmd_init(path: PathBuf) -> Result<()> {
    let written = CrucibleConfig::write_default(&path)
        .with_context(|| format!("Failed to write configuration in {}", path.display()))?;
    println!("Created {}", written.display());
    Ok(())
}

async fn cmd_health(config: CrucibleConfig) -> Result<()> {
    let gateway = Gateway::ollama(&config)?;
    let report = gateway.health().await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.is_ok() {
        bail!("Backend at {} is not reachable", report.url);
    }
    Ok(())
}

async fn cmd_run(config: CrucibleConfig, requirements: String, project: Option<String>) -> Result<()> {
    let requirements = requirements.trim().to_string();
    if requirements.is_empty() {
        bail!("Requirements are empty");
    }
    let project = project.unwrap_or_else(|| export::project_slug(&requirements));

    let gateway = Arc::new(Gateway::ollama(&config)?);
    preflight(&gateway, &config).await?;

    let context = AgentContext::new(gateway, config.limits.clone());
    let roster = AgentRoster::standard(context, &config);
    let mut orchestrator = Orchestrator::new(roster, OrchestratorConfig::from(&config.run));

    let cancel = orchestrator.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current iteration");
            cancel.cancel();
        }
    });

    info!(
        "Project '{}': up to {} iterations, threshold {:.1}, language {}",
        project,
        config.run.max_iterations,
        config.run.quality_threshold,
        config.run.target_language
    );
    let solution = orchestrator
        .run(&requirements)
        .await
        .context("Generation loop failed")?;

    let dir = export::export_solution(&solution, &project, &config.run.output_dir).await?;

    println!("{}", solution.report(&project));
    println!("Output written to {}", dir.display());

    if !solution.is_success() {
        bail!("No iteration produced a solution");
    }
    Ok(())
}

/// Fatal when the backend is unreachable; missing models only warn
async fn preflight(gateway: &Gateway, config: &CrucibleConfig) -> Result<()> {
    gateway
        .check_connection()
        .await
        .with_context(|| format!("Cannot reach generation backend at {}", gateway.endpoint()))?;

    let available: HashSet<String> = gateway
        .list_models()
        .await
        .context("Failed to list backend models")?
        .into_iter()
        .collect();
    info!(
        "Backend {} is up with {} model(s)",
        gateway.endpoint(),
        available.len()
    );

    for role in Role::ALL {
        let model = config.models.model(role);
        let base = model.split(':').next().unwrap_or(model);
        if !available.contains(base) {
            warn!(
                "Model '{}' for {} is not installed on the backend",
                model,
                role.title()
            );
        }
    }
    Ok(())
}

async fn cmd_stream(config: CrucibleConfig, model: String, temperature: f32, prompt: String) -> Result<()> {
    let gateway = Gateway::ollama(&config)?;
    let params = SamplingParameters::new(model, temperature)
        .with_top_p(config.sampling.top_p)
        .with_top_k(config.sampling.top_k);

    let mut stream = gateway.stream_generate(&prompt, &params);
    let mut stdout = std::io::stdout();
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            chunk = stream.next() => match chunk {
                Some(chunk) => {
                    let text = chunk.context("Stream failed")?;
                    stdout.write_all(text.as_bytes())?;
                    stdout.flush()?;
                }
                None => break,
            },
            _ = &mut interrupt => {
                warn!("Interrupted, dropping the stream");
                break;
            }
        }
    }
    println!();
    Ok(())
}
