use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use docdigest::config::{ChunkingConfig, SummarizerConfig};
use docdigest::docx;
use docdigest::report::SourceInfo;
use docdigest::{
    Backend, ChatClient, Config, CostOracle, HeuristicOracle, LocalSummarizer, OracleKind, Pipeline,
    RefineLoop, RemoteTokenizer, RunManifest, Summarizer, WordCountOracle, chunk_text,
};

#[derive(Parser)]
#[command(name = "docdigest", version, about = "Summarize Word documents in token-bounded chunks")]
struct Cli {
    /// Config file (defaults to ./.docdigest.yml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize a .docx into a new .docx
    Summarize {
        input: PathBuf,

        #[arg(short, long, default_value = "summary.docx")]
        output: PathBuf,

        /// Also write a JSON run manifest
        #[arg(long)]
        manifest: Option<PathBuf>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Print the chunks of a .docx as JSON
    Chunk {
        input: PathBuf,

        #[command(flatten)]
        chunking: ChunkArgs,
    },

    /// Summarize a .docx, then draft and review a slide outline
    Outline {
        input: PathBuf,

        #[arg(short, long, default_value = "outline.md")]
        output: PathBuf,

        #[arg(long)]
        max_iterations: Option<u32>,

        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args)]
struct ChunkArgs {
    /// Token budget per chunk
    #[arg(long)]
    max_tokens: Option<usize>,

    #[arg(long, value_enum)]
    oracle: Option<OracleKind>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    chunking: ChunkArgs,

    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Chunks summarized at once
    #[arg(long)]
    concurrency: Option<usize>,
}

impl ChunkArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(max_tokens) = self.max_tokens {
            config.chunking.max_tokens = max_tokens;
        }
        if let Some(oracle) = self.oracle {
            config.chunking.oracle = oracle;
        }
    }
}

impl RunArgs {
    fn apply(&self, config: &mut Config) {
        self.chunking.apply(config);
        if let Some(backend) = self.backend {
            config.summarizer.backend = backend;
        }
        if let Some(concurrency) = self.concurrency {
            config.pipeline.concurrency = concurrency;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Summarize {
            input,
            output,
            manifest,
            run,
        } => {
            run.apply(&mut config);
            config.validate()?;
            summarize(&config, &input, &output, manifest.as_deref()).await
        }
        Command::Chunk { input, chunking } => {
            chunking.apply(&mut config);
            config.validate()?;
            print_chunks(&config, &input).await
        }
        Command::Outline {
            input,
            output,
            max_iterations,
            run,
        } => {
            run.apply(&mut config);
            if let Some(max_iterations) = max_iterations {
                config.refine.max_iterations = max_iterations;
            }
            config.validate()?;
            config.validate_chat()?;
            outline(&config, &input, &output).await
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();
}

fn build_oracle(config: &ChunkingConfig) -> Result<Arc<dyn CostOracle>> {
    let oracle: Arc<dyn CostOracle> = match config.oracle {
        OracleKind::Words => Arc::new(WordCountOracle),
        OracleKind::Heuristic => Arc::new(HeuristicOracle::default()),
        OracleKind::Remote => Arc::new(
            RemoteTokenizer::new(config.tokenizer_endpoint.clone())
                .context("Failed to create tokenizer client")?,
        ),
    };
    Ok(oracle)
}

fn build_summarizer(config: &SummarizerConfig) -> Result<Arc<dyn Summarizer>> {
    let summarizer: Arc<dyn Summarizer> = match config.backend {
        Backend::Local => {
            let mut client = LocalSummarizer::with_timeout(
                config.endpoint.clone(),
                Duration::from_millis(config.timeout_ms),
            )?;
            if let Some(model) = &config.model {
                client = client.with_model(model.clone());
            }
            Arc::new(client)
        }
        Backend::Chat => Arc::new(ChatClient::from_config(&config.chat)?),
    };
    Ok(summarizer)
}

fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let oracle = build_oracle(&config.chunking)?;
    let summarizer = build_summarizer(&config.summarizer)?;
    let options = config.pipeline.options(config.summarizer.length);

    Ok(Pipeline::new(oracle, summarizer, config.chunking.max_tokens).with_options(options))
}

async fn summarize(
    config: &Config,
    input: &Path,
    output: &Path,
    manifest: Option<&Path>,
) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let run = pipeline
        .run_document(input)
        .await
        .with_context(|| format!("Failed to summarize {}", input.display()))?;

    if let Some(manifest_path) = manifest {
        let source = SourceInfo::from_path(input).context("Failed to hash input document")?;
        RunManifest::new(source, pipeline.summarizer_name(), config.chunking.max_tokens, &run)
            .write_to_file(manifest_path)
            .context("Failed to write run manifest")?;
    }

    if run.outcome.is_empty() {
        bail!("All {} chunks failed to summarize", run.chunks.len());
    }

    docx::write_summary(output, &config.output.heading, &[run.outcome.text.as_str()])
        .with_context(|| format!("Failed to save summary to {}", output.display()))?;

    if !run.outcome.failed.is_empty() {
        let failed: Vec<String> = run.outcome.failed.iter().map(|f| f.index.to_string()).collect();
        eprintln!(
            "Warning: {} of {} chunks failed and were left out (chunks {})",
            failed.len(),
            run.chunks.len(),
            failed.join(", ")
        );
    }

    println!("✓ Summary saved to {}", output.display());
    Ok(())
}

async fn print_chunks(config: &Config, input: &Path) -> Result<()> {
    let text = docx::extract_text(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let oracle = build_oracle(&config.chunking)?;
    let max_tokens = config.chunking.max_tokens;

    let chunks = tokio::task::spawn_blocking(move || chunk_text(&text, max_tokens, oracle.as_ref()))
        .await
        .context("Chunking task failed")??;

    info!(chunks = chunks.len(), "Chunking complete");
    println!("{}", serde_json::to_string_pretty(&chunks)?);
    Ok(())
}

async fn outline(config: &Config, input: &Path, output: &Path) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let run = pipeline
        .run_document(input)
        .await
        .with_context(|| format!("Failed to summarize {}", input.display()))?;

    if run.outcome.is_empty() {
        bail!("All {} chunks failed to summarize", run.chunks.len());
    }

    let chat = ChatClient::from_config(&config.summarizer.chat)
        .context("Failed to create chat client")?;
    let result = RefineLoop::from_config(&config.refine)
        .run(&chat, &chat, &run.outcome.text)
        .await?;

    std::fs::write(output, &result.outline)
        .with_context(|| format!("Failed to write outline to {}", output.display()))?;

    if result.approved {
        println!(
            "✓ Outline approved after {} iteration(s), saved to {}",
            result.iterations,
            output.display()
        );
    } else {
        println!(
            "Max iterations ({}) reached, latest outline saved to {}",
            result.iterations,
            output.display()
        );
    }
    Ok(())
}
