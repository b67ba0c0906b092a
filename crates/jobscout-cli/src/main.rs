//! JobScout command-line interface.
//!
//! `crawl` runs the selector spider and `extract` the LLM pipeline. `sites`
//! lists the loaded site definitions; `config init` writes a default config.

mod commands;

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use jobscout_core::{AppConfig, OutputFormat};
use jobscout_site::SiteLoader;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "jobscout", version)]
#[command(about = "Extract job listings from job boards")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "JOBSCOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding site definition TOML files
    #[arg(long, global = true, env = "JOBSCOUT_DEFINITIONS")]
    definitions: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl listing pages with the site's selector rules
    Crawl(CrawlArgs),

    /// Extract listings with an LLM
    Extract(ExtractArgs),

    /// List available site definitions
    Sites,

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print where the configuration is read from
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FetcherKind {
    /// Plain HTTP requests
    Http,
    /// Headless Chromium
    Browser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    /// One JSON object per line
    Jsonl,
    /// Pretty-printed JSON array
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Jsonl => Self::Jsonl,
            FormatArg::Json => Self::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProviderArg {
    /// Any OpenAI-compatible endpoint (Groq, OpenAI, LM Studio)
    Openai,
    /// Local Ollama
    Ollama,
}

#[derive(Debug, Args)]
struct CrawlArgs {
    /// Site definition ID
    #[arg(long, default_value = "jobstreet-ph")]
    site: String,

    /// Continuation pages to follow after the start page
    #[arg(long)]
    max_pages: Option<u32>,

    /// How pages are fetched
    #[arg(long, value_enum, default_value_t = FetcherKind::Http)]
    fetcher: FetcherKind,

    /// Records file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Records file format
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Also print every job to the console
    #[arg(long)]
    print: bool,
}

#[derive(Debug, Args)]
struct ExtractArgs {
    /// Site definition ID
    #[arg(long, default_value = "jobstreet-ph")]
    site: String,

    /// LLM provider
    #[arg(long, value_enum)]
    provider: Option<ProviderArg>,

    /// Model name
    #[arg(long)]
    model: Option<String>,

    /// Records file (JSON array)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Error log written when extraction fails
    #[arg(long)]
    error_log: Option<PathBuf>,

    /// How pages are fetched
    #[arg(long, value_enum, default_value_t = FetcherKind::Browser)]
    fetcher: FetcherKind,

    /// Continuation pages to follow after the start page
    #[arg(long, default_value_t = 0)]
    max_pages: u32,
}

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,jobscout=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

struct Context {
    config: AppConfig,
    loader: SiteLoader,
}

fn load_context(config: Option<&Path>, definitions: Option<PathBuf>) -> Result<Context> {
    let config = AppConfig::load_with_env(config).context("failed to load config")?;
    let loader = match definitions {
        Some(dir) => SiteLoader::new(dir),
        None => SiteLoader::with_default_dir(),
    }
    .context("failed to locate site definitions")?;
    Ok(Context { config, loader })
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let Cli {
        config,
        definitions,
        command,
    } = Cli::parse();
    info!("Starting JobScout v{}", env!("CARGO_PKG_VERSION"));

    match command {
        Commands::Crawl(args) => {
            let ctx = load_context(config.as_deref(), definitions)?;
            commands::crawl(&ctx.config, &ctx.loader, args).await
        }
        Commands::Extract(args) => {
            let ctx = load_context(config.as_deref(), definitions)?;
            commands::extract(&ctx.config, &ctx.loader, args).await
        }
        Commands::Sites => {
            let ctx = load_context(config.as_deref(), definitions)?;
            commands::sites(&ctx.loader)
        }
        Commands::Config(command) => {
            let path = match config {
                Some(path) => path,
                None => AppConfig::config_path().context("failed to locate config directory")?,
            };
            match command {
                ConfigCommand::Init { force } => commands::config_init(&path, force),
                ConfigCommand::Path => {
                    println!("{}", path.display());
                    Ok(())
                }
            }
        }
    }
}
