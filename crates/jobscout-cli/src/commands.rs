//! Subcommand implementations.

use crate::{CrawlArgs, ExtractArgs, FetcherKind, ProviderArg};
use anyhow::{bail, Context, Result};
use jobscout_browser::BrowserEngine;
use jobscout_core::{AppConfig, LlmConfig, OutputFormat, SiteId};
use jobscout_crawler::{
    BrowserFetcher, ConsoleSink, CrawlError, CrawlOrchestrator, CrawlReport, ErrorArtifact,
    Fetcher, HttpFetcher, JsonArraySink, JsonLinesSink, LlmExtractor, MultiSink, RecordSink,
    RetryPolicy, SelectorExtractor, SiteRules,
};
use jobscout_llm::providers::{self, OLLAMA_DEFAULT_MODEL, OLLAMA_DEFAULT_URL};
use jobscout_llm::{ExtractionOptions, JobExtractionPass};
use jobscout_site::{SiteDefinition, SiteLoader, SiteRegistry};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

struct FetcherHandle {
    fetcher: Arc<dyn Fetcher>,
    engine: Option<Arc<BrowserEngine>>,
}

async fn build_fetcher(
    kind: FetcherKind,
    config: &AppConfig,
    wait_for: Option<String>,
) -> Result<FetcherHandle> {
    match kind {
        FetcherKind::Http => Ok(FetcherHandle {
            fetcher: Arc::new(HttpFetcher::new(&config.fetch)?),
            engine: None,
        }),
        FetcherKind::Browser => {
            let engine = Arc::new(
                BrowserEngine::with_config(&config.browser, &config.fetch.user_agent)
                    .await
                    .context("failed to launch browser")?,
            );
            Ok(FetcherHandle {
                fetcher: Arc::new(BrowserFetcher::new(engine.clone()).with_wait_for(wait_for)),
                engine: Some(engine),
            })
        }
    }
}

async fn shutdown_browser(engine: Option<Arc<BrowserEngine>>) {
    let Some(engine) = engine else {
        return;
    };
    match Arc::try_unwrap(engine) {
        Ok(engine) => {
            if let Err(e) = engine.close().await {
                warn!("Failed to close browser: {}", e);
            }
        }
        Err(_) => warn!("Browser still in use, leaving it to shut down on exit"),
    }
}

fn load_site(loader: &SiteLoader, id: &str) -> Result<Arc<SiteDefinition>> {
    let site_id = SiteId::new(id)?;
    let site = loader
        .load(&site_id)
        .with_context(|| format!("failed to load site definition '{id}'"))?;
    Ok(Arc::new(site))
}

/// Selector spider.
pub async fn crawl(config: &AppConfig, loader: &SiteLoader, args: CrawlArgs) -> Result<()> {
    let site = load_site(loader, &args.site)?;
    let rules = Arc::new(SiteRules::compile(&site)?);

    let mut crawl_config = config.crawl.clone();
    if let Some(max_pages) = args.max_pages {
        crawl_config.max_pages = max_pages;
    }

    let path = args
        .output
        .unwrap_or_else(|| config.output.records_path.clone());
    let format = args.format.map_or(config.output.format, OutputFormat::from);

    let records: Box<dyn RecordSink> = match format {
        OutputFormat::Jsonl => Box::new(JsonLinesSink::create(&path)),
        OutputFormat::Json => Box::new(JsonArraySink::new(&path)),
    };
    let mut sink = MultiSink::new().with(records);
    if args.print {
        sink = sink.with(Box::new(ConsoleSink::stdout()));
    }

    let handle = build_fetcher(args.fetcher, config, site.llm.wait_for.clone()).await?;
    let result = {
        let extractor = Arc::new(SelectorExtractor::new(
            rules.clone(),
            crawl_config.max_items_per_page,
        ));
        let orchestrator = CrawlOrchestrator::new(site, rules, handle.fetcher, extractor)
            .with_crawl_config(&crawl_config)
            .with_retry_policy(RetryPolicy::from_config(&config.fetch));
        orchestrator.run(&mut sink).await
    };
    shutdown_browser(handle.engine).await;

    let report = result.context("crawl failed")?;
    print_report(&report);
    println!("Job data saved to '{}'.", path.display());
    Ok(())
}

/// Switch the LLM settings to the provider picked on the command line.
fn apply_provider(llm: &mut LlmConfig, provider: ProviderArg, model_given: bool) {
    match provider {
        ProviderArg::Openai => llm.provider = "openai".to_string(),
        ProviderArg::Ollama => {
            if llm.provider != "ollama" {
                llm.base_url = OLLAMA_DEFAULT_URL.to_string();
                if !model_given {
                    llm.model = OLLAMA_DEFAULT_MODEL.to_string();
                }
            }
            llm.provider = "ollama".to_string();
        }
    }
}

/// LLM pipeline.
pub async fn extract(config: &AppConfig, loader: &SiteLoader, args: ExtractArgs) -> Result<()> {
    let site = load_site(loader, &args.site)?;
    let rules = Arc::new(SiteRules::compile(&site)?);

    let mut llm = config.llm.clone();
    if let Some(provider) = args.provider {
        apply_provider(&mut llm, provider, args.model.is_some());
    }
    if let Some(model) = args.model {
        llm.model = model;
    }

    let provider = providers::from_config(&llm).context("failed to configure LLM provider")?;
    let options = ExtractionOptions::from_config(
        &llm,
        site.llm.container.clone(),
        site.llm.instruction.clone(),
    );
    let extractor = Arc::new(LlmExtractor::new(
        JobExtractionPass::new(provider, options),
        rules.clone(),
    ));

    let mut crawl_config = config.crawl.clone();
    crawl_config.max_pages = args.max_pages;

    let output = args
        .output
        .unwrap_or_else(|| config.output.llm_records_path.clone());
    let error_log = args
        .error_log
        .unwrap_or_else(|| config.output.error_log_path.clone());
    let mut sink = JsonArraySink::new(&output);

    let handle = build_fetcher(args.fetcher, config, site.llm.wait_for.clone()).await?;
    let result = {
        let orchestrator = CrawlOrchestrator::new(site, rules, handle.fetcher, extractor)
            .with_crawl_config(&crawl_config)
            .with_retry_policy(RetryPolicy::from_config(&config.fetch));
        orchestrator.run(&mut sink).await
    };
    shutdown_browser(handle.engine).await;

    let error = match result {
        Ok(report) => match report.start_page_failure() {
            None => {
                println!("Found {} jobs.", report.records_written);
                println!("Job data saved to '{}'.", output.display());
                print_report(&report);
                return Ok(());
            }
            Some(failure) => CrawlError::Fetch(failure.clone()),
        },
        Err(e) => e,
    };

    error!(error = %error, "extraction failed");
    let artifact = ErrorArtifact::new(&error_log, config.output.error_excerpt_chars);
    print!("{}", artifact.render(&error));
    artifact.write(&error)?;
    println!("Error log saved to '{}'.", error_log.display());
    Err(error).context("extraction failed")
}

/// List site definitions.
pub fn sites(loader: &SiteLoader) -> Result<()> {
    let registry = SiteRegistry::load_from(loader)?;
    info!(count = registry.count(), "loaded site definitions");

    for site in registry.get_all() {
        let verified = site
            .site
            .last_verified
            .map_or_else(|| "unverified".to_string(), |date| date.to_string());
        println!(
            "{:<20} {:<30} {} ({verified})",
            site.id().as_str(),
            site.name(),
            site.start_url()
        );
    }
    Ok(())
}

/// Write the default configuration to `path`.
pub fn config_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "config file already exists at '{}' (use --force to overwrite)",
            path.display()
        );
    }

    AppConfig::default()
        .save_to(path)
        .with_context(|| format!("failed to write config to '{}'", path.display()))?;
    info!(path = %path.display(), "wrote default config");
    println!("Config written to '{}'.", path.display());
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn print_report(report: &CrawlReport) {
    println!();
    println!("Run {} ({})", report.run_id, report.extractor);
    println!("  Pages processed:  {}", report.pages_processed);
    println!("  Records written:  {}", report.records_written);
    if report.details_fetched + report.details_failed + report.details_skipped > 0 {
        println!(
            "  Detail pages:     {} fetched, {} failed, {} skipped",
            report.details_fetched, report.details_failed, report.details_skipped
        );
    }
    for failed in &report.failed_pages {
        println!("  Failed page:      {failed}");
    }
    println!("  Stopped because:  {}", report.stop_reason);
    println!(
        "  Duration:         {:.1}s",
        report.duration().num_milliseconds() as f64 / 1000.0
    );

    if let Some(usage) = report.llm_usage {
        println!();
        println!("Token Usage:");
        println!("  Input tokens:     {}", usage.input_tokens);
        println!("  Output tokens:    {}", usage.output_tokens);
        println!("  Total tokens:     {}", usage.total_tokens());
    }
}
