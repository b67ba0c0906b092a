use async_trait::async_trait;
use jobscout_core::{CrawlConfig, JobRecord, LlmConfig};
use jobscout_crawler::{
    CrawlError, CrawlOrchestrator, ErrorArtifact, FetchError, JsonArraySink, LlmExtractor,
    StaticFetcher, StopReason,
};
use jobscout_llm::{
    CompletionRequest, CompletionResponse, ExtractionOptions, JobExtractionPass, LlmProvider, Usage,
};
use jobscout_site::SiteDefinition;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const START: &str = "https://ph.jobstreet.com/jobs/";

struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedProvider {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(ToString::to_string).collect()),
        })
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, _request: CompletionRequest) -> jobscout_llm::Result<CompletionResponse> {
        let content = self
            .replies
            .lock()
            .expect("lock replies")
            .pop_front()
            .unwrap_or_else(|| "[]".to_string());
        Ok(CompletionResponse {
            content,
            model: "scripted".to_string(),
            stop_reason: Some("stop".to_string()),
            usage: Some(Usage {
                input_tokens: 900,
                output_tokens: 60,
            }),
        })
    }

    fn provider_id(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

fn site() -> SiteDefinition {
    toml::from_str(
        r#"
        [site]
        id = "jobstreet-ph"
        name = "JobStreet Philippines"
        start_url = "https://ph.jobstreet.com/jobs/"
        allowed_domains = ["ph.jobstreet.com"]

        [listing]
        item = "article"

        [llm]
        container = "div.job-card, .job-listing"
        instruction = "Extract job listings with all fields from the HTML content."
        "#,
    )
    .expect("parse site definition")
}

const PAGE: &str = r#"<html><body>
    <div class="job-card"><h3>Engineer</h3><span>Acme</span><a href="/job/1">View</a></div>
</body></html>"#;

fn orchestrator(
    provider: Arc<ScriptedProvider>,
    fetcher: Arc<StaticFetcher>,
    max_pages: u32,
) -> CrawlOrchestrator {
    let site = Arc::new(site());
    let rules = Arc::new(jobscout_crawler::SiteRules::compile(&site).expect("compile rules"));
    let options = ExtractionOptions::from_config(
        &LlmConfig::default(),
        site.llm.container.clone(),
        site.llm.instruction.clone(),
    );
    let extractor = LlmExtractor::new(JobExtractionPass::new(provider, options), rules.clone());

    CrawlOrchestrator::new(site, rules, fetcher, Arc::new(extractor))
        .with_crawl_config(&CrawlConfig::default())
        .with_max_pages(max_pages)
}

#[tokio::test]
async fn test_llm_records_written_as_json_array() {
    let provider = ScriptedProvider::new(&[
        r#"{"jobs": [{"title": "Engineer", "company": "Acme", "location": "Makati",
                      "salary": "₱40,000–₱50,000", "description": "Build", "link": "/job/1"}]}"#,
    ]);
    let fetcher = Arc::new(StaticFetcher::new().with_page(START, PAGE));
    let dir = TempDir::new().expect("create temp dir");
    let output = dir.path().join("jobs_output.txt");
    let mut sink = JsonArraySink::new(&output);

    let report = orchestrator(provider, fetcher.clone(), 0)
        .run(&mut sink)
        .await
        .expect("extract");

    let records: Vec<JobRecord> =
        serde_json::from_str(&std::fs::read_to_string(&output).expect("read output"))
            .expect("parse output");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url(), "https://ph.jobstreet.com/job/1");
    assert_eq!(records[0].salary(), "₱40,000–₱50,000");

    assert_eq!(report.extractor, "llm");
    assert_eq!(report.details_fetched, 0);
    assert_eq!(report.llm_usage.map(|u| u.total_tokens()), Some(960));
    assert_eq!(fetcher.requests(), vec![START.to_string()], "LLM records need no detail fetch");
}

#[tokio::test]
async fn test_invalid_llm_output_writes_error_artifact_and_no_records() {
    let raw = format!("Here are the jobs you asked for! {}", "z".repeat(3000));
    let provider = ScriptedProvider::new(&[&raw]);
    let fetcher = Arc::new(StaticFetcher::new().with_page(START, PAGE));
    let dir = TempDir::new().expect("create temp dir");
    let output = dir.path().join("jobs_output.txt");
    let error_log = dir.path().join("jobs_error_log.txt");
    let mut sink = JsonArraySink::new(&output);

    let err = orchestrator(provider, fetcher, 0)
        .run(&mut sink)
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::Parse { .. }));
    assert_eq!(err.raw_output(), Some(raw.as_str()));

    let artifact = ErrorArtifact::new(&error_log, 2000);
    artifact.write(&err).expect("write artifact");

    assert!(!output.exists(), "no records file on parse failure");
    let log = std::fs::read_to_string(&error_log).expect("read error log");
    assert!(log.starts_with("JSON parsing failed. Raw output:"));
    assert!(log.contains(START));
    let excerpt: String = raw.chars().take(2000).collect();
    assert!(log.contains(&excerpt));
    assert!(!log.contains(&raw));
}

const FIRST_PAGE: &str = r#"<html><body>
    <div class="job-card"><h3>Engineer</h3><span>Acme</span><a href="/job/1">View</a></div>
    <a aria-label="Next" href="?page=2">Next</a>
</body></html>"#;

#[tokio::test]
async fn test_parse_failure_on_later_page_keeps_earlier_records() {
    let provider = ScriptedProvider::new(&[
        r#"{"jobs": [{"title": "Engineer", "company": "Acme", "link": "/job/1"}]}"#,
        "not json",
    ]);
    let fetcher = Arc::new(
        StaticFetcher::new()
            .with_page(START, FIRST_PAGE)
            .with_page("https://ph.jobstreet.com/jobs/?page=2", PAGE),
    );
    let dir = TempDir::new().expect("create temp dir");
    let output = dir.path().join("jobs_output.txt");
    let mut sink = JsonArraySink::new(&output);

    let err = orchestrator(provider, fetcher, 1)
        .run(&mut sink)
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::Parse { .. }));
    assert_eq!(err.url(), Some("https://ph.jobstreet.com/jobs/?page=2"));
    assert_eq!(err.raw_output(), Some("not json"));

    let records: Vec<JobRecord> =
        serde_json::from_str(&std::fs::read_to_string(&output).expect("read output"))
            .expect("parse output");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title(), "Engineer");
    assert_eq!(records[0].url(), "https://ph.jobstreet.com/job/1");
}

#[tokio::test]
async fn test_start_page_failure_leaves_previous_output() {
    let provider = ScriptedProvider::new(&[]);
    let fetcher = Arc::new(StaticFetcher::new().with_error(
        START,
        FetchError::Status {
            url: START.to_string(),
            status: 503,
        },
    ));
    let dir = TempDir::new().expect("create temp dir");
    let output = dir.path().join("jobs_output.txt");
    let previous = r#"[{"title": "From the last good run"}]"#;
    std::fs::write(&output, previous).expect("seed output");
    let mut sink = JsonArraySink::new(&output);

    let report = orchestrator(provider, fetcher, 0)
        .run(&mut sink)
        .await
        .expect("crawl");

    assert_eq!(report.stop_reason, StopReason::PageFailed);
    let failure = report.start_page_failure().expect("start page failure");
    assert_eq!(failure.url(), START);
    assert_eq!(
        std::fs::read_to_string(&output).expect("read output"),
        previous
    );

    let error_log = dir.path().join("jobs_error_log.txt");
    let err = CrawlError::Fetch(failure.clone());
    ErrorArtifact::new(&error_log, 2000)
        .write(&err)
        .expect("write artifact");
    let log = std::fs::read_to_string(&error_log).expect("read error log");
    assert!(log.starts_with("Crawling failed:"));
    assert!(log.contains(START));
}
