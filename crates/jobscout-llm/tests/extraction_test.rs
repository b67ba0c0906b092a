use async_trait::async_trait;
use jobscout_llm::{
    CompletionRequest, CompletionResponse, ExtractionOptions, JobExtractionPass, LlmError,
    LlmProvider, ResponseFormat, Usage,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use url::Url;

/// Provider that replays canned replies and records what it was asked.
struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(ToString::to_string).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("lock requests").clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> jobscout_llm::Result<CompletionResponse> {
        self.requests.lock().expect("lock requests").push(request);
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
                input_tokens: 100,
                output_tokens: 10,
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

fn options(threshold: usize) -> ExtractionOptions {
    ExtractionOptions {
        instruction: "Extract job listings with all fields from the HTML content.".to_string(),
        container: "div.job-card, .job-listing".to_string(),
        chunk_token_threshold: threshold,
        overlap_rate: 0.15,
        temperature: 0.1,
        max_tokens: 2000,
    }
}

fn page_url() -> Url {
    Url::parse("https://ph.jobstreet.com/jobs/").expect("valid url")
}

fn listing_page(cards: usize) -> String {
    let cards: String = (0..cards)
        .map(|i| {
            format!(
                r#"<div class="job-card"><h3>Job {i}</h3><span>Company {i}</span>
                   <p>Some words describing the role in a little detail</p></div>"#
            )
        })
        .collect();
    format!("<html><body><header>Site header</header>{cards}</body></html>")
}

#[tokio::test]
async fn test_single_chunk_extraction() {
    let provider = ScriptedProvider::new(&[
        r#"{"jobs": [{"title": "Engineer", "company": "Acme", "location": "Makati",
                      "salary": "₱40,000–₱50,000", "description": "Build", "link": "/job/1"}]}"#,
    ]);
    let pass = JobExtractionPass::new(provider.clone(), options(3500));

    let outcome = pass
        .extract(&listing_page(2), &page_url())
        .await
        .expect("extract");

    assert_eq!(outcome.requests, 1);
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].salary(), "₱40,000–₱50,000");
    assert_eq!(outcome.records[0].url(), "https://ph.jobstreet.com/job/1");
    assert_eq!(outcome.usage.total_tokens(), 110);

    let requests = provider.requests();
    let request = &requests[0];
    assert_eq!(request.response_format, ResponseFormat::JsonObject);
    assert_eq!(request.temperature, Some(0.1));
    assert_eq!(request.max_tokens, Some(2000));
    let system = request.system_prompt.as_deref().unwrap_or_default();
    assert!(system.starts_with("Extract job listings"));
    assert!(system.contains("\"link\""));
    assert!(request.messages[0].content.contains("Job 1"));
    assert!(!request.messages[0].content.contains("Site header"));
}

#[tokio::test]
async fn test_multi_chunk_aggregates_usage_and_dedupes() {
    let duplicate = r#"[{"title": "Shared", "link": "/job/shared"}]"#;
    let provider = ScriptedProvider::new(&[
        duplicate,
        r#"[{"title": "Second", "link": "/job/2"}]"#,
        duplicate,
    ]);
    let pass = JobExtractionPass::new(provider.clone(), options(20));

    let outcome = pass
        .extract(&listing_page(6), &page_url())
        .await
        .expect("extract");

    assert!(outcome.requests >= 3, "expected several chunks");
    assert_eq!(provider.requests().len(), outcome.requests);
    assert_eq!(outcome.usage.input_tokens, 100 * u32::try_from(outcome.requests).unwrap());

    let titles: Vec<_> = outcome.records.iter().map(|r| r.title()).collect();
    assert_eq!(titles, vec!["Shared", "Second"]);
}

#[tokio::test]
async fn test_invalid_output_is_terminal() {
    let provider = ScriptedProvider::new(&[
        r#"[{"title": "Fine"}]"#,
        "I could not find any jobs, sorry!",
        r#"[{"title": "Never reached"}]"#,
    ]);
    let pass = JobExtractionPass::new(provider.clone(), options(20));

    let result = pass.extract(&listing_page(6), &page_url()).await;

    match result {
        Err(LlmError::InvalidOutput { raw, .. }) => {
            assert_eq!(raw, "I could not find any jobs, sorry!");
        }
        other => panic!("expected InvalidOutput, got {other:?}"),
    }
    assert_eq!(provider.requests().len(), 2);
}

#[tokio::test]
async fn test_empty_page_sends_nothing() {
    let provider = ScriptedProvider::new(&[]);
    let pass = JobExtractionPass::new(provider.clone(), options(3500));

    let outcome = pass
        .extract("<html><body>   </body></html>", &page_url())
        .await
        .expect("extract");

    assert!(outcome.records.is_empty());
    assert_eq!(outcome.requests, 0);
    assert!(provider.requests().is_empty());
}
