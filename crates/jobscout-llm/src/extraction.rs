//! Structured job extraction with an LLM.
//!
//! A listing page is narrowed to its job containers, split into overlapping
//! chunks sized by an approximate token count, and each chunk is sent to the
//! provider with a fixed instruction and record schema. Every response must
//! parse as job JSON; the first one that does not ends the pass with
//! [`LlmError::InvalidOutput`] carrying the raw text.

use crate::error::{LlmError, Result};
use crate::provider::{CompletionRequest, LlmProvider, Usage};
use jobscout_core::{JobField, JobRecord, LlmConfig};
use scraper::{Html, Selector};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Keys the model is asked to produce for every job.
pub const SCHEMA_FIELDS: [&str; 6] = [
    "title",
    "company",
    "location",
    "salary",
    "description",
    "link",
];

/// Settings for one extraction pass.
#[derive(Debug, Clone)]
pub struct ExtractionOptions {
    /// Instruction placed ahead of the schema in the system prompt
    pub instruction: String,
    /// CSS selector narrowing the page before chunking
    pub container: String,
    /// Approximate tokens per chunk
    pub chunk_token_threshold: usize,
    /// Fraction of a chunk repeated at the start of the next one
    pub overlap_rate: f32,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token limit per chunk
    pub max_tokens: u32,
}

impl ExtractionOptions {
    /// Options from the `[llm]` config section plus a site's container and
    /// instruction.
    #[must_use]
    pub fn from_config(
        config: &LlmConfig,
        container: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            instruction: instruction.into(),
            container: container.into(),
            chunk_token_threshold: config.chunk_token_threshold,
            overlap_rate: config.overlap_rate,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Records and accounting from one pass.
#[derive(Debug, Clone, Default)]
pub struct ExtractionOutcome {
    /// Extracted records in chunk order, exact duplicates removed
    pub records: Vec<JobRecord>,
    /// Token usage summed over all requests
    pub usage: Usage,
    /// Completion requests sent
    pub requests: usize,
}

/// Runs extraction over listing pages with one provider.
pub struct JobExtractionPass {
    provider: Arc<dyn LlmProvider>,
    options: ExtractionOptions,
}

impl JobExtractionPass {
    /// Create a pass.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, options: ExtractionOptions) -> Self {
        Self { provider, options }
    }

    /// Extract every job on a listing page.
    pub async fn extract(&self, html: &str, page_url: &Url) -> Result<ExtractionOutcome> {
        let narrowed = narrow_to_containers(html, &self.options.container)?;
        let chunks = chunk_text(
            &narrowed,
            self.options.chunk_token_threshold,
            self.options.overlap_rate,
        );

        info!(
            url = %page_url,
            provider = self.provider.provider_id(),
            model = self.provider.model(),
            chunks = chunks.len(),
            "running LLM extraction"
        );

        let mut outcome = ExtractionOutcome::default();

        for (index, chunk) in chunks.iter().enumerate() {
            let response = self
                .provider
                .complete(build_request(&self.options, chunk, page_url))
                .await?;
            outcome.requests += 1;
            if let Some(usage) = response.usage {
                outcome.usage.accumulate(usage);
            }

            let records = parse_jobs(&response.content, page_url)?;
            debug!(chunk = index, records = records.len(), "parsed chunk");

            for record in records {
                if !outcome.records.contains(&record) {
                    outcome.records.push(record);
                }
            }
        }

        Ok(outcome)
    }
}

/// The output shape is set here; site instructions only say what to extract.
fn build_request(options: &ExtractionOptions, chunk: &str, page_url: &Url) -> CompletionRequest {
    let schema = serde_json::to_string_pretty(&record_schema()).unwrap_or_default();
    let system_prompt = format!(
        "{}\n\nRespond with JSON only: an object with a \"jobs\" array whose items \
         follow this schema. Use an empty string for values that are not present.\n{schema}",
        options.instruction.trim()
    );

    CompletionRequest::new(format!("Page URL: {page_url}\n\n{chunk}"))
        .with_system_prompt(system_prompt)
        .with_temperature(options.temperature)
        .with_max_tokens(options.max_tokens)
        .with_json_response()
}

/// JSON schema of one extracted job.
#[must_use]
pub fn record_schema() -> Value {
    let properties: Map<String, Value> = SCHEMA_FIELDS
        .iter()
        .map(|field| ((*field).to_string(), json!({ "type": "string" })))
        .collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": SCHEMA_FIELDS,
    })
}

/// Outer HTML of the outermost elements matching `container`, or the body
/// when nothing matches.
pub fn narrow_to_containers(html: &str, container: &str) -> Result<String> {
    let selector = Selector::parse(container).map_err(|e| {
        LlmError::InvalidRequest(format!("invalid container selector '{container}': {e}"))
    })?;

    let document = Html::parse_document(html);
    let matches: Vec<_> = document.select(&selector).collect();

    if matches.is_empty() {
        let body = Selector::parse("body").expect("valid selector");
        return Ok(document
            .select(&body)
            .next()
            .map_or_else(|| html.to_string(), |b| b.inner_html()));
    }

    let matched: HashSet<_> = matches.iter().map(|el| el.id()).collect();
    Ok(matches
        .iter()
        .filter(|el| !el.ancestors().any(|a| matched.contains(&a.id())))
        .map(|el| el.html())
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Split text into chunks of about `threshold` tokens.
///
/// Tokens are approximated by whitespace-separated words. Consecutive chunks
/// share `threshold * overlap_rate` words.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn chunk_text(text: &str, threshold: usize, overlap_rate: f32) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let size = threshold.max(1);
    let overlap = (size as f32 * overlap_rate.clamp(0.0, 0.9)) as usize;
    let step = size.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += step;
    }
    chunks
}

/// Parse model output into records.
///
/// Accepts a JSON array of jobs, an object wrapping such an array (for
/// example `{"jobs": [...]}`) or a single job object. Relative links are
/// resolved against `page_url`.
pub fn parse_jobs(raw: &str, page_url: &Url) -> Result<Vec<JobRecord>> {
    let invalid = |message: String| LlmError::InvalidOutput {
        message,
        raw: raw.to_string(),
    };

    let value: Value =
        serde_json::from_str(strip_code_fence(raw)).map_err(|e| invalid(e.to_string()))?;

    let items = job_items(value).ok_or_else(|| {
        invalid("expected a JSON array of jobs or an object wrapping one".to_string())
    })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_object()
                .map(|job| record_from_object(job, page_url))
                .ok_or_else(|| invalid(format!("job entry {index} is not an object")))
        })
        .collect()
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn job_items(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => {
            if SCHEMA_FIELDS.iter().any(|key| map.contains_key(*key)) || map.contains_key("url") {
                return Some(vec![Value::Object(map)]);
            }
            if map.is_empty() {
                return Some(Vec::new());
            }
            map.into_iter().find_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                _ => None,
            })
        }
        _ => None,
    }
}

fn record_from_object(job: &Map<String, Value>, page_url: &Url) -> JobRecord {
    let text = |key: &str| job.get(key).and_then(value_text);

    let url = text("link")
        .or_else(|| text("url"))
        .filter(|link| !JobField::Url.is_sentinel(link))
        .map(|link| {
            page_url
                .join(link.trim())
                .map_or(link, |resolved| resolved.to_string())
        });

    let mut builder = JobRecord::builder().salary_opt(text("salary").as_deref());
    if let Some(title) = text("title") {
        builder = builder.title(title);
    }
    if let Some(company) = text("company") {
        builder = builder.company(company);
    }
    if let Some(location) = text("location") {
        builder = builder.location(location);
    }
    if let Some(description) = text("description") {
        builder = builder.description(description);
    }
    if let Some(url) = url {
        builder = builder.url(url);
    }
    builder.build()
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_text).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Null | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ResponseFormat;

    fn page() -> Url {
        Url::parse("https://ph.jobstreet.com/jobs/").expect("valid url")
    }

    #[test]
    fn test_chunk_text_small_input_is_one_chunk() {
        assert_eq!(chunk_text("a b  c", 10, 0.15), vec!["a b c"]);
        assert!(chunk_text("   ", 10, 0.15).is_empty());
    }

    #[test]
    fn test_chunk_text_overlap() {
        let text = (0..25).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        let chunks = chunk_text(&text, 10, 0.2);

        // size 10, overlap 2, step 8: [0..10] [8..18] [16..25]
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].starts_with("0 1"));
        assert!(chunks[1].starts_with("8 9 10"));
        assert!(chunks[2].starts_with("16 17"));
        assert!(chunks[2].ends_with("24"));
    }

    #[test]
    fn test_chunk_text_zero_threshold_terminates() {
        let chunks = chunk_text("a b c", 0, 0.5);
        assert_eq!(chunks, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_narrow_to_outermost_containers() {
        let html = r#"<html><body>
            <nav>menu</nav>
            <div class="job-card"><h3>Engineer</h3><div class="job-listing">inner</div></div>
            <section class="job-listing"><h3>Analyst</h3></section>
        </body></html>"#;

        let narrowed = narrow_to_containers(html, "div.job-card, .job-listing").expect("narrow");
        assert!(narrowed.contains("Engineer"));
        assert!(narrowed.contains("Analyst"));
        assert!(!narrowed.contains("menu"));
        assert_eq!(narrowed.matches("inner").count(), 1);
    }

    #[test]
    fn test_narrow_falls_back_to_body() {
        let html = "<html><body><article>Only content</article></body></html>";
        let narrowed = narrow_to_containers(html, "div.job-card").expect("narrow");
        assert!(narrowed.contains("<article>Only content</article>"));
    }

    #[test]
    fn test_narrow_rejects_bad_selector() {
        let result = narrow_to_containers("<p></p>", "div[");
        assert!(matches!(result, Err(LlmError::InvalidRequest(_))));
    }

    #[test]
    fn test_parse_jobs_array() {
        let raw = r#"[{"title": "Engineer", "company": "Acme", "location": "Manila",
                       "salary": "", "description": "Build things", "link": "/job/1"}]"#;
        let records = parse_jobs(raw, &page()).expect("parse");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title(), "Engineer");
        assert_eq!(records[0].salary(), "Not listed");
        assert_eq!(records[0].url(), "https://ph.jobstreet.com/job/1");
    }

    #[test]
    fn test_parse_jobs_wrapped_and_single() {
        let wrapped = r#"{"jobs": [{"title": "A"}, {"title": "B", "link": "https://x.com/b"}]}"#;
        let records = parse_jobs(wrapped, &page()).expect("parse wrapped");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].url(), "Not found");
        assert_eq!(records[1].url(), "https://x.com/b");

        let single = r#"{"title": "Solo", "salary": 50000}"#;
        let records = parse_jobs(single, &page()).expect("parse single");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].salary(), "50000");
        assert_eq!(records[0].company(), "Not found");
        assert_eq!(records[0].description(), "Description not available.");

        assert!(parse_jobs("{}", &page()).expect("parse empty").is_empty());
    }

    #[test]
    fn test_parse_jobs_code_fence() {
        let raw = "```json\n[{\"title\": \"Fenced\"}]\n```";
        let records = parse_jobs(raw, &page()).expect("parse");
        assert_eq!(records[0].title(), "Fenced");
    }

    #[test]
    fn test_parse_jobs_invalid_output_keeps_raw() {
        for raw in ["Here are the jobs you asked for:", "42", r#"["not an object"]"#] {
            match parse_jobs(raw, &page()) {
                Err(LlmError::InvalidOutput { raw: kept, .. }) => assert_eq!(kept, raw),
                other => panic!("expected InvalidOutput for {raw:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_request_asks_for_jobs_object() {
        let options = ExtractionOptions::from_config(
            &LlmConfig::default(),
            "div.job-card",
            "Extract job listings with all fields from the HTML content.\n",
        );
        let request = build_request(&options, "<div class=\"job-card\">Engineer</div>", &page());

        let system = request.system_prompt.expect("system prompt");
        assert!(system.starts_with("Extract job listings with all fields from the HTML content.\n\n"));
        assert!(system.contains("an object with a \"jobs\" array"));
        assert!(!system.contains("JSON array of objects"));
        assert_eq!(request.response_format, ResponseFormat::JsonObject);
        assert_eq!(request.max_tokens, Some(options.max_tokens));
        assert!(request.messages[0]
            .content
            .starts_with("Page URL: https://ph.jobstreet.com/jobs/"));
    }

    #[test]
    fn test_record_schema_lists_fields() {
        let schema = record_schema();
        for field in SCHEMA_FIELDS {
            assert_eq!(schema["properties"][field]["type"], "string");
        }
        assert_eq!(schema["required"].as_array().map(Vec::len), Some(6));
    }
}
