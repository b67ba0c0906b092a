//! Record sinks and the error artifact.

use crate::error::{CrawlError, Result};
use jobscout_core::JobRecord;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Characters of description shown per job by [`ConsoleSink`].
pub const CONSOLE_DESCRIPTION_CHARS: usize = 150;

/// Consumes assembled records.
pub trait RecordSink: Send {
    /// Accept one record.
    fn write(&mut self, record: &JobRecord) -> Result<()>;

    /// Flush everything; called once after the last record. A run that
    /// processed no listing page does not call it.
    fn finish(&mut self) -> Result<()>;
}

fn sink_error(label: &str, source: io::Error) -> CrawlError {
    CrawlError::Sink {
        path: label.to_string(),
        source,
    }
}

fn open_file(path: &Path) -> io::Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

fn create_file(path: &Path) -> Result<BufWriter<File>> {
    open_file(path).map_err(|e| sink_error(&path.display().to_string(), e))
}

/// File created (or truncated) on the first write or flush.
///
/// A run that ends before producing output leaves an existing file as it was.
pub struct DeferredFile {
    path: PathBuf,
    file: Option<BufWriter<File>>,
}

impl DeferredFile {
    /// Defer opening `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        let file = match self.file.take() {
            Some(file) => file,
            None => open_file(&self.path)?,
        };
        Ok(self.file.insert(file))
    }
}

impl Write for DeferredFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer()?.flush()
    }
}

/// One JSON object per line, flushed after every record.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
    label: String,
    written: usize,
}

impl JsonLinesSink<DeferredFile> {
    /// Write to the file at `path`, created (or truncated) once the first
    /// record arrives or the sink is finished.
    #[must_use]
    pub fn create(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::new(DeferredFile::new(path), path.display().to_string())
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Write to `writer`; `label` names it in errors.
    #[must_use]
    pub fn new(writer: W, label: impl Into<String>) -> Self {
        Self {
            writer,
            label: label.into(),
            written: 0,
        }
    }

    /// Consume the sink and return the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    fn write(&mut self, record: &JobRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        writeln!(self.writer, "{line}").map_err(|e| sink_error(&self.label, e))?;
        self.writer.flush().map_err(|e| sink_error(&self.label, e))?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| sink_error(&self.label, e))?;
        debug!(output = %self.label, records = self.written, "closed JSON lines output");
        Ok(())
    }
}

/// Pretty-printed JSON array with four-space indentation.
///
/// Nothing touches the file until [`RecordSink::finish`], so a failed run
/// leaves no records file behind.
pub struct JsonArraySink {
    path: PathBuf,
    records: Vec<JobRecord>,
}

impl JsonArraySink {
    /// Sink that will write to `path` on finish.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
        }
    }
}

impl RecordSink for JsonArraySink {
    fn write(&mut self, record: &JobRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let label = self.path.display().to_string();
        let mut writer = create_file(&self.path)?;
        write_pretty_json(&mut writer, &self.records)?;
        writer.flush().map_err(|e| sink_error(&label, e))?;
        info!(path = %label, records = self.records.len(), "saved records");
        Ok(())
    }
}

fn write_pretty_json<W: Write, T: Serialize>(writer: W, value: &T) -> Result<()> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
    value.serialize(&mut serializer)?;
    Ok(())
}

/// Human-readable per-job report.
pub struct ConsoleSink<W: Write + Send> {
    writer: W,
    count: usize,
}

impl ConsoleSink<io::Stdout> {
    /// Print to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    /// Print to `writer`.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer, count: 0 }
    }

    /// Consume the sink and return the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Render one job the way [`ConsoleSink`] prints it.
#[must_use]
pub fn render_record(index: usize, record: &JobRecord) -> String {
    let salary = if record.has_salary() {
        format!("   Salary: {}", record.salary())
    } else {
        "   Salary: Not listed (!)".to_string()
    };

    [
        format!("Job {index}:"),
        format!("   Company: {}", record.company()),
        format!("   Job Title: {}", record.title()),
        format!("   Link: {}", record.url()),
        format!("   Location: {}", record.location()),
        salary,
        format!(
            "   Description: {}",
            record.description_excerpt(CONSOLE_DESCRIPTION_CHARS)
        ),
        "-".repeat(50),
    ]
    .join("\n")
}

impl<W: Write + Send> RecordSink for ConsoleSink<W> {
    fn write(&mut self, record: &JobRecord) -> Result<()> {
        self.count += 1;
        writeln!(self.writer, "{}", render_record(self.count, record))
            .map_err(|e| sink_error("<console>", e))
    }

    fn finish(&mut self) -> Result<()> {
        if self.count == 0 {
            writeln!(self.writer, "No job postings found.").map_err(|e| sink_error("<console>", e))?;
        }
        self.writer.flush().map_err(|e| sink_error("<console>", e))
    }
}

/// Fans every record out to several sinks in order.
#[derive(Default)]
pub struct MultiSink {
    sinks: Vec<Box<dyn RecordSink>>,
}

impl MultiSink {
    /// Empty fan-out.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink.
    #[must_use]
    pub fn with(mut self, sink: Box<dyn RecordSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether there are no sinks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl RecordSink for MultiSink {
    fn write(&mut self, record: &JobRecord) -> Result<()> {
        self.sinks.iter_mut().try_for_each(|sink| sink.write(record))
    }

    fn finish(&mut self) -> Result<()> {
        self.sinks.iter_mut().try_for_each(|sink| sink.finish())
    }
}

/// Error log written when a run ends in a terminal error.
#[derive(Debug, Clone)]
pub struct ErrorArtifact {
    path: PathBuf,
    excerpt_chars: usize,
}

impl ErrorArtifact {
    /// Artifact at `path` keeping at most `excerpt_chars` of raw output.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, excerpt_chars: usize) -> Self {
        Self {
            path: path.into(),
            excerpt_chars,
        }
    }

    /// Where the artifact is written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Artifact text for `error`.
    ///
    /// Parse failures carry a bounded excerpt of the raw model output; every
    /// other error is reported as a crawl failure.
    #[must_use]
    pub fn render(&self, error: &CrawlError) -> String {
        let mut text = match error.raw_output() {
            Some(_) => "JSON parsing failed. Raw output:\n".to_string(),
            None => format!("Crawling failed: {error}\n"),
        };

        if let Some(url) = error.url() {
            text.push_str(&format!("URL: {url}\n"));
        }
        text.push_str(&format!("Error: {error}\n"));

        if let Some(raw) = error.raw_output() {
            text.push('\n');
            text.extend(raw.chars().take(self.excerpt_chars));
            text.push('\n');
        }

        text
    }

    /// Write the artifact for `error`, replacing any previous one.
    pub fn write(&self, error: &CrawlError) -> Result<()> {
        let label = self.path.display().to_string();
        let mut writer = create_file(&self.path)?;
        writer
            .write_all(self.render(error).as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|e| sink_error(&label, e))?;
        info!(path = %label, "error log saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(title: &str) -> JobRecord {
        JobRecord::builder()
            .title(title)
            .company("Acme")
            .location("Makati")
            .salary("₱40,000–₱50,000")
            .description("Build things")
            .url("https://ph.jobstreet.com/job/1")
            .build()
    }

    #[test]
    fn test_json_lines_one_object_per_line() {
        let mut sink = JsonLinesSink::new(Vec::new(), "<memory>");
        sink.write(&record("Engineer")).expect("write");
        sink.write(&record("Analyst")).expect("write");
        sink.finish().expect("finish");

        let output = String::from_utf8(sink.into_inner()).expect("utf8");
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: JobRecord = serde_json::from_str(lines[0]).expect("parse line");
        assert_eq!(first, record("Engineer"));
        assert!(output.contains("₱40,000"), "non-ASCII written verbatim");
    }

    #[test]
    fn test_json_lines_file_is_readable_before_finish() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("out/jobs.jsonl");

        let mut sink = JsonLinesSink::create(&path);
        sink.write(&record("Engineer")).expect("write");

        let content = std::fs::read_to_string(&path).expect("read output");
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn test_json_lines_leaves_file_alone_until_used() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("jobs.jsonl");
        std::fs::write(&path, "previous run\n").expect("seed output");

        let sink = JsonLinesSink::create(&path);
        drop(sink);
        assert_eq!(std::fs::read_to_string(&path).expect("read output"), "previous run\n");

        let mut sink = JsonLinesSink::create(&path);
        sink.finish().expect("finish");
        assert_eq!(std::fs::read_to_string(&path).expect("read output"), "");
    }

    #[test]
    fn test_json_array_written_only_on_finish() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("jobs_output.txt");

        let mut sink = JsonArraySink::new(&path);
        sink.write(&record("Engineer")).expect("write");
        assert!(!path.exists());

        sink.finish().expect("finish");
        let content = std::fs::read_to_string(&path).expect("read output");
        assert!(content.starts_with("[\n    {"));
        let records: Vec<JobRecord> = serde_json::from_str(&content).expect("parse array");
        assert_eq!(records, vec![record("Engineer")]);
    }

    #[test]
    fn test_console_rendering() {
        let long = JobRecord::builder()
            .title("Engineer")
            .description("x".repeat(200))
            .build();
        let text = render_record(3, &long);

        assert!(text.starts_with("Job 3:"));
        assert!(text.contains("   Company: Not found"));
        assert!(text.contains("   Salary: Not listed"));
        assert!(text.contains(&format!("   Description: {}...", "x".repeat(150))));
        assert!(text.ends_with(&"-".repeat(50)));
    }

    #[test]
    fn test_console_sink_numbers_jobs() {
        let mut sink = ConsoleSink::new(Vec::new());
        sink.write(&record("Engineer")).expect("write");
        sink.write(&record("Analyst")).expect("write");
        sink.finish().expect("finish");

        let output = String::from_utf8(sink.into_inner()).expect("utf8");
        assert!(output.contains("Job 1:"));
        assert!(output.contains("Job 2:"));
        assert!(output.contains("   Salary: ₱40,000–₱50,000"));
    }

    #[test]
    fn test_console_sink_reports_empty_run() {
        let mut sink = ConsoleSink::new(Vec::new());
        sink.finish().expect("finish");
        let output = String::from_utf8(sink.into_inner()).expect("utf8");
        assert_eq!(output.trim(), "No job postings found.");
    }

    #[test]
    fn test_multi_sink_fans_out() {
        let dir = TempDir::new().expect("create temp dir");
        let jsonl = dir.path().join("jobs.jsonl");
        let json = dir.path().join("jobs.json");

        let mut sink = MultiSink::new()
            .with(Box::new(JsonLinesSink::create(&jsonl)))
            .with(Box::new(JsonArraySink::new(&json)));
        assert_eq!(sink.len(), 2);

        sink.write(&record("Engineer")).expect("write");
        sink.finish().expect("finish");

        assert!(jsonl.exists());
        assert!(json.exists());
    }

    #[test]
    fn test_error_artifact_excerpt_is_bounded() {
        let artifact = ErrorArtifact::new("jobs_error_log.txt", 2000);
        let error = CrawlError::Parse {
            url: "https://ph.jobstreet.com/jobs/".to_string(),
            message: "expected value at line 1 column 1".to_string(),
            raw: "y".repeat(5000),
        };

        let text = artifact.render(&error);
        assert!(text.starts_with("JSON parsing failed. Raw output:\n"));
        assert!(text.contains("URL: https://ph.jobstreet.com/jobs/"));
        assert!(text.contains(&"y".repeat(2000)));
        assert!(!text.contains(&"y".repeat(2001)));
    }

    #[test]
    fn test_error_artifact_for_crawl_failure() {
        let dir = TempDir::new().expect("create temp dir");
        let artifact = ErrorArtifact::new(dir.path().join("jobs_error_log.txt"), 2000);
        let error = CrawlError::Fetch(crate::error::FetchError::Status {
            url: "https://ph.jobstreet.com/jobs/".to_string(),
            status: 503,
        });

        artifact.write(&error).expect("write artifact");
        let content = std::fs::read_to_string(artifact.path()).expect("read artifact");
        assert!(content.starts_with("Crawling failed: HTTP 503"));
        assert!(content.contains("URL: https://ph.jobstreet.com/jobs/"));
    }
}
