//! Record assembly.

use jobscout_core::{JobRecord, JobSummary};

/// Combine listing summary fields with the salary read from the detail page.
///
/// A missing or blank salary becomes `"Not listed"`.
#[must_use]
pub fn assemble(summary: JobSummary, salary: Option<String>) -> JobRecord {
    JobRecord::from_summary(summary, salary.as_deref())
}
