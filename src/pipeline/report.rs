use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::pipeline::processor::{ProcessOutcome, SkipReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Idle,
    Running,
    Completed,
    CompletedWithErrors,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::CompletedWithErrors | RunStatus::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Idle => "IDLE",
            RunStatus::Running => "RUNNING",
            RunStatus::Completed => "COMPLETED",
            RunStatus::CompletedWithErrors => "COMPLETED_WITH_ERRORS",
            RunStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics of one run. Only the runner mutates it; hooks and callers get
/// shared references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: u64,
    pub source: String,
    pub status: RunStatus,
    pub started_at: u64,
    pub finished_at: Option<u64>,
    pub read_count: usize,
    pub write_count: usize,
    pub skip_count: usize,
    pub duplicate_count: usize,
    pub error_count: usize,
    pub commit_count: usize,
    pub errors: Vec<String>,
    pub duplicates: Vec<String>,
}

impl RunReport {
    pub fn new(run_id: u64, source: impl Into<String>) -> Self {
        Self {
            run_id,
            source: source.into(),
            status: RunStatus::Idle,
            started_at: current_timestamp(),
            finished_at: None,
            read_count: 0,
            write_count: 0,
            skip_count: 0,
            duplicate_count: 0,
            error_count: 0,
            commit_count: 0,
            errors: Vec::new(),
            duplicates: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }

    /// Every record read is written, skipped, or errored exactly once.
    pub fn is_balanced(&self) -> bool {
        self.read_count == self.write_count + self.skip_count + self.error_count
    }

    pub(crate) fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = current_timestamp();
    }

    pub(crate) fn record_read(&mut self, count: usize) {
        self.read_count += count;
    }

    pub(crate) fn record_outcome(&mut self, outcome: &ProcessOutcome) {
        match outcome {
            ProcessOutcome::Accepted(_) => {}
            ProcessOutcome::Skipped(SkipReason::EmptyInput) => {
                self.skip_count += 1;
            }
            ProcessOutcome::Skipped(SkipReason::DuplicateOf(name)) => {
                self.skip_count += 1;
                self.duplicate_count += 1;
                self.duplicates.push(name.clone());
            }
            ProcessOutcome::Failed { error, raw_text } => {
                self.error_count += 1;
                self.errors.push(format!("Error processing '{}': {}", raw_text, error));
            }
        }
    }

    pub(crate) fn record_written(&mut self, count: usize) {
        self.write_count += count;
    }

    pub(crate) fn record_commit(&mut self) {
        self.commit_count += 1;
    }

    /// Accepted records that never reached the store because their batch
    /// failed. `message` describes the failing save.
    pub(crate) fn record_write_failure(&mut self, unsaved: usize, message: String) {
        self.error_count += unsaved;
        self.errors.push(message);
    }

    pub(crate) fn finish(&mut self, failed: bool) {
        self.status = if failed {
            RunStatus::Failed
        } else if self.has_errors() {
            RunStatus::CompletedWithErrors
        } else {
            RunStatus::Completed
        };
        self.finished_at = Some(current_timestamp());
    }

    pub fn duration_secs(&self) -> u64 {
        self.finished_at
            .unwrap_or_else(current_timestamp)
            .saturating_sub(self.started_at)
    }
}

/// The externally visible summary of a run. Empty collections are left out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub status: RunStatus,
    pub exit_status: String,
    pub message: String,
    pub run_id: u64,
    pub start_time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<u64>,
    pub read_count: usize,
    pub write_count: usize,
    pub skip_count: usize,
    pub duplicate_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicates: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl RunSummary {
    pub fn from_report(report: &RunReport, failure: Option<&str>) -> Self {
        let message = match failure {
            Some(reason) => format!("Run failed: {}", reason),
            None if report.duplicate_count > 0 => format!(
                "Processed: {} saved, {} duplicates skipped",
                report.write_count, report.duplicate_count
            ),
            None => "File processed successfully".to_string(),
        };

        let exit_status = match report.status {
            RunStatus::Failed => "FAILED",
            _ => "COMPLETED",
        };

        Self {
            status: report.status,
            exit_status: exit_status.to_string(),
            message,
            run_id: report.run_id,
            start_time: report.started_at,
            end_time: report.finished_at,
            read_count: report.read_count,
            write_count: report.write_count,
            skip_count: report.skip_count,
            duplicate_count: report.duplicate_count,
            filename: (!report.source.is_empty()).then(|| report.source.clone()),
            duplicates: report.duplicates.clone(),
            errors: report.errors.clone(),
        }
    }
}

pub(crate) fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
