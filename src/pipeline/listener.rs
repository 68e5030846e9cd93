use tracing::{debug, error, info, warn};

use crate::pipeline::processor::{ProcessOutcome, SkipReason};
use crate::pipeline::record::RawRecord;
use crate::pipeline::report::{RunReport, RunStatus};

/// Lifecycle hooks called synchronously by the runner.
///
/// Hooks observe; they get shared references and cannot change the run. Keep
/// them cheap, the runner waits for each one.
pub trait RunListener: Send {
    fn before_run(&mut self, _report: &RunReport) {}

    fn before_record(&mut self, _record: &RawRecord, _report: &RunReport) {}

    fn after_record(&mut self, _record: &RawRecord, _outcome: &ProcessOutcome, _report: &RunReport) {}

    fn after_chunk(&mut self, _chunk_index: usize, _report: &RunReport) {}

    fn after_run(&mut self, _report: &RunReport) {}
}

/// Emits the run's progress as tracing events.
#[derive(Debug, Default)]
pub struct LoggingListener;

impl RunListener for LoggingListener {
    fn before_run(&mut self, report: &RunReport) {
        info!("========================================");
        info!("Starting import run {} for {}", report.run_id, report.source);
        info!("========================================");
    }

    fn before_record(&mut self, record: &RawRecord, _report: &RunReport) {
        debug!("Processing line {}: '{}'", record.line_number, record.raw_text);
    }

    fn after_record(&mut self, record: &RawRecord, outcome: &ProcessOutcome, _report: &RunReport) {
        match outcome {
            ProcessOutcome::Accepted(canonical) => {
                debug!("Processed: '{}' -> '{}'", record.raw_text, canonical.name);
            }
            ProcessOutcome::Skipped(SkipReason::DuplicateOf(name)) => {
                warn!("DUPLICATE SKIPPED: '{}' already exists", name);
            }
            ProcessOutcome::Skipped(SkipReason::EmptyInput) => {
                warn!("Empty name at line {} skipped", record.line_number);
            }
            ProcessOutcome::Failed { error, raw_text } => {
                error!("Error processing '{}': {}", raw_text, error);
            }
        }
    }

    fn after_chunk(&mut self, chunk_index: usize, report: &RunReport) {
        info!(
            chunk = chunk_index,
            read = report.read_count,
            written = report.write_count,
            skipped = report.skip_count,
            "Chunk committed"
        );
    }

    fn after_run(&mut self, report: &RunReport) {
        info!("========================================");
        info!("Import run {} finished: {}", report.run_id, report.status);
        info!("Duration: {} seconds", report.duration_secs());
        info!(
            "Read: {}, Written: {}, Skipped: {}, Duplicates: {}, Errors: {}, Commits: {}",
            report.read_count,
            report.write_count,
            report.skip_count,
            report.duplicate_count,
            report.error_count,
            report.commit_count
        );
        info!("========================================");

        if report.status == RunStatus::Failed {
            for message in &report.errors {
                error!("Failure: {}", message);
            }
        }
    }
}
