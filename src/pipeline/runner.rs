use anyhow::Result;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::pipeline::config::{ImportConfig, WriteFailurePolicy};
use crate::pipeline::error::{PipelineError, RunFailure};
use crate::pipeline::index::{build_index, ChunkScope, DuplicateIndex};
use crate::pipeline::listener::RunListener;
use crate::pipeline::processor::{ChunkProcessor, ProcessOutcome};
use crate::pipeline::reader::{ChunkReader, Source};
use crate::pipeline::record::CanonicalRecord;
use crate::pipeline::report::RunReport;
use crate::pipeline::writer::ChunkWriter;
use crate::store::RecordStore;

static NEXT_RUN_ID: AtomicU64 = AtomicU64::new(1);

/// Drives reader, processor and writer over a source in fixed-size chunks.
///
/// A run is strictly sequential: chunk N+1 is not read before chunk N's
/// commit has returned, which is what lets duplicate detection see the run's
/// own earlier writes. The shutdown flag is only looked at between chunks.
pub struct PipelineRunner {
    config: ImportConfig,
    store: Arc<dyn RecordStore>,
    processor: ChunkProcessor,
    writer: ChunkWriter,
    listeners: Vec<Box<dyn RunListener>>,
    shutdown_flag: Arc<AtomicBool>,
}

impl PipelineRunner {
    pub fn new(config: ImportConfig, store: Arc<dyn RecordStore>) -> Result<Self> {
        config.validate()?;

        let writer = ChunkWriter::new(Arc::clone(&store));
        Ok(Self {
            config,
            store,
            processor: ChunkProcessor::new(),
            writer,
            listeners: Vec::new(),
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn with_listener(mut self, listener: impl RunListener + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    pub fn with_shutdown_signal(mut self, shutdown_flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = shutdown_flag;
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Runs the whole import and blocks until it reaches a terminal state.
    /// Failed runs come back as `Err` with the statistics gathered so far.
    pub fn run(&mut self, source: &Source) -> Result<RunReport, RunFailure> {
        let run_id = NEXT_RUN_ID.fetch_add(1, Ordering::Relaxed);
        let mut report = RunReport::new(run_id, source.display_name());
        report.start();

        for listener in self.listeners.iter_mut() {
            listener.before_run(&report);
        }

        let result = self.execute(source, &mut report);
        report.finish(result.is_err());

        for listener in self.listeners.iter_mut() {
            listener.after_run(&report);
        }

        match result {
            Ok(()) => {
                info!("Import run {} completed with status {}", run_id, report.status);
                Ok(report)
            }
            Err(e) => {
                error!("Import run {} failed: {}", run_id, e);
                Err(RunFailure::new(e, report))
            }
        }
    }

    fn execute(&mut self, source: &Source, report: &mut RunReport) -> Result<(), PipelineError> {
        let mut reader = ChunkReader::open(source, self.config.io_buffer_size_bytes())?;
        let mut index = build_index(self.config.dedup_strategy, &self.store)?;
        let mut chunk_index = 0;

        loop {
            if self.shutdown_requested() {
                warn!("Shutdown requested, stopping after {} records", report.read_count);
                return Err(PipelineError::Interrupted { records_read: report.read_count });
            }

            let chunk = match reader.next_chunk(self.config.chunk_size) {
                Ok(chunk) => chunk,
                Err(e) => {
                    // Records pulled before the read error never reach the
                    // processor, so they stay out of read_count.
                    let discarded = reader.records_emitted().saturating_sub(report.read_count);
                    if discarded > 0 {
                        warn!("Discarding {} records of the unfinished chunk", discarded);
                    }
                    return Err(e);
                }
            };
            if chunk.is_empty() {
                break;
            }
            report.record_read(chunk.len());

            let mut scope = ChunkScope::new(index.as_ref());
            let mut batch = Vec::with_capacity(chunk.len());
            for raw in &chunk {
                for listener in self.listeners.iter_mut() {
                    listener.before_record(raw, report);
                }

                let outcome = self.processor.process(raw, &scope);
                if let ProcessOutcome::Accepted(record) = &outcome {
                    scope.stage(&record.name);
                    batch.push(record.clone());
                }
                report.record_outcome(&outcome);

                for listener in self.listeners.iter_mut() {
                    listener.after_record(raw, &outcome, report);
                }
            }
            drop(scope);

            self.commit_batch(&batch, index.as_mut(), report)?;

            for listener in self.listeners.iter_mut() {
                listener.after_chunk(chunk_index, report);
            }
            chunk_index += 1;
        }

        if report.read_count > 0 && report.error_count == report.read_count {
            return Err(PipelineError::AllRecordsFailed { records_read: report.read_count });
        }

        Ok(())
    }

    fn commit_batch(
        &self,
        batch: &[CanonicalRecord],
        index: &mut dyn DuplicateIndex,
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        match self.writer.commit(batch, index) {
            Ok(saved) => {
                report.record_written(saved.len());
                report.record_commit();
                Ok(())
            }
            Err(failure) => {
                let message = failure.to_string();
                let unsaved = batch.len() - failure.committed.len();
                report.record_written(failure.committed.len());
                report.record_write_failure(unsaved, message);

                match self.config.write_failure_policy {
                    WriteFailurePolicy::Abort => Err(PipelineError::WriteFailed {
                        index: failure.index,
                        cause: failure.cause,
                    }),
                    WriteFailurePolicy::Continue => {
                        warn!(
                            "Continuing after write failure; {} records of the chunk were not saved",
                            unsaved
                        );
                        Ok(())
                    }
                }
            }
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown_flag.load(Ordering::Relaxed)
    }

    /// The failure of a source that shutdown stopped before its run began.
    pub fn interrupted_before_start(source: &Source) -> RunFailure {
        let run_id = NEXT_RUN_ID.fetch_add(1, Ordering::Relaxed);
        let mut report = RunReport::new(run_id, source.display_name());
        report.start();
        report.finish(true);
        RunFailure::new(PipelineError::Interrupted { records_read: 0 }, report)
    }
}
