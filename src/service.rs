//! Import entry points used by the command line: source resolution, upload
//! validation, and concurrent runs over several sources.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::pipeline::config::has_csv_extension;
use crate::pipeline::constants::{JOB_ARCHITECTURE, JOB_DESCRIPTION, JOB_NAME};
use crate::pipeline::{
    ImportConfig, LoggingListener, PipelineError, PipelineRunner, RunFailure, RunReport,
    RunSummary, Source,
};
use crate::store::RecordStore;

/// Static description of the import job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    pub job_name: String,
    pub description: String,
    pub restartable: bool,
    pub architecture: String,
    pub chunk_size: usize,
}

pub struct ImportService {
    config: ImportConfig,
    store: Arc<dyn RecordStore>,
    shutdown_flag: Arc<AtomicBool>,
}

impl ImportService {
    pub fn new(config: ImportConfig, store: Arc<dyn RecordStore>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn with_shutdown_signal(mut self, shutdown_flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = shutdown_flag;
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn job_info(&self) -> JobInfo {
        JobInfo {
            job_name: JOB_NAME.to_string(),
            description: JOB_DESCRIPTION.to_string(),
            // runs never resume from where a previous process stopped
            restartable: false,
            architecture: JOB_ARCHITECTURE.to_string(),
            chunk_size: self.config.chunk_size,
        }
    }

    /// `None` imports the configured default file from the data directory.
    pub fn resolve(&self, name: Option<&str>) -> Source {
        Source::Path(self.config.resolve_source(name))
    }

    /// Accepts in-memory content only when it is non-empty and named `*.csv`.
    pub fn validate_upload(
        &self,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<Source, PipelineError> {
        if content.is_empty() {
            return Err(PipelineError::InvalidUpload {
                message: "Please select a CSV file to upload".to_string(),
            });
        }

        if !has_csv_extension(Path::new(filename)) {
            return Err(PipelineError::InvalidUpload {
                message: "Only CSV files are allowed".to_string(),
            });
        }

        Ok(Source::upload(filename, content))
    }

    /// Runs one source on the calling thread.
    pub fn run(&self, source: &Source) -> Result<Result<RunReport, RunFailure>> {
        let mut runner = self.runner()?;
        Ok(runner.run(source))
    }

    /// Runs one source on tokio's blocking pool.
    pub async fn spawn_run(&self, source: Source) -> Result<Result<RunReport, RunFailure>> {
        let mut runner = self.runner()?;
        tokio::task::spawn_blocking(move || runner.run(&source))
            .await
            .map_err(|e| anyhow!("Import task failed: {}", e))
    }

    /// Runs every source as its own independent run, at most
    /// `max_concurrent_runs` at a time. Summaries come back in input order.
    ///
    /// Runs share the store; two runs importing the same new name at the same
    /// moment may both save it. Sources left unscheduled by a shutdown come
    /// back as interrupted failures.
    pub async fn run_all(&self, sources: Vec<Source>) -> Result<Vec<RunSummary>> {
        let total = sources.len();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_runs));
        let mut tasks = JoinSet::new();
        let mut summaries = Vec::with_capacity(total);

        info!(
            "Scheduling {} sources with up to {} concurrent runs",
            total, self.config.max_concurrent_runs
        );

        for (position, source) in sources.into_iter().enumerate() {
            if self.shutdown_flag.load(Ordering::Relaxed) {
                warn!("Shutdown requested. Not scheduling {}", source.display_name());
                let failure = PipelineRunner::interrupted_before_start(&source);
                summaries.push((position, summarize(&Err(failure))));
                continue;
            }

            let permit = semaphore.clone().acquire_owned().await?;
            let mut runner = self.runner()?;

            tasks.spawn_blocking(move || {
                let _permit = permit;
                let result = runner.run(&source);
                (position, summarize(&result))
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (position, summary) = joined.map_err(|e| anyhow!("Import task failed: {}", e))?;
            summaries.push((position, summary));
        }

        summaries.sort_by_key(|(position, _)| *position);
        Ok(summaries.into_iter().map(|(_, summary)| summary).collect())
    }

    fn runner(&self) -> Result<PipelineRunner> {
        Ok(PipelineRunner::new(self.config.clone(), Arc::clone(&self.store))?
            .with_listener(LoggingListener)
            .with_shutdown_signal(Arc::clone(&self.shutdown_flag)))
    }
}

pub fn summarize(result: &Result<RunReport, RunFailure>) -> RunSummary {
    match result {
        Ok(report) => RunSummary::from_report(report, None),
        Err(failure) => RunSummary::from_report(&failure.report, Some(&failure.error.to_string())),
    }
}
