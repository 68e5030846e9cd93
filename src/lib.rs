// Chunked import pipeline: reader, processor, writer and the runner driving them
pub mod pipeline;

// Record stores the pipeline writes into
pub mod store;

// Single-record management on top of a store
pub mod directory;

// Source resolution, uploads and concurrent runs
pub mod service;

pub mod utils;

// Re-export main types for convenience
pub use directory::{DirectoryError, PersonDirectory};
pub use pipeline::{
    normalize, ImportConfig, PipelineError, PipelineRunner, RunFailure, RunReport, RunStatus,
    RunSummary, Source,
};
pub use service::{ImportService, JobInfo};
pub use store::{JsonFileStore, MemoryStore, RecordStore, StoreError};
