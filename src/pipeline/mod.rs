pub mod config;
pub mod constants;
pub mod error;
pub mod index;
pub mod listener;
pub mod processor;
pub mod reader;
pub mod record;
pub mod report;
pub mod runner;
pub mod writer;

#[cfg(test)]
mod tests;

pub use config::{DedupStrategy, ImportConfig, WriteFailurePolicy};
pub use error::{PipelineError, RunFailure};
pub use index::{DuplicateIndex, MemoryIndex, StoreScanIndex};
pub use listener::{LoggingListener, RunListener};
pub use processor::{ChunkProcessor, ProcessOutcome, SkipReason};
pub use reader::{ChunkReader, Source};
pub use record::{normalize, CanonicalRecord, PersistedRecord, RawRecord};
pub use report::{RunReport, RunStatus, RunSummary};
pub use runner::PipelineRunner;
pub use writer::{ChunkWriter, WriteFailed};
