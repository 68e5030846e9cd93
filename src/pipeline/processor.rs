use tracing::{debug, warn};

use crate::pipeline::index::DuplicateIndex;
use crate::pipeline::record::{normalize, CanonicalRecord, RawRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    EmptyInput,
    /// Carries the normalized name that was already present.
    DuplicateOf(String),
}

/// Result of transforming one raw record. Exactly one per record read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Accepted(CanonicalRecord),
    Skipped(SkipReason),
    Failed { error: String, raw_text: String },
}

impl ProcessOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ProcessOutcome::Accepted(_))
    }
}

/// Turns raw records into outcomes. Reads the duplicate index, never writes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChunkProcessor;

impl ChunkProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn process(&self, raw: &RawRecord, index: &dyn DuplicateIndex) -> ProcessOutcome {
        if !raw.valid_utf8 {
            warn!("Line {} is not valid UTF-8", raw.line_number);
            return ProcessOutcome::Failed {
                error: "invalid UTF-8 sequence".to_string(),
                raw_text: raw.raw_text.clone(),
            };
        }

        let trimmed = raw.raw_text.trim();
        if trimmed.is_empty() {
            warn!("Invalid data found at line {}, skipping", raw.line_number);
            return ProcessOutcome::Skipped(SkipReason::EmptyInput);
        }

        let name = normalize(trimmed);
        debug!("TRANSFORM: '{}' -> '{}'", trimmed, name);

        match index.is_duplicate(&name) {
            Ok(true) => ProcessOutcome::Skipped(SkipReason::DuplicateOf(name)),
            Ok(false) => ProcessOutcome::Accepted(CanonicalRecord::new(name)),
            Err(e) => ProcessOutcome::Failed {
                error: e.to_string(),
                raw_text: raw.raw_text.clone(),
            },
        }
    }
}
