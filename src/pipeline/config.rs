use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use anyhow::Result;
use crate::pipeline::constants::*;

/// What the runner does when a chunk commit fails part way through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WriteFailurePolicy {
    #[default]
    Abort,
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DedupStrategy {
    /// Case-insensitive set loaded once per run and updated on every write.
    #[default]
    Memory,
    /// Re-reads the whole store for every candidate.
    Scan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub chunk_size: usize,
    pub write_failure_policy: WriteFailurePolicy,
    pub dedup_strategy: DedupStrategy,
    pub io_buffer_size_kb: usize,
    pub data_directory: PathBuf,
    pub default_file: String,
    pub store_path: PathBuf,
    pub max_concurrent_runs: usize,
    pub verbose: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            write_failure_policy: WriteFailurePolicy::default(),
            dedup_strategy: DedupStrategy::default(),
            io_buffer_size_kb: DEFAULT_IO_BUFFER_SIZE_KB,
            data_directory: PathBuf::from(DEFAULT_DATA_DIRECTORY),
            default_file: DEFAULT_SOURCE_FILE.to_string(),
            store_path: PathBuf::from(DEFAULT_STORE_FILE),
            max_concurrent_runs: DEFAULT_MAX_CONCURRENT_RUNS,
            verbose: false,
        }
    }
}

impl ImportConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size < MIN_CHUNK_SIZE || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(anyhow::anyhow!(
                "Chunk size must be between {} and {} records",
                MIN_CHUNK_SIZE, MAX_CHUNK_SIZE
            ));
        }

        if self.max_concurrent_runs < MIN_CONCURRENT_RUNS
            || self.max_concurrent_runs > MAX_CONCURRENT_RUNS {
            return Err(anyhow::anyhow!(
                "Concurrent runs must be between {} and {}",
                MIN_CONCURRENT_RUNS, MAX_CONCURRENT_RUNS
            ));
        }

        if self.io_buffer_size_kb < MIN_IO_BUFFER_SIZE_KB
            || self.io_buffer_size_kb > MAX_IO_BUFFER_SIZE_KB {
            return Err(anyhow::anyhow!(
                "IO buffer size must be between {} and {} KB",
                MIN_IO_BUFFER_SIZE_KB, MAX_IO_BUFFER_SIZE_KB
            ));
        }

        if self.default_file.trim().is_empty() {
            return Err(anyhow::anyhow!("Default source file name must not be empty"));
        }

        Ok(())
    }

    pub fn io_buffer_size_bytes(&self) -> usize {
        self.io_buffer_size_kb * BYTES_PER_KB
    }

    /// Resolves a source name the way the import job does: absolute paths are
    /// used as given, bare names live in the data directory and get a `.csv`
    /// suffix when they lack one. `None` means the configured default file.
    pub fn resolve_source(&self, name: Option<&str>) -> PathBuf {
        let name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n,
            _ => self.default_file.as_str(),
        };

        let candidate = Path::new(name);
        if candidate.is_absolute() {
            return candidate.to_path_buf();
        }

        let file_name = if has_csv_extension(candidate) {
            name.to_string()
        } else {
            format!("{}.{}", name, CSV_EXTENSION)
        };
        self.data_directory.join(file_name)
    }
}

pub fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(CSV_EXTENSION))
        .unwrap_or(false)
}
