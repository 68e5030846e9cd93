use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::pipeline::error::PipelineError;
use crate::pipeline::record::RawRecord;

/// Where a run reads its records from.
#[derive(Debug, Clone)]
pub enum Source {
    Path(PathBuf),
    /// Content received in memory, e.g. an uploaded file.
    Upload { filename: String, content: Vec<u8> },
}

impl Source {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Source::Path(path.into())
    }

    pub fn upload(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Source::Upload {
            filename: filename.into(),
            content: content.into(),
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Source::Path(path) => path.display().to_string(),
            Source::Upload { filename, .. } => filename.clone(),
        }
    }
}

/// Single-pass reader over the data lines of a source.
///
/// The first line is always dropped as the header. Lines that are blank once
/// trimmed never become records. Only the first comma-separated field of a
/// line is kept.
pub struct ChunkReader {
    reader: Box<dyn BufRead + Send>,
    location: PathBuf,
    emitted: usize,
    exhausted: bool,
    buffer: Vec<u8>,
}

impl ChunkReader {
    pub fn open(source: &Source, io_buffer_size: usize) -> Result<Self, PipelineError> {
        let (reader, location): (Box<dyn BufRead + Send>, PathBuf) = match source {
            Source::Path(path) => {
                let file = open_file(path)?;
                info!("Loading from file system: {}", path.display());
                (Box::new(BufReader::with_capacity(io_buffer_size, file)), path.clone())
            }
            Source::Upload { filename, content } => {
                info!("Loading uploaded content: {} ({} bytes)", filename, content.len());
                (Box::new(Cursor::new(content.clone())), PathBuf::from(filename))
            }
        };

        Self::from_reader(reader, location)
    }

    /// Reads from any buffered stream; `location` only names it in errors.
    pub fn from_reader(
        reader: Box<dyn BufRead + Send>,
        location: impl Into<PathBuf>,
    ) -> Result<Self, PipelineError> {
        let mut chunk_reader = Self {
            reader,
            location: location.into(),
            emitted: 0,
            exhausted: false,
            buffer: Vec::new(),
        };
        chunk_reader.skip_header()?;
        Ok(chunk_reader)
    }

    pub fn records_emitted(&self) -> usize {
        self.emitted
    }

    /// Up to `size` records; an empty vector means the source is exhausted.
    pub fn next_chunk(&mut self, size: usize) -> Result<Vec<RawRecord>, PipelineError> {
        let mut chunk = Vec::with_capacity(size);
        while chunk.len() < size {
            match self.next_record()? {
                Some(record) => chunk.push(record),
                None => break,
            }
        }
        Ok(chunk)
    }

    pub fn next_record(&mut self) -> Result<Option<RawRecord>, PipelineError> {
        while let Some(end) = self.read_line()? {
            if is_blank(&self.buffer[..end]) {
                continue;
            }

            self.emitted += 1;
            let record = RawRecord::from_line_bytes(&self.buffer[..end], self.emitted);
            debug!("Read from CSV: {}", record.raw_text);
            return Ok(Some(record));
        }
        Ok(None)
    }

    fn skip_header(&mut self) -> Result<(), PipelineError> {
        if self.read_line()?.is_some() {
            debug!("Skipped header of {}", self.location.display());
        }
        Ok(())
    }

    /// Reads the next physical line into the buffer and returns its length
    /// without the line terminator.
    fn read_line(&mut self) -> Result<Option<usize>, PipelineError> {
        if self.exhausted {
            return Ok(None);
        }

        self.buffer.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.buffer)
            .map_err(|source| PipelineError::SourceUnreadable {
                path: self.location.clone(),
                source,
            })?;

        if read == 0 {
            self.exhausted = true;
            return Ok(None);
        }

        let mut end = self.buffer.len();
        if end > 0 && self.buffer[end - 1] == b'\n' {
            end -= 1;
        }
        if end > 0 && self.buffer[end - 1] == b'\r' {
            end -= 1;
        }
        Ok(Some(end))
    }
}

impl Iterator for ChunkReader {
    type Item = Result<RawRecord, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

fn open_file(path: &Path) -> Result<File, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::SourceNotFound { path: path.to_path_buf() });
    }

    if path.is_dir() {
        return Err(PipelineError::SourceUnreadable {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "path is a directory"),
        });
    }

    File::open(path).map_err(|source| PipelineError::SourceUnreadable {
        path: path.to_path_buf(),
        source,
    })
}

fn is_blank(line: &[u8]) -> bool {
    String::from_utf8_lossy(line).trim().is_empty()
}
