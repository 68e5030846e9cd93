pub const DEFAULT_CHUNK_SIZE: usize = 5;
pub const DEFAULT_MAX_CONCURRENT_RUNS: usize = 4;
pub const DEFAULT_IO_BUFFER_SIZE_KB: usize = 64;

pub const MIN_CHUNK_SIZE: usize = 1;
pub const MAX_CHUNK_SIZE: usize = 10_000;
pub const MIN_CONCURRENT_RUNS: usize = 1;
pub const MAX_CONCURRENT_RUNS: usize = 32;
pub const MIN_IO_BUFFER_SIZE_KB: usize = 4;
pub const MAX_IO_BUFFER_SIZE_KB: usize = 4096;

pub const BYTES_PER_KB: usize = 1024;

pub const DEFAULT_DATA_DIRECTORY: &str = "data";
pub const DEFAULT_SOURCE_FILE: &str = "data.csv";
pub const DEFAULT_STORE_FILE: &str = "persons.json";
pub const CSV_EXTENSION: &str = "csv";

pub const CSV_FIELD_SEPARATOR: char = ',';
pub const NAME_TOKEN_SEPARATOR: char = ' ';

pub const JOB_NAME: &str = "importPersonJob";
pub const JOB_DESCRIPTION: &str = "Chunked import of person names from CSV";
pub const JOB_ARCHITECTURE: &str = "Reader -> Processor -> Writer with chunk commits";
