//! CSV ingestion: parsing uploaded files and persisting them as a batch

pub mod parser;
pub mod pipeline;

pub use parser::{parse_csv, ParseError, ParsedCsv, SiteRow, SkipKind, SkippedRow, EXPECTED_HEADER};
pub use pipeline::{ingest_csv, IngestMode, IngestOptions, IngestSummary};
