//! CSV parsing and row validation
//!
//! Turns raw upload bytes into typed [`SiteRow`]s. Whole-file problems
//! (undecodable bytes, wrong header) are returned as [`ParseError`]; row
//! problems are collected as [`SkippedRow`]s and parsing continues.

use serde::Serialize;
use thiserror::Error;

/// Required header, compared case-insensitively
pub const EXPECTED_HEADER: [&str; 3] = ["Town", "Region", "Number_of_Galamsay_Sites"];

/// Fatal CSV errors; nothing is written when one of these occurs
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("File is not valid UTF-8: {0}")]
    Decode(String),

    #[error("Invalid CSV header: {0}")]
    Schema(String),
}

/// A validated data row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRow {
    /// 1-based line in the uploaded file
    pub line: u64,
    pub town: String,
    pub region: String,
    pub site_count: i64,
}

/// Why a row was not persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipKind {
    Invalid,
    Duplicate,
}

/// A row left out of the batch, reported back to the uploader
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub line: u64,
    pub kind: SkipKind,
    pub reason: String,
}

impl SkippedRow {
    fn invalid(line: u64, reason: impl Into<String>) -> Self {
        Self {
            line,
            kind: SkipKind::Invalid,
            reason: reason.into(),
        }
    }

    pub fn duplicate(row: &SiteRow) -> Self {
        Self {
            line: row.line,
            kind: SkipKind::Duplicate,
            reason: format!(
                "Record for town '{}' in region '{}' already exists",
                row.town, row.region
            ),
        }
    }

    /// Later row of a (town, region) pair already seen earlier in the same file
    pub fn repeated(row: &SiteRow, first_line: u64) -> Self {
        Self {
            line: row.line,
            kind: SkipKind::Duplicate,
            reason: format!(
                "Town '{}' in region '{}' already appears on line {}",
                row.town, row.region, first_line
            ),
        }
    }
}

/// Parser output: accepted rows plus rejected ones, both in file order
#[derive(Debug, Clone, Default)]
pub struct ParsedCsv {
    pub rows: Vec<SiteRow>,
    pub invalid: Vec<SkippedRow>,
}

/// Decode, check the header and validate every data row
pub fn parse_csv(bytes: &[u8]) -> Result<ParsedCsv, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ParseError::Decode(e.to_string()))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();

    let header = match records.next() {
        Some(Ok(header)) => header,
        Some(Err(e)) => return Err(ParseError::Schema(e.to_string())),
        None => return Err(ParseError::Schema("CSV file is empty".to_string())),
    };
    check_header(&header)?;

    let mut parsed = ParsedCsv::default();

    for result in records {
        match result {
            Ok(record) => {
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                match validate_row(line, &record) {
                    Ok(row) => parsed.rows.push(row),
                    Err(skipped) => parsed.invalid.push(skipped),
                }
            }
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                parsed
                    .invalid
                    .push(SkippedRow::invalid(line, format!("Malformed row: {}", e)));
            }
        }
    }

    Ok(parsed)
}

fn check_header(header: &csv::StringRecord) -> Result<(), ParseError> {
    let matches = header.len() == EXPECTED_HEADER.len()
        && header
            .iter()
            .zip(EXPECTED_HEADER.iter())
            .all(|(found, expected)| found.trim().eq_ignore_ascii_case(expected));

    if matches {
        Ok(())
    } else {
        let found: Vec<&str> = header.iter().map(str::trim).collect();
        Err(ParseError::Schema(format!(
            "expected columns {}, found {}",
            EXPECTED_HEADER.join(","),
            found.join(",")
        )))
    }
}

fn validate_row(line: u64, record: &csv::StringRecord) -> Result<SiteRow, SkippedRow> {
    if record.len() != EXPECTED_HEADER.len() {
        return Err(SkippedRow::invalid(
            line,
            format!("Expected 3 columns, found {}", record.len()),
        ));
    }

    let town = record[0].trim();
    let region = record[1].trim();
    let raw_count = record[2].trim();

    let site_count: i64 = raw_count.parse().map_err(|_| {
        SkippedRow::invalid(
            line,
            format!("Number_of_Galamsay_Sites '{}' is not a whole number", raw_count),
        )
    })?;

    if site_count < 0 {
        return Err(SkippedRow::invalid(
            line,
            format!("Number_of_Galamsay_Sites must not be negative (got {})", site_count),
        ));
    }

    if town.is_empty() {
        return Err(SkippedRow::invalid(line, "Town is missing"));
    }
    if region.is_empty() {
        return Err(SkippedRow::invalid(line, "Region is missing"));
    }

    Ok(SiteRow {
        line,
        town: town.to_string(),
        region: region.to_string(),
        site_count,
    })
}
