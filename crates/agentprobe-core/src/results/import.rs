//! Test-case import from CSV text.
//!
//! Accepts the loose spreadsheets people export by hand: `;` or `,`
//! delimiters, an optional header row, and quoted or unquoted fields.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use super::TestCase;
use crate::error::AgentProbeError;

fn question_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)pregunta|question|query").expect("static regex"))
}

fn expected_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)esperada|expected|answer|respuesta").expect("static regex"))
}

/// Parse CSV content into test cases.
///
/// - Blank rows are ignored; quoted fields may span lines.
/// - The delimiter is `;` when the first non-blank line contains one, `,`
///   otherwise.
/// - A first row with a column matching `pregunta|question|query` is a header;
///   the expected answer then comes from the first column matching
///   `esperada|expected|answer|respuesta` (empty when there is none).
/// - Without a header, column 0 is the question and column 1 the answer.
pub fn parse_test_cases(content: &str) -> Result<Vec<TestCase>, AgentProbeError> {
    let Some(first) = content.lines().find(|l| !l.trim().is_empty()) else {
        return Ok(Vec::new());
    };
    let delimiter = if first.contains(';') { b';' } else { b',' };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let row: Vec<String> = record?.iter().map(clean_field).collect();
        if row.iter().any(|field| !field.is_empty()) {
            rows.push(row);
        }
    }

    let column = |row: &[String], idx: usize| row.get(idx).cloned().unwrap_or_default();

    let header = rows.first().cloned().unwrap_or_default();
    let question_idx = header.iter().position(|h| question_header().is_match(h));

    let cases = match question_idx {
        None => rows
            .iter()
            .map(|row| TestCase::new(column(row, 0), column(row, 1)))
            .collect(),
        Some(q_idx) => {
            let e_idx = header.iter().position(|h| expected_header().is_match(h));
            rows.iter()
                .skip(1)
                .map(|row| {
                    let expected = e_idx.map(|i| column(row, i)).unwrap_or_default();
                    TestCase::new(column(row, q_idx), expected)
                })
                .collect()
        }
    };

    Ok(cases)
}

/// Read and parse a CSV file of test cases.
pub async fn read_test_cases(path: impl AsRef<Path>) -> Result<Vec<TestCase>, AgentProbeError> {
    let content = tokio::fs::read_to_string(path.as_ref()).await?;
    parse_test_cases(&content)
}

/// Trim a field and drop one pair of stray single quotes around it.
fn clean_field(field: &str) -> String {
    let trimmed = field.trim();
    let trimmed = trimmed.strip_prefix('\'').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('\'').unwrap_or(trimmed);
    trimmed.trim().to_string()
}
