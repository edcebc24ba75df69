//! Decode a delimited text export into a raw Grid. The first line is
//! data like any other and empty lines stay as blank rows; header
//! detection happens later.

use crate::domain::error::{AppError, Result};
use crate::domain::grid::Grid;
use csv::{ReaderBuilder, Trim};
use encoding_rs::{Encoding, WINDOWS_1252};
use std::path::Path;
use tracing::debug;

/// Delimiters tried by auto-detection, in tie-break order
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];
/// Lines sampled for delimiter detection
const SAMPLE_LINES: usize = 20;

#[derive(Default)]
pub struct CsvGridReader {
    /// `None` detects the delimiter from the content
    delimiter: Option<u8>,
}

impl CsvGridReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn parse_file(&self, path: &Path) -> Result<Grid> {
        let bytes = std::fs::read(path).map_err(|e| {
            AppError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        self.parse_bytes(&bytes)
    }

    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Grid> {
        let content = decode_bytes(bytes);
        self.parse_content(&content)
    }

    pub fn parse_content(&self, content: &str) -> Result<Grid> {
        let delimiter = self
            .delimiter
            .unwrap_or_else(|| Self::detect_delimiter(content));

        // The csv reader skips empty lines; they are marked beforehand and
        // restored as blank rows so grid rows keep matching file lines.
        let marked = mark_empty_lines(content, delimiter);
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(marked.as_bytes());

        let mut rows: Vec<Vec<String>> = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;
            if record.iter().all(str::is_empty) {
                rows.push(Vec::new());
            } else {
                rows.push(record.iter().map(|field| field.to_string()).collect());
            }
        }

        debug!(
            rows = rows.len(),
            delimiter = %(delimiter as char).escape_default(),
            "CSV grid parsed"
        );
        Ok(Grid::new(rows))
    }

    /// Pick the delimiter that splits the sampled lines most consistently.
    /// Score is (lines agreeing with the modal field count) x field count.
    pub fn detect_delimiter(content: &str) -> u8 {
        let sample: Vec<&str> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .take(SAMPLE_LINES)
            .collect();

        let mut best = b',';
        let mut best_score = 0usize;

        for &delimiter in &DELIMITER_CANDIDATES {
            let counts: Vec<usize> = sample
                .iter()
                .map(|line| count_unquoted(line, delimiter))
                .collect();

            let Some(modal) = modal_count(&counts) else {
                continue;
            };
            if modal == 0 {
                continue;
            }

            let agreeing = counts.iter().filter(|&&c| c == modal).count();
            let score = agreeing * (modal + 1);
            if score > best_score {
                best_score = score;
                best = delimiter;
            }
        }

        best
    }
}

/// BOM-aware decode; non-UTF-8 input without a BOM is read as Windows-1252
pub fn decode_bytes(bytes: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (decoded, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return decoded.into_owned();
    }

    match std::str::from_utf8(bytes) {
        Ok(content) => content.to_string(),
        Err(_) => {
            let (decoded, _, _) = WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Replaces every empty line outside a quoted field with a lone delimiter.
fn mark_empty_lines(content: &str, delimiter: u8) -> String {
    let mut marked = String::with_capacity(content.len());
    let mut in_quotes = false;
    for line in content.split_inclusive('\n') {
        let body = line.trim_end_matches(['\r', '\n']);
        if !in_quotes && body.is_empty() {
            marked.push(delimiter as char);
        }
        marked.push_str(line);
        if body.matches('"').count() % 2 == 1 {
            in_quotes = !in_quotes;
        }
    }
    marked
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for byte in line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

fn modal_count(counts: &[usize]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for &candidate in counts {
        let freq = counts.iter().filter(|&&c| c == candidate).count();
        match best {
            Some((_, best_freq)) if best_freq >= freq => {}
            _ => best = Some((candidate, freq)),
        }
    }
    best.map(|(count, _)| count)
}
