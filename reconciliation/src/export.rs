//! Delimited export of reconciliation records
//!
//! Fixed field order: internal transaction id, external transaction id,
//! internal amount, external amount, status, notes. Fields containing the
//! delimiter, a quote, or a newline are quoted with inner quotes doubled,
//! so the representation parses back losslessly.

use crate::{
    types::{ReconciliationRecord, ReconciliationStatus},
    Error, Result,
};
use rust_decimal::Decimal;
use std::str::FromStr;

const DELIMITER: char = ',';
const QUOTE: char = '"';

/// Header line matching the exported field order
pub const HEADER: &str =
    "internal_transaction_id,external_transaction_id,internal_amount,external_amount,status,notes";

/// Quote a field if it contains the delimiter, a quote, or a newline
fn escape_field(field: &str) -> String {
    if field.contains(DELIMITER) || field.contains(QUOTE) || field.contains('\n') {
        let doubled = field.replace(QUOTE, "\"\"");
        format!("\"{}\"", doubled)
    } else {
        field.to_string()
    }
}

/// Serialize one record to a single line (no trailing newline)
///
/// Absent optional fields are rendered empty, which is distinguishable
/// from a present empty string only when the original never stores empty
/// strings; the store writes `None` instead of `Some("")`.
pub fn format_record(record: &ReconciliationRecord) -> String {
    let internal_amount = record
        .internal_amount
        .map(|a| a.to_string())
        .unwrap_or_default();
    let external_amount = record
        .external_amount
        .map(|a| a.to_string())
        .unwrap_or_default();

    let fields: [&str; 6] = [
        record.internal_transaction_id.as_deref().unwrap_or(""),
        record.external_transaction_id.as_deref().unwrap_or(""),
        &internal_amount,
        &external_amount,
        record.status.as_str(),
        record.notes.as_deref().unwrap_or(""),
    ];

    fields
        .iter()
        .map(|f| escape_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Render a full report body: header plus one line per record
pub fn write_report(records: &[ReconciliationRecord]) -> String {
    let mut out = String::from(HEADER);
    for record in records {
        out.push('\n');
        out.push_str(&format_record(record));
    }
    out
}

/// Split one line into raw fields, undoing the quoting
fn split_line(line: &str) -> Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == QUOTE {
                if chars.peek() == Some(&QUOTE) {
                    chars.next();
                    current.push(QUOTE);
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else if c == QUOTE {
            in_quotes = true;
        } else if c == DELIMITER {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }

    if in_quotes {
        return Err(Error::Other(format!("Unterminated quote in line: {}", line)));
    }

    fields.push(current);
    Ok(fields)
}

fn parse_status(s: &str) -> Result<ReconciliationStatus> {
    match s {
        "MATCHED" => Ok(ReconciliationStatus::Matched),
        "MISSING_INTERNAL" => Ok(ReconciliationStatus::MissingInternal),
        "MISSING_EXTERNAL" => Ok(ReconciliationStatus::MissingExternal),
        "AMOUNT_MISMATCH" => Ok(ReconciliationStatus::AmountMismatch),
        other => Err(Error::Other(format!("Unknown status: {}", other))),
    }
}

fn parse_amount(s: &str) -> Result<Option<Decimal>> {
    if s.is_empty() {
        return Ok(None);
    }
    Decimal::from_str(s)
        .map(Some)
        .map_err(|e| Error::Other(format!("Invalid amount '{}': {}", s, e)))
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Parsed line: the exported subset of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedRecord {
    /// Internal transaction id, when the record had an internal side
    pub internal_transaction_id: Option<String>,

    /// External transaction id, when the record had an external side
    pub external_transaction_id: Option<String>,

    /// Internal amount
    pub internal_amount: Option<Decimal>,

    /// External amount
    pub external_amount: Option<Decimal>,

    /// Match classification
    pub status: ReconciliationStatus,

    /// Discrepancy notes
    pub notes: Option<String>,
}

impl From<&ReconciliationRecord> for ExportedRecord {
    fn from(record: &ReconciliationRecord) -> Self {
        Self {
            internal_transaction_id: record.internal_transaction_id.clone(),
            external_transaction_id: record.external_transaction_id.clone(),
            internal_amount: record.internal_amount,
            external_amount: record.external_amount,
            status: record.status,
            notes: record.notes.clone(),
        }
    }
}

/// Parse one exported line back into its fields
pub fn parse_line(line: &str) -> Result<ExportedRecord> {
    let fields = split_line(line)?;
    if fields.len() != 6 {
        return Err(Error::Other(format!(
            "Expected 6 fields, got {}: {}",
            fields.len(),
            line
        )));
    }

    let mut fields = fields.into_iter();
    // Field order is fixed, same as the header
    let internal_transaction_id = non_empty(fields.next().unwrap_or_default());
    let external_transaction_id = non_empty(fields.next().unwrap_or_default());
    let internal_amount = parse_amount(&fields.next().unwrap_or_default())?;
    let external_amount = parse_amount(&fields.next().unwrap_or_default())?;
    let status = parse_status(&fields.next().unwrap_or_default())?;
    let notes = non_empty(fields.next().unwrap_or_default());

    Ok(ExportedRecord {
        internal_transaction_id,
        external_transaction_id,
        internal_amount,
        external_amount,
        status,
        notes,
    })
}
