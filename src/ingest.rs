//! Ingestion of upstream placement records.
//!
//! Records arrive as loosely typed JSON so one bad entry cannot fail the
//! batch: anything that is not an array of eight finite numbers describing a
//! valid package is skipped and counted.

use std::collections::HashSet;

use serde_json::Value;
use tracing::warn;

use crate::model::{Package, PackageRecord, ValidationError};

/// Number of fields in one record.
pub const RECORD_LEN: usize = 8;

/// Packages parsed from one batch, in input order.
#[derive(Clone, Debug, Default)]
pub struct ParsedBatch {
    pub packages: Vec<Package>,
    pub malformed: usize,
}

/// Parses one JSON record into the fixed tuple.
pub fn parse_record(raw: &Value) -> Result<PackageRecord, ValidationError> {
    let fields = raw.as_array().ok_or_else(|| {
        ValidationError::InvalidDimension("Record must be an array".to_string())
    })?;
    if fields.len() != RECORD_LEN {
        return Err(ValidationError::InvalidDimension(format!(
            "Record must have {} fields, got {}",
            RECORD_LEN,
            fields.len()
        )));
    }

    let mut values = [0.0; RECORD_LEN];
    for (slot, field) in values.iter_mut().zip(fields) {
        *slot = field.as_f64().filter(|v| v.is_finite()).ok_or_else(|| {
            ValidationError::InvalidDimension(format!("Field is not a finite number: {}", field))
        })?;
    }
    Ok(PackageRecord::from(values))
}

/// Parses a batch, dropping malformed records and repeated ids.
///
/// The first record with a given id wins; later duplicates count as malformed.
pub fn parse_batch(raw_records: &[Value]) -> ParsedBatch {
    let mut batch = ParsedBatch::default();
    let mut seen = HashSet::new();

    for (index, raw) in raw_records.iter().enumerate() {
        let package = match parse_record(raw).and_then(PackageRecord::into_package) {
            Ok(package) => package,
            Err(err) => {
                warn!(index, %err, "skipping malformed record");
                batch.malformed += 1;
                continue;
            }
        };
        if !seen.insert(package.id) {
            warn!(index, id = package.id, "skipping record with duplicate id");
            batch.malformed += 1;
            continue;
        }
        batch.packages.push(package);
    }

    batch
}
