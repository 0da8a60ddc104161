//! Filtered views of the dose log.

use crate::dose_log::LogRecord;
use crate::fuzzy::casefold;
use crate::{DoseLog, MedRegistry, Medicine, Result};
use std::io::Write;

/// Whether `record` belongs to one of `medicines`
///
/// An empty list keeps everything. With `ignore_case` names are compared
/// case-folded; otherwise the whole medicine record must be equal.
fn is_selected(medicines: &[Medicine], record: &LogRecord, ignore_case: bool) -> bool {
    if medicines.is_empty() {
        return true;
    }

    let logged = &record.entry.medicine;
    if ignore_case {
        let name = casefold(&logged.name);
        medicines.iter().any(|m| casefold(&m.name) == name)
    } else {
        medicines.iter().any(|m| m == logged)
    }
}

/// Log records for `medicines`, in file order
pub fn filter_entries(
    medicines: &[Medicine],
    log: &DoseLog,
    registry: &MedRegistry,
    ignore_case: bool,
) -> Result<Vec<LogRecord>> {
    let mut kept = Vec::new();
    for record in log.records(registry)? {
        let record = record?;
        if is_selected(medicines, &record, ignore_case) {
            kept.push(record);
        }
    }
    Ok(kept)
}

/// Write the log lines for `medicines` to `out`, in file order
///
/// Lines are written as they appear in the log. Returns the number written.
pub fn print_filtered<W: Write>(
    medicines: &[Medicine],
    log: &DoseLog,
    registry: &MedRegistry,
    ignore_case: bool,
    out: &mut W,
) -> Result<usize> {
    let mut written = 0;
    for record in log.records(registry)? {
        let record = record?;
        if is_selected(medicines, &record, ignore_case) {
            writeln!(out, "{}", record.text)?;
            written += 1;
        }
    }

    tracing::debug!("Printed {} log lines", written);
    Ok(written)
}
