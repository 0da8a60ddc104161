//! Append-only dose log.
//!
//! One administered dose per line, in the layout
//!
//! ```text
//! <MM/DD/YYYY> <HH:MM> <medicine name> <amount><unit>
//! 03/14/2024 08:30 Cough Syrup 30ml
//! ```
//!
//! The medicine name may contain spaces; it is every token between the time
//! and the trailing dosage token. Entries for all medicines are interleaved
//! and append order is taken as chronological order.

use crate::types::LOG_TIME_FORMAT;
use crate::{Dosage, DoseLogEntry, Error, MedRegistry, Medicine, Result};
use chrono::{Local, NaiveDateTime, Timelike};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Lines, Write};
use std::iter::Enumerate;
use std::path::{Path, PathBuf};

/// What to do with a line that does not match the log layout
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Yield the parse error for the line
    #[default]
    Strict,
    /// Log a warning and move on to the next line
    SkipMalformed,
}

/// A log line split into its fields, before the medicine is resolved
#[derive(Clone, Debug, PartialEq)]
pub struct LogLine {
    pub administered_at: NaiveDateTime,
    pub medicine_name: String,
    pub dosage: Dosage,
}

/// A parsed entry together with the text it came from
#[derive(Clone, Debug)]
pub struct LogRecord {
    /// 1-based line number in the log file
    pub line: usize,
    pub text: String,
    pub entry: DoseLogEntry,
}

/// Render an entry as a log line (without the trailing newline)
pub fn format_line(entry: &DoseLogEntry) -> String {
    format!(
        "{} {} {}",
        entry.administered_at.format(LOG_TIME_FORMAT),
        entry.medicine.name,
        entry.dosage()
    )
}

/// Split a log line into its fields
pub fn parse_line(line: &str) -> std::result::Result<LogLine, String> {
    let words: Vec<&str> = line.split(' ').collect();
    if words.len() < 4 {
        return Err(format!(
            "expected \"<date> <time> <medicine> <dosage>\", got {:?}",
            line
        ));
    }

    let stamp = format!("{} {}", words[0], words[1]);
    let administered_at = NaiveDateTime::parse_from_str(&stamp, LOG_TIME_FORMAT)
        .map_err(|e| format!("bad timestamp {:?}: {}", stamp, e))?;

    let medicine_name = words[2..words.len() - 1].join(" ");
    if medicine_name.trim().is_empty() {
        return Err("missing medicine name".into());
    }

    let dosage: Dosage = words[words.len() - 1]
        .parse()
        .map_err(|e: Error| e.to_string())?;

    Ok(LogLine {
        administered_at,
        medicine_name,
        dosage,
    })
}

/// The dose log file
#[derive(Clone, Debug)]
pub struct DoseLog {
    path: PathBuf,
    policy: ReadPolicy,
}

impl DoseLog {
    /// Create a log handle for `path` with the strict read policy
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            policy: ReadPolicy::Strict,
        }
    }

    pub fn with_policy(mut self, policy: ReadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a line
    ///
    /// Entries whose line would not parse back to the same name and dosage
    /// are rejected with [`Error::Validation`] before the file is touched.
    pub fn append(&self, entry: &DoseLogEntry) -> Result<()> {
        entry.dosage().validate()?;
        if entry.medicine.name.contains(['\n', '\r']) {
            return Err(Error::Validation(format!(
                "medicine name {:?} must fit on one log line",
                entry.medicine.name
            )));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        writer.write_all(format_line(entry).as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!(
            "Appended {} dose of {:?} to {:?}",
            entry.dosage(),
            entry.medicine.name,
            self.path
        );
        Ok(())
    }

    /// Lazily read every record in file order
    ///
    /// A missing log file reads as empty. Medicines are resolved through
    /// `registry`; an unregistered name yields [`Error::NotFound`].
    pub fn records<'a>(&self, registry: &'a MedRegistry) -> Result<LogRecords<'a>> {
        let lines = match File::open(&self.path) {
            Ok(file) => {
                file.lock_shared()?;
                Some(BufReader::new(file).lines().enumerate())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No dose log at {:?}", self.path);
                None
            }
            Err(e) => return Err(e.into()),
        };

        Ok(LogRecords {
            lines,
            registry,
            policy: self.policy,
        })
    }

    /// Lazily read every entry in file order
    pub fn entries<'a>(
        &self,
        registry: &'a MedRegistry,
    ) -> Result<impl Iterator<Item = Result<DoseLogEntry>> + 'a> {
        Ok(self
            .records(registry)?
            .map(|record| record.map(|r| r.entry)))
    }
}

/// Iterator over the records of a dose log
///
/// Holds a shared lock on the log file until dropped.
pub struct LogRecords<'a> {
    lines: Option<Enumerate<Lines<BufReader<File>>>>,
    registry: &'a MedRegistry,
    policy: ReadPolicy,
}

impl LogRecords<'_> {
    fn resolve(&self, line: usize, text: String) -> Result<LogRecord> {
        let fields =
            parse_line(&text).map_err(|reason| Error::MalformedLine { line, reason })?;
        let medicine = self.registry.get(&fields.medicine_name)?;

        Ok(LogRecord {
            line,
            text,
            entry: DoseLogEntry {
                medicine,
                amount: fields.dosage.amount,
                unit: fields.dosage.unit,
                administered_at: fields.administered_at,
            },
        })
    }
}

impl Iterator for LogRecords<'_> {
    type Item = Result<LogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (index, line) = self.lines.as_mut()?.next()?;
            let text = match line {
                Ok(text) => text.trim_end_matches('\r').to_string(),
                Err(e) => return Some(Err(e.into())),
            };
            if text.trim().is_empty() {
                continue;
            }

            match self.resolve(index + 1, text) {
                Err(Error::MalformedLine { line, reason })
                    if self.policy == ReadPolicy::SkipMalformed =>
                {
                    tracing::warn!("Skipping log line {}: {}", line, reason);
                }
                result => return Some(result),
            }
        }
    }
}

/// Log a dose, filling unspecified fields from the medicine's standard dose
///
/// The timestamp defaults to now and is truncated to the minute, the
/// precision of the log layout.
pub fn log_dose(
    log: &DoseLog,
    medicine: &Medicine,
    amount: Option<f64>,
    unit: Option<String>,
    administered_at: Option<NaiveDateTime>,
) -> Result<DoseLogEntry> {
    let amount = amount.unwrap_or(medicine.standard_dose_amount);
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::Validation(format!(
            "dose amount must be non-negative, got {}",
            amount
        )));
    }

    let administered_at = administered_at.unwrap_or_else(|| Local::now().naive_local());
    let entry = DoseLogEntry {
        medicine: medicine.clone(),
        amount,
        unit: unit.unwrap_or_else(|| medicine.standard_dose_unit.clone()),
        administered_at: truncate_to_minute(administered_at),
    };

    log.append(&entry)?;
    tracing::info!("Logged {} of {:?}", entry.dosage(), medicine.name);
    Ok(entry)
}

fn truncate_to_minute(t: NaiveDateTime) -> NaiveDateTime {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}
