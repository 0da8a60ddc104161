//! Core domain types for the medlog system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Medicine definitions
//! - Dosages (amount + unit) and their textual form
//! - Dose log entries
//! - Computed next doses

use crate::{Error, Result};
use chrono::{Duration, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

/// Timestamp layout used in the dose log and when displaying times
pub const LOG_TIME_FORMAT: &str = "%m/%d/%Y %H:%M";

// ============================================================================
// Medicine
// ============================================================================

/// A registered medicine profile
#[derive(Clone, Debug, PartialEq)]
pub struct Medicine {
    pub name: String,
    pub standard_dose_amount: f64,
    pub standard_dose_unit: String,
    pub time_between_standard_doses: Duration,
    /// `None` means unlimited
    pub max_standard_doses_per_day: Option<u32>,
    /// `None` means unknown
    pub must_take_with_meal: Option<bool>,
    /// `None` means unknown
    pub must_take_with_water: Option<bool>,
}

impl Medicine {
    /// Create a medicine with no daily cap and unknown meal/water requirements
    pub fn new(
        name: impl Into<String>,
        dose: Dosage,
        time_between_standard_doses: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            standard_dose_amount: dose.amount,
            standard_dose_unit: dose.unit,
            time_between_standard_doses,
            max_standard_doses_per_day: None,
            must_take_with_meal: None,
            must_take_with_water: None,
        }
    }

    /// Storage key for this medicine's name
    pub fn key(&self) -> String {
        crate::registry::storage_key(&self.name)
    }

    /// The standard dose as an `<amount><unit>` string
    pub fn standard_dose(&self) -> String {
        Dosage::new(self.standard_dose_amount, self.standard_dose_unit.clone()).to_string()
    }

    /// Check the record invariants
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("medicine name must not be empty".into()));
        }
        if !self.standard_dose_amount.is_finite() || self.standard_dose_amount < 0.0 {
            return Err(Error::Validation(format!(
                "standard dose amount must be non-negative, got {}",
                self.standard_dose_amount
            )));
        }
        if self.standard_dose_unit.is_empty() {
            return Err(Error::Validation("standard dose unit must not be empty".into()));
        }
        Dosage::new(self.standard_dose_amount, self.standard_dose_unit.clone()).validate()?;
        if self.time_between_standard_doses <= Duration::zero() {
            return Err(Error::Validation(
                "time between standard doses must be positive".into(),
            ));
        }
        if self.max_standard_doses_per_day == Some(0) {
            return Err(Error::Validation(
                "max standard doses per day must be a positive integer".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Dosage
// ============================================================================

/// An amount immediately followed by a unit, e.g. `5mg` or `2.5ml`
#[derive(Clone, Debug, PartialEq)]
pub struct Dosage {
    pub amount: f64,
    pub unit: String,
}

impl Dosage {
    pub fn new(amount: f64, unit: impl Into<String>) -> Self {
        Self {
            amount,
            unit: unit.into(),
        }
    }

    /// Check that the `<amount><unit>` form parses back to this dosage
    ///
    /// Rejects units that would merge into the amount (`2x` after `5`),
    /// units with whitespace, empty units and non-finite amounts.
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_finite() {
            return Err(Error::Validation(format!(
                "dose amount must be a finite number, got {}",
                self.amount
            )));
        }
        match self.to_string().parse::<Dosage>() {
            Ok(parsed) if parsed == *self => Ok(()),
            _ => Err(Error::Validation(format!(
                "{:?} cannot be used as a unit after the amount {}",
                self.unit, self.amount
            ))),
        }
    }
}

impl fmt::Display for Dosage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit)
    }
}

impl FromStr for Dosage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = |reason: &str| {
            Error::MalformedRecord(format!(
                "{:?} is not a dosage ({}); expected a number followed by a unit, e.g. 30ml",
                s, reason
            ))
        };

        let bytes = s.as_bytes();
        let mut end = 0;
        if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
            end = 1;
        }
        let digits_start = end;
        let mut seen_dot = false;
        while end < bytes.len() {
            match bytes[end] {
                b'0'..=b'9' => end += 1,
                b'.' if !seen_dot => {
                    seen_dot = true;
                    end += 1;
                }
                _ => break,
            }
        }

        if !s[digits_start..end].bytes().any(|b| b.is_ascii_digit()) {
            return Err(bad("missing amount"));
        }

        // Optional exponent, only when digits follow: `1e3mg` but `5eq`
        if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
            let mut exp_end = end + 1;
            if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
                exp_end += 1;
            }
            if matches!(bytes.get(exp_end), Some(b) if b.is_ascii_digit()) {
                while matches!(bytes.get(exp_end), Some(b) if b.is_ascii_digit()) {
                    exp_end += 1;
                }
                end = exp_end;
            }
        }

        let amount: f64 = s[..end].parse().map_err(|_| bad("invalid amount"))?;
        if !amount.is_finite() {
            return Err(bad("amount out of range"));
        }

        let unit = &s[end..];
        if unit.is_empty() {
            return Err(bad("missing unit"));
        }
        if unit.starts_with(['.', '+', '-']) {
            return Err(bad("unit must not start with '.', '+' or '-'"));
        }
        if unit.chars().any(char::is_whitespace) {
            return Err(bad("unit must directly follow the amount"));
        }

        Ok(Dosage::new(amount, unit))
    }
}

/// Parse an `H:M` interval (integer hours, decimal minutes), e.g. `1:30.5`
pub fn parse_interval(s: &str) -> Result<Duration> {
    let bad = || {
        Error::MalformedRecord(format!(
            "{:?} is not an interval; expected hours:minutes, e.g. 1:30.5",
            s
        ))
    };

    let (hours, minutes) = s.trim().split_once(':').ok_or_else(bad)?;
    let hours: i64 = hours.parse().map_err(|_| bad())?;
    let minutes: f64 = minutes.parse().map_err(|_| bad())?;
    if !minutes.is_finite() {
        return Err(bad());
    }

    let out_of_range = || Error::MalformedRecord(format!("interval {:?} is out of range", s));
    let micros = (minutes * 60_000_000.0).round();
    if micros.abs() >= i64::MAX as f64 {
        return Err(out_of_range());
    }
    Duration::try_hours(hours)
        .and_then(|h| h.checked_add(&Duration::microseconds(micros as i64)))
        .ok_or_else(out_of_range)
}

// ============================================================================
// Log entries and next doses
// ============================================================================

/// One administered dose
#[derive(Clone, Debug, PartialEq)]
pub struct DoseLogEntry {
    pub medicine: Medicine,
    pub amount: f64,
    pub unit: String,
    pub administered_at: NaiveDateTime,
}

impl DoseLogEntry {
    pub fn dosage(&self) -> Dosage {
        Dosage::new(self.amount, self.unit.clone())
    }
}

/// When the next dose may be taken, and how much
#[derive(Clone, Debug, PartialEq)]
pub struct NextDose {
    pub time: NaiveDateTime,
    pub amount: String,
}

impl NextDose {
    /// Standard dose of `medicine` at `time`
    pub fn standard(medicine: &Medicine, time: NaiveDateTime) -> Self {
        Self {
            time,
            amount: medicine.standard_dose(),
        }
    }
}

impl fmt::Display for NextDose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "next dose: {} at {}",
            self.amount,
            self.time.format(LOG_TIME_FORMAT)
        )
    }
}
