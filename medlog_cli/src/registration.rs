//! Building a medicine record from prompts, for names `log --interactive`
//! could not find.

use crate::prompt::Prompter;
use chrono::Duration;
use medlog_core::{parse_interval, Dosage, Error, Medicine, Result};
use std::io::{BufRead, Write};

pub const DOSAGE_HELP: &str = "Format must be a number followed by a unit.\nExample: 30ml";

const INTERVAL_HELP: &str = "Format must be hours:minutes.\nExample: 4:30";

const MAX_PER_DAY_HELP: &str = "Enter a positive whole number, or leave blank for no limit.";

/// Ask for the standard dose, interval, daily cap and meal/water
/// requirements of `name`
///
/// The dose and interval are required; input ending before they are given
/// cancels with [`Error::Validation`]. Everything else may be left blank.
pub fn ask_medicine<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    name: &str,
) -> Result<Medicine> {
    let cancelled = || Error::Validation(format!("registration of {:?} cancelled", name));

    let dose = prompter
        .required("Standard dosage: ", DOSAGE_HELP, parse_dosage)?
        .ok_or_else(cancelled)?;

    let interval = prompter
        .required(
            "Time between standard doses (hours:minutes): ",
            INTERVAL_HELP,
            |s| {
                parse_interval(s).and_then(|d| {
                    if d > Duration::zero() {
                        Ok(d)
                    } else {
                        Err(Error::Validation(format!("{:?} is not a positive interval.", s)))
                    }
                })
            },
        )?
        .ok_or_else(cancelled)?;

    let max_per_day = prompter.parsed(
        "Maximum standard doses per day (optional): ",
        MAX_PER_DAY_HELP,
        |s| match s.parse::<u32>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(format!("{:?} is not valid.", s)),
        },
    )?;

    let mut medicine = Medicine::new(name, dose, interval);
    medicine.max_standard_doses_per_day = max_per_day;
    medicine.must_take_with_meal = requirement(prompter, "Should this be taken with a meal")?;
    medicine.must_take_with_water = requirement(prompter, "Should this be taken with water")?;
    medicine.validate()?;
    Ok(medicine)
}

/// A non-negative dosage whose unit reads back from the log
pub fn parse_dosage(s: &str) -> Result<Dosage> {
    let dosage: Dosage = s.parse()?;
    if dosage.amount < 0.0 {
        return Err(Error::Validation(format!("{:?} is not valid.", s)));
    }
    dosage.validate()?;
    Ok(dosage)
}

/// `yes`, `no`, or unknown (`?` or blank)
fn requirement<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    question: &str,
) -> Result<Option<bool>> {
    Ok(match prompter.select(question, &["yes", "no", "?"], true)?.as_deref() {
        Some("yes") => Some(true),
        Some("no") => Some(false),
        _ => None,
    })
}
