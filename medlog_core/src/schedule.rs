//! Next-dose scheduling.
//!
//! ## Rules
//!
//! 1. **No history**: the standard dose, now.
//! 2. **Interval**: the standard dose at `last + interval`, never earlier
//!    than now.
//! 3. **Daily cap** (when `max_standard_doses_per_day = N` and at least `N`
//!    doses are logged): the dose is also held until 24 hours after the
//!    N-th most recent dose, whichever of the two times is later.
//!
//! The cap is checked against the N-th most recent dose only, not a sliding
//! window over every dose.

use crate::{DoseLog, DoseLogEntry, Error, MedRegistry, Medicine, NextDose, Result};
use chrono::{Duration, Local, NaiveDateTime};
use std::collections::VecDeque;

/// Window the daily cap applies to
pub const CAP_WINDOW_HOURS: i64 = 24;

/// Compute the next dose of `medicine` using the local clock
pub fn next_dose(medicine: &Medicine, log: &DoseLog, registry: &MedRegistry) -> Result<NextDose> {
    next_dose_at(medicine, log, registry, Local::now().naive_local())
}

/// Compute the next dose of `medicine` as of `now`
///
/// Log entries are matched to the medicine by storage key, so records read
/// back from disk match the registered medicine regardless of case.
pub fn next_dose_at(
    medicine: &Medicine,
    log: &DoseLog,
    registry: &MedRegistry,
    now: NaiveDateTime,
) -> Result<NextDose> {
    let key = medicine.key();
    let keep = medicine.max_standard_doses_per_day.unwrap_or(1).max(1) as usize;

    // Only the most recent `keep` matching entries are needed
    let mut recent: VecDeque<DoseLogEntry> = VecDeque::with_capacity(keep);
    let mut matched = 0usize;

    for entry in log.entries(registry)? {
        let entry = entry?;
        if entry.medicine.key() != key {
            continue;
        }
        matched += 1;
        if recent.len() == keep {
            recent.pop_front();
        }
        recent.push_back(entry);
    }

    tracing::debug!("Found {} logged doses of {:?}", matched, medicine.name);

    let Some(last) = recent.back() else {
        return Ok(NextDose::standard(medicine, now));
    };

    let after_interval = later_by(
        last.administered_at,
        medicine.time_between_standard_doses,
        medicine,
    )?;
    let by_interval = NextDose::standard(medicine, after_interval.max(now));

    let cap = match medicine.max_standard_doses_per_day {
        Some(cap) if matched >= cap as usize => cap as usize,
        _ => return Ok(by_interval),
    };

    // `recent` holds exactly `cap` entries here; the front is the cap-th most recent
    let cap_time = later_by(
        recent[recent.len() - cap].administered_at,
        Duration::hours(CAP_WINDOW_HOURS),
        medicine,
    )?;
    if cap_time > by_interval.time {
        tracing::info!(
            "Daily cap of {} reached for {:?}; next dose held until {}",
            cap,
            medicine.name,
            cap_time
        );
        Ok(NextDose::standard(medicine, cap_time))
    } else {
        Ok(by_interval)
    }
}

fn later_by(time: NaiveDateTime, delta: Duration, medicine: &Medicine) -> Result<NaiveDateTime> {
    time.checked_add_signed(delta).ok_or_else(|| {
        Error::Validation(format!(
            "next dose of {:?} falls outside the supported calendar ({} + {})",
            medicine.name, time, delta
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{log_dose, Dosage, Error};
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn capped(name: &str, cap: Option<u32>) -> Medicine {
        let mut med = Medicine::new(name, Dosage::new(500.0, "mg"), Duration::hours(6));
        med.max_standard_doses_per_day = cap;
        med
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        registry: MedRegistry,
        log: DoseLog,
    }

    fn setup(meds: &[&Medicine]) -> Fixture {
        let temp_dir = tempfile::tempdir().unwrap();
        let meds_dir = temp_dir.path().join("meds");
        std::fs::create_dir_all(&meds_dir).unwrap();

        let registry = MedRegistry::new(&meds_dir);
        for med in meds {
            registry.register(med).unwrap();
        }
        let log = DoseLog::new(temp_dir.path().join("med.log"));

        Fixture {
            _dir: temp_dir,
            registry,
            log,
        }
    }

    fn dose(f: &Fixture, med: &Medicine, time: NaiveDateTime) {
        log_dose(&f.log, med, None, None, Some(time)).unwrap();
    }

    #[test]
    fn test_no_history_is_now() {
        let med = capped("Ibuprofen", Some(2));
        let f = setup(&[&med]);
        let now = at(14, 8, 0);

        let next = next_dose_at(&med, &f.log, &f.registry, now).unwrap();
        assert_eq!(next.time, now);
        assert_eq!(next.amount, "500mg");
    }

    #[test]
    fn test_sub_cap_uses_interval() {
        let med = capped("Ibuprofen", Some(2));
        let f = setup(&[&med]);
        dose(&f, &med, at(14, 8, 0));

        let next = next_dose_at(&med, &f.log, &f.registry, at(14, 8, 5)).unwrap();
        assert_eq!(next.time, at(14, 14, 0));
        assert_eq!(next.amount, "500mg");
    }

    #[test]
    fn test_cap_reached_holds_until_next_day() {
        let med = capped("Ibuprofen", Some(2));
        let f = setup(&[&med]);
        dose(&f, &med, at(14, 8, 0));
        dose(&f, &med, at(14, 14, 0));

        let next = next_dose_at(&med, &f.log, &f.registry, at(14, 14, 5)).unwrap();
        assert_eq!(next.time, at(15, 8, 0));
        assert_eq!(next.amount, "500mg");
    }

    #[test]
    fn test_cap_reached_but_interval_later() {
        let med = capped("Ibuprofen", Some(2));
        let f = setup(&[&med]);
        dose(&f, &med, at(14, 8, 0));
        dose(&f, &med, at(15, 7, 0));

        let next = next_dose_at(&med, &f.log, &f.registry, at(15, 7, 10)).unwrap();
        assert_eq!(next.time, at(15, 13, 0));
    }

    #[test]
    fn test_cap_uses_nth_most_recent_entry() {
        let med = capped("Ibuprofen", Some(2));
        let f = setup(&[&med]);
        dose(&f, &med, at(13, 6, 0));
        dose(&f, &med, at(14, 8, 0));
        dose(&f, &med, at(14, 14, 0));

        // 2nd most recent is 14th 08:00, not the oldest entry
        let next = next_dose_at(&med, &f.log, &f.registry, at(14, 14, 5)).unwrap();
        assert_eq!(next.time, at(15, 8, 0));
    }

    #[test]
    fn test_uncapped_uses_interval() {
        let med = capped("Aspirin", None);
        let f = setup(&[&med]);
        dose(&f, &med, at(14, 8, 0));
        dose(&f, &med, at(14, 14, 0));
        dose(&f, &med, at(14, 20, 0));

        let next = next_dose_at(&med, &f.log, &f.registry, at(14, 20, 1)).unwrap();
        assert_eq!(next.time, at(15, 2, 0));
    }

    #[test]
    fn test_never_earlier_than_now() {
        let med = capped("Ibuprofen", Some(2));
        let f = setup(&[&med]);
        dose(&f, &med, at(1, 8, 0));
        dose(&f, &med, at(1, 14, 0));

        let now = at(20, 9, 0);
        let next = next_dose_at(&med, &f.log, &f.registry, now).unwrap();
        assert_eq!(next.time, now);
    }

    #[test]
    fn test_other_medicines_ignored() {
        let ibuprofen = capped("Ibuprofen", Some(2));
        let aspirin = capped("Aspirin", None);
        let f = setup(&[&ibuprofen, &aspirin]);
        dose(&f, &ibuprofen, at(14, 8, 0));
        dose(&f, &aspirin, at(14, 10, 0));
        dose(&f, &aspirin, at(14, 12, 0));

        let next = next_dose_at(&ibuprofen, &f.log, &f.registry, at(14, 12, 5)).unwrap();
        assert_eq!(next.time, at(14, 14, 0));
    }

    #[test]
    fn test_interval_past_calendar_end_is_an_error() {
        let interval = crate::parse_interval("2300000000:00").unwrap();
        let med = Medicine::new("Depot Shot", Dosage::new(1.0, "ml"), interval);
        assert!(med.validate().is_ok());

        let f = setup(&[&med]);
        dose(&f, &med, at(14, 8, 0));

        let result = next_dose_at(&med, &f.log, &f.registry, at(14, 9, 0));
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_lookup_failure_propagates() {
        let med = capped("Ibuprofen", Some(2));
        let f = setup(&[&med]);
        std::fs::write(f.log.path(), "03/14/2024 08:00 Unknown 1tab\n").unwrap();

        let result = next_dose_at(&med, &f.log, &f.registry, at(14, 9, 0));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
