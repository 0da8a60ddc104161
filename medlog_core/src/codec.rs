//! Tagged JSON encoding for medicine record files.
//!
//! Every stored object carries a `__DECODE_KEY__` tag naming its type. The set
//! of tags is fixed here:
//!
//! | tag         | type                          |
//! |-------------|-------------------------------|
//! | `Med`       | [`Medicine`] record           |
//! | `timedelta` | duration (days/seconds/µs)    |
//!
//! A record file looks like:
//!
//! ```json
//! {
//!     "__DECODE_KEY__": "Med",
//!     "name": "Aspirin",
//!     "standard_dose_amount": 500.0,
//!     "standard_dose_unit": "mg",
//!     "time_between_standard_doses": {
//!         "__DECODE_KEY__": "timedelta",
//!         "days": 0,
//!         "seconds": 21600,
//!         "microseconds": 0
//!     },
//!     "max_standard_doses_per_day": 4,
//!     "must_take_with_meal": true,
//!     "must_take_with_water": null
//! }
//! ```

use crate::{Error, Medicine, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

const MICROS_PER_SECOND: i64 = 1_000_000;
const SECONDS_PER_DAY: i64 = 86_400;
const MICROS_PER_DAY: i64 = SECONDS_PER_DAY * MICROS_PER_SECOND;

/// Every object type a record file may contain, keyed by its tag
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "__DECODE_KEY__")]
enum StoredRecord {
    #[serde(rename = "Med")]
    Med(MedRecord),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "__DECODE_KEY__")]
enum StoredDuration {
    #[serde(rename = "timedelta")]
    TimeDelta(TimeDelta),
}

#[derive(Debug, Serialize, Deserialize)]
struct MedRecord {
    name: String,
    standard_dose_amount: f64,
    standard_dose_unit: String,
    time_between_standard_doses: StoredDuration,
    #[serde(default)]
    max_standard_doses_per_day: Option<u32>,
    #[serde(default)]
    must_take_with_meal: Option<bool>,
    #[serde(default)]
    must_take_with_water: Option<bool>,
}

/// Duration split into days, seconds and microseconds
///
/// Normalized so that `0 <= seconds < 86400` and `0 <= microseconds < 1_000_000`;
/// only `days` carries the sign.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDelta {
    pub days: i64,
    pub seconds: i64,
    pub microseconds: i64,
}

impl TimeDelta {
    pub fn from_duration(duration: Duration) -> Result<Self> {
        let total = duration.num_microseconds().ok_or_else(|| {
            Error::Validation(format!("duration {} is too large to store", duration))
        })?;

        let days = total.div_euclid(MICROS_PER_DAY);
        let rem = total.rem_euclid(MICROS_PER_DAY);

        Ok(Self {
            days,
            seconds: rem / MICROS_PER_SECOND,
            microseconds: rem % MICROS_PER_SECOND,
        })
    }

    pub fn to_duration(self) -> Result<Duration> {
        let out_of_range = || Error::MalformedRecord(format!("duration {:?} is out of range", self));

        let days = Duration::try_days(self.days).ok_or_else(out_of_range)?;
        let seconds = Duration::try_seconds(self.seconds).ok_or_else(out_of_range)?;
        days.checked_add(&seconds)
            .and_then(|d| d.checked_add(&Duration::microseconds(self.microseconds)))
            .ok_or_else(out_of_range)
    }
}

impl MedRecord {
    fn from_medicine(medicine: &Medicine) -> Result<Self> {
        Ok(Self {
            name: medicine.name.clone(),
            standard_dose_amount: medicine.standard_dose_amount,
            standard_dose_unit: medicine.standard_dose_unit.clone(),
            time_between_standard_doses: StoredDuration::TimeDelta(TimeDelta::from_duration(
                medicine.time_between_standard_doses,
            )?),
            max_standard_doses_per_day: medicine.max_standard_doses_per_day,
            must_take_with_meal: medicine.must_take_with_meal,
            must_take_with_water: medicine.must_take_with_water,
        })
    }

    fn into_medicine(self) -> Result<Medicine> {
        let StoredDuration::TimeDelta(delta) = self.time_between_standard_doses;
        Ok(Medicine {
            name: self.name,
            standard_dose_amount: self.standard_dose_amount,
            standard_dose_unit: self.standard_dose_unit,
            time_between_standard_doses: delta.to_duration()?,
            max_standard_doses_per_day: self.max_standard_doses_per_day,
            must_take_with_meal: self.must_take_with_meal,
            must_take_with_water: self.must_take_with_water,
        })
    }
}

/// Encode a medicine as a pretty-printed record (4-space indent)
pub fn encode_medicine(medicine: &Medicine) -> Result<String> {
    let record = StoredRecord::Med(MedRecord::from_medicine(medicine)?);

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    record.serialize(&mut ser)?;

    String::from_utf8(buf).map_err(|e| Error::MalformedRecord(e.to_string()))
}

/// Decode a record file's contents into a medicine
pub fn decode_medicine(contents: &str) -> Result<Medicine> {
    let record: StoredRecord = serde_json::from_str(contents)
        .map_err(|e| Error::MalformedRecord(format!("not a medicine record: {}", e)))?;

    match record {
        StoredRecord::Med(med) => med.into_medicine(),
    }
}
