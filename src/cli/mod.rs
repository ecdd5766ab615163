pub mod clarify;
pub mod doctor;
pub mod entry;
pub mod export;
pub mod purge;
pub mod search;
pub mod show;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;

use crate::journal::datetime::parse_date;

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// `--date` value, or today when omitted.
pub fn selected_date(raw: Option<&str>) -> Result<NaiveDate> {
    match raw {
        None => Ok(today()),
        Some(s) => parse_date(s).ok_or_else(|| anyhow!("could not read date \"{s}\"")),
    }
}
