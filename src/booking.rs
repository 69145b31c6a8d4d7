//! Bookings and the window of dates they can be viewed for

use std::convert::TryFrom;
use std::fmt::{Display, Formatter};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;


/// A reservation of a rectangle of the (court x time slot) grid.
///
/// `court` and `slot` are 1-based and locate the top-left corner of the rectangle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub court: u32,
    pub court_span: u32,
    pub slot: u32,
    pub slot_span: u32,
    pub name: String,
}

impl Booking {
    pub fn new<S: ToString>(court: u32, court_span: u32, slot: u32, slot_span: u32, name: S) -> Self {
        Self { court, court_span, slot, slot_span, name: name.to_string() }
    }

    /// A single court for a single time slot
    pub fn single<S: ToString>(court: u32, slot: u32, name: S) -> Self {
        Self::new(court, 1, slot, 1, name)
    }

    pub fn is_block_booking(&self) -> bool {
        self.court_span != 1 || self.slot_span != 1
    }

    /// Whether this booking lies completely inside a grid of the given size
    pub fn fits_in(&self, time_slot_count: usize, court_count: usize) -> bool {
        if self.court == 0 || self.slot == 0 || self.court_span == 0 || self.slot_span == 0 {
            return false;
        }
        let last_court = self.court as u64 + self.court_span as u64 - 1;
        let last_slot = self.slot as u64 + self.slot_span as u64 - 1;
        last_court <= court_count as u64 && last_slot <= time_slot_count as u64
    }
}

impl Display for Booking {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} (court {}x{}, slot {}x{})", self.name, self.court, self.court_span, self.slot, self.slot_span)
    }
}


/// The ascending list of dates the backend currently allows to view or mutate.
///
/// This is never empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<NaiveDate>", into = "Vec<NaiveDate>")]
pub struct ValidDates {
    dates: Vec<NaiveDate>,
}

impl ValidDates {
    pub fn new(mut dates: Vec<NaiveDate>) -> Result<Self, FetchError> {
        if dates.is_empty() {
            return Err(FetchError::Malformed("the list of valid dates is empty".to_string()));
        }
        dates.sort();
        dates.dedup();
        Ok(Self { dates })
    }

    pub fn as_slice(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.dates.binary_search(date).is_ok()
    }

    pub fn position(&self, date: &NaiveDate) -> Option<usize> {
        self.dates.binary_search(date).ok()
    }

    pub fn earliest(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn latest(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    /// The date to view: `remembered` if it still is valid, the earliest date otherwise
    pub fn choose_selection(&self, remembered: Option<NaiveDate>) -> NaiveDate {
        match remembered {
            Some(date) if self.contains(&date) => date,
            _ => self.earliest(),
        }
    }

    /// Move `step` positions away from `from`, clamping to the bounds of the window.
    ///
    /// Returns `None` if `from` is not a valid date.
    pub fn stepped(&self, from: &NaiveDate, step: i64) -> Option<NaiveDate> {
        let index = self.position(from)? as i64;
        let last = (self.dates.len() - 1) as i64;
        let new_index = (index + step).max(0).min(last);
        Some(self.dates[new_index as usize])
    }
}

impl TryFrom<Vec<NaiveDate>> for ValidDates {
    type Error = FetchError;

    fn try_from(dates: Vec<NaiveDate>) -> Result<Self, Self::Error> {
        Self::new(dates)
    }
}

impl From<ValidDates> for Vec<NaiveDate> {
    fn from(valid: ValidDates) -> Self {
        valid.dates
    }
}


/// The JSON document that carries the valid dates, e.g. `{"dates": ["2016-04-23", "2016-04-24"]}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidDatesDocument {
    pub dates: ValidDates,
}

/// The JSON document that carries the bookings of a day, e.g. `{"date": "2016-04-23", "bookings": [...]}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookingsDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub bookings: Vec<Booking>,
}
