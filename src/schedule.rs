//! The courts and time slots that make up the booking grid

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

const DEFAULT_COURT_COUNT: u32 = 5;
const DEFAULT_TIME_SLOT_COUNT: u32 = 16;
const DEFAULT_SLOT_MINUTES: i64 = 45;

/// The rows (time slots) and columns (courts) of the booking grid
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    court_numbers: Vec<u32>,
    time_slots: Vec<NaiveTime>,
}

impl Schedule {
    /// `time_slot_count` slots, every `slot_minutes` minutes from `first_slot`
    pub fn new(court_count: u32, time_slot_count: u32, first_slot: NaiveTime, slot_minutes: i64) -> Self {
        let court_numbers = (1..=court_count).collect();
        let time_slots = (0..time_slot_count)
            .map(|i| first_slot + Duration::minutes(slot_minutes * i as i64))
            .collect();
        Self { court_numbers, time_slots }
    }

    /// e.g. `[1, 2, 3, 4, 5]`
    pub fn court_numbers(&self) -> &[u32] {
        &self.court_numbers
    }

    pub fn time_slots(&self) -> &[NaiveTime] {
        &self.time_slots
    }

    pub fn court_count(&self) -> usize {
        self.court_numbers.len()
    }

    pub fn time_slot_count(&self) -> usize {
        self.time_slots.len()
    }

    /// e.g. "10:00 AM", or "9:15 PM"
    pub fn time_slot_label(&self, slot_index: usize) -> Option<String> {
        self.time_slots.get(slot_index).map(|t| t.format("%-I:%M %p").to_string())
    }

    pub fn time_slot_labels(&self) -> Vec<String> {
        (0..self.time_slots.len())
            .filter_map(|i| self.time_slot_label(i))
            .collect()
    }
}

impl Default for Schedule {
    /// Five courts, with sixteen 45-minute slots from 10:00 AM
    fn default() -> Self {
        Self::new(
            DEFAULT_COURT_COUNT,
            DEFAULT_TIME_SLOT_COUNT,
            NaiveTime::from_hms(10, 0, 0),
            DEFAULT_SLOT_MINUTES,
        )
    }
}
