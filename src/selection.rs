//! What a click on a cell of the grid hands over to the reservation and cancellation forms

use chrono::NaiveDate;
use serde::Serialize;

/// Which form a selected cell leads to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionTarget {
    /// The court is free
    Reservation,
    /// The cell is the top-left cell of a booking
    Cancellation,
}

/// A cell of the grid picked by the user.
///
/// This carries everything the next form needs, including the date, which should also be given
/// back to the next [`BookingView`](crate::BookingView) so that it reopens on the same day.
#[derive(Clone, Debug, PartialEq)]
pub struct CellSelection {
    pub date: NaiveDate,
    pub court: u32,
    pub court_span: u32,
    /// 0-based
    pub slot_index: usize,
    pub slot_span: u32,
    /// e.g. "10:45 AM"
    pub slot_label: String,
    /// The players of the booking, for cancellations
    pub name: Option<String>,
    pub target: SelectionTarget,
}

impl CellSelection {
    /// The 1-based slot number, as the backend counts them
    pub fn slot(&self) -> u32 {
        self.slot_index as u32 + 1
    }
}


/// A request to book one or more courts
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub court: u32,
    pub court_span: u32,
    pub slot: u32,
    pub slot_span: u32,
    #[serde(rename = "player1name")]
    pub player1: String,
    #[serde(rename = "player2name")]
    pub player2: String,
    pub date: NaiveDate,
    pub password: String,
}

impl Reservation {
    /// Book the selected court for a single slot
    pub fn from_selection<S: ToString, T: ToString, U: ToString>(selection: &CellSelection, player1: S, player2: T, password: U) -> Self {
        Self {
            court: selection.court,
            court_span: 1,
            slot: selection.slot(),
            slot_span: 1,
            player1: player1.to_string(),
            player2: player2.to_string(),
            date: selection.date,
            password: password.to_string(),
        }
    }

    /// Turn this into a block booking (which requires the user to be logged in)
    pub fn with_spans(self, court_span: u32, slot_span: u32) -> Self {
        Self { court_span: court_span.max(1), slot_span: slot_span.max(1), ..self }
    }
}

/// A request to cancel an existing booking
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    pub court: u32,
    pub court_span: u32,
    pub slot: u32,
    pub slot_span: u32,
    pub players: String,
    pub date: NaiveDate,
    pub password: String,
}

impl Cancellation {
    /// Returns `None` if the selected cell is not a booking
    pub fn from_selection<S: ToString>(selection: &CellSelection, password: S) -> Option<Self> {
        if selection.target != SelectionTarget::Cancellation {
            return None;
        }
        let players = selection.name.clone()?;
        Some(Self {
            court: selection.court,
            court_span: selection.court_span,
            slot: selection.slot(),
            slot_span: selection.slot_span,
            players,
            date: selection.date,
            password: password.to_string(),
        })
    }
}
