//! Projection of a list of bookings onto the (time slot x court) grid
//!
//! Each booking is rendered as one merged cell: the cell at its top-left corner (its "anchor")
//! spans the whole rectangle, and every other cell of the rectangle is an "interior" cell that
//! must not be rendered at all.

use crate::booking::Booking;

const RESERVE_TEXT: &str = "Reserve";

/// How a single cell of the grid must be rendered
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CellAttributes {
    Unbooked,
    /// The top-left cell of a booking
    Anchor { row_span: u32, col_span: u32, name: String },
    /// Covered by the anchor of a booking
    Interior,
}

impl Default for CellAttributes {
    fn default() -> Self {
        Self::Unbooked
    }
}

/// The rendering attributes of every cell, indexed by `[slot_index][court_index]` (0-based)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GridAttributes {
    cells: Vec<Vec<CellAttributes>>,
}

/// Compute the rendering attributes of a `time_slot_count` x `court_count` grid.
///
/// Anchors take precedence over interior marks whatever the order of `bookings`. Two bookings
/// anchored on the same cell cannot both be shown: the first one is kept.
/// Bookings that do not fit in the grid are skipped.
pub fn project(bookings: &[Booking], time_slot_count: usize, court_count: usize) -> GridAttributes {
    let mut cells = vec![vec![CellAttributes::Unbooked; court_count]; time_slot_count];

    for booking in bookings {
        if booking.fits_in(time_slot_count, court_count) == false {
            log::warn!("Booking {} does not fit in a {}x{} grid. Ignoring it", booking, time_slot_count, court_count);
            continue;
        }
        let slot_index = (booking.slot - 1) as usize;
        let court_index = (booking.court - 1) as usize;

        if let CellAttributes::Anchor{ name, .. } = &cells[slot_index][court_index] {
            log::warn!("Booking {} overlaps the booking of {}. Ignoring it", booking, name);
            continue;
        }

        for slot_offset in 0..booking.slot_span as usize {
            for court_offset in 0..booking.court_span as usize {
                let cell = &mut cells[slot_index + slot_offset][court_index + court_offset];
                if matches!(cell, CellAttributes::Anchor{ .. }) {
                    log::warn!("Booking {} covers the anchor of another booking", booking);
                } else {
                    *cell = CellAttributes::Interior;
                }
            }
        }

        cells[slot_index][court_index] = CellAttributes::Anchor {
            row_span: booking.slot_span,
            col_span: booking.court_span,
            name: booking.name.clone(),
        };
    }

    GridAttributes { cells }
}

impl GridAttributes {
    pub fn time_slot_count(&self) -> usize {
        self.cells.len()
    }

    pub fn court_count(&self) -> usize {
        self.cells.get(0).map(|row| row.len()).unwrap_or(0)
    }

    pub fn cell(&self, slot_index: usize, court_index: usize) -> Option<&CellAttributes> {
        self.cells.get(slot_index)?.get(court_index)
    }

    pub fn rows(&self) -> &[Vec<CellAttributes>] {
        &self.cells
    }

    /// Whether this cell is the top-left cell of a booking
    pub fn is_anchor(&self, slot_index: usize, court_index: usize) -> bool {
        matches!(self.cell(slot_index, court_index), Some(CellAttributes::Anchor{ .. }))
    }

    /// Whether this cell is the anchor of a booking that spans more than one court or slot
    pub fn is_block_booking(&self, slot_index: usize, court_index: usize) -> bool {
        match self.cell(slot_index, court_index) {
            Some(CellAttributes::Anchor{ row_span, col_span, .. }) => *row_span != 1 || *col_span != 1,
            _ => false,
        }
    }

    /// Interior cells are hidden behind the anchor of their booking
    pub fn is_rendered(&self, slot_index: usize, court_index: usize) -> bool {
        !matches!(self.cell(slot_index, court_index), Some(CellAttributes::Interior))
    }

    pub fn row_span(&self, slot_index: usize, court_index: usize) -> u32 {
        match self.cell(slot_index, court_index) {
            Some(CellAttributes::Anchor{ row_span, .. }) => *row_span,
            _ => 1,
        }
    }

    pub fn col_span(&self, slot_index: usize, court_index: usize) -> u32 {
        match self.cell(slot_index, court_index) {
            Some(CellAttributes::Anchor{ col_span, .. }) => *col_span,
            _ => 1,
        }
    }

    pub fn booking_name(&self, slot_index: usize, court_index: usize) -> Option<&str> {
        match self.cell(slot_index, court_index) {
            Some(CellAttributes::Anchor{ name, .. }) => Some(name),
            _ => None,
        }
    }

    /// The players of a booking, or an invitation to reserve the court
    pub fn booking_text(&self, slot_index: usize, court_index: usize) -> &str {
        self.booking_name(slot_index, court_index).unwrap_or(RESERVE_TEXT)
    }

    /// Unbooked courts have no tooltip
    pub fn tooltip(&self, slot_index: usize, court_index: usize) -> &str {
        self.booking_name(slot_index, court_index).unwrap_or("")
    }

    pub fn button_style(&self, slot_index: usize, court_index: usize) -> &'static str {
        if self.is_anchor(slot_index, court_index) {
            "cancellation-button"
        } else {
            "reservation-button"
        }
    }

    pub fn cell_class(&self, slot_index: usize, court_index: usize) -> &'static str {
        if self.is_block_booking(slot_index, court_index) {
            "block-booking-cell"
        } else {
            "non-block-booking-cell"
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn occupied(grid: &GridAttributes) -> Vec<(usize, usize)> {
        let mut result = Vec::new();
        for (slot_index, row) in grid.rows().iter().enumerate() {
            for (court_index, cell) in row.iter().enumerate() {
                if cell != &CellAttributes::Unbooked {
                    result.push((slot_index, court_index));
                }
            }
        }
        result
    }

    #[test]
    fn block_booking_covers_its_rectangle() {
        let grid = project(&[Booking::new(2, 3, 1, 2, "A.Block/B.Ooking")], 16, 5);

        assert_eq!(occupied(&grid).len(), 6);
        assert_eq!(grid.cell(0, 1), Some(&CellAttributes::Anchor{ row_span: 2, col_span: 3, name: "A.Block/B.Ooking".to_string() }));
        for &(slot_index, court_index) in &[(0, 2), (0, 3), (1, 1), (1, 2), (1, 3)] {
            assert_eq!(grid.cell(slot_index, court_index), Some(&CellAttributes::Interior));
            assert!(grid.is_rendered(slot_index, court_index) == false);
        }
        assert!(grid.is_block_booking(0, 1));
        assert_eq!(grid.cell_class(0, 1), "block-booking-cell");
        assert_eq!(grid.row_span(0, 1), 2);
        assert_eq!(grid.col_span(0, 1), 3);
    }

    #[test]
    fn projection_is_deterministic() {
        let bookings = vec![
            Booking::single(2, 3, "R.Ashour/J.Power"),
            Booking::new(3, 3, 2, 3, "A.Block/B.Ooking"),
        ];
        assert_eq!(project(&bookings, 16, 5), project(&bookings, 16, 5));

        let mut reversed = bookings.clone();
        reversed.reverse();
        assert_eq!(project(&bookings, 16, 5), project(&reversed, 16, 5));
    }

    #[test]
    fn unbooked_cells() {
        let grid = project(&[Booking::single(1, 2, "H.Ashour/H.AckerTDog")], 5, 5);
        assert_eq!(grid.booking_text(0, 0), "Reserve");
        assert_eq!(grid.tooltip(0, 0), "");
        assert_eq!(grid.button_style(0, 0), "reservation-button");
        assert_eq!(grid.cell_class(0, 0), "non-block-booking-cell");
        assert_eq!(grid.row_span(0, 0), 1);

        assert_eq!(grid.booking_text(1, 0), "H.Ashour/H.AckerTDog");
        assert_eq!(grid.tooltip(1, 0), "H.Ashour/H.AckerTDog");
        assert_eq!(grid.button_style(1, 0), "cancellation-button");
        assert_eq!(grid.cell_class(1, 0), "non-block-booking-cell");
    }

    #[test]
    fn anchors_win_over_interior_marks() {
        let bookings = vec![
            Booking::single(2, 2, "Single"),
            Booking::new(1, 2, 1, 2, "Block"),
        ];
        let grid = project(&bookings, 4, 4);
        assert!(grid.is_anchor(1, 1));
        assert!(grid.is_anchor(0, 0));
        assert_eq!(grid.cell(1, 0), Some(&CellAttributes::Interior));

        // Same anchor twice: the first one is kept
        let grid = project(&[Booking::single(1, 1, "First"), Booking::single(1, 1, "Second")], 2, 2);
        assert_eq!(grid.booking_text(0, 0), "First");
    }

    #[test]
    fn out_of_bounds_bookings_are_skipped() {
        let grid = project(&[Booking::new(5, 2, 1, 1, "Too wide")], 16, 5);
        assert!(occupied(&grid).is_empty());
        assert_eq!(grid.court_count(), 5);
        assert_eq!(grid.time_slot_count(), 16);
    }
}
