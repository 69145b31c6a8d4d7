//! Some utility functions

use crate::grid::{CellAttributes, GridAttributes};
use crate::schedule::Schedule;
use crate::view_state::ViewState;

const COLUMN_WIDTH: usize = 20;

/// Render the grid as plain text, one line per time slot.
///
/// Anchors show the players of their booking (suffixed with the size of a block booking),
/// cells covered by a booking show `|`, free courts show `-`.
pub fn render_text_grid(grid: &GridAttributes, schedule: &Schedule) -> String {
    let mut text = format!("{:>8} ", "");
    for court in schedule.court_numbers() {
        text.push_str(&format!("{:<width$}", format!("Court {}", court), width = COLUMN_WIDTH));
    }
    text.push('\n');

    for (slot_index, row) in grid.rows().iter().enumerate() {
        let label = schedule.time_slot_label(slot_index).unwrap_or_default();
        text.push_str(&format!("{:>8} ", label));
        for cell in row {
            let content = match cell {
                CellAttributes::Unbooked => "-".to_string(),
                CellAttributes::Interior => "|".to_string(),
                CellAttributes::Anchor{ row_span: 1, col_span: 1, name } => name.clone(),
                CellAttributes::Anchor{ row_span, col_span, name } => format!("{} ({}x{})", name, col_span, row_span),
            };
            text.push_str(&format!("{:<width$}", truncate(&content, COLUMN_WIDTH - 1), width = COLUMN_WIDTH));
        }
        text.push('\n');
    }
    text
}

fn truncate(content: &str, max_chars: usize) -> String {
    content.chars().take(max_chars).collect()
}

/// A debug utility that pretty-prints what a view currently shows
pub fn print_view_state(state: &ViewState, schedule: &Schedule) {
    match state.selected_date() {
        None => println!("No date selected"),
        Some(date) => println!("Bookings for {}", date),
    }
    if state.load_failure() {
        println!("  (the bookings could not be loaded)");
    }
    print!("{}", render_text_grid(state.grid(), schedule));
}
