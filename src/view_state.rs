//! The state the user actually sees

use chrono::NaiveDate;

use crate::booking::{Booking, ValidDates};
use crate::context::RequestContext;
use crate::grid::GridAttributes;

/// Whether a commit has been applied
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// The context is not about what the user is currently looking at
    Discarded,
}

/// The committed, user-visible state of the booking grid.
///
/// Only complete, current [`RequestContext`]s may change it (see [`ViewState::commit`]).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewState {
    epoch: u64,
    selected_date: Option<NaiveDate>,
    valid_dates: Option<ValidDates>,
    bookings: Vec<Booking>,
    grid: GridAttributes,
    initial_load_succeeded: bool,
    load_failure: bool,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `ctx` is about what the user is looking at right now.
    ///
    /// This is the case when nothing has ever been selected, or when the context targets the date
    /// that is selected *now* (not when the context was created), or when the context replaces its own
    /// cached render of the selected date. Contexts created before the last reload never are.
    pub fn is_current(&self, ctx: &RequestContext) -> bool {
        if ctx.epoch() != self.epoch {
            return false;
        }
        match self.selected_date {
            None => true,
            Some(selected) => ctx.selected_date() == Some(selected) || ctx.replaced_date() == Some(selected),
        }
    }

    /// Apply the data of `ctx`, if it is still current.
    ///
    /// The selected date, the valid dates, the bookings and the grid all change at once.
    pub fn commit(&mut self, ctx: &RequestContext) -> CommitOutcome {
        if self.is_current(ctx) == false {
            return CommitOutcome::Discarded;
        }
        let (date, bookings) = match (ctx.selected_date(), ctx.bookings()) {
            (Some(date), Some(bookings)) => (date, bookings),
            _ => {
                log::error!("Refusing to commit an incomplete context ({:?})", ctx.state());
                return CommitOutcome::Discarded;
            },
        };

        self.selected_date = Some(date);
        if let Some(valid_dates) = ctx.valid_dates() {
            self.valid_dates = Some(valid_dates.clone());
        }
        self.bookings = bookings.to_vec();
        self.grid = ctx.grid().cloned().unwrap_or_default();
        self.initial_load_succeeded = true;
        CommitOutcome::Committed
    }

    /// The user picked another date
    pub fn select_date(&mut self, date: NaiveDate) {
        self.selected_date = Some(date);
        self.load_failure = false;
    }

    /// Nothing can be shown: clear the grid and raise the failure flag
    pub fn reset_after_failure(&mut self) {
        self.selected_date = None;
        self.valid_dates = None;
        self.bookings = Vec::new();
        self.grid = GridAttributes::default();
        self.load_failure = true;
    }

    /// Start over from a pristine state, ignoring every operation started so far.
    ///
    /// Returns the new epoch
    pub fn start_new_epoch(&mut self) -> u64 {
        let epoch = self.epoch + 1;
        *self = Self { epoch, ..Self::default() };
        epoch
    }

    pub fn epoch(&self) -> u64 { self.epoch }
    pub fn selected_date(&self) -> Option<NaiveDate> { self.selected_date }
    pub fn valid_dates(&self) -> Option<&ValidDates> { self.valid_dates.as_ref() }
    pub fn bookings(&self) -> &[Booking] { &self.bookings }
    pub fn grid(&self) -> &GridAttributes { &self.grid }
    pub fn initial_load_succeeded(&self) -> bool { self.initial_load_succeeded }
    pub fn load_failure(&self) -> bool { self.load_failure }

    /// Also true when no date is known at all, so that the "previous day" control stays disabled
    pub fn is_earliest_date(&self) -> bool {
        match (&self.valid_dates, self.selected_date) {
            (Some(valid), Some(selected)) => valid.earliest() == selected,
            (None, _) => true,
            (Some(_), None) => false,
        }
    }

    pub fn is_latest_date(&self) -> bool {
        match (&self.valid_dates, self.selected_date) {
            (Some(valid), Some(selected)) => valid.latest() == selected,
            (None, _) => true,
            (Some(_), None) => false,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn complete_context(epoch: u64, day: &str, bookings: Vec<Booking>) -> RequestContext {
        let valid = ValidDates::new(vec![date("2016-04-23"), date("2016-04-24")]).unwrap();
        let projected = grid::project(&bookings, 16, 5);
        RequestContext::for_date(epoch, date(day), Some(valid))
            .with_bookings(bookings)
            .with_grid(projected)
    }

    #[test]
    fn first_commit_is_always_accepted() {
        let mut state = ViewState::new();
        let ctx = complete_context(0, "2016-04-24", vec![Booking::single(1, 1, "A")]);
        assert_eq!(state.commit(&ctx), CommitOutcome::Committed);
        assert_eq!(state.selected_date(), Some(date("2016-04-24")));
        assert!(state.initial_load_succeeded());
        assert!(state.grid().is_anchor(0, 0));
    }

    #[test]
    fn stale_contexts_are_discarded() {
        let mut state = ViewState::new();
        state.select_date(date("2016-04-24"));
        let stale = complete_context(0, "2016-04-23", vec![Booking::single(1, 1, "Stale")]);
        assert_eq!(state.commit(&stale), CommitOutcome::Discarded);
        assert!(state.bookings().is_empty());
        assert!(state.initial_load_succeeded() == false);
    }

    #[test]
    fn commit_is_idempotent() {
        let mut state = ViewState::new();
        let ctx = complete_context(0, "2016-04-23", vec![Booking::new(2, 3, 1, 2, "Block")]);
        assert_eq!(state.commit(&ctx), CommitOutcome::Committed);
        let after_first = state.clone();
        assert_eq!(state.commit(&ctx), CommitOutcome::Committed);
        assert_eq!(state, after_first);
    }

    #[test]
    fn new_epoch_ignores_older_contexts() {
        let mut state = ViewState::new();
        let old = complete_context(0, "2016-04-23", Vec::new());
        assert_eq!(state.start_new_epoch(), 1);
        assert_eq!(state.commit(&old), CommitOutcome::Discarded);
        assert_eq!(state.commit(&complete_context(1, "2016-04-23", Vec::new())), CommitOutcome::Committed);
    }

    #[test]
    fn incomplete_contexts_are_refused() {
        let mut state = ViewState::new();
        let ctx = RequestContext::new(0).with_selected_date(date("2016-04-23"));
        assert_eq!(state.commit(&ctx), CommitOutcome::Discarded);
    }

    #[test]
    fn failure_resets_the_grid() {
        let mut state = ViewState::new();
        state.commit(&complete_context(0, "2016-04-23", vec![Booking::single(1, 1, "A")]));
        state.reset_after_failure();
        assert!(state.load_failure());
        assert!(state.bookings().is_empty());
        assert_eq!(state.selected_date(), None);
        assert!(state.is_earliest_date() && state.is_latest_date());

        state.select_date(date("2016-04-23"));
        assert!(state.load_failure() == false);
    }

    #[test]
    fn earliest_and_latest() {
        let mut state = ViewState::new();
        state.commit(&complete_context(0, "2016-04-23", Vec::new()));
        assert!(state.is_earliest_date());
        assert!(state.is_latest_date() == false);
        state.select_date(date("2016-04-24"));
        assert!(state.is_latest_date());
    }

    #[test]
    fn refreshed_date_moves_the_selection_on_commit() {
        let mut state = ViewState::new();
        let cached = complete_context(0, "2016-04-23", vec![Booking::single(1, 1, "Cached")]);
        state.commit(&cached);

        let refreshed = cached.rendered_from_cache()
            .with_refreshed_date(date("2016-04-24"))
            .with_bookings(vec![Booking::single(2, 2, "Network")]);
        assert!(state.is_current(&refreshed));
        assert_eq!(state.selected_date(), Some(date("2016-04-23")));
        assert_eq!(state.bookings()[0].name, "Cached");

        assert_eq!(state.commit(&refreshed), CommitOutcome::Committed);
        assert_eq!(state.selected_date(), Some(date("2016-04-24")));
        assert_eq!(state.bookings()[0].name, "Network");
    }

    #[test]
    fn refreshed_date_yields_to_the_user() {
        let mut state = ViewState::new();
        let cached = complete_context(0, "2016-04-23", Vec::new());
        state.commit(&cached);
        let refreshed = cached.rendered_from_cache()
            .with_refreshed_date(date("2016-04-24"))
            .with_bookings(Vec::new());

        state.select_date(date("2016-04-25"));
        assert_eq!(state.commit(&refreshed), CommitOutcome::Discarded);
        assert_eq!(state.selected_date(), Some(date("2016-04-25")));
    }
}
