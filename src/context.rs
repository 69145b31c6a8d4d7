//! The private accumulator of a single load operation
//!
//! Every operation (initial load, date change) builds its own [`RequestContext`] and threads it
//! through its cache and network steps. Contexts are values: each step consumes a context and
//! returns a new one, so two operations in flight never see each other's data.

use std::fmt::{Display, Formatter};

use chrono::NaiveDate;

use crate::booking::{Booking, ValidDates};
use crate::grid::GridAttributes;

/// Where an operation stands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
    Created,
    CachePending,
    CacheOk,
    CacheFailed,
    NetworkPending,
    NetworkOk,
    NetworkFailed,
    /// The network result has been applied to the view
    Committed,
    /// The network result arrived for a date the user is no longer looking at
    Discarded,
}

impl ContextState {
    pub fn can_advance_to(self, next: Self) -> bool {
        use ContextState::*;
        matches!((self, next),
            (Created, CachePending)
            | (CachePending, CacheOk)
            | (CachePending, CacheFailed)
            | (CacheOk, NetworkPending)
            | (CacheFailed, NetworkPending)
            | (NetworkPending, NetworkOk)
            | (NetworkPending, NetworkFailed)
            | (NetworkOk, Committed)
            | (NetworkOk, Discarded)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::NetworkFailed | Self::Committed | Self::Discarded)
    }
}

/// A transition that is not part of the state graph
#[derive(Debug)]
pub struct InvalidTransition {
    context: Box<RequestContext>,
    to: ContextState,
}

impl InvalidTransition {
    /// Get back the unchanged context
    pub fn into_context(self) -> RequestContext {
        *self.context
    }
}

impl Display for InvalidTransition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid context transition {:?} -> {:?}", self.context.state, self.to)
    }
}

impl std::error::Error for InvalidTransition {}


#[derive(Clone, Debug, PartialEq)]
pub struct RequestContext {
    epoch: u64,
    state: ContextState,
    selected_date: Option<NaiveDate>,
    valid_dates: Option<ValidDates>,
    bookings: Option<Vec<Booking>>,
    grid: Option<GridAttributes>,
    rendered_from_cache: bool,
    replaced_date: Option<NaiveDate>,
}

impl RequestContext {
    /// A context for an operation started during the given view epoch
    pub fn new(epoch: u64) -> Self {
        Self {
            epoch,
            state: ContextState::Created,
            selected_date: None,
            valid_dates: None,
            bookings: None,
            grid: None,
            rendered_from_cache: false,
            replaced_date: None,
        }
    }

    /// A context for a date change, that already knows the valid dates
    pub fn for_date(epoch: u64, date: NaiveDate, valid_dates: Option<ValidDates>) -> Self {
        Self {
            selected_date: Some(date),
            valid_dates,
            ..Self::new(epoch)
        }
    }

    pub fn advance(self, next: ContextState) -> Result<Self, InvalidTransition> {
        if self.state.can_advance_to(next) == false {
            return Err(InvalidTransition { context: Box::new(self), to: next });
        }
        Ok(Self { state: next, ..self })
    }

    /// A cached render only counts for the date it was made for
    pub fn with_selected_date(self, date: NaiveDate) -> Self {
        let rendered_from_cache = self.rendered_from_cache && self.selected_date == Some(date);
        Self { selected_date: Some(date), rendered_from_cache, ..self }
    }

    /// Move an initial load to the date selected by the refreshed valid dates.
    ///
    /// When the view shows this context's cached render of another date, the context keeps a claim on
    /// that date: committing it replaces the selection, unless the user has picked a date since.
    pub fn with_refreshed_date(self, date: NaiveDate) -> Self {
        let replaced_date = match self.selected_date {
            Some(cached) if self.rendered_from_cache && cached != date => Some(cached),
            _ => None,
        };
        let ctx = self.with_selected_date(date);
        Self { replaced_date, ..ctx }
    }

    pub fn with_valid_dates(self, valid_dates: ValidDates) -> Self {
        Self { valid_dates: Some(valid_dates), ..self }
    }

    /// Set new bookings. This drops the grid computed for the previous ones
    pub fn with_bookings(self, bookings: Vec<Booking>) -> Self {
        Self { bookings: Some(bookings), grid: None, ..self }
    }

    pub fn with_grid(self, grid: GridAttributes) -> Self {
        Self { grid: Some(grid), ..self }
    }

    /// Record that the view has been rendered from this context's cached data
    pub fn rendered_from_cache(self) -> Self {
        Self { rendered_from_cache: true, ..self }
    }

    pub fn epoch(&self) -> u64 { self.epoch }
    pub fn state(&self) -> ContextState { self.state }
    pub fn selected_date(&self) -> Option<NaiveDate> { self.selected_date }
    /// The cached render this context is about to replace, if it targets another date
    pub fn replaced_date(&self) -> Option<NaiveDate> { self.replaced_date }
    pub fn valid_dates(&self) -> Option<&ValidDates> { self.valid_dates.as_ref() }
    pub fn bookings(&self) -> Option<&[Booking]> { self.bookings.as_deref() }
    pub fn grid(&self) -> Option<&GridAttributes> { self.grid.as_ref() }

    /// Whether the view has been rendered from cached data during this operation
    pub fn has_rendered_from_cache(&self) -> bool {
        self.rendered_from_cache
    }

    pub fn cache_fetch_failed(&self) -> bool {
        !self.rendered_from_cache
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use ContextState::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn happy_path_transitions() {
        let ctx = RequestContext::new(0);
        let ctx = ctx.advance(CachePending).unwrap();
        let ctx = ctx.advance(CacheFailed).unwrap();
        let ctx = ctx.advance(NetworkPending).unwrap();
        let ctx = ctx.advance(NetworkOk).unwrap();
        let ctx = ctx.advance(Discarded).unwrap();
        assert!(ctx.state().is_terminal());
    }

    #[test]
    fn network_never_precedes_cache() {
        let err = RequestContext::new(0).advance(NetworkPending).unwrap_err();
        let ctx = err.into_context();
        assert_eq!(ctx.state(), Created);

        let ctx = ctx.advance(CachePending).unwrap();
        assert!(ctx.clone().advance(Committed).is_err());
        assert!(ctx.advance(NetworkOk).is_err());
    }

    #[test]
    fn contexts_do_not_share_data() {
        let valid = ValidDates::new(vec![date("2016-04-23"), date("2016-04-24")]).unwrap();
        let first = RequestContext::for_date(0, date("2016-04-23"), Some(valid.clone()));
        let second = first.clone().with_selected_date(date("2016-04-24"))
            .with_bookings(vec![Booking::single(1, 1, "A.Nother/B.Lock")]);

        assert_eq!(first.selected_date(), Some(date("2016-04-23")));
        assert_eq!(first.bookings(), None);
        assert_eq!(second.selected_date(), Some(date("2016-04-24")));
        assert_eq!(second.bookings().map(|b| b.len()), Some(1));
        assert_eq!(second.valid_dates(), Some(&valid));
    }

    #[test]
    fn new_bookings_drop_the_stale_grid() {
        let ctx = RequestContext::new(0)
            .with_bookings(Vec::new())
            .with_grid(GridAttributes::default());
        assert!(ctx.grid().is_some());
        assert!(ctx.with_bookings(Vec::new()).grid().is_none());
    }

    #[test]
    fn cache_failure_is_the_default() {
        let ctx = RequestContext::new(0);
        assert!(ctx.cache_fetch_failed());
        assert!(ctx.rendered_from_cache().has_rendered_from_cache());
    }

    #[test]
    fn cached_render_is_tied_to_its_date() {
        let ctx = RequestContext::for_date(0, date("2016-04-23"), None).rendered_from_cache();
        assert!(ctx.clone().with_selected_date(date("2016-04-23")).has_rendered_from_cache());
        assert!(ctx.with_selected_date(date("2016-04-24")).cache_fetch_failed());
    }

    #[test]
    fn refreshed_date_claims_the_cached_render() {
        let cached = RequestContext::for_date(0, date("2016-04-23"), None).rendered_from_cache();
        let moved = cached.clone().with_refreshed_date(date("2016-04-24"));
        assert_eq!(moved.selected_date(), Some(date("2016-04-24")));
        assert_eq!(moved.replaced_date(), Some(date("2016-04-23")));
        assert!(moved.cache_fetch_failed());

        let same = cached.with_refreshed_date(date("2016-04-23"));
        assert_eq!(same.replaced_date(), None);
        assert!(same.has_rendered_from_cache());

        let not_rendered = RequestContext::for_date(0, date("2016-04-23"), None)
            .with_refreshed_date(date("2016-04-24"));
        assert_eq!(not_rendered.replaced_date(), None);
    }
}
