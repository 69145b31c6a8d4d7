//! This module renders the booking grid from a two-channel [`DataSource`]
//!
//! Every operation first tries the (fast) cache channel, then the (authoritative) network channel.
//! Operations are not cancelled when the user moves to another date: they run to completion, and
//! their results are dropped at commit time if the date they are about is not selected anymore.

use std::error::Error;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;

use crate::context::{ContextState, RequestContext};
use crate::error::{FailureClass, FetchError};
use crate::grid;
use crate::schedule::Schedule;
use crate::selection::{CellSelection, SelectionTarget};
use crate::traits::{Channel, DataSource, Identity};
use crate::view_state::{CommitOutcome, ViewState};

pub mod progress;
use progress::{FeedbackSender, LoadEvent, LoadProgress};

/// How many times a single load may start over because the window of valid dates has moved
pub const MAX_RELOADS: u32 = 3;

/// How an operation ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The view shows up-to-date bookings from the network
    Rendered,
    /// The network failed, but the view had already been rendered from the cache for the same date
    RenderedFromCache,
    /// The user has moved to another date, and the result of this operation has been dropped
    Superseded,
    /// Nothing could be rendered. The view shows its failure flag
    Failed,
}

/// What the login/logout button did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginAction {
    LoggedOut,
    /// The user is not logged in, the login form should be shown
    ShowLogin,
}

enum Step {
    Done(LoadOutcome),
    ReloadRequired,
}


/// The booking grid of a given date, kept consistent with the user's current selection
pub struct BookingView<S, I>
where
    S: DataSource,
    I: Identity,
{
    source: Arc<S>,
    identity: Arc<I>,
    schedule: Schedule,
    /// The date to reopen on, if it still is valid
    remembered_date: Option<NaiveDate>,

    state: Mutex<ViewState>,
    feedback_channel: Option<Arc<FeedbackSender>>,
}

impl<S, I> BookingView<S, I>
where
    S: DataSource,
    I: Identity,
{
    /// Create a view. This does not load anything yet, see [`Self::load_initial`].
    ///
    /// `remembered_date` is usually the date of the [`CellSelection`] the user made in a previous view.
    pub fn new(source: Arc<S>, identity: Arc<I>, schedule: Schedule, remembered_date: Option<NaiveDate>) -> Self {
        Self {
            source, identity, schedule, remembered_date,
            state: Mutex::new(ViewState::new()),
            feedback_channel: None,
        }
    }

    /// Publish the progress of every later operation on this channel
    pub fn set_feedback_channel(&mut self, sender: FeedbackSender) {
        self.feedback_channel = Some(Arc::new(sender));
    }

    pub fn schedule(&self) -> &Schedule { &self.schedule }
    pub fn source(&self) -> &Arc<S> { &self.source }

    /// A snapshot of what the user currently sees
    pub fn state(&self) -> ViewState {
        self.lock_state().clone()
    }

    pub fn selected_date(&self) -> Option<NaiveDate> { self.lock_state().selected_date() }
    pub fn load_failure(&self) -> bool { self.lock_state().load_failure() }
    pub fn initial_load_succeeded(&self) -> bool { self.lock_state().initial_load_succeeded() }
    pub fn is_earliest_date(&self) -> bool { self.lock_state().is_earliest_date() }
    pub fn is_latest_date(&self) -> bool { self.lock_state().is_latest_date() }

    fn lock_state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn progress<T: ToString>(&self, operation: T) -> LoadProgress {
        LoadProgress::new(operation, self.feedback_channel.clone())
    }


    /// Load the valid dates and the bookings of the date to show, from the cache first, then from the network.
    ///
    /// If the network reports that the date has left the window of valid dates, the view is reset and
    /// everything is loaded again (up to [`MAX_RELOADS`] times).
    pub async fn load_initial(&self) -> LoadOutcome {
        let progress = self.progress("initial load");
        progress.feedback(LoadEvent::Started{ date: None });

        let mut reloads = 0;
        let outcome = loop {
            let epoch = self.lock_state().epoch();
            match self.run_initial_load(epoch, &progress).await {
                Step::Done(outcome) => break outcome,
                Step::ReloadRequired if reloads < MAX_RELOADS => {
                    reloads += 1;
                    progress.info(&format!("Valid dates have changed, reloading (attempt {}/{})", reloads, MAX_RELOADS));
                    progress.feedback(LoadEvent::Reloading);
                    self.lock_state().start_new_epoch();
                },
                Step::ReloadRequired => {
                    progress.error("Valid dates keep changing, giving up");
                    let mut state = self.lock_state();
                    if state.epoch() == epoch {
                        state.reset_after_failure();
                    }
                    break LoadOutcome::Failed;
                },
            }
        };

        progress.feedback(LoadEvent::Finished{ outcome });
        outcome
    }

    async fn run_initial_load(&self, epoch: u64, progress: &LoadProgress) -> Step {
        let mut ctx = advance(RequestContext::new(epoch), ContextState::CachePending);

        match self.source.fetch_valid_dates(Channel::Cache).await {
            Ok(valid_dates) => {
                let date = valid_dates.choose_selection(self.remembered_date);
                ctx = ctx.with_valid_dates(valid_dates).with_selected_date(date);
            },
            Err(err) => progress.debug(&format!("No valid dates in the cache ({}), the network will tell", err)),
        }
        let ctx = self.render_from_cache(ctx, progress).await;

        let ctx = advance(ctx, ContextState::NetworkPending);
        let valid_dates = match self.source.fetch_valid_dates(Channel::Network).await {
            Ok(valid_dates) => valid_dates,
            Err(err) => return self.network_failed(ctx, err, progress),
        };
        let date = valid_dates.choose_selection(self.remembered_date);
        if let Some(cached_date) = ctx.selected_date().filter(|cached_date| *cached_date != date) {
            progress.info(&format!("The cached valid dates are out of date, loading {} instead of {}", date, cached_date));
        }
        let ctx = ctx.with_valid_dates(valid_dates).with_refreshed_date(date);

        self.render_from_network(ctx, progress).await
    }

    /// Show the bookings of another date.
    ///
    /// The new date is selected as soon as this function is called (not when the returned future is
    /// first polled), so that results of earlier operations are dropped from now on.
    pub fn on_date_changed(&self, date: NaiveDate) -> impl Future<Output = LoadOutcome> + '_ {
        let ctx = {
            let mut state = self.lock_state();
            state.select_date(date);
            RequestContext::for_date(state.epoch(), date, state.valid_dates().cloned())
        };

        async move {
            let progress = self.progress(date);
            progress.feedback(LoadEvent::Started{ date: Some(date) });

            let ctx = advance(ctx, ContextState::CachePending);
            let ctx = self.render_from_cache(ctx, &progress).await;
            let ctx = advance(ctx, ContextState::NetworkPending);

            let outcome = match self.render_from_network(ctx, &progress).await {
                Step::Done(outcome) => outcome,
                Step::ReloadRequired => {
                    progress.feedback(LoadEvent::Reloading);
                    self.reload().await
                },
            };
            progress.feedback(LoadEvent::Finished{ outcome });
            outcome
        }
    }

    /// Move `step` dates forward (or backward, if negative) in the window of valid dates.
    ///
    /// This is clamped to the window, and does nothing if the selected date would not change.
    /// Otherwise, the new date is selected immediately and its bookings are loaded by the returned future.
    pub fn increment_or_decrement_date(&self, step: i64) -> impl Future<Output = Option<LoadOutcome>> + '_ {
        let next_date = {
            let state = self.lock_state();
            match (state.selected_date(), state.valid_dates()) {
                (Some(selected), Some(valid_dates)) => valid_dates
                    .stepped(&selected, step)
                    .filter(|next| *next != selected),
                _ => None,
            }
        };
        let date_change = next_date.map(|date| self.on_date_changed(date));

        async move {
            match date_change {
                Some(future) => Some(future.await),
                None => None,
            }
        }
    }

    /// Drop everything and load from scratch
    pub async fn reload(&self) -> LoadOutcome {
        self.lock_state().start_new_epoch();
        self.load_initial().await
    }


    async fn render_from_cache(&self, ctx: RequestContext, progress: &LoadProgress) -> RequestContext {
        let date = match ctx.selected_date() {
            Some(date) => date,
            None => return advance(ctx, ContextState::CacheFailed),
        };

        match self.source.fetch_bookings_for_date(date, Channel::Cache).await {
            Err(err) => {
                progress.debug(&format!("Unable to render from the cache: {}", err));
                advance(ctx, ContextState::CacheFailed)
            },
            Ok(bookings) => {
                let ctx = advance(ctx.with_bookings(bookings), ContextState::CacheOk);
                let (ctx, outcome) = self.commit(ctx, Channel::Cache, progress);
                match outcome {
                    CommitOutcome::Committed => ctx.rendered_from_cache(),
                    CommitOutcome::Discarded => ctx,
                }
            },
        }
    }

    async fn render_from_network(&self, ctx: RequestContext, progress: &LoadProgress) -> Step {
        let date = match ctx.selected_date() {
            Some(date) => date,
            None => {
                let err = FetchError::Malformed("no date to fetch bookings for".to_string());
                return self.network_failed(ctx, err, progress);
            },
        };

        match self.source.fetch_bookings_for_date(date, Channel::Network).await {
            Err(err) => self.network_failed(ctx, err, progress),
            Ok(bookings) => {
                let ctx = advance(ctx.with_bookings(bookings), ContextState::NetworkOk);
                let (ctx, outcome) = self.commit(ctx, Channel::Network, progress);
                let (ctx, result) = match outcome {
                    CommitOutcome::Committed => (advance(ctx, ContextState::Committed), LoadOutcome::Rendered),
                    CommitOutcome::Discarded => (advance(ctx, ContextState::Discarded), LoadOutcome::Superseded),
                };
                progress.debug(&format!("Operation ended in state {:?}", ctx.state()));
                Step::Done(result)
            },
        }
    }

    /// Apply the bookings of `ctx` to the view, if the user still looks at the same date
    fn commit(&self, ctx: RequestContext, channel: Channel, progress: &LoadProgress) -> (RequestContext, CommitOutcome) {
        let date = ctx.selected_date();
        let projected = ctx.bookings()
            .map(|bookings| grid::project(bookings, self.schedule.time_slot_count(), self.schedule.court_count()));
        let ctx = match projected {
            Some(grid) => ctx.with_grid(grid),
            None => ctx,
        };

        let outcome = self.lock_state().commit(&ctx);
        if let Some(date) = date {
            match outcome {
                CommitOutcome::Committed => {
                    progress.debug(&format!("Rendered {} from the {}", date, channel));
                    progress.feedback(LoadEvent::Rendered{ date, channel });
                },
                CommitOutcome::Discarded => {
                    progress.debug(&format!("Dropping the {} result for {}, this date is not selected anymore", channel, date));
                    progress.feedback(LoadEvent::Discarded{ date, channel });
                },
            }
        }
        (ctx, outcome)
    }

    fn network_failed(&self, ctx: RequestContext, err: FetchError, progress: &LoadProgress) -> Step {
        let ctx = advance(ctx, ContextState::NetworkFailed);
        let mut state = self.lock_state();
        let is_current = state.is_current(&ctx);

        match err.classify(Channel::Network) {
            FailureClass::DateOutOfRange if is_current => {
                progress.info(&format!("The selected date is not valid anymore ({})", err));
                Step::ReloadRequired
            },
            _ if is_current == false => {
                progress.debug(&format!("Ignoring a failure for a date that is not selected anymore ({})", err));
                Step::Done(LoadOutcome::Superseded)
            },
            _ if ctx.has_rendered_from_cache() => {
                progress.warn(&format!("Unable to refresh from the network ({}). Keeping the cached bookings", err));
                Step::Done(LoadOutcome::RenderedFromCache)
            },
            _ => {
                progress.error(&format!("Unable to load the bookings: {}", err));
                state.reset_after_failure();
                Step::Done(LoadOutcome::Failed)
            },
        }
    }


    /// What a click on a cell leads to.
    ///
    /// Returns `None` for cells that are hidden behind a block booking, or outside the grid, or when no date is shown.
    pub fn select_cell(&self, slot_index: usize, court_index: usize) -> Option<CellSelection> {
        let state = self.lock_state();
        let date = state.selected_date()?;
        let grid = state.grid();
        if grid.cell(slot_index, court_index).is_none() || grid.is_rendered(slot_index, court_index) == false {
            return None;
        }
        let court = *self.schedule.court_numbers().get(court_index)?;
        let slot_label = self.schedule.time_slot_label(slot_index)?;

        let target = if grid.is_anchor(slot_index, court_index) {
            SelectionTarget::Cancellation
        } else {
            SelectionTarget::Reservation
        };

        Some(CellSelection {
            date,
            court,
            court_span: grid.col_span(slot_index, court_index),
            slot_index,
            slot_span: grid.row_span(slot_index, court_index),
            slot_label,
            name: grid.booking_name(slot_index, court_index).map(String::from),
            target,
        })
    }

    pub fn show_admin_ui(&self) -> bool {
        self.identity.is_logged_in()
    }

    pub fn login_or_out_button_text(&self) -> &'static str {
        if self.show_admin_ui() { "Logout" } else { "Admin" }
    }

    /// Log out if the user is logged in, otherwise tell the caller to show the login form
    pub async fn login_or_out(&self) -> Result<LoginAction, Box<dyn Error + Send + Sync>> {
        if self.identity.is_logged_in() {
            self.identity.logout().await?;
            Ok(LoginAction::LoggedOut)
        } else {
            Ok(LoginAction::ShowLogin)
        }
    }
}


fn advance(ctx: RequestContext, next: ContextState) -> RequestContext {
    match ctx.advance(next) {
        Ok(ctx) => ctx,
        Err(err) => {
            log::error!("{}", err);
            err.into_context()
        },
    }
}
