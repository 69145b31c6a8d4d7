//! This crate shows the court bookings of a squash club, as a (time slot x court) grid.
//!
//! It provides a client to the booking API in the [`client`] module, that can be used as a stand-alone module.
//!
//! Because the connection to the server may be slow, and a user-friendly app may want to quickly display cached data on startup, this crate also provides a local cache for booking data in the [`cache`] module.
//!
//! These two "data sources" (actual client and local cache) can be used together in a [`Provider`](provider::Provider). \
//! A `Provider` answers queries through two channels: the fast cache, and the authoritative network.
//!
//! A [`BookingView`] renders the bookings of the selected date from both channels, one after the other.
//! The user can select another date at any time: results that arrive for a date that is not selected anymore are dropped.

pub mod traits;
pub mod error;

pub mod booking;
pub use booking::{Booking, ValidDates};
pub mod schedule;
pub use schedule::Schedule;
pub mod grid;
pub mod selection;
pub use selection::{CellSelection, Reservation, Cancellation};

pub mod context;
pub mod view_state;
pub use view_state::ViewState;
pub mod reconciler;
pub use reconciler::{BookingView, LoadOutcome};

pub mod provider;
pub use provider::Provider;
pub mod client;
pub mod cache;

/// Scripted sources for tests, built with the `mock_sources` feature
pub mod mock_behaviour;
pub mod mock_source;

pub mod config;
pub mod utils;

/// The usual provider: a local cache in front of the booking API
pub type HttpProvider = Provider<cache::Cache, client::Client>;
