use std::error::Error;
use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::booking::{Booking, ValidDates};
use crate::error::{FetchError, MutationError};
use crate::selection::{Cancellation, Reservation};

/// The two ways a query can be answered
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Fast, but possibly out-of-date
    Cache,
    /// Authoritative
    Network,
}

impl Display for Channel {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// A source that answers booking queries through a single channel (e.g. a server, or a local cache)
#[async_trait]
pub trait BookingStore {
    /// Returns the dates bookings can currently be viewed for
    async fn valid_dates(&self) -> Result<ValidDates, FetchError>;
    /// Returns the bookings of a given day
    async fn bookings_for_date(&self, date: NaiveDate) -> Result<Vec<Booking>, FetchError>;
}

/// A local store that keeps a copy of what the network answered
pub trait SnapshotStore {
    fn store_valid_dates(&self, valid_dates: &ValidDates);
    fn store_bookings(&self, date: NaiveDate, bookings: &[Booking]);
    /// The last time this store has been updated
    fn last_refresh(&self) -> Option<DateTime<Utc>>;
}

/// The data source of a [`BookingView`](crate::BookingView), which can answer through both channels
#[async_trait]
pub trait DataSource {
    async fn fetch_valid_dates(&self, channel: Channel) -> Result<ValidDates, FetchError>;
    async fn fetch_bookings_for_date(&self, date: NaiveDate, channel: Channel) -> Result<Vec<Booking>, FetchError>;
}

/// Something that creates and cancels bookings
#[async_trait]
pub trait BookingMutator {
    async fn reserve(&self, reservation: &Reservation) -> Result<(), MutationError>;
    async fn cancel(&self, cancellation: &Cancellation) -> Result<(), MutationError>;
}

/// Who the current user is
#[async_trait]
pub trait Identity {
    fn is_logged_in(&self) -> bool;
    async fn login(&self, username: &str, password: &str) -> Result<(), Box<dyn Error + Send + Sync>>;
    async fn logout(&self) -> Result<(), Box<dyn Error + Send + Sync>>;
}
