//! This modules abstracts data sources and merges them in a single virtual one

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::booking::{Booking, ValidDates};
use crate::error::FetchError;
use crate::traits::{BookingStore, Channel, DataSource, SnapshotStore};

/// A data source that combines two `BookingStore`s (usually a server and a local cache).
///
/// Queries on the [`Channel::Cache`] channel are answered by `local`, queries on the [`Channel::Network`] channel
/// are answered by `remote`, and successful network answers are written back to `local`.
/// This can be used for integration tests, where the remote source is mocked by a `Cache`.
pub struct Provider<L, R>
where
    L: BookingStore + SnapshotStore,
    R: BookingStore,
{
    /// The remote source (usually a server)
    remote: R,
    /// The local cache
    local: L,
}

impl<L, R> Provider<L, R>
where
    L: BookingStore + SnapshotStore,
    R: BookingStore,
{
    /// Create a provider.
    ///
    /// `remote` is usually a [`Client`](crate::client::Client), `local` is usually a [`Cache`](crate::cache::Cache).
    pub fn new(remote: R, local: L) -> Self {
        Self { remote, local }
    }

    /// Returns the data source described as the `remote`
    pub fn remote(&self) -> &R { &self.remote }
    /// Returns the data source described as the `local`
    pub fn local(&self)  -> &L { &self.local }
    /// Returns the data source described as the `local`
    pub fn local_mut(&mut self) -> &mut L { &mut self.local }
}

#[async_trait]
impl<L, R> DataSource for Provider<L, R>
where
    L: BookingStore + SnapshotStore + Send + Sync,
    R: BookingStore + Send + Sync,
{
    async fn fetch_valid_dates(&self, channel: Channel) -> Result<ValidDates, FetchError> {
        match channel {
            Channel::Cache => self.local.valid_dates().await.map_err(into_cache_miss),
            Channel::Network => {
                let valid_dates = self.remote.valid_dates().await?;
                self.local.store_valid_dates(&valid_dates);
                Ok(valid_dates)
            },
        }
    }

    async fn fetch_bookings_for_date(&self, date: NaiveDate, channel: Channel) -> Result<Vec<Booking>, FetchError> {
        match channel {
            Channel::Cache => self.local.bookings_for_date(date).await.map_err(into_cache_miss),
            Channel::Network => {
                let bookings = self.remote.bookings_for_date(date).await?;
                self.local.store_bookings(date, &bookings);
                Ok(bookings)
            },
        }
    }
}

/// Whatever goes wrong with the local store, the cache channel just has nothing to offer
fn into_cache_miss(err: FetchError) -> FetchError {
    match err {
        FetchError::CacheMiss(_) => err,
        other => {
            log::debug!("Local store failed: {}", other);
            FetchError::CacheMiss(other.to_string())
        },
    }
}
