//! Scripted data sources and identities, to drive a [`BookingView`](crate::BookingView) in tests
//!
//! A [`MockSource`] answers from canned data for each channel. Its requests can be made to fail
//! (with a specific error, or following a [`MockBehaviour`]), and can be held until the test
//! releases them, so that answers arrive in any order the test needs.
#![cfg(any(test, feature = "mock_sources"))]

use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Notify;

use crate::booking::{Booking, ValidDates};
use crate::error::FetchError;
use crate::mock_behaviour::MockBehaviour;
use crate::traits::{Channel, DataSource, Identity};

/// A request made to a [`MockSource`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Request {
    ValidDates(Channel),
    Bookings(Channel, NaiveDate),
}

impl Request {
    pub fn channel(&self) -> Channel {
        match self {
            Self::ValidDates(channel) => *channel,
            Self::Bookings(channel, _) => *channel,
        }
    }
}

#[derive(Default)]
struct MockChannel {
    valid_dates: Option<ValidDates>,
    bookings: HashMap<NaiveDate, Vec<Booking>>,
    behaviour: MockBehaviour,
}

#[derive(Default)]
struct MockData {
    channels: HashMap<Channel, MockChannel>,
    errors: HashMap<Request, FetchError>,
    calls: Vec<Request>,
}

/// A [`DataSource`] that answers with canned data
#[derive(Default)]
pub struct MockSource {
    data: Mutex<MockData>,
    gates: Mutex<HashMap<Request, Arc<Notify>>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> MutexGuard<'_, MockData> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn gates(&self) -> MutexGuard<'_, HashMap<Request, Arc<Notify>>> {
        self.gates.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_valid_dates(&self, channel: Channel, valid_dates: ValidDates) {
        self.data().channels.entry(channel).or_default().valid_dates = Some(valid_dates);
    }

    pub fn set_bookings(&self, channel: Channel, date: NaiveDate, bookings: Vec<Booking>) {
        self.data().channels.entry(channel).or_default().bookings.insert(date, bookings);
    }

    /// Make every `request` fail with `error`, until [`Self::clear_failure`] is called
    pub fn fail(&self, request: Request, error: FetchError) {
        self.data().errors.insert(request, error);
    }

    pub fn clear_failure(&self, request: Request) {
        self.data().errors.remove(&request);
    }

    pub fn set_behaviour(&self, channel: Channel, behaviour: MockBehaviour) {
        self.data().channels.entry(channel).or_default().behaviour = behaviour;
    }

    /// The next `request`s will not be answered until [`Self::release`] is called
    pub fn hold(&self, request: Request) {
        self.gates().insert(request, Arc::new(Notify::new()));
    }

    /// Let the held `request` be answered (even if it has not been made yet)
    pub fn release(&self, request: Request) {
        if let Some(gate) = self.gates().remove(&request) {
            gate.notify_one();
        }
    }

    /// Every request made so far, in order
    pub fn calls(&self) -> Vec<Request> {
        self.data().calls.clone()
    }

    pub fn call_count(&self, request: Request) -> usize {
        self.data().calls.iter().filter(|call| **call == request).count()
    }

    async fn answer<T, F>(&self, request: Request, read: F) -> Result<T, FetchError>
    where
        F: FnOnce(&mut MockChannel) -> Result<T, String>,
    {
        self.data().calls.push(request);

        let gate = self.gates().get(&request).cloned();
        if let Some(gate) = gate {
            log::debug!("Mock source: holding {:?}", request);
            gate.notified().await;
            log::debug!("Mock source: releasing {:?}", request);
        }

        let mut data = self.data();
        let channel = request.channel();
        if let Some(err) = data.errors.get(&request) {
            return Err(err.clone());
        }
        read(data.channels.entry(channel).or_default()).map_err(|reason| match channel {
            Channel::Cache => FetchError::CacheMiss(reason),
            Channel::Network => FetchError::network(reason),
        })
    }
}

#[async_trait]
impl DataSource for MockSource {
    async fn fetch_valid_dates(&self, channel: Channel) -> Result<ValidDates, FetchError> {
        self.answer(Request::ValidDates(channel), |mock| {
            mock.behaviour.can_fetch_valid_dates()?;
            mock.valid_dates.clone().ok_or_else(|| "no valid dates".to_string())
        }).await
    }

    async fn fetch_bookings_for_date(&self, date: NaiveDate, channel: Channel) -> Result<Vec<Booking>, FetchError> {
        self.answer(Request::Bookings(channel, date), |mock| {
            mock.behaviour.can_fetch_bookings()?;
            mock.bookings.get(&date).cloned().ok_or_else(|| format!("no bookings for {}", date))
        }).await
    }
}


/// An [`Identity`] that accepts any non-empty password
#[derive(Debug, Default)]
pub struct MockIdentity {
    logged_in: Mutex<bool>,
}

impl MockIdentity {
    pub fn new(logged_in: bool) -> Self {
        Self { logged_in: Mutex::new(logged_in) }
    }

    fn set_logged_in(&self, value: bool) {
        *self.logged_in.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = value;
    }
}

#[async_trait]
impl Identity for MockIdentity {
    fn is_logged_in(&self) -> bool {
        *self.logged_in.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn login(&self, username: &str, password: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        if password.is_empty() {
            return Err(format!("Wrong password for {}", username).into());
        }
        self.set_logged_in(true);
        Ok(())
    }

    async fn logout(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.set_logged_in(false);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_behaviour::FetchScript;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn answers_per_channel() {
        let source = MockSource::new();
        source.set_bookings(Channel::Network, date("2016-04-23"), vec![Booking::single(1, 1, "A")]);

        assert_eq!(source.fetch_bookings_for_date(date("2016-04-23"), Channel::Network).await.unwrap().len(), 1);
        assert!(matches!(
            source.fetch_bookings_for_date(date("2016-04-23"), Channel::Cache).await,
            Err(FetchError::CacheMiss(_))
        ));
        assert!(matches!(source.fetch_valid_dates(Channel::Network).await, Err(FetchError::Network{ .. })));
        assert_eq!(source.call_count(Request::Bookings(Channel::Network, date("2016-04-23"))), 1);
        assert_eq!(source.calls().len(), 3);
    }

    #[tokio::test]
    async fn scripted_failures() {
        let source = MockSource::new();
        source.set_valid_dates(Channel::Cache, ValidDates::new(vec![date("2016-04-23")]).unwrap());
        source.set_behaviour(Channel::Cache, MockBehaviour { valid_dates: FetchScript::new(0, 1), ..MockBehaviour::default() });

        assert!(source.fetch_valid_dates(Channel::Cache).await.is_err());
        assert!(source.fetch_valid_dates(Channel::Cache).await.is_ok());

        source.fail(Request::ValidDates(Channel::Cache), FetchError::CacheMiss("gone".to_string()));
        assert_eq!(source.fetch_valid_dates(Channel::Cache).await, Err(FetchError::CacheMiss("gone".to_string())));
        source.clear_failure(Request::ValidDates(Channel::Cache));
        assert!(source.fetch_valid_dates(Channel::Cache).await.is_ok());
    }

    #[tokio::test]
    async fn held_requests_wait_for_release() {
        let source = MockSource::new();
        source.set_valid_dates(Channel::Network, ValidDates::new(vec![date("2016-04-23")]).unwrap());
        let request = Request::ValidDates(Channel::Network);
        source.hold(request);

        let (fetched, _) = tokio::join!(
            source.fetch_valid_dates(Channel::Network),
            async {
                tokio::task::yield_now().await;
                source.release(request);
            }
        );
        assert!(fetched.is_ok());

        // Releasing before the request is made lets it through as well
        source.hold(request);
        source.release(request);
        assert!(source.fetch_valid_dates(Channel::Network).await.is_ok());
    }

    #[tokio::test]
    async fn identity() {
        let identity = MockIdentity::new(false);
        assert!(identity.login("admin", "").await.is_err());
        assert!(identity.is_logged_in() == false);
        identity.login("admin", "secret").await.unwrap();
        assert!(identity.is_logged_in());
        identity.logout().await.unwrap();
        assert!(identity.is_logged_in() == false);
    }
}
