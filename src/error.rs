//! Errors returned by the data sources and the booking backend

use std::fmt::{Display, Formatter};

use crate::traits::Channel;

/// The message the backend sends when the requested date has left the window of valid dates
/// (e.g. a page left open past midnight)
pub const DATE_OUT_OF_RANGE: &str = "The booking date is outside the valid range";

const PASSWORD_INCORRECT: &str = "The password is incorrect";
const LOGIN_REQUIRED: &str = "You must login to manage block bookings";
const CREATION_FAILED: &str = "Booking creation failed";
const CANCELLATION_FAILED: &str = "Booking cancellation failed";


/// A failed read from a [`DataSource`](crate::traits::DataSource)
#[derive(Clone, Debug, PartialEq)]
pub enum FetchError {
    /// The cache channel has no (usable) answer
    CacheMiss(String),
    /// The network channel failed. `payload` is the error body sent by the backend, if any
    Network { reason: String, payload: Option<String> },
    /// An answer was received, but it does not make sense
    Malformed(String),
}

/// How the reconciler must react to a [`FetchError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
    /// Always silent, the network channel is queried next
    CacheMiss,
    /// Fatal, unless the view has already been rendered from the cache for the same date
    NetworkFailure,
    /// The window of valid dates has moved: a full reload is needed
    DateOutOfRange,
}

impl FetchError {
    pub fn network<S: ToString>(reason: S) -> Self {
        Self::Network { reason: reason.to_string(), payload: None }
    }

    pub fn with_payload<S: ToString, P: ToString>(reason: S, payload: P) -> Self {
        Self::Network { reason: reason.to_string(), payload: Some(payload.to_string()) }
    }

    pub fn payload(&self) -> Option<&str> {
        match self {
            Self::Network { payload, .. } => payload.as_deref(),
            _ => None,
        }
    }

    pub fn is_date_out_of_range(&self) -> bool {
        self.payload().map(|p| p.contains(DATE_OUT_OF_RANGE)).unwrap_or(false)
    }

    /// Whatever went wrong, a failure of the cache channel is only a cache miss
    pub fn classify(&self, channel: Channel) -> FailureClass {
        match channel {
            Channel::Cache => FailureClass::CacheMiss,
            Channel::Network if self.is_date_out_of_range() => FailureClass::DateOutOfRange,
            Channel::Network => FailureClass::NetworkFailure,
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CacheMiss(reason) => write!(f, "cache miss: {}", reason),
            Self::Network { reason, payload: None } => write!(f, "network failure: {}", reason),
            Self::Network { reason, payload: Some(p) } => write!(f, "network failure: {} ({})", reason, p),
            Self::Malformed(reason) => write!(f, "malformed data: {}", reason),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        Self::network(err)
    }
}


/// A failed reservation or cancellation
#[derive(Clone, Debug, PartialEq)]
pub enum MutationError {
    PasswordIncorrect,
    /// Block bookings can only be managed by a logged-in user
    LoginRequired,
    /// The backend refused the change
    Rejected(String),
    /// The request did not make it to the backend, or its answer was unreadable
    Transport(String),
}

impl MutationError {
    /// Classify the error message sent back by the backend
    pub fn from_payload(payload: &str) -> Self {
        if payload.contains(PASSWORD_INCORRECT) {
            Self::PasswordIncorrect
        } else if payload.contains(LOGIN_REQUIRED) {
            Self::LoginRequired
        } else if payload.contains(CREATION_FAILED) || payload.contains(CANCELLATION_FAILED) {
            Self::Rejected(payload.to_string())
        } else {
            Self::Transport(payload.to_string())
        }
    }
}

impl Display for MutationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PasswordIncorrect => write!(f, "the password is incorrect"),
            Self::LoginRequired => write!(f, "you must login to manage block bookings"),
            Self::Rejected(msg) => write!(f, "rejected by the backend: {}", msg),
            Self::Transport(msg) => write!(f, "request failed: {}", msg),
        }
    }
}

impl std::error::Error for MutationError {}

impl From<reqwest::Error> for MutationError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
