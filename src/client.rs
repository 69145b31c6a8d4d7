//! This module provides a client to connect to the booking backend

use std::error::Error;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::booking::{Booking, BookingsDocument, ValidDates, ValidDatesDocument};
use crate::config::{user_agent, ClientConfig};
use crate::error::{FetchError, MutationError};
use crate::selection::{Cancellation, Reservation};
use crate::traits::{BookingMutator, BookingStore};

/// The backend insists on a redirect target, even though API clients never follow it
const DUMMY_REDIRECT_URL: &str = "http://dummy";


/// A booking source that fetches its data from the booking API
pub struct Client {
    api_url: Url,
    max_retries: u32,
    http: reqwest::Client,
}

impl Client {
    /// Create a client. This does not start a connection
    pub fn new<S: AsRef<str>>(api_url: S) -> Result<Self, Box<dyn Error>> {
        let mut api_url = Url::parse(api_url.as_ref())?;
        if api_url.cannot_be_a_base() {
            return Err(format!("{} cannot be used as a base URL", api_url).into());
        }
        if api_url.path().ends_with('/') == false {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }

        Ok(Self {
            api_url,
            max_retries: 0,
            http: reqwest::Client::new(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, Box<dyn Error>> {
        let client = Self::new(config.api_url.as_str())?;
        Ok(client.with_max_retries(config.max_retries))
    }

    /// Retry failed requests up to `max_retries` times. Mutations are only retried when they could not be sent
    pub fn with_max_retries(self, max_retries: u32) -> Self {
        Self { max_retries, ..self }
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.api_url.join(path)
    }

    fn bookings_url(&self, date: Option<NaiveDate>) -> Result<Url, url::ParseError> {
        let mut url = self.endpoint("bookings")?;
        if let Some(date) = date {
            url.query_pairs_mut().append_pair("date", &date.to_string());
        }
        Ok(url)
    }

    async fn send<F>(&self, policy: RetryPolicy, build: F) -> Result<Response, reqwest::Error>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            let result = build(&self.http)
                .header(USER_AGENT, user_agent())
                .send()
                .await;

            let retryable = match &result {
                Ok(response) => policy.retries_status(response.status()),
                Err(err) => policy.retries_transport_error(err.is_timeout(), err.is_connect()),
            };
            if retryable == false || attempt >= self.max_retries {
                return result;
            }

            attempt += 1;
            log::warn!("Request to the booking API failed, retrying ({}/{})", attempt, self.max_retries);
            tokio::time::sleep(backoff(attempt)).await;
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        log::debug!("GET {}", url);
        let response = self.send(RetryPolicy::Reads, |http| http.get(url.clone())).await?;
        let status = response.status();
        let text = response.text().await?;
        parse_answer(status, &text)
    }

    async fn mutate<T: Serialize + Sync>(&self, put_or_delete: PutOrDelete, request: &T) -> Result<(), MutationError> {
        let url = self.bookings_url(None).map_err(|err| MutationError::Transport(err.to_string()))?;
        let body = MutationBody {
            put_or_delete,
            request,
            api_gateway_base_url: self.api_url.as_str(),
            redirect_url: DUMMY_REDIRECT_URL,
        };
        let body = serde_json::to_string(&body).map_err(|err| MutationError::Transport(err.to_string()))?;
        log::debug!("{:?} {}", put_or_delete, url);

        let response = self.send(RetryPolicy::Mutations, |http| {
            let builder = match put_or_delete {
                PutOrDelete::Put => http.put(url.clone()),
                PutOrDelete::Delete => http.delete(url.clone()),
            };
            builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone())
        }).await?;
        let status = response.status();
        let text = response.text().await?;
        check_mutation_answer(status, &text)
    }
}

#[async_trait]
impl BookingStore for Client {
    async fn valid_dates(&self) -> Result<ValidDates, FetchError> {
        let url = self.endpoint("validdates").map_err(FetchError::network)?;
        let doc: ValidDatesDocument = self.get(url).await?;
        Ok(doc.dates)
    }

    async fn bookings_for_date(&self, date: NaiveDate) -> Result<Vec<Booking>, FetchError> {
        let url = self.bookings_url(Some(date)).map_err(FetchError::network)?;
        let doc: BookingsDocument = self.get(url).await?;
        Ok(doc.bookings)
    }
}

#[async_trait]
impl BookingMutator for Client {
    async fn reserve(&self, reservation: &Reservation) -> Result<(), MutationError> {
        self.mutate(PutOrDelete::Put, reservation).await
    }

    async fn cancel(&self, cancellation: &Cancellation) -> Result<(), MutationError> {
        self.mutate(PutOrDelete::Delete, cancellation).await
    }
}


#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "UPPERCASE")]
enum PutOrDelete {
    Put,
    Delete,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MutationBody<'a, T: Serialize> {
    put_or_delete: PutOrDelete,
    #[serde(flatten)]
    request: &'a T,
    api_gateway_base_url: &'a str,
    redirect_url: &'a str,
}

/// Which failed requests may be sent again
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RetryPolicy {
    /// GET requests, that change nothing on the backend
    Reads,
    /// PUT and DELETE requests. A mutation that timed out may have been applied anyway, so only
    /// requests that never reached the backend are sent again
    Mutations,
}

impl RetryPolicy {
    fn retries_status(self, status: StatusCode) -> bool {
        self == Self::Reads && is_gateway_error(status)
    }

    fn retries_transport_error(self, timed_out: bool, connect_failed: bool) -> bool {
        match self {
            Self::Reads => timed_out || connect_failed,
            Self::Mutations => connect_failed,
        }
    }
}

fn is_gateway_error(status: StatusCode) -> bool {
    status == StatusCode::BAD_GATEWAY
        || status == StatusCode::SERVICE_UNAVAILABLE
        || status == StatusCode::GATEWAY_TIMEOUT
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(100 * 2u64.pow(attempt.min(6)))
}

/// The backend reports its failures as `{"errorMessage": "..."}`, sometimes with a successful status code
fn error_message(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    value.get("errorMessage")?.as_str().map(String::from)
}

fn parse_answer<T: DeserializeOwned>(status: StatusCode, text: &str) -> Result<T, FetchError> {
    if let Some(message) = error_message(text) {
        return Err(FetchError::with_payload(format!("HTTP status {}", status), message));
    }
    if status.is_success() == false {
        return Err(FetchError::with_payload(format!("Unexpected HTTP status code {}", status), text));
    }
    Ok(serde_json::from_str(text)?)
}

fn check_mutation_answer(status: StatusCode, text: &str) -> Result<(), MutationError> {
    if let Some(message) = error_message(text) {
        return Err(MutationError::from_payload(&message));
    }
    if status.is_success() == false {
        return Err(MutationError::Transport(format!("Unexpected HTTP status code {}", status)));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DATE_OUT_OF_RANGE;
    use crate::selection::{CellSelection, SelectionTarget};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn endpoints_are_relative_to_the_api_url() {
        let client = Client::new("https://api.example.com/prod").unwrap();
        assert_eq!(client.api_url().as_str(), "https://api.example.com/prod/");
        assert_eq!(client.endpoint("validdates").unwrap().as_str(), "https://api.example.com/prod/validdates");
        assert_eq!(
            client.bookings_url(Some(date("2016-04-23"))).unwrap().as_str(),
            "https://api.example.com/prod/bookings?date=2016-04-23"
        );
        assert!(Client::new("not a url").is_err());
    }

    #[test]
    fn answers() {
        let doc: ValidDatesDocument = parse_answer(StatusCode::OK, r#"{"dates": ["2016-04-24", "2016-04-23"]}"#).unwrap();
        assert_eq!(doc.dates.earliest(), date("2016-04-23"));

        let out_of_range = parse_answer::<BookingsDocument>(
            StatusCode::BAD_REQUEST,
            &format!(r#"{{"errorMessage": "{}"}}"#, DATE_OUT_OF_RANGE),
        ).unwrap_err();
        assert!(out_of_range.is_date_out_of_range());

        let server_error = parse_answer::<BookingsDocument>(StatusCode::INTERNAL_SERVER_ERROR, "oops").unwrap_err();
        assert_eq!(server_error.payload(), Some("oops"));

        let empty = parse_answer::<ValidDatesDocument>(StatusCode::OK, r#"{"dates": []}"#);
        assert!(matches!(empty, Err(FetchError::Malformed(_))));
    }

    #[test]
    fn mutation_answers() {
        assert_eq!(check_mutation_answer(StatusCode::OK, ""), Ok(()));
        assert_eq!(
            check_mutation_answer(StatusCode::OK, r#"{"errorMessage": "Boom: The password is incorrect"}"#),
            Err(MutationError::PasswordIncorrect)
        );
        assert!(matches!(check_mutation_answer(StatusCode::BAD_GATEWAY, ""), Err(MutationError::Transport(_))));
    }

    #[test]
    fn mutation_body() {
        let selection = CellSelection {
            date: date("2016-04-23"),
            court: 2,
            court_span: 1,
            slot_index: 0,
            slot_span: 1,
            slot_label: "10:00 AM".to_string(),
            name: None,
            target: SelectionTarget::Reservation,
        };
        let reservation = Reservation::from_selection(&selection, "A.Shabana", "J.Power", "pass");
        let body = MutationBody {
            put_or_delete: PutOrDelete::Put,
            request: &reservation,
            api_gateway_base_url: "https://api.example.com/prod/",
            redirect_url: DUMMY_REDIRECT_URL,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["putOrDelete"], "PUT");
        assert_eq!(json["court"], 2);
        assert_eq!(json["slot"], 1);
        assert_eq!(json["player1name"], "A.Shabana");
        assert_eq!(json["date"], "2016-04-23");
        assert_eq!(json["redirectUrl"], "http://dummy");
    }

    #[test]
    fn gateway_errors_are_retried() {
        assert!(is_gateway_error(StatusCode::GATEWAY_TIMEOUT));
        assert!(is_gateway_error(StatusCode::BAD_REQUEST) == false);
        assert!(backoff(2) > backoff(1));
    }

    #[test]
    fn reads_are_retried_on_transient_failures() {
        let policy = RetryPolicy::Reads;
        assert!(policy.retries_status(StatusCode::BAD_GATEWAY));
        assert!(policy.retries_status(StatusCode::OK) == false);
        assert!(policy.retries_transport_error(true, false));
        assert!(policy.retries_transport_error(false, true));
        assert!(policy.retries_transport_error(false, false) == false);
    }

    #[test]
    fn mutations_are_only_retried_when_unsent() {
        let policy = RetryPolicy::Mutations;
        assert!(policy.retries_status(StatusCode::BAD_GATEWAY) == false);
        assert!(policy.retries_status(StatusCode::SERVICE_UNAVAILABLE) == false);
        assert!(policy.retries_status(StatusCode::GATEWAY_TIMEOUT) == false);
        assert!(policy.retries_transport_error(true, false) == false);
        assert!(policy.retries_transport_error(false, true));
    }
}
