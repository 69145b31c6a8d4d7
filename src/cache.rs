//! This module provides a local cache for booking data
//!
//! The cache is a folder of JSON snapshots: `validdates.json` holds the valid dates, and each
//! `YYYY-MM-DD.json` holds the bookings of that day.

use std::collections::HashMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::booking::{Booking, BookingsDocument, ValidDates, ValidDatesDocument};
use crate::error::FetchError;
use crate::traits::{BookingStore, SnapshotStore};

const VALID_DATES_FILE: &str = "validdates.json";
const METADATA_FILE: &str = "metadata.json";


/// A booking source that stores its data in a local folder
#[derive(Debug)]
pub struct Cache {
    backing_folder: PathBuf,
    data: Mutex<CachedData>,
}

#[derive(Clone, Default, Debug, PartialEq)]
struct CachedData {
    valid_dates: Option<ValidDates>,
    bookings: HashMap<NaiveDate, Vec<Booking>>,
    last_refresh: Option<DateTime<Utc>>,
}

#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Metadata {
    last_refresh: Option<DateTime<Utc>>,
}

impl Cache {
    /// Initialize a cache from the content of a valid backing folder if it exists.
    /// Returns an error otherwise
    pub fn from_folder(folder: &Path) -> Result<Self, Box<dyn Error>> {
        let entries = match std::fs::read_dir(folder) {
            Err(err) => {
                return Err(format!("Unable to read folder {:?}: {}", folder, err).into());
            },
            Ok(entries) => entries,
        };

        let mut data = CachedData::default();
        for entry in entries {
            let path = entry?.path();
            let file_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };

            if file_name == VALID_DATES_FILE {
                let doc: ValidDatesDocument = serde_json::from_reader(std::fs::File::open(&path)?)?;
                data.valid_dates = Some(doc.dates);
            } else if file_name == METADATA_FILE {
                let metadata: Metadata = serde_json::from_reader(std::fs::File::open(&path)?)?;
                data.last_refresh = metadata.last_refresh;
            } else {
                let date = match file_name.strip_suffix(".json").and_then(|stem| stem.parse::<NaiveDate>().ok()) {
                    Some(date) => date,
                    None => {
                        log::debug!("Ignoring unexpected file {:?} in the cache", path);
                        continue;
                    },
                };
                let doc: BookingsDocument = serde_json::from_reader(std::fs::File::open(&path)?)?;
                data.bookings.insert(date, doc.bookings);
            }
        }

        Ok(Self {
            backing_folder: PathBuf::from(folder),
            data: Mutex::new(data),
        })
    }

    /// Initialize a cache with the default contents
    pub fn new(folder: &Path) -> Self {
        Self {
            backing_folder: PathBuf::from(folder),
            data: Mutex::new(CachedData::default()),
        }
    }

    fn data(&self) -> MutexGuard<'_, CachedData> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store the current Cache to its backing folder
    pub fn save_to_folder(&self) -> Result<(), std::io::Error> {
        let data = self.data().clone();
        let folder = &self.backing_folder;
        std::fs::create_dir_all(folder)?;

        if let Some(valid_dates) = data.valid_dates {
            let doc = ValidDatesDocument { dates: valid_dates };
            serde_json::to_writer(std::fs::File::create(folder.join(VALID_DATES_FILE))?, &doc)?;
        }
        for (date, bookings) in data.bookings {
            let doc = BookingsDocument { date: Some(date), bookings };
            let file = std::fs::File::create(folder.join(format!("{}.json", date)))?;
            serde_json::to_writer(file, &doc)?;
        }
        let metadata = Metadata { last_refresh: data.last_refresh };
        serde_json::to_writer(std::fs::File::create(folder.join(METADATA_FILE))?, &metadata)?;
        Ok(())
    }

    /// Compares two Caches to check they have the same current content
    ///
    /// This is not a complete equality test: the refresh dates may differ
    pub fn has_same_contents_than(&self, other: &Self) -> bool {
        let left = self.data().clone();
        let right = other.data().clone();
        left.valid_dates == right.valid_dates && left.bookings == right.bookings
    }

    /// Forget the bookings of the days that are not valid anymore
    pub fn prune(&self) {
        let mut data = self.data();
        let valid_dates = match &data.valid_dates {
            None => return,
            Some(valid) => valid.clone(),
        };
        data.bookings.retain(|date, _| valid_dates.contains(date));
    }
}

#[async_trait]
impl BookingStore for Cache {
    async fn valid_dates(&self) -> Result<ValidDates, FetchError> {
        self.data().valid_dates.clone()
            .ok_or_else(|| FetchError::CacheMiss("no valid dates in the cache".to_string()))
    }

    async fn bookings_for_date(&self, date: NaiveDate) -> Result<Vec<Booking>, FetchError> {
        self.data().bookings.get(&date).cloned()
            .ok_or_else(|| FetchError::CacheMiss(format!("no bookings for {} in the cache", date)))
    }
}

impl SnapshotStore for Cache {
    fn store_valid_dates(&self, valid_dates: &ValidDates) {
        let mut data = self.data();
        data.valid_dates = Some(valid_dates.clone());
        data.last_refresh = Some(Utc::now());
    }

    fn store_bookings(&self, date: NaiveDate, bookings: &[Booking]) {
        let mut data = self.data();
        data.bookings.insert(date, bookings.to_vec());
        data.last_refresh = Some(Utc::now());
    }

    fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.data().last_refresh
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn temp_folder(name: &str) -> PathBuf {
        let folder = std::env::temp_dir().join(format!("courtside-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&folder);
        folder
    }

    #[test]
    fn serde_cache() {
        let folder = temp_folder("serde");
        let cache = Cache::new(&folder);
        cache.store_valid_dates(&ValidDates::new(vec![date("2016-04-23"), date("2016-04-24")]).unwrap());
        cache.store_bookings(date("2016-04-23"), &[Booking::new(3, 3, 2, 3, "A.Block/B.Ooking")]);
        cache.save_to_folder().unwrap();

        let retrieved_cache = Cache::from_folder(&folder).unwrap();
        assert!(cache.has_same_contents_than(&retrieved_cache));
        assert!(retrieved_cache.last_refresh().is_some());

        let _ = std::fs::remove_dir_all(&folder);
    }

    #[test]
    fn missing_folder_is_an_error() {
        assert!(Cache::from_folder(&temp_folder("missing")).is_err());
    }

    #[tokio::test]
    async fn empty_cache_misses() {
        let cache = Cache::new(&temp_folder("empty"));
        assert!(matches!(cache.valid_dates().await, Err(FetchError::CacheMiss(_))));
        assert!(matches!(cache.bookings_for_date(date("2016-04-23")).await, Err(FetchError::CacheMiss(_))));
        assert_eq!(cache.last_refresh(), None);
    }

    #[tokio::test]
    async fn prune_forgets_past_days() {
        let cache = Cache::new(&temp_folder("prune"));
        cache.store_bookings(date("2016-04-22"), &[]);
        cache.store_bookings(date("2016-04-23"), &[]);
        cache.store_valid_dates(&ValidDates::new(vec![date("2016-04-23")]).unwrap());
        cache.prune();
        assert!(cache.bookings_for_date(date("2016-04-22")).await.is_err());
        assert!(cache.bookings_for_date(date("2016-04-23")).await.is_ok());
    }
}
