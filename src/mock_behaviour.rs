//! This module provides ways to tweak mocked sources, so that they can return errors on some tests
#![cfg(any(test, feature = "mock_sources"))]

/// How a mocked fetch answers: `successes` times successfully, then `failures` times with an error,
/// then successfully forever
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchScript {
    pub successes: u32,
    pub failures: u32,
}

impl FetchScript {
    pub fn new(successes: u32, failures: u32) -> Self {
        Self { successes, failures }
    }

    /// Consume one answer of this script
    fn next_answer(&mut self, descr: &str) -> Result<(), String> {
        if self.successes > 0 {
            self.successes -= 1;
        } else if self.failures > 0 {
            self.failures -= 1;
            log::debug!("Mock behaviour: failing a {} ({:?})", descr, self);
            return Err(format!("Mocked behaviour requires this {} to fail this time ({:?})", descr, self));
        }
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, self);
        Ok(())
    }
}


/// This stores some behaviour tweaks, that describe how a mocked channel will behave during a given test
#[derive(Default, Clone, Debug)]
pub struct MockBehaviour {
    /// If this is true, every fetch will be allowed
    pub is_suspended: bool,

    pub valid_dates: FetchScript,
    pub bookings: FetchScript,
}

impl MockBehaviour {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch will fail at once, for `n_fails` times per kind of fetch
    pub fn fail_now(n_fails: u32) -> Self {
        Self {
            is_suspended: false,
            valid_dates: FetchScript::new(0, n_fails),
            bookings: FetchScript::new(0, n_fails),
        }
    }

    /// Suspend this mock behaviour until you call `resume`
    pub fn suspend(&mut self) {
        self.is_suspended = true;
    }
    /// Make this behaviour active again
    pub fn resume(&mut self) {
        self.is_suspended = false;
    }

    pub fn can_fetch_valid_dates(&mut self) -> Result<(), String> {
        if self.is_suspended { return Ok(()) }
        self.valid_dates.next_answer("fetch_valid_dates")
    }
    pub fn can_fetch_bookings(&mut self) -> Result<(), String> {
        if self.is_suspended { return Ok(()) }
        self.bookings.next_answer("fetch_bookings")
    }
}
