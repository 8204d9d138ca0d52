//! Mock extractor for testing.
//!
//! Provides [`MockExtractor`], a configurable [`Extractor`] for unit and
//! integration tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{Extraction, Extractor};

/// A mock extractor for testing.
///
/// Returns configured results in LIFO order, then "nothing extracted".
/// Every call is recorded so tests can assert which steps consulted it.
///
/// # Examples
///
/// ```
/// use cemtem_core::extract::{Extraction, Extractor, MockExtractor};
///
/// # async fn example() {
/// let extractor = MockExtractor::new();
/// let result = extractor.extract("hello", "buyer_material").await;
/// assert!(!result.extracted);
/// assert_eq!(extractor.calls(), vec!["buyer_material".to_string()]);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MockExtractor {
    results: Mutex<Vec<Extraction>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockExtractor {
    /// Create a mock with no configured results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result. The most recently added result is returned first.
    #[must_use]
    pub fn with_result(self, result: Extraction) -> Self {
        match self.results.lock() {
            Ok(mut results) => results.push(result),
            Err(poisoned) => poisoned.into_inner().push(result),
        }
        self
    }

    /// Sleep this long before answering, to exercise caller timeouts.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Steps the extractor was consulted at, in call order.
    pub fn calls(&self) -> Vec<String> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    async fn extract(&self, _text: &str, current_step: &str) -> Extraction {
        match self.calls.lock() {
            Ok(mut calls) => calls.push(current_step.to_string()),
            Err(poisoned) => poisoned.into_inner().push(current_step.to_string()),
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut results = match self.results.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        results
            .pop()
            .unwrap_or_else(|| Extraction::none(current_step))
    }
}
