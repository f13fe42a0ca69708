//! Fetcher abstraction for retrieving the approach page

use crate::error::FetchError;
use async_trait::async_trait;

/// Trait for approach page fetchers
///
/// A fetcher performs exactly one retrieval per call. Retry policy belongs
/// to the tracker, which simply tries again on the next tick.
#[async_trait]
pub trait ApproachFetcher: Send + Sync {
    /// Fetches the approach page and returns its body as text
    ///
    /// # Returns
    /// The page markup, or a transport-level error
    async fn fetch_page(&self) -> Result<String, FetchError>;

    /// Returns the name of this fetcher
    fn fetcher_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Scripted response for one call
    pub enum MockResponse {
        Body(String),
        Error(FetchError),
    }

    /// Mock fetcher for testing
    ///
    /// Responses are consumed in order; the last one repeats once the queue
    /// holds a single entry.
    pub struct MockFetcher {
        responses: Arc<Mutex<VecDeque<MockResponse>>>,
        delay: Option<Duration>,
        call_count: Arc<Mutex<usize>>,
    }

    impl Default for MockFetcher {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockFetcher {
        pub fn new() -> Self {
            Self {
                responses: Arc::new(Mutex::new(VecDeque::new())),
                delay: None,
                call_count: Arc::new(Mutex::new(0)),
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn push_body(&self, body: impl Into<String>) {
            self.responses
                .lock()
                .unwrap()
                .push_back(MockResponse::Body(body.into()));
        }

        pub fn push_error(&self, error: FetchError) {
            self.responses
                .lock()
                .unwrap()
                .push_back(MockResponse::Error(error));
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }

        fn next_response(&self) -> Result<String, FetchError> {
            let mut responses = self.responses.lock().unwrap();
            let response = if responses.len() > 1 {
                responses.pop_front()
            } else {
                responses.front().map(|r| match r {
                    MockResponse::Body(body) => MockResponse::Body(body.clone()),
                    // Manual "clone" of FetchError since it doesn't implement Clone
                    MockResponse::Error(err) => MockResponse::Error(match err {
                        FetchError::InvalidUrl(s) => FetchError::InvalidUrl(s.clone()),
                        FetchError::NetworkError(e) => FetchError::Decode(format!(
                            "Network error (cloned): {}",
                            e
                        )),
                        FetchError::Timeout => FetchError::Timeout,
                        FetchError::HttpStatus { status } => {
                            FetchError::HttpStatus { status: *status }
                        }
                        FetchError::Decode(s) => FetchError::Decode(s.clone()),
                    }),
                })
            };

            match response {
                Some(MockResponse::Body(body)) => Ok(body),
                Some(MockResponse::Error(err)) => Err(err),
                None => Err(FetchError::InvalidUrl("no scripted response".to_string())),
            }
        }
    }

    #[async_trait]
    impl ApproachFetcher for MockFetcher {
        async fn fetch_page(&self) -> Result<String, FetchError> {
            *self.call_count.lock().unwrap() += 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.next_response()
        }

        fn fetcher_name(&self) -> &'static str {
            "mock"
        }
    }
}
