//! The [`FeedSource`] seam between the sync pipeline and the network.
//!
//! The pipeline only needs "give me the raw ICS body"; the HTTP client is one
//! implementation, [`StaticFeed`] and [`ErrorFeed`] are others used for local
//! files, dry runs and tests.

use std::future::Future;
use std::pin::Pin;

use crate::error::{FeedError, FeedResult};

/// A boxed future for async trait methods.
///
/// Boxing keeps [`FeedSource`] object-safe so runners can hold a
/// `Box<dyn FeedSource>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Something that can deliver a raw iCalendar body.
pub trait FeedSource: Send + Sync {
    /// Returns a short name for logs (usually the feed URL).
    fn name(&self) -> &str;

    /// Fetches the complete ICS body.
    ///
    /// # Errors
    ///
    /// Returns a [`FeedError`] when the body cannot be obtained.
    fn fetch(&self) -> BoxFuture<'_, FeedResult<String>>;
}

/// A feed whose body is already in memory.
#[derive(Debug, Clone)]
pub struct StaticFeed {
    name: String,
    body: String,
}

impl StaticFeed {
    /// Creates a feed that always yields `body`.
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }
}

impl FeedSource for StaticFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> BoxFuture<'_, FeedResult<String>> {
        let body = self.body.clone();
        Box::pin(async move { Ok(body) })
    }
}

/// A feed that always fails with the same error.
#[derive(Debug, Clone)]
pub struct ErrorFeed {
    name: String,
    error: FeedError,
}

impl ErrorFeed {
    /// Creates a feed that always returns `error`.
    pub fn new(name: impl Into<String>, error: impl Into<FeedError>) -> Self {
        Self {
            name: name.into(),
            error: error.into(),
        }
    }
}

impl FeedSource for ErrorFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> BoxFuture<'_, FeedResult<String>> {
        let error = self.error.clone();
        Box::pin(async move { Err(error) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkError;

    #[tokio::test]
    async fn static_feed_returns_body() {
        let feed = StaticFeed::new("fixture", "BEGIN:VCALENDAR");
        assert_eq!(feed.name(), "fixture");
        assert_eq!(feed.fetch().await.unwrap(), "BEGIN:VCALENDAR");
    }

    #[tokio::test]
    async fn error_feed_returns_error() {
        let feed: Box<dyn FeedSource> = Box::new(ErrorFeed::new(
            "broken",
            NetworkError::EmptyResponse {
                url: "https://x.example".into(),
            },
        ));

        let err = feed.fetch().await.unwrap_err();
        assert!(matches!(
            err,
            FeedError::Network(NetworkError::EmptyResponse { .. })
        ));
    }
}
