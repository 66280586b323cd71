//! HTTP transport for the calendar feed.
//!
//! This module provides the client that downloads the ICS body and handles:
//! - URL normalization and the HTTPS to HTTP fallback
//! - a single re-request after a 401 challenge (Basic or Digest)
//! - mapping of transport failures onto [`NetworkError`]

use reqwest::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::auth::Authenticator;
use crate::config::FeedConfig;
use crate::error::{FeedError, FeedResult, NetworkError};
use crate::source::{BoxFuture, FeedSource};

/// Turns user input into an HTTP(S) URL.
///
/// A missing scheme is filled in and an existing `http`/`https` scheme is
/// swapped to match `prefer_https`.
///
/// # Errors
///
/// Returns [`NetworkError::InvalidUrl`] for other schemes or unparsable input.
pub fn normalize_url(raw: &str, prefer_https: bool) -> Result<Url, NetworkError> {
    let raw = raw.trim();
    let invalid = || NetworkError::InvalidUrl(raw.to_string());

    let rest = match raw.split_once("://") {
        Some((scheme, rest))
            if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") =>
        {
            rest
        }
        Some(_) => return Err(invalid()),
        None => raw,
    };

    let scheme = if prefer_https { "https" } else { "http" };
    let url = Url::parse(&format!("{}://{}", scheme, rest)).map_err(|_| invalid())?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid());
    }
    Ok(url)
}

/// Returns the request target used as the Digest `uri`: path plus query.
pub fn request_uri(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// HTTP client for one calendar feed.
pub struct FeedClient {
    /// The underlying HTTP client.
    client: Client,
    /// Configuration.
    config: FeedConfig,
    /// Answers authentication challenges.
    authenticator: Authenticator,
}

impl FeedClient {
    /// Creates a new feed client with the given configuration.
    pub fn new(config: FeedConfig) -> FeedResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| NetworkError::Client(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            authenticator: Authenticator::new(config.no_qop_mode),
            config,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Downloads the feed body.
    ///
    /// An `https` attempt that fails to connect (or times out) is retried once
    /// over plain `http`; never the other way round.
    pub async fn download(&self) -> FeedResult<String> {
        let url = normalize_url(&self.config.url, self.config.prefer_https)?;

        match self.download_from(&url).await {
            Err(FeedError::Network(ref err)) if should_fall_back(&url, err) => {
                let mut plain = url.clone();
                plain
                    .set_scheme("http")
                    .map_err(|_| NetworkError::InvalidUrl(url.to_string()))?;
                warn!(url = %url, error = %err, "HTTPS connection failed, retrying over HTTP");
                self.download_from(&plain).await
            }
            other => other,
        }
    }

    /// Performs the GET, answering at most one 401 challenge.
    async fn download_from(&self, url: &Url) -> FeedResult<String> {
        let response = self.send(url, None).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return read_body(response, url).await;
        }

        let Some(challenge) = select_challenge(&response) else {
            warn!(url = %url, "Received 401 without a challenge");
            return Err(unauthorized(url));
        };
        let Some((username, password)) = self.config.credentials() else {
            warn!(url = %url, "Server requires authentication but no credentials are configured");
            return Err(unauthorized(url));
        };

        debug!(url = %url, "Received 401, answering challenge");
        let authorization = self.authenticator.authorization_header(
            &challenge,
            "GET",
            &request_uri(url),
            username,
            password,
        )?;

        let response = self.send(url, Some(authorization)).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(unauthorized(url));
        }
        read_body(response, url).await
    }

    /// Sends one GET request.
    async fn send(&self, url: &Url, authorization: Option<String>) -> Result<Response, NetworkError> {
        let mut request = self.client.get(url.clone());
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }

        trace!(url = %url, "Sending request");
        request.send().await.map_err(|e| classify(e, url))
    }
}

impl FeedSource for FeedClient {
    fn name(&self) -> &str {
        &self.config.url
    }

    fn fetch(&self) -> BoxFuture<'_, FeedResult<String>> {
        Box::pin(self.download())
    }
}

/// Returns true if a failed `https` attempt may be retried over `http`.
fn should_fall_back(url: &Url, err: &NetworkError) -> bool {
    url.scheme() == "https"
        && matches!(
            err,
            NetworkError::Connection { .. } | NetworkError::Timeout { .. }
        )
}

/// Picks the Digest challenge if the server offers several.
fn select_challenge(response: &Response) -> Option<String> {
    let challenges: Vec<&str> = response
        .headers()
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    challenges
        .iter()
        .find(|c| {
            c.trim_start()
                .get(..6)
                .is_some_and(|scheme| scheme.eq_ignore_ascii_case("digest"))
        })
        .or_else(|| challenges.first())
        .map(|c| c.to_string())
}

/// Extracts the body of a final response.
async fn read_body(response: Response, url: &Url) -> FeedResult<String> {
    let status = response.status();
    trace!(status = %status, "Received response");

    if !status.is_success() {
        warn!(url = %url, status = %status, "Unexpected response status");
        return Err(NetworkError::Protocol {
            status: status.as_u16(),
            url: url.to_string(),
        }
        .into());
    }

    let body = response.text().await.map_err(|e| classify(e, url))?;
    if body.trim().is_empty() {
        return Err(NetworkError::EmptyResponse {
            url: url.to_string(),
        }
        .into());
    }

    info!(url = %url, bytes = body.len(), "Downloaded feed");
    Ok(body)
}

fn unauthorized(url: &Url) -> FeedError {
    NetworkError::Unauthorized {
        url: url.to_string(),
    }
    .into()
}

fn classify(err: reqwest::Error, url: &Url) -> NetworkError {
    let url = url.to_string();
    if err.is_timeout() {
        NetworkError::Timeout { url }
    } else if err.is_connect() {
        NetworkError::Connection {
            url,
            message: err.to_string(),
        }
    } else {
        NetworkError::Client(err.to_string())
    }
}
