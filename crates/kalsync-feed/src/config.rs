//! Feed configuration.

use std::time::Duration;

use crate::auth::NoQopMode;
use crate::client::normalize_url;
use crate::error::ConfigError;

/// Configuration for fetching one calendar feed.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Feed location as entered by the user; the scheme may be missing.
    pub url: String,

    /// Username for authentication.
    pub username: Option<String>,

    /// Password for authentication.
    pub password: Option<String>,

    /// Request the feed over HTTPS (falls back to HTTP on connection failure).
    pub prefer_https: bool,

    /// Connect timeout.
    pub connect_timeout: Duration,

    /// Read timeout.
    pub read_timeout: Duration,

    /// User agent string.
    pub user_agent: String,

    /// Digest response formula for challenges without `qop`.
    pub no_qop_mode: NoQopMode,
}

impl FeedConfig {
    /// Default connect timeout in seconds.
    pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

    /// Default read timeout in seconds.
    pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 10;

    /// Parameter key for the feed URL.
    pub const PARAM_URL: &'static str = "url";

    /// Parameter key for the username.
    pub const PARAM_USER: &'static str = "user";

    /// Parameter key for the password.
    pub const PARAM_PASSWORD: &'static str = "pw";

    /// Creates a new feed configuration for the given URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be turned into an HTTP(S) URL.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into().trim().to_string();
        if normalize_url(&url, true).is_err() {
            return Err(ConfigError::InvalidUrl(url));
        }

        Ok(Self {
            url,
            username: None,
            password: None,
            prefer_https: true,
            connect_timeout: Duration::from_secs(Self::DEFAULT_CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(Self::DEFAULT_READ_TIMEOUT_SECS),
            user_agent: format!("kalsync/{}", env!("CARGO_PKG_VERSION")),
            no_qop_mode: NoQopMode::default(),
        })
    }

    /// Builds a configuration from keyed `url`, `user` and `pw` parameters.
    ///
    /// Order does not matter and unknown keys are ignored; the last value
    /// wins when a key repeats.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingParameter`] when one of the three keys is
    /// absent, or [`ConfigError::InvalidUrl`] when the URL is unusable.
    pub fn from_params<I, K, V>(params: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let (mut url, mut user, mut password) = (None, None, None);
        for (key, value) in params {
            match key.as_ref() {
                Self::PARAM_URL => url = Some(value.into()),
                Self::PARAM_USER => user = Some(value.into()),
                Self::PARAM_PASSWORD => password = Some(value.into()),
                _ => {}
            }
        }

        let missing = |key: &str| ConfigError::MissingParameter(key.to_string());
        let url = url.ok_or_else(|| missing(Self::PARAM_URL))?;
        let user = user.ok_or_else(|| missing(Self::PARAM_USER))?;
        let password = password.ok_or_else(|| missing(Self::PARAM_PASSWORD))?;

        Ok(Self::new(url)?.with_credentials(user, password))
    }

    /// Sets the credentials for authentication.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Chooses between HTTPS (with HTTP fallback) and plain HTTP.
    pub fn with_prefer_https(mut self, prefer_https: bool) -> Self {
        self.prefer_https = prefer_https;
        self
    }

    /// Sets both the connect and the read timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self.read_timeout = timeout;
        self
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the digest response formula for challenges without `qop`.
    pub fn with_no_qop_mode(mut self, mode: NoQopMode) -> Self {
        self.no_qop_mode = mode;
        self
    }

    /// Returns the username and password when both are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(password)) => Some((user.as_str(), password.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = FeedConfig::new(" feeds.example.com/cal.ics ").unwrap();

        assert_eq!(config.url, "feeds.example.com/cal.ics");
        assert!(config.prefer_https);
        assert!(config.credentials().is_none());
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.read_timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("kalsync/"));
        assert_eq!(config.no_qop_mode, NoQopMode::Legacy);
    }

    #[test]
    fn config_builder_methods() {
        let config = FeedConfig::new("https://feeds.example.com/")
            .unwrap()
            .with_credentials("user", "pass")
            .with_prefer_https(false)
            .with_timeout(Duration::from_secs(3))
            .with_user_agent("test-agent")
            .with_no_qop_mode(NoQopMode::Rfc2617);

        assert_eq!(config.credentials(), Some(("user", "pass")));
        assert!(!config.prefer_https);
        assert_eq!(config.read_timeout, Duration::from_secs(3));
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.no_qop_mode, NoQopMode::Rfc2617);
    }

    #[test]
    fn params_are_order_independent() {
        let config = FeedConfig::from_params([
            ("pw", "secret"),
            ("mode", "ignored"),
            ("url", "https://feeds.example.com/cal"),
            ("user", "alice"),
        ])
        .unwrap();

        assert_eq!(config.url, "https://feeds.example.com/cal");
        assert_eq!(config.credentials(), Some(("alice", "secret")));
    }

    #[test]
    fn params_missing_key() {
        let err = FeedConfig::from_params([("url", "https://x.example"), ("user", "alice")])
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("pw".into()));

        let err = FeedConfig::from_params(Vec::<(String, String)>::new()).unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("url".into()));
    }

    #[test]
    fn invalid_url_returns_error() {
        assert!(matches!(
            FeedConfig::new("ftp://feeds.example.com"),
            Err(ConfigError::InvalidUrl(_))
        ));
        assert!(matches!(FeedConfig::new("   "), Err(ConfigError::InvalidUrl(_))));
    }
}
