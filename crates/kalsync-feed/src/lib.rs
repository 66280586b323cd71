//! Calendar feed retrieval and parsing.
//!
//! This crate turns a protected ICS URL into [`CalendarEntry`] values:
//!
//! - [`FeedClient`] - downloads the body, answering Basic/Digest challenges
//! - [`auth`] - stateless challenge/response header construction
//! - [`ics::parse`] - splits the body into `VEVENT` blocks and maps them to entries
//! - [`FeedSource`] - the seam the sync pipeline fetches through
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  401   ┌───────────────┐
//! │  FeedClient  │ ─────► │ Authenticator │
//! └──────┬───────┘ ◄───── └───────────────┘
//!        │ body      Authorization
//!        ▼
//! ┌──────────────┐
//! │  ics::parse  │ ─► Vec<CalendarEntry>
//! └──────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use kalsync_feed::{FeedClient, FeedConfig, ics};
//!
//! let config = FeedConfig::from_params([("url", url), ("user", user), ("pw", pw)])?;
//! let body = FeedClient::new(config)?.download().await?;
//! let entries = ics::parse(&body)?;
//! ```
//!
//! [`CalendarEntry`]: kalsync_core::CalendarEntry

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod ics;
pub mod source;

pub use auth::{
    Authenticator, DigestChallenge, NoQopMode, Qop, basic_auth, build_authorization_header,
};
pub use client::{FeedClient, normalize_url, request_uri};
pub use config::FeedConfig;
pub use error::{AuthError, ConfigError, FeedError, FeedResult, NetworkError, ParseError};
pub use source::{BoxFuture, ErrorFeed, FeedSource, StaticFeed};
