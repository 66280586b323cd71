//! HTTP authentication for feed requests.
//!
//! This module answers `WWW-Authenticate` challenges as per:
//! - RFC 7617 (Basic)
//! - RFC 2617 (Digest, MD5 only)
//!
//! Everything here is a pure function of the challenge and the credentials;
//! no state survives between requests.

use std::collections::HashMap;

use base64::Engine;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AuthError;

/// Length of the generated client nonce.
pub const CNONCE_LENGTH: usize = 8;

/// How to compute the digest response when the challenge carries no `qop`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoQopMode {
    /// `MD5(method:nonce:uri)`, the form some feed servers expect.
    #[default]
    Legacy,
    /// `MD5(HA1:nonce:HA2)` as RFC 2617 §3.2.2.1 defines it.
    Rfc2617,
}

/// Quality of protection offered by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qop {
    /// `auth`
    Auth,
    /// `auth-int`
    AuthInt,
}

impl Qop {
    /// Picks `auth` from a comma-separated option list, else `auth-int`.
    fn select(options: &str) -> Option<Self> {
        let offered: Vec<&str> = options.split(',').map(str::trim).collect();
        if offered.iter().any(|o| o.eq_ignore_ascii_case("auth")) {
            Some(Self::Auth)
        } else if offered.iter().any(|o| o.eq_ignore_ascii_case("auth-int")) {
            Some(Self::AuthInt)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::AuthInt => "auth-int",
        }
    }
}

/// A parsed Digest challenge.
///
/// Created from one 401 response and consumed to build one header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    /// The protection space.
    pub realm: String,
    /// Server nonce.
    pub nonce: String,
    /// Opaque value to echo back unchanged.
    pub opaque: Option<String>,
    /// Selected quality of protection, if any was offered.
    pub qop: Option<Qop>,
    /// Hash algorithm as announced (always MD5 once parsed).
    pub algorithm: String,
    /// Nonce count, never zero.
    pub nc: u32,
    /// Fixed client nonce; a fresh one is generated when unset.
    cnonce: Option<String>,
}

impl DigestChallenge {
    /// Parses a `WWW-Authenticate: Digest ...` header value.
    ///
    /// # Errors
    ///
    /// Fails when the scheme is not Digest, the algorithm is not MD5, or
    /// `realm`/`nonce` are missing.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let header = r#"Digest realm="example", nonce="abc123", qop="auth""#;
    /// let challenge = DigestChallenge::parse(header)?;
    /// ```
    pub fn parse(header: &str) -> Result<Self, AuthError> {
        let (scheme, rest) = split_scheme(header);
        if !scheme.eq_ignore_ascii_case("digest") {
            return Err(AuthError::UnsupportedScheme(scheme.to_string()));
        }
        Self::from_params(rest)
    }

    fn from_params(content: &str) -> Result<Self, AuthError> {
        let mut params = parse_auth_params(content);

        let realm = params
            .remove("realm")
            .ok_or(AuthError::MissingParameter("realm"))?;
        let nonce = params
            .remove("nonce")
            .ok_or(AuthError::MissingParameter("nonce"))?;

        let algorithm = params
            .remove("algorithm")
            .unwrap_or_else(|| "MD5".to_string());
        if !algorithm.eq_ignore_ascii_case("MD5") {
            return Err(AuthError::UnsupportedAlgorithm(algorithm));
        }

        let qop = match params.get("qop") {
            Some(options) => {
                let selected = Qop::select(options);
                if selected.is_none() {
                    debug!(qop = %options, "No usable qop offered, using no-qop response");
                }
                selected
            }
            None => None,
        };

        let nc = params
            .get("nc")
            .and_then(|v| u32::from_str_radix(v, 16).ok())
            .filter(|n| *n > 0)
            .unwrap_or(1);

        Ok(Self {
            realm,
            nonce,
            opaque: params.remove("opaque"),
            qop,
            algorithm: "MD5".to_string(),
            nc,
            cnonce: None,
        })
    }

    /// Uses a fixed client nonce instead of a random one.
    pub fn with_cnonce(mut self, cnonce: impl Into<String>) -> Self {
        self.cnonce = Some(cnonce.into());
        self
    }

    /// Overrides the nonce count.
    pub fn with_nonce_count(mut self, nc: u32) -> Self {
        self.nc = nc.max(1);
        self
    }

    /// Computes the `response` hash for the given request.
    pub fn response(
        &self,
        method: &str,
        uri: &str,
        username: &str,
        password: &str,
        cnonce: &str,
        mode: NoQopMode,
    ) -> String {
        let ha1 = md5_hex(&format!("{}:{}:{}", username, self.realm, password));
        let ha2 = md5_hex(&format!("{}:{}", method, uri));

        match (self.qop, mode) {
            (Some(qop), _) => md5_hex(&format!(
                "{}:{}:{:08x}:{}:{}:{}",
                ha1,
                self.nonce,
                self.nc,
                cnonce,
                qop.as_str(),
                ha2
            )),
            (None, NoQopMode::Legacy) => {
                warn!(
                    realm = %self.realm,
                    "Digest challenge without qop, using legacy method:nonce:uri response"
                );
                md5_hex(&format!("{}:{}:{}", method, self.nonce, uri))
            }
            (None, NoQopMode::Rfc2617) => md5_hex(&format!("{}:{}:{}", ha1, self.nonce, ha2)),
        }
    }

    /// Builds the `Authorization` header value for one request.
    pub fn authorize(
        &self,
        method: &str,
        uri: &str,
        username: &str,
        password: &str,
        mode: NoQopMode,
    ) -> String {
        let cnonce = self.cnonce.clone().unwrap_or_else(generate_cnonce);
        let response = self.response(method, uri, username, password, &cnonce, mode);

        let mut parts = vec![
            format!("username=\"{}\"", username),
            format!("realm=\"{}\"", self.realm),
            format!("nonce=\"{}\"", self.nonce),
            format!("uri=\"{}\"", uri),
            format!("algorithm={}", self.algorithm),
            format!("response=\"{}\"", response),
        ];

        if let Some(qop) = self.qop {
            parts.push(format!("qop={}", qop.as_str()));
            parts.push(format!("nc={:08x}", self.nc));
            parts.push(format!("cnonce=\"{}\"", cnonce));
        }

        if let Some(ref opaque) = self.opaque {
            parts.push(format!("opaque=\"{}\"", opaque));
        }

        format!("Digest {}", parts.join(", "))
    }
}

/// Answers Basic and Digest challenges.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticator {
    no_qop_mode: NoQopMode,
}

impl Authenticator {
    /// Creates an authenticator using the given no-qop behaviour.
    pub fn new(no_qop_mode: NoQopMode) -> Self {
        Self { no_qop_mode }
    }

    /// Returns the configured no-qop behaviour.
    pub fn no_qop_mode(&self) -> NoQopMode {
        self.no_qop_mode
    }

    /// Builds the `Authorization` header answering `challenge`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnsupportedScheme`] for schemes other than Basic
    /// and Digest, and [`AuthError::UnsupportedAlgorithm`] for digest
    /// algorithms other than MD5.
    pub fn authorization_header(
        &self,
        challenge: &str,
        method: &str,
        uri: &str,
        username: &str,
        password: &str,
    ) -> Result<String, AuthError> {
        let (scheme, rest) = split_scheme(challenge);
        if scheme.eq_ignore_ascii_case("basic") {
            Ok(basic_auth(username, password))
        } else if scheme.eq_ignore_ascii_case("digest") {
            let digest = DigestChallenge::from_params(rest)?;
            Ok(digest.authorize(method, uri, username, password, self.no_qop_mode))
        } else {
            Err(AuthError::UnsupportedScheme(scheme.to_string()))
        }
    }
}

/// Builds the `Authorization` header answering `challenge` with default settings.
///
/// # Errors
///
/// See [`Authenticator::authorization_header`].
pub fn build_authorization_header(
    challenge: &str,
    method: &str,
    uri: &str,
    username: &str,
    password: &str,
) -> Result<String, AuthError> {
    Authenticator::default().authorization_header(challenge, method, uri, username, password)
}

/// Generates a Basic authentication header value.
pub fn basic_auth(username: &str, password: &str) -> String {
    let credentials = format!("{}:{}", username, password);
    let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
    format!("Basic {}", encoded)
}

/// Returns the scheme token and the remaining parameter text.
fn split_scheme(header: &str) -> (&str, &str) {
    let header = header.trim();
    match header.find(char::is_whitespace) {
        Some(idx) => (&header[..idx], header[idx..].trim_start()),
        None => (header, ""),
    }
}

/// Parses `key=value` pairs; values may be quoted with backslash escapes.
fn parse_auth_params(content: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut chars = content.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}

        let key: String = chars
            .by_ref()
            .take_while(|c| *c != '=')
            .collect::<String>()
            .trim()
            .to_lowercase();
        if key.is_empty() {
            break;
        }

        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let value = if chars.next_if_eq(&'"').is_some() {
            let mut val = String::new();
            let mut escaped = false;
            for c in chars.by_ref() {
                match (escaped, c) {
                    (true, _) => {
                        val.push(c);
                        escaped = false;
                    }
                    (false, '\\') => escaped = true,
                    (false, '"') => break,
                    (false, _) => val.push(c),
                }
            }
            val
        } else {
            chars
                .by_ref()
                .take_while(|c| *c != ',')
                .collect::<String>()
                .trim()
                .to_string()
        };

        params.insert(key, value);
    }

    params
}

/// Generates a random alphanumeric client nonce.
fn generate_cnonce() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(CNONCE_LENGTH)
        .map(char::from)
        .collect()
}

/// Computes an MD5 hash as lowercase hex.
fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHALLENGE: &str = r#"Digest realm="R", qop="auth", algorithm=MD5, nonce="abc""#;

    fn field<'a>(header: &'a str, name: &str) -> Option<&'a str> {
        header
            .trim_start_matches("Digest ")
            .split(", ")
            .find_map(|part| part.strip_prefix(&format!("{}=", name)))
            .map(|v| v.trim_matches('"'))
    }

    #[test]
    fn parse_digest_challenge() {
        let challenge = DigestChallenge::parse(CHALLENGE).unwrap();

        assert_eq!(challenge.realm, "R");
        assert_eq!(challenge.nonce, "abc");
        assert_eq!(challenge.qop, Some(Qop::Auth));
        assert_eq!(challenge.algorithm, "MD5");
        assert_eq!(challenge.nc, 1);
        assert!(challenge.opaque.is_none());
    }

    #[test]
    fn parse_tolerates_spacing_and_escapes() {
        let header = r#"digest   realm = "a \"quoted\" realm" ,nonce=xyz,opaque="op""#;
        let challenge = DigestChallenge::parse(header).unwrap();

        assert_eq!(challenge.realm, r#"a "quoted" realm"#);
        assert_eq!(challenge.nonce, "xyz");
        assert_eq!(challenge.opaque.as_deref(), Some("op"));
        assert!(challenge.qop.is_none());
    }

    #[test]
    fn qop_list_prefers_auth() {
        let header = r#"Digest realm="R", nonce="n", qop="auth-int,auth""#;
        assert_eq!(DigestChallenge::parse(header).unwrap().qop, Some(Qop::Auth));

        let header = r#"Digest realm="R", nonce="n", qop="auth-int""#;
        assert_eq!(
            DigestChallenge::parse(header).unwrap().qop,
            Some(Qop::AuthInt)
        );

        let header = r#"Digest realm="R", nonce="n", qop="token""#;
        assert!(DigestChallenge::parse(header).unwrap().qop.is_none());
    }

    #[test]
    fn zero_nonce_count_defaults_to_one() {
        let header = r#"Digest realm="R", nonce="n", nc=00000000"#;
        assert_eq!(DigestChallenge::parse(header).unwrap().nc, 1);

        let header = r#"Digest realm="R", nonce="n", nc=0000000a"#;
        assert_eq!(DigestChallenge::parse(header).unwrap().nc, 10);
    }

    #[test]
    fn parse_rejects_missing_nonce() {
        let err = DigestChallenge::parse(r#"Digest realm="R""#).unwrap_err();
        assert_eq!(err, AuthError::MissingParameter("nonce"));
    }

    #[test]
    fn parse_rejects_other_algorithms() {
        let header = r#"Digest realm="R", nonce="n", algorithm=SHA-256"#;
        assert_eq!(
            DigestChallenge::parse(header).unwrap_err(),
            AuthError::UnsupportedAlgorithm("SHA-256".into())
        );
    }

    #[test]
    fn algorithm_token_is_case_insensitive() {
        let header = r#"Digest realm="R", nonce="n", algorithm=md5"#;
        assert_eq!(DigestChallenge::parse(header).unwrap().algorithm, "MD5");
    }

    #[test]
    fn deterministic_digest_header() {
        let header = DigestChallenge::parse(CHALLENGE)
            .unwrap()
            .with_cnonce("0a4f113b")
            .authorize("GET", "/cal/", "u", "p", NoQopMode::Legacy);

        insta::assert_snapshot!(header, @r##"Digest username="u", realm="R", nonce="abc", uri="/cal/", algorithm=MD5, response="fc9d03276863f0311b3baf77bd5b5e57", qop=auth, nc=00000001, cnonce="0a4f113b""##);
    }

    #[test]
    fn known_server_response() {
        let header = r#"Digest realm="THW-Dienstplaner Login", qop="auth", algorithm=MD5, nonce="i3hKaeRpBQA=bc8f16ca586395187b0cc820afce188b9a6b2eeb""#;
        let challenge = DigestChallenge::parse(header)
            .unwrap()
            .with_cnonce("fkjwSDtW");

        let value = challenge.authorize("GET", "/", "DavidS", "s5MhKr9Jpn[ZgM1<", NoQopMode::Legacy);
        assert_eq!(
            field(&value, "response"),
            Some("54195f47877016f3268be902bcecc48c")
        );
    }

    #[test]
    fn nonce_count_and_auth_int() {
        let header = r#"Digest realm="R", nonce="abc", qop="auth-int""#;
        let value = DigestChallenge::parse(header)
            .unwrap()
            .with_cnonce("0a4f113b")
            .with_nonce_count(2)
            .authorize("GET", "/cal/", "u", "p", NoQopMode::Legacy);

        assert_eq!(field(&value, "qop"), Some("auth-int"));
        assert_eq!(field(&value, "nc"), Some("00000002"));
        assert_eq!(
            field(&value, "response"),
            Some("32db6662540b09a7086a8d24b3624887")
        );
    }

    #[test]
    fn no_qop_modes() {
        let challenge = DigestChallenge::parse(r#"Digest realm="R", nonce="abc""#).unwrap();

        let legacy = challenge.authorize("GET", "/cal/", "u", "p", NoQopMode::Legacy);
        assert_eq!(
            field(&legacy, "response"),
            Some("f093647d58bdf288928a7f4460e4ff89")
        );
        assert!(field(&legacy, "qop").is_none());
        assert!(field(&legacy, "cnonce").is_none());

        let rfc = challenge.authorize("GET", "/cal/", "u", "p", NoQopMode::Rfc2617);
        assert_eq!(
            field(&rfc, "response"),
            Some("3faed76e2f13e569ef0c2d0865ed74d2")
        );
    }

    #[test]
    fn opaque_is_echoed() {
        let header = r#"Digest realm="R", nonce="abc", qop="auth", opaque="5ccc""#;
        let value = build_authorization_header(header, "GET", "/", "u", "p").unwrap();
        assert!(value.ends_with(r#", opaque="5ccc""#));
    }

    #[test]
    fn generated_cnonce_is_alphanumeric() {
        let value = build_authorization_header(CHALLENGE, "GET", "/", "u", "p").unwrap();
        let cnonce = field(&value, "cnonce").unwrap();

        assert_eq!(cnonce.len(), CNONCE_LENGTH);
        assert!(cnonce.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(field(&value, "response").unwrap().len(), 32);
    }

    #[test]
    fn basic_scheme() {
        let value = build_authorization_header(r#"Basic realm="feed""#, "GET", "/", "u", "p");
        assert_eq!(value.unwrap(), "Basic dTpw");
        assert_eq!(basic_auth("user", "secret"), "Basic dXNlcjpzZWNyZXQ=");
    }

    #[test]
    fn unsupported_scheme() {
        let err = build_authorization_header("Bearer realm=\"x\"", "GET", "/", "u", "p");
        assert_eq!(err.unwrap_err(), AuthError::UnsupportedScheme("Bearer".into()));

        let err = build_authorization_header("", "GET", "/", "u", "p");
        assert_eq!(err.unwrap_err(), AuthError::UnsupportedScheme(String::new()));
    }

    #[test]
    fn authenticator_uses_configured_mode() {
        let auth = Authenticator::new(NoQopMode::Rfc2617);
        assert_eq!(auth.no_qop_mode(), NoQopMode::Rfc2617);

        let value = auth
            .authorization_header(r#"Digest realm="R", nonce="abc""#, "GET", "/cal/", "u", "p")
            .unwrap();
        assert_eq!(
            field(&value, "response"),
            Some("3faed76e2f13e569ef0c2d0865ed74d2")
        );
    }

    #[test]
    fn md5_hex_computation() {
        assert_eq!(md5_hex("hello"), "5d41402abc4b2a76b9719d911017c592");
    }
}
