use std::time::Duration;

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

/// Cloud region the account lives in.
///
/// Determines the API host and the `country` field sent at login.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Region {
    #[default]
    #[serde(rename = "US", alias = "us")]
    #[strum(serialize = "US")]
    Us,
}

impl Region {
    /// Root of the regional API host.
    pub fn api_host(self) -> &'static str {
        match self {
            Self::Us => "https://api.us.petlibro.com",
        }
    }

    /// [`api_host`](Self::api_host) as a parsed URL.
    pub fn base_url(self) -> Result<Url, url::ParseError> {
        Url::parse(self.api_host())
    }

    /// Country code sent in the login body.
    pub fn country_code(self) -> &'static str {
        match self {
            Self::Us => "US",
        }
    }
}

/// Email/password pair used for the login exchange.
///
/// Kept by [`AuthSession`](crate::AuthSession) until explicit logout so
/// expired tokens can be renewed without user interaction.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: SecretString) -> Self {
        Self {
            email: email.into(),
            password,
        }
    }

    /// The lowercase hex MD5 digest the login endpoint expects in place of
    /// the plain password.
    pub fn password_digest(&self) -> String {
        format!(
            "{:x}",
            Md5::digest(self.password.expose_secret().as_bytes())
        )
    }
}

/// An issued cloud session.
///
/// `generation` increases by one with every successful login so renewals
/// can tell whether the token they saw fail has already been replaced.
#[derive(Debug, Clone)]
pub struct Session {
    token: SecretString,
    pub issued_at: DateTime<Utc>,
    pub valid_for: Duration,
    pub generation: u64,
}

impl Session {
    pub(crate) fn new(token: SecretString, valid_for: Duration, generation: u64) -> Self {
        Self {
            token,
            issued_at: Utc::now(),
            valid_for,
            generation,
        }
    }

    /// The raw token for the `token` request header.
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.valid_for)
            .ok()
            .and_then(|ttl| self.issued_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn password_digest_is_lowercase_md5_hex() {
        let creds = Credentials::new("a@b.c", SecretString::from("password"));
        assert_eq!(creds.password_digest(), "5f4dcc3b5aa765d61d8327deb882cf99");
    }

    #[test]
    fn region_parses_case_insensitively() {
        assert_eq!("us".parse::<Region>().ok(), Some(Region::Us));
        assert_eq!(Region::Us.to_string(), "US");
        assert_eq!(
            Region::Us.base_url().unwrap().as_str(),
            "https://api.us.petlibro.com/"
        );
    }

    #[test]
    fn session_expiry_follows_validity_window() {
        let session = Session::new(SecretString::from("t"), Duration::from_secs(60), 1);
        assert!(!session.is_expired_at(session.issued_at));
        assert!(session.is_expired_at(session.issued_at + chrono::Duration::seconds(60)));
        assert_eq!(session.token(), "t");
    }
}
