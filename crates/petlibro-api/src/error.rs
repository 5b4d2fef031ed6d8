use thiserror::Error;

/// Failures of the credential exchange and session renewal path.
///
/// Produced only by [`AuthSession`](crate::AuthSession). `petlibro-core`
/// treats an `AuthError` from the initial login as fatal to setup.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The cloud rejected the email/password pair.
    #[error("Invalid credentials: {message}")]
    InvalidCredentials { message: String },

    /// The login endpoint could not be reached (DNS, connect, timeout, 5xx).
    #[error("Cloud unavailable during login: {0}")]
    NetworkUnavailable(#[source] reqwest::Error),

    /// The session was invalidated and the single re-login attempt failed.
    #[error("Session revoked: {message}")]
    Revoked { message: String },

    /// The session has been closed; renewals are no longer accepted.
    #[error("Session closed")]
    Closed,
}

/// Failures of a single authenticated cloud call.
///
/// Every [`CloudClient`](crate::CloudClient) method returns this type.
/// Retry policy lives in the poller, so each variant reflects exactly one
/// attempt (plus the single re-login retry on authorization failures).
#[derive(Debug, Error)]
pub enum TransportError {
    // ── Authorization ───────────────────────────────────────────────
    /// Request still unauthorized after one forced re-login.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// `ensure_valid` / re-login failed before the request could be sent.
    #[error(transparent)]
    Auth(#[from] AuthError),

    // ── Transport ───────────────────────────────────────────────────
    /// Network or timeout failure. Not retried at this layer.
    #[error("Cloud unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// HTTP 429 from the cloud.
    #[error("Rate limited -- retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Non-success HTTP status that is not an auth or rate-limit response.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The HTTP client could not be constructed (TLS backend, headers).
    #[error("HTTP client setup failed: {0}")]
    Client(#[source] reqwest::Error),

    /// URL construction failed (bad base URL override).
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Cloud API ───────────────────────────────────────────────────
    /// The `{code, msg, data}` envelope carried a non-zero, non-auth code.
    #[error("Cloud API error {code}: {message}")]
    Api { code: i64, message: String },

    /// Response body was not the expected JSON shape.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl TransportError {
    /// Returns `true` if the failure is an authorization problem that
    /// only new credentials (user action) can fix.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. }
                | Self::Auth(AuthError::InvalidCredentials { .. } | AuthError::Revoked { .. })
        )
    }

    /// Returns `true` if retrying on the next poll cycle may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unreachable(_)
            | Self::RateLimited { .. }
            | Self::Auth(AuthError::NetworkUnavailable(_)) => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The vendor error code, if the failure came from the envelope.
    pub fn api_code(&self) -> Option<i64> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}
