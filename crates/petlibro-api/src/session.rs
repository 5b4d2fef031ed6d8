// Cloud session lifecycle
//
// Exchanges credentials for a token, keeps the credentials for transparent
// renewal, and serializes every renewal behind one async mutex. The
// generation counter lets a caller that queued behind an in-flight renewal
// see that the token it held has already been replaced and skip its own
// login. A rejected renewal is remembered the same way: callers holding a
// token no newer than the rejected attempt get `Revoked` without another
// login, until fresh credentials arrive through `login` or
// `set_credentials`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::json;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{Credentials, Region, Session};
use crate::error::{AuthError, TransportError};
use crate::models::{CODE_OK, Envelope, LoginData};
use crate::transport::{TransportConfig, endpoint_url};

/// Validity window assumed for a fresh token. The cloud does not report one.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Fixed app serial the mobile app sends at login.
const APP_SN: &str = "c35772530d1041699c87fe62348507a8";

/// The seam [`CloudClient`](crate::CloudClient) authenticates through.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Return a valid session, logging in again if the current token is
    /// missing or expired.
    async fn ensure_valid(&self) -> Result<Session, AuthError>;

    /// Replace `stale` after the server rejected it. Returns the already
    /// renewed session if another caller got there first.
    async fn renew(&self, stale: &Session) -> Result<Session, AuthError>;
}

/// The single authorized session for one PETLIBRO account.
pub struct AuthSession {
    http: reqwest::Client,
    base_url: Url,
    region: Region,
    time_zone: String,
    ttl: Duration,
    credentials: RwLock<Option<Credentials>>,
    current: RwLock<Option<Session>>,
    renewal: Mutex<()>,
    generation: AtomicU64,
    rejected: RwLock<Option<RejectedRenewal>>,
    closed: CancellationToken,
}

/// A renewal the cloud refused, and the newest generation it covered.
#[derive(Debug, Clone)]
struct RejectedRenewal {
    generation: u64,
    message: String,
}

impl AuthSession {
    /// Create a session for `region`, building an HTTP client from `transport`.
    pub fn new(
        base_url: Url,
        region: Region,
        transport: &TransportConfig,
    ) -> Result<Self, TransportError> {
        let http = transport.build_client()?;
        Ok(Self::with_client(
            http,
            base_url,
            region,
            transport.time_zone.clone(),
        ))
    }

    /// Create a session around a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        region: Region,
        time_zone: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url,
            region,
            time_zone: time_zone.into(),
            ttl: DEFAULT_SESSION_TTL,
            credentials: RwLock::new(None),
            current: RwLock::new(None),
            renewal: Mutex::new(()),
            generation: AtomicU64::new(0),
            rejected: RwLock::new(None),
            closed: CancellationToken::new(),
        }
    }

    /// Override the assumed token validity window.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The underlying HTTP client, shared with the request transport.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Number of successful logins performed so far.
    pub fn login_count(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// The current session, if one has been issued and not cleared.
    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Exchange `credentials` for a token.
    ///
    /// On success the credentials are retained for renewal until
    /// [`logout`](Self::logout).
    pub async fn login(&self, credentials: Credentials) -> Result<Session, AuthError> {
        let _guard = self.acquire_renewal().await?;
        let session = self.exchange(&credentials).await?;
        self.rejected.write().await.take();
        *self.credentials.write().await = Some(credentials);
        *self.current.write().await = Some(session.clone());
        Ok(session)
    }

    /// Store credentials without logging in. The first
    /// [`ensure_valid`](Self::ensure_valid) performs the login.
    pub async fn set_credentials(&self, credentials: Credentials) {
        self.rejected.write().await.take();
        *self.credentials.write().await = Some(credentials);
    }

    /// Return the current session, renewing it first if it is missing or
    /// past its validity window.
    pub async fn ensure_valid(&self) -> Result<Session, AuthError> {
        if self.is_closed() {
            return Err(AuthError::Closed);
        }
        let seen = match self.current.read().await.as_ref() {
            Some(session) if !session.is_expired() => return Ok(session.clone()),
            Some(session) => session.generation,
            None => 0,
        };
        debug!(generation = seen, "session missing or expired, renewing");
        self.relogin(seen).await
    }

    /// Force one re-login after the server rejected `stale`.
    pub async fn renew(&self, stale: &Session) -> Result<Session, AuthError> {
        debug!(generation = stale.generation, "server rejected session, renewing");
        self.relogin(stale.generation).await
    }

    /// Clear the session and credentials, then tell the cloud (best-effort).
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.credentials.write().await.take();
        let Some(session) = self.current.write().await.take() else {
            return Ok(());
        };

        let url = endpoint_url(&self.base_url, "/member/auth/logout");
        debug!("logging out of PETLIBRO cloud");
        self.http
            .post(url)
            .header("token", session.token())
            .json(&json!({}))
            .send()
            .await
            .map_err(AuthError::NetworkUnavailable)?;

        info!("logged out");
        Ok(())
    }

    /// Reject every renewal from now on, including ones already waiting.
    pub fn close(&self) {
        self.closed.cancel();
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn acquire_renewal(&self) -> Result<MutexGuard<'_, ()>, AuthError> {
        tokio::select! {
            biased;
            () = self.closed.cancelled() => Err(AuthError::Closed),
            guard = self.renewal.lock() => Ok(guard),
        }
    }

    async fn relogin(&self, stale_generation: u64) -> Result<Session, AuthError> {
        let _guard = self.acquire_renewal().await?;

        if let Some(session) = self.current.read().await.as_ref() {
            if session.generation > stale_generation && !session.is_expired() {
                debug!(
                    generation = session.generation,
                    "session already renewed by a concurrent caller"
                );
                return Ok(session.clone());
            }
        }

        if let Some(rejected) = self.rejected.read().await.as_ref() {
            if stale_generation <= rejected.generation {
                debug!(
                    generation = stale_generation,
                    "re-login already rejected for this session"
                );
                return Err(AuthError::Revoked {
                    message: rejected.message.clone(),
                });
            }
        }

        let Some(credentials) = self.credentials.read().await.clone() else {
            return Err(AuthError::Revoked {
                message: "no stored credentials, login required".into(),
            });
        };

        self.current.write().await.take();
        let session = match self.exchange(&credentials).await {
            Ok(session) => session,
            Err(AuthError::InvalidCredentials { message }) => {
                warn!(%message, "re-login rejected");
                *self.rejected.write().await = Some(RejectedRenewal {
                    generation: self.generation.load(Ordering::SeqCst),
                    message: message.clone(),
                });
                return Err(AuthError::Revoked { message });
            }
            Err(other) => return Err(other),
        };
        *self.current.write().await = Some(session.clone());
        info!(generation = session.generation, "session renewed");
        Ok(session)
    }

    /// `POST /member/auth/login`
    async fn exchange(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let url = endpoint_url(&self.base_url, "/member/auth/login");
        let body = json!({
            "appId": 1,
            "appSn": APP_SN,
            "country": self.region.country_code(),
            "email": credentials.email,
            "password": credentials.password_digest(),
            "phoneBrand": "",
            "phoneSystemVersion": "",
            "timezone": self.time_zone,
            "thirdPartyPlatform": null,
            "thirdPartyToken": null,
        });

        debug!(email = %credentials.email, "logging in to PETLIBRO cloud");
        let send = self.http.post(url).json(&body).send();
        let resp = tokio::select! {
            biased;
            () = self.closed.cancelled() => return Err(AuthError::Closed),
            resp = send => resp.map_err(AuthError::NetworkUnavailable)?,
        };

        let status = resp.status();
        if let Err(e) = resp.error_for_status_ref() {
            if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(AuthError::NetworkUnavailable(e));
            }
            return Err(AuthError::InvalidCredentials {
                message: format!("login rejected with HTTP {status}"),
            });
        }

        let text = resp.text().await.map_err(AuthError::NetworkUnavailable)?;
        let envelope: Envelope =
            serde_json::from_str(&text).map_err(|e| AuthError::InvalidCredentials {
                message: format!("unexpected login response: {e}"),
            })?;

        if envelope.code != CODE_OK {
            return Err(AuthError::InvalidCredentials {
                message: envelope.message(),
            });
        }

        let token = envelope
            .data
            .and_then(|data| serde_json::from_value::<LoginData>(data).ok())
            .map(|data| data.token)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AuthError::InvalidCredentials {
                message: "login response carried no token".into(),
            })?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(generation, "logged in to PETLIBRO cloud");
        Ok(Session::new(SecretString::from(token), self.ttl, generation))
    }
}

#[async_trait]
impl TokenSource for AuthSession {
    async fn ensure_valid(&self) -> Result<Session, AuthError> {
        AuthSession::ensure_valid(self).await
    }

    async fn renew(&self, stale: &Session) -> Result<Session, AuthError> {
        AuthSession::renew(self, stale).await
    }
}
