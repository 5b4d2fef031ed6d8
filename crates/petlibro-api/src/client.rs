// Authenticated cloud transport
//
// Wraps `reqwest::Client` with token injection, `{code, msg, data}`
// envelope unwrapping, and the one-shot re-login retry. Endpoint methods
// live in `endpoints/` as inherent methods on `CloudClient` to keep this
// module focused on transport mechanics.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::auth::Session;
use crate::error::TransportError;
use crate::models::{CODE_NOT_LOGGED_IN, CODE_OK, Envelope};
use crate::session::{AuthSession, TokenSource};
use crate::transport::endpoint_url;

/// Seconds to wait when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// HTTP client for the authenticated PETLIBRO cloud API.
///
/// Every call asks the [`TokenSource`] for a valid session first. An
/// authorization failure (HTTP 401 or envelope code 1009) forces exactly one
/// renewal and one retry. Nothing is cached.
#[derive(Clone)]
pub struct CloudClient {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<dyn TokenSource>,
}

impl CloudClient {
    /// Create a client sharing the session's HTTP client and base URL.
    pub fn new(session: Arc<AuthSession>) -> Self {
        let http = session.http().clone();
        let base_url = session.base_url().clone();
        Self {
            http,
            base_url,
            session,
        }
    }

    /// Create a client over any token source with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        session: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            http,
            base_url,
            session,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Request path ─────────────────────────────────────────────────

    /// Send one authenticated request and return the unwrapped `data`.
    ///
    /// `data` is `Value::Null` when the envelope omits it.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let url = endpoint_url(&self.base_url, path);
        let session = self.session.ensure_valid().await?;

        match self.send_once(&session, &method, &url, payload).await {
            Err(TransportError::Unauthorized { message }) => {
                warn!(path, %message, "request unauthorized, renewing session once");
                let renewed = self.session.renew(&session).await?;
                self.send_once(&renewed, &method, &url, payload).await
            }
            other => other,
        }
    }

    /// `request(POST, ..)` followed by typed decoding of `data`.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, TransportError> {
        let data = self.request(Method::POST, path, Some(body)).await?;
        decode_data(data)
    }

    async fn send_once(
        &self,
        session: &Session,
        method: &Method,
        url: &Url,
        payload: Option<&Value>,
    ) -> Result<Value, TransportError> {
        debug!("{method} {url}");

        let mut builder = self
            .http
            .request(method.clone(), url.clone())
            .header("token", session.token());
        if let Some(body) = payload {
            builder = builder.json(body);
        }
        let resp = builder.send().await.map_err(TransportError::Unreachable)?;

        parse_envelope(resp).await
    }
}

/// Map the HTTP status, then unwrap the `{ code, msg, data }` envelope.
async fn parse_envelope(resp: reqwest::Response) -> Result<Value, TransportError> {
    let status = resp.status();

    if status == StatusCode::UNAUTHORIZED {
        return Err(TransportError::Unauthorized {
            message: "HTTP 401".into(),
        });
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return Err(TransportError::RateLimited { retry_after_secs });
    }

    let body = resp.text().await.map_err(TransportError::Unreachable)?;

    if !status.is_success() {
        return Err(TransportError::Http {
            status: status.as_u16(),
            message: preview(&body).to_owned(),
        });
    }

    let envelope: Envelope =
        serde_json::from_str(&body).map_err(|e| TransportError::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body: body.clone(),
        })?;

    match envelope.code {
        CODE_OK => Ok(envelope.data.unwrap_or(Value::Null)),
        CODE_NOT_LOGGED_IN => Err(TransportError::Unauthorized {
            message: envelope.message(),
        }),
        code => Err(TransportError::Api {
            code,
            message: envelope.message(),
        }),
    }
}

pub(crate) fn decode_data<T: DeserializeOwned>(data: Value) -> Result<T, TransportError> {
    serde_json::from_value(data.clone()).map_err(|e| TransportError::Deserialization {
        message: e.to_string(),
        body: data.to_string(),
    })
}

fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
