// Panel API HTTP client
//
// Wraps `reqwest::Client` with panel-specific URL construction, bearer
// token injection, and error-envelope handling. The `AlarmApi` trait is
// the seam the core crate depends on; `HttpClient` is the production
// implementation.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, trace};
use url::Url;

use crate::auth::{Session, SystemId};
use crate::error::Error;
use crate::models::{ActionRequest, ErrorEnvelope, LoginResponse, SystemState};
use crate::transport::TransportConfig;

/// Remote operations the adapter needs from a panel service.
///
/// All calls are fallible and async. Implementations must be shareable
/// across the poll task and command callers.
#[async_trait]
pub trait AlarmApi: Send + Sync {
    /// Authenticate and return a session listing the account's systems.
    async fn login(
        &self,
        username: &str,
        password: &SecretString,
        provider: Option<&str>,
    ) -> Result<Session, Error>;

    /// Fetch the current state of one system.
    async fn get_state(&self, system: &SystemId, session: &Session)
    -> Result<SystemState, Error>;

    async fn arm_away(
        &self,
        system: &SystemId,
        session: &Session,
        pin: Option<&SecretString>,
    ) -> Result<(), Error>;

    async fn arm_stay(
        &self,
        system: &SystemId,
        session: &Session,
        pin: Option<&SecretString>,
    ) -> Result<(), Error>;

    async fn disarm(
        &self,
        system: &SystemId,
        session: &Session,
        pin: Option<&SecretString>,
    ) -> Result<(), Error>;
}

/// Raw HTTP client for the panel JSON API.
///
/// Endpoints (relative to `base_url`):
/// - `POST api/login`
/// - `GET  api/systems/{id}/state`
/// - `POST api/systems/{id}/arm-away` | `arm-stay` | `disarm`
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The panel service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/api/{path}`, tolerating a trailing slash on the base.
    fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/api/{path}"))?)
    }

    fn system_url(&self, system: &SystemId, action: &str) -> Result<Url, Error> {
        self.api_url(&format!("systems/{}/{action}", system.as_str()))
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn send_action(
        &self,
        action: &str,
        system: &SystemId,
        session: &Session,
        pin: Option<&SecretString>,
    ) -> Result<(), Error> {
        let url = self.system_url(system, action)?;
        debug!(system = %system, has_pin = pin.is_some(), "POST {}", url);

        let body = ActionRequest {
            pin: pin.map(|p| p.expose_secret()),
        };
        let resp = self
            .http
            .post(url)
            .bearer_auth(session.token().expose_secret())
            .json(&body)
            .send()
            .await?;

        let _ = self.read_body(resp).await?;
        Ok(())
    }

    async fn parse_json<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, Error> {
        let body = self.read_body(resp).await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview = preview(&body);
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }

    /// Check status and the in-band error envelope, returning the raw body.
    async fn read_body(&self, resp: reqwest::Response) -> Result<String, Error> {
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "session expired or invalid credentials".into(),
            });
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: preview(&body),
            });
        }

        let body = resp.text().await?;
        trace!(len = body.len(), "response body received");

        // Gateways sometimes return `{"error":{"code":N,"message":"..."}}` with HTTP 200.
        if let Ok(ErrorEnvelope { error: Some(err) }) = serde_json::from_str::<ErrorEnvelope>(&body) {
            let message = err.message.unwrap_or_default();
            return Err(if err.code == 401 {
                Error::Authentication { message }
            } else {
                Error::Api {
                    status: err.code,
                    message,
                }
            });
        }

        Ok(body)
    }
}

/// First 200 characters of a response body, for error messages.
fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}

#[async_trait]
impl AlarmApi for HttpClient {
    async fn login(
        &self,
        username: &str,
        password: &SecretString,
        provider: Option<&str>,
    ) -> Result<Session, Error> {
        let url = self.api_url("login")?;
        debug!("logging in at {}", url);

        let mut body = json!({
            "username": username,
            "password": password.expose_secret(),
        });
        if let Some(provider) = provider.filter(|p| !p.is_empty()) {
            body["provider"] = json!(provider);
        }

        let resp = self.http.post(url).json(&body).send().await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status}): {body}"),
            });
        }

        let login: LoginResponse = self.parse_json(resp).await?;
        debug!(systems = login.systems.len(), "login successful");

        Ok(Session::new(
            SecretString::from(login.token),
            login.systems.into_iter().map(SystemId::new).collect(),
        ))
    }

    async fn get_state(
        &self,
        system: &SystemId,
        session: &Session,
    ) -> Result<SystemState, Error> {
        let url = self.system_url(system, "state")?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .bearer_auth(session.token().expose_secret())
            .send()
            .await?;

        self.parse_json(resp).await
    }

    async fn arm_away(
        &self,
        system: &SystemId,
        session: &Session,
        pin: Option<&SecretString>,
    ) -> Result<(), Error> {
        self.send_action("arm-away", system, session, pin).await
    }

    async fn arm_stay(
        &self,
        system: &SystemId,
        session: &Session,
        pin: Option<&SecretString>,
    ) -> Result<(), Error> {
        self.send_action("arm-stay", system, session, pin).await
    }

    async fn disarm(
        &self,
        system: &SystemId,
        session: &Session,
        pin: Option<&SecretString>,
    ) -> Result<(), Error> {
        self.send_action("disarm", system, session, pin).await
    }
}
