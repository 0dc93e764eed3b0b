//! Session-carrying page fetches with a single re-login on expiry.

use reqwest::Client;
use reqwest::header::COOKIE;
use tracing::{debug, info, instrument, warn};

use super::auth::Authenticator;
use super::session::Session;
use crate::credentials::Credentials;
use crate::error::AppError;

/// Fetches members pages with the current session's cookies.
pub struct AuthenticatedFetcher {
    client: Client,
    authenticator: Authenticator,
    credentials: Credentials,
    expired_markers: Vec<String>,
}

impl AuthenticatedFetcher {
    pub fn new(
        client: Client,
        authenticator: Authenticator,
        credentials: Credentials,
        expired_markers: Vec<String>,
    ) -> Self {
        AuthenticatedFetcher {
            client,
            authenticator,
            credentials,
            expired_markers,
        }
    }

    /// Logs in with the run's credentials.
    pub async fn login(&self) -> Result<Session, AppError> {
        self.authenticator.authenticate(&self.credentials).await
    }

    /// Fetches `url` and returns its body.
    ///
    /// When the body shows the session has expired, logs in again, stores the
    /// new session in `session` and repeats the request once. The second
    /// response is returned as is.
    ///
    /// # Errors
    /// * Fetch errors from either attempt
    /// * Auth errors from the re-login
    #[instrument(skip(self, session))]
    pub async fn fetch(&self, url: &str, session: &mut Session) -> Result<String, AppError> {
        let body = self.get(url, session).await?;
        if !self.is_session_expired(&body) {
            return Ok(body);
        }

        info!("Session expired while fetching {url}, logging in again");
        *session = self.login().await?;

        let body = self.get(url, session).await?;
        if self.is_session_expired(&body) {
            warn!("Still looks logged out after re-login: {url}");
        }
        Ok(body)
    }

    fn is_session_expired(&self, body: &str) -> bool {
        self.expired_markers
            .iter()
            .any(|marker| !marker.is_empty() && body.contains(marker.as_str()))
    }

    async fn get(&self, url: &str, session: &Session) -> Result<String, AppError> {
        let mut request = self.client.get(url);
        let host = reqwest::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        if let Some(cookie_header) = session.cookie_header(&host) {
            request = request.header(COOKIE, cookie_header);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::from_transport(url, e))?;

        let status = response.status();
        debug!("GET {url} -> {status}");
        if !status.is_success() {
            return Err(AppError::http_status(status.as_u16(), url));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::from_transport(url, e))?;
        if body.trim().is_empty() {
            return Err(AppError::empty_response(url));
        }
        Ok(body)
    }
}
