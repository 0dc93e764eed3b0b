//! HTTP client creation and configuration utilities

use reqwest::Client;
use reqwest::redirect::Policy;
use std::time::Duration;

use crate::constants::{DEFAULT_HTTP_TIMEOUT_SECONDS, HTTP_POOL_MAX_IDLE_PER_HOST, USER_AGENT};

/// Creates the client used for page fetches.
///
/// # Features
/// * Fixed timeout for every request (default: 30 seconds, configurable via config/env)
/// * Connection pooling with centralized pool size configuration
/// * Redirects followed, so a bounce to the login page surfaces as a body
///   the fetcher can inspect for the session-expired marker
pub fn create_http_client_with_timeout(timeout_seconds: u64) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .pool_max_idle_per_host(HTTP_POOL_MAX_IDLE_PER_HOST)
        .user_agent(USER_AGENT)
        .build()
}

/// Creates the client used for the login handshake.
///
/// Redirects are not followed: the site answers a successful login with a
/// redirect whose `Set-Cookie` headers carry the session.
pub fn create_login_client(timeout_seconds: u64) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .redirect(Policy::none())
        .user_agent(USER_AGENT)
        .build()
}

/// Creates an HTTP client for testing with default timeout
#[cfg(test)]
pub fn create_test_http_client() -> Client {
    create_http_client_with_timeout(DEFAULT_HTTP_TIMEOUT_SECONDS)
        .expect("Failed to create test HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clients_build() {
        let _ = create_test_http_client();
        assert!(create_login_client(DEFAULT_HTTP_TIMEOUT_SECONDS).is_ok());
    }
}
