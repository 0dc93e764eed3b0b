//! Login handshake against the source site.

use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};

use super::http_client::create_login_client;
use super::session::Session;
use crate::config::{Config, Heuristics};
use crate::credentials::Credentials;
use crate::error::AppError;

/// Performs the login handshake and hands out fresh sessions.
///
/// Every call to [`Authenticator::authenticate`] is a full login from
/// scratch, so it doubles as re-authentication.
#[derive(Debug, Clone)]
pub struct Authenticator {
    client: Client,
    login_url: String,
    heuristics: Heuristics,
}

impl Authenticator {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Ok(Authenticator {
            client: create_login_client(config.http_timeout_seconds)?,
            login_url: config.login_url.clone(),
            heuristics: config.heuristics.clone(),
        })
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    /// Logs in and returns the cookies the site issued.
    ///
    /// # Errors
    /// * `LoginPageUnreachable` - the login page could not be fetched
    /// * `LoginSubmitFailed` - the form POST failed at the transport level or with a server error
    /// * `InvalidCredentials` - the site rejected the login
    #[instrument(skip(self, credentials), fields(login_url = %self.login_url))]
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Session, AppError> {
        debug!("Fetching login page");
        let page = self
            .client
            .get(&self.login_url)
            .send()
            .await
            .map_err(|e| AppError::login_page_unreachable(&self.login_url, e.to_string()))?;

        let status = page.status();
        // The login page is not expected to redirect, but a 3xx still has no form.
        if !status.is_success() {
            return Err(AppError::login_page_unreachable(
                &self.login_url,
                format!("HTTP {status}"),
            ));
        }
        let login_html = page
            .text()
            .await
            .map_err(|e| AppError::login_page_unreachable(&self.login_url, e.to_string()))?;

        let token = extract_csrf_token(&login_html, &self.heuristics.csrf_field_names);
        if token.is_none() {
            debug!("No anti-forgery token on login page, submitting without one");
        }

        let mut form = vec![
            (
                self.heuristics.username_field.as_str(),
                credentials.username.as_str(),
            ),
            (
                self.heuristics.password_field.as_str(),
                credentials.password.as_str(),
            ),
        ];
        if let Some(token) = token.as_deref() {
            form.push((self.heuristics.token_field.as_str(), token));
        }

        // Submitted without any cookie from the page fetch.
        let response = self
            .client
            .post(&self.login_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::login_submit_failed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!("Login rejected with HTTP {status}");
            return Err(AppError::InvalidCredentials);
        }
        if status.is_client_error() || status.is_server_error() {
            return Err(AppError::login_submit_failed(format!("HTTP {status}")));
        }

        let session = Session::from_headers(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| AppError::login_submit_failed(e.to_string()))?;

        if login_rejected(&body, &self.heuristics.login_failure_markers) {
            warn!("Login response matched the failure markers");
            return Err(AppError::InvalidCredentials);
        }

        info!("Logged in, {} session cookie(s)", session.cookies().len());
        Ok(session)
    }
}

/// Looks for the anti-forgery token in the login form, trying each hidden
/// input name in order.
pub fn extract_csrf_token(html: &str, field_names: &[String]) -> Option<String> {
    let document = Html::parse_document(html);
    field_names.iter().find_map(|name| {
        let selector = Selector::parse(&format!("input[name=\"{name}\"]")).ok()?;
        document
            .select(&selector)
            .filter_map(|input| input.value().attr("value"))
            .find(|value| !value.is_empty())
            .map(str::to_string)
    })
}

/// A login is treated as rejected when the body contains every marker.
/// An empty marker list never rejects.
pub fn login_rejected(body: &str, markers: &[String]) -> bool {
    !markers.is_empty() && markers.iter().all(|marker| body.contains(marker.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing_utils::{login_page, login_page_with_token};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn field_names() -> Vec<String> {
        Heuristics::default().csrf_field_names
    }

    fn config_for(server: &MockServer) -> Config {
        Config {
            login_url: format!("{}/login", server.uri()),
            ..Config::default()
        }
    }

    #[test]
    fn test_extract_csrf_token_in_order() {
        let html = r#"<form>
            <input type="hidden" name="_csrf" value="third">
            <input type="hidden" name="csrf_token" value="second">
        </form>"#;
        assert_eq!(
            extract_csrf_token(html, &field_names()).as_deref(),
            Some("second")
        );
    }

    #[test]
    fn test_extract_csrf_token_absent() {
        assert_eq!(extract_csrf_token(&login_page(), &field_names()), None);
        assert_eq!(extract_csrf_token("<html><body", &field_names()), None);
    }

    #[test]
    fn test_login_rejected_needs_all_markers() {
        let markers = Heuristics::default().login_failure_markers;
        assert!(login_rejected("login error: wrong password", &markers));
        assert!(!login_rejected("welcome back, see your login history", &markers));
        assert!(!login_rejected("an error occurred", &markers));
        assert!(!login_rejected("login error", &[]));
    }

    #[tokio::test]
    async fn test_authenticate_posts_token_and_captures_cookies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string(login_page_with_token("tok-42")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_string_contains("username=coach"))
            .and(body_string_contains("_token=tok-42"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", "/bkgt")
                    .append_header("Set-Cookie", "sl_session=abc; Path=/")
                    .append_header("Set-Cookie", "remember=1; Path=/"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let authenticator = Authenticator::new(&config_for(&server)).unwrap();
        let session = authenticator
            .authenticate(&Credentials::new("coach", "hunter2"))
            .await
            .unwrap();

        assert_eq!(session.cookies().len(), 2);
        assert_eq!(
            session.cookie_header("127.0.0.1").as_deref(),
            Some("sl_session=abc; remember=1")
        );
    }

    #[tokio::test]
    async fn test_authenticate_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string(login_page()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>Välkommen</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let authenticator = Authenticator::new(&config_for(&server)).unwrap();
        let session = authenticator
            .authenticate(&Credentials::new("coach", "hunter2"))
            .await;
        assert!(session.is_ok());
    }

    #[tokio::test]
    async fn test_authenticate_rejected_by_markers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string(login_page()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<div class=\"login error\">Fel lösenord</div>"),
            )
            .mount(&server)
            .await;

        let authenticator = Authenticator::new(&config_for(&server)).unwrap();
        let err = authenticator
            .authenticate(&Credentials::new("coach", "wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_authenticate_login_page_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let authenticator = Authenticator::new(&config_for(&server)).unwrap();
        let err = authenticator
            .authenticate(&Credentials::new("coach", "hunter2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LoginPageUnreachable { .. }));
        assert!(err.is_auth_error());
    }

    #[tokio::test]
    async fn test_authenticate_forbidden_is_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string(login_page()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let authenticator = Authenticator::new(&config_for(&server)).unwrap();
        let err = authenticator
            .authenticate(&Credentials::new("coach", "hunter2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }
}
