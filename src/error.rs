use thiserror::Error;

use crate::store::RunKind;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    // Authentication errors
    #[error("Failed to access login page {url}: {message}")]
    LoginPageUnreachable { url: String, message: String },

    #[error("Login request failed: {message}")]
    LoginSubmitFailed { message: String },

    #[error("Login credentials incorrect or login failed")]
    InvalidCredentials,

    #[error("Scraping credentials not configured")]
    CredentialsMissing,

    #[error("Failed to decrypt stored credential: {0}")]
    CredentialDecrypt(String),

    // Fetch errors
    #[error("Network timeout while fetching: {url}")]
    NetworkTimeout { url: String },

    #[error("Connection failed to: {url} - {message}")]
    NetworkConnection { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Empty response from URL: {url}")]
    EmptyResponse { url: String },

    // Storage
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("A {kind} scrape is already running")]
    RunInProgress { kind: RunKind },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Log setup error: {0}")]
    LogSetup(String),
}

impl AppError {
    /// Create a configuration error with context
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a log setup error with context
    pub fn log_setup_error(msg: impl Into<String>) -> Self {
        Self::LogSetup(msg.into())
    }

    pub fn login_page_unreachable(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LoginPageUnreachable {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn login_submit_failed(message: impl Into<String>) -> Self {
        Self::LoginSubmitFailed {
            message: message.into(),
        }
    }

    pub fn credential_decrypt(msg: impl Into<String>) -> Self {
        Self::CredentialDecrypt(msg.into())
    }

    /// Create a network timeout error
    pub fn network_timeout(url: impl Into<String>) -> Self {
        Self::NetworkTimeout { url: url.into() }
    }

    /// Create a network connection error
    pub fn network_connection(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NetworkConnection {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn http_status(status: u16, url: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
        }
    }

    pub fn empty_response(url: impl Into<String>) -> Self {
        Self::EmptyResponse { url: url.into() }
    }

    pub fn storage_error(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Maps a transport-level reqwest error onto the fetch error variants.
    pub fn from_transport(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network_timeout(url)
        } else if err.is_connect() {
            Self::network_connection(url, err.to_string())
        } else {
            Self::Http(err)
        }
    }

    /// Errors that abort a whole run: the session could not be established.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            AppError::LoginPageUnreachable { .. }
                | AppError::LoginSubmitFailed { .. }
                | AppError::InvalidCredentials
                | AppError::CredentialsMissing
                | AppError::CredentialDecrypt(_)
        )
    }

    /// Errors scoped to a single page fetch.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            AppError::NetworkTimeout { .. }
                | AppError::NetworkConnection { .. }
                | AppError::HttpStatus { .. }
                | AppError::EmptyResponse { .. }
                | AppError::Http(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_helper() {
        let error = AppError::config_error("Invalid configuration");
        assert!(matches!(error, AppError::Config(_)));
        assert_eq!(
            error.to_string(),
            "Configuration error: Invalid configuration"
        );
    }

    #[test]
    fn test_login_page_unreachable_helper() {
        let error =
            AppError::login_page_unreachable("https://example.com/login", "connection refused");
        assert!(error.is_auth_error());
        assert!(!error.is_fetch_error());
        assert_eq!(
            error.to_string(),
            "Failed to access login page https://example.com/login: connection refused"
        );
    }

    #[test]
    fn test_invalid_credentials_message() {
        assert_eq!(
            AppError::InvalidCredentials.to_string(),
            "Login credentials incorrect or login failed"
        );
    }

    #[test]
    fn test_fetch_error_classification() {
        let fetch_errors = vec![
            AppError::network_timeout("https://example.com"),
            AppError::network_connection("https://example.com", "refused"),
            AppError::http_status(404, "https://example.com/matcher"),
            AppError::empty_response("https://example.com"),
        ];

        for error in fetch_errors {
            assert!(error.is_fetch_error(), "{error:?} should be a fetch error");
            assert!(!error.is_auth_error(), "{error:?} should not be an auth error");
        }
    }

    #[test]
    fn test_auth_error_classification() {
        let auth_errors = vec![
            AppError::login_page_unreachable("url", "down"),
            AppError::login_submit_failed("reset"),
            AppError::InvalidCredentials,
            AppError::CredentialsMissing,
            AppError::credential_decrypt("bad padding"),
        ];

        for error in auth_errors {
            assert!(error.is_auth_error(), "{error:?} should be an auth error");
            assert!(!error.is_fetch_error(), "{error:?} should not be a fetch error");
        }
    }

    #[test]
    fn test_run_in_progress_display() {
        let error = AppError::RunInProgress {
            kind: RunKind::Players,
        };
        assert_eq!(error.to_string(), "A players scrape is already running");
    }

    #[test]
    fn test_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let app_error: AppError = io_error.into();
        assert!(matches!(app_error, AppError::Io(_)));
    }

    #[test]
    fn test_error_from_toml_deserialize() {
        let invalid_toml = "invalid = [toml";
        let toml_error = toml::from_str::<toml::Table>(invalid_toml).unwrap_err();
        let app_error: AppError = toml_error.into();
        assert!(matches!(app_error, AppError::TomlDeserialize(_)));
    }

    #[test]
    fn test_error_from_reqwest_is_fetch_error() {
        let client = reqwest::Client::new();
        match client.get("not a valid url").build() {
            Err(reqwest_error) => {
                let app_error: AppError = reqwest_error.into();
                assert!(matches!(app_error, AppError::Http(_)));
                assert!(app_error.is_fetch_error());
            }
            Ok(_) => panic!("Expected an error from invalid URL"),
        }
    }
}
