//! Resolves the scraping login from configuration.
//!
//! Stored credentials use the format the club's WordPress install wrote:
//! `base64(base64(AES-256-CBC(plaintext)))` with PKCS#7 padding. The key is
//! the secret's first 32 bytes and the IV its first 16 bytes, both
//! zero-padded when the secret is shorter.

use aes::Aes256;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use std::fmt;

use crate::config::Config;
use crate::constants::env_vars;
use crate::error::AppError;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const BLOCK_SIZE: usize = 16;

/// Plaintext login for the source site. Only ever held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Produces the credentials for one run.
pub trait CredentialSource: Send + Sync {
    fn resolve_credentials(&self) -> Result<Credentials, AppError>;
}

/// Fixed credentials, for tests and callers that manage secrets themselves.
#[derive(Debug, Clone)]
pub struct StaticCredentials(pub Credentials);

impl StaticCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        StaticCredentials(Credentials::new(username, password))
    }
}

impl CredentialSource for StaticCredentials {
    fn resolve_credentials(&self) -> Result<Credentials, AppError> {
        non_empty(self.0.clone())
    }
}

/// Credentials taken from [`Config`].
///
/// Plaintext `username`/`password` win. Otherwise the `encrypted_*` values
/// are decrypted with the secret in `BKGT_CREDENTIAL_KEY`.
#[derive(Clone)]
pub struct ConfigCredentials {
    username: Option<String>,
    password: Option<String>,
    encrypted_username: Option<String>,
    encrypted_password: Option<String>,
    secret: Option<String>,
}

impl ConfigCredentials {
    pub fn from_config(config: &Config) -> Self {
        ConfigCredentials {
            username: config.username.clone(),
            password: config.password.clone(),
            encrypted_username: config.encrypted_username.clone(),
            encrypted_password: config.encrypted_password.clone(),
            secret: std::env::var(env_vars::CREDENTIAL_KEY).ok(),
        }
    }

    /// Overrides the decryption secret instead of reading the environment.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }
}

impl CredentialSource for ConfigCredentials {
    fn resolve_credentials(&self) -> Result<Credentials, AppError> {
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            return non_empty(Credentials::new(username, password));
        }

        let (Some(encrypted_username), Some(encrypted_password)) =
            (&self.encrypted_username, &self.encrypted_password)
        else {
            return Err(AppError::CredentialsMissing);
        };
        let secret = self.secret.as_deref().ok_or_else(|| {
            AppError::credential_decrypt(format!(
                "{} is not set, cannot decrypt stored credentials",
                env_vars::CREDENTIAL_KEY
            ))
        })?;

        non_empty(Credentials::new(
            decrypt_credential(encrypted_username, secret)?,
            decrypt_credential(encrypted_password, secret)?,
        ))
    }
}

fn non_empty(credentials: Credentials) -> Result<Credentials, AppError> {
    if credentials.username.is_empty() || credentials.password.is_empty() {
        return Err(AppError::CredentialsMissing);
    }
    Ok(credentials)
}

fn key_and_iv(secret: &str) -> ([u8; 32], [u8; BLOCK_SIZE]) {
    let bytes = secret.as_bytes();
    let mut key = [0u8; 32];
    let key_len = bytes.len().min(key.len());
    key[..key_len].copy_from_slice(&bytes[..key_len]);

    let mut iv = [0u8; BLOCK_SIZE];
    let iv_len = bytes.len().min(iv.len());
    iv[..iv_len].copy_from_slice(&bytes[..iv_len]);
    (key, iv)
}

/// Encrypts a credential into its stored form.
pub fn encrypt_credential(plaintext: &str, secret: &str) -> Result<String, AppError> {
    let (key, iv) = key_and_iv(secret);
    let message = plaintext.as_bytes();

    // Room for the message plus a full padding block.
    let mut buf = vec![0u8; (message.len() / BLOCK_SIZE + 1) * BLOCK_SIZE];
    buf[..message.len()].copy_from_slice(message);

    let ciphertext = Aes256CbcEnc::new(&key.into(), &iv.into())
        .encrypt_padded_mut::<Pkcs7>(&mut buf, message.len())
        .map_err(|e| AppError::credential_decrypt(format!("AES encrypt failed: {e}")))?;

    let inner = BASE64.encode(ciphertext);
    Ok(BASE64.encode(inner))
}

/// Decrypts a stored credential. An empty stored value decrypts to an empty
/// string.
pub fn decrypt_credential(stored: &str, secret: &str) -> Result<String, AppError> {
    let stored = stored.trim();
    if stored.is_empty() {
        return Ok(String::new());
    }

    let outer = BASE64
        .decode(stored)
        .map_err(|e| AppError::credential_decrypt(format!("outer base64 decode failed: {e}")))?;
    let mut buf = BASE64
        .decode(&outer)
        .map_err(|e| AppError::credential_decrypt(format!("inner base64 decode failed: {e}")))?;

    let (key, iv) = key_and_iv(secret);
    let plaintext = Aes256CbcDec::new(&key.into(), &iv.into())
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|e| AppError::credential_decrypt(format!("AES decrypt failed: {e}")))?;

    String::from_utf8(plaintext.to_vec())
        .map_err(|_| AppError::credential_decrypt("decrypted credential is not UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "kL8#x!2vQz@9mN4$pR7^tW1&yB6*cF3(hJ5)";

    #[test]
    fn test_encrypt_then_decrypt() {
        let stored = encrypt_credential("coach@bkgt.se", SECRET).unwrap();
        assert_ne!(stored, "coach@bkgt.se");
        assert_eq!(decrypt_credential(&stored, SECRET).unwrap(), "coach@bkgt.se");
    }

    #[test]
    fn test_block_aligned_plaintext() {
        let plaintext = "0123456789abcdef";
        let stored = encrypt_credential(plaintext, SECRET).unwrap();
        assert_eq!(decrypt_credential(&stored, SECRET).unwrap(), plaintext);
    }

    #[test]
    fn test_short_secret_is_zero_padded() {
        let stored = encrypt_credential("hunter2", "short").unwrap();
        assert_eq!(decrypt_credential(&stored, "short").unwrap(), "hunter2");
    }

    #[test]
    fn test_wrong_secret_fails() {
        let stored = encrypt_credential("hunter2", SECRET).unwrap();
        let result = decrypt_credential(&stored, "a completely different secret!!");
        // Either the padding check or the UTF-8 check rejects it.
        if let Ok(value) = result {
            assert_ne!(value, "hunter2");
        }
    }

    #[test]
    fn test_garbage_is_decrypt_error() {
        let err = decrypt_credential("not base64 at all!", SECRET).unwrap_err();
        assert!(matches!(err, AppError::CredentialDecrypt(_)));
        assert!(err.is_auth_error());
    }

    #[test]
    fn test_empty_stored_value() {
        assert_eq!(decrypt_credential("", SECRET).unwrap(), "");
    }

    #[test]
    fn test_debug_redacts_password() {
        let credentials = Credentials::new("coach", "hunter2");
        let debug = format!("{credentials:?}");
        assert!(debug.contains("coach"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_plaintext_config_wins() {
        let config = Config {
            username: Some("coach".to_string()),
            password: Some("hunter2".to_string()),
            encrypted_username: Some("ignored".to_string()),
            encrypted_password: Some("ignored".to_string()),
            ..Config::default()
        };
        let credentials = ConfigCredentials::from_config(&config)
            .resolve_credentials()
            .unwrap();
        assert_eq!(credentials, Credentials::new("coach", "hunter2"));
    }

    #[test]
    fn test_encrypted_config_is_decrypted() {
        let config = Config {
            encrypted_username: Some(encrypt_credential("coach", SECRET).unwrap()),
            encrypted_password: Some(encrypt_credential("hunter2", SECRET).unwrap()),
            ..Config::default()
        };
        let credentials = ConfigCredentials::from_config(&config)
            .with_secret(SECRET)
            .resolve_credentials()
            .unwrap();
        assert_eq!(credentials, Credentials::new("coach", "hunter2"));
    }

    #[test]
    fn test_missing_credentials() {
        let source = ConfigCredentials::from_config(&Config::default());
        assert!(matches!(
            source.resolve_credentials(),
            Err(AppError::CredentialsMissing)
        ));
    }

    #[test]
    fn test_empty_password_is_missing() {
        let source = StaticCredentials::new("coach", "");
        assert!(matches!(
            source.resolve_credentials(),
            Err(AppError::CredentialsMissing)
        ));
    }
}
