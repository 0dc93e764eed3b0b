//! Session cookies captured by a login.

use reqwest::header::{HeaderMap, SET_COOKIE};
use tracing::debug;

/// One cookie from a `Set-Cookie` header. Attributes other than domain and
/// path are dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: Option<String>,
}

impl std::fmt::Debug for Cookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cookie")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .field("domain", &self.domain)
            .field("path", &self.path)
            .finish()
    }
}

impl Cookie {
    /// Parses a `Set-Cookie` header value. Returns `None` when there is no
    /// `name=value` pair.
    pub fn parse(header: &str) -> Option<Self> {
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Cookie {
            name: name.to_string(),
            value: value.trim().trim_matches('"').to_string(),
            domain: None,
            path: None,
        };
        for attribute in parts {
            let Some((key, val)) = attribute.split_once('=') else {
                continue;
            };
            let val = val.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "domain" if !val.is_empty() => {
                    cookie.domain = Some(val.trim_start_matches('.').to_ascii_lowercase())
                }
                "path" if !val.is_empty() => cookie.path = Some(val.to_string()),
                _ => {}
            }
        }
        Some(cookie)
    }

    /// Whether the cookie should be sent to `host`. Cookies without a domain
    /// are sent everywhere the session is used.
    pub fn matches_host(&self, host: &str) -> bool {
        let Some(domain) = &self.domain else {
            return true;
        };
        let host = host.to_ascii_lowercase();
        host == *domain || host.ends_with(&format!(".{domain}"))
    }
}

/// Cookies issued by a completed login.
///
/// Only the authenticator builds one, so a `Session` value always stands for
/// an established login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    cookies: Vec<Cookie>,
}

impl Session {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Self {
        let mut session = Session::default();
        for value in headers.get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else {
                continue;
            };
            match Cookie::parse(raw) {
                Some(cookie) => session.insert(cookie),
                None => debug!("Ignoring malformed Set-Cookie header"),
            }
        }
        session
    }

    /// Later cookies with the same name, domain and path replace earlier ones.
    fn insert(&mut self, cookie: Cookie) {
        self.cookies.retain(|c| {
            !(c.name == cookie.name && c.domain == cookie.domain && c.path == cookie.path)
        });
        self.cookies.push(cookie);
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Value for a `Cookie` request header, or `None` when nothing applies.
    pub fn cookie_header(&self, host: &str) -> Option<String> {
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .filter(|c| c.matches_host(host))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        (!pairs.is_empty()).then(|| pairs.join("; "))
    }
}
