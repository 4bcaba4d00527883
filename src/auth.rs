//! Bearer-token checks and loading of the expected token from a credentials file.
//!
//! The credentials file is a JSON document of the form
//! `{"tokens": {"access_token": "..."}}`.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::config::home_dir;
use crate::error::{ProxyError, Result};

#[derive(Debug, Default, Deserialize)]
struct AuthFile {
    #[serde(default)]
    tokens: Option<AuthTokens>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthTokens {
    #[serde(default)]
    access_token: Option<String>,
}

/// `$CODEX_HOME/auth.json`, falling back to `~/.config/codex/auth.json`.
pub fn default_credentials_path() -> Option<PathBuf> {
    let codex_home = match std::env::var_os("CODEX_HOME") {
        Some(dir) => PathBuf::from(dir),
        None => home_dir()?.join(".config").join("codex"),
    };
    Some(codex_home.join("auth.json"))
}

/// Read the access token from a credentials file.
///
/// A missing file, a missing field or an empty token all yield `Ok(None)`.
///
/// # Errors
/// Returns an error when the file exists but cannot be read or is not valid JSON.
pub fn load_access_token(path: &Path) -> Result<Option<String>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let file: AuthFile = serde_json::from_str(&text)?;
    Ok(file
        .tokens
        .and_then(|t| t.access_token)
        .filter(|t| !t.is_empty()))
}

/// Extract the token from an `authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token)
}

/// Check the request's bearer token against the expected one.
///
/// With no expected token configured every request is rejected.
///
/// # Errors
/// Returns `ProxyError::Unauthorized` on a missing or mismatched token.
pub fn authorize(headers: &HeaderMap, expected: Option<&str>) -> Result<()> {
    match (bearer_token(headers), expected) {
        (Some(token), Some(expected)) if token == expected => Ok(()),
        _ => Err(ProxyError::Unauthorized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn headers_with(auth: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        headers
    }

    #[test]
    fn test_load_access_token() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, r#"{{"tokens": {{"access_token": "Access Token", "refresh_token": "r"}}}}"#)
            .unwrap();

        let token = load_access_token(f.path()).unwrap();
        assert_eq!(token.as_deref(), Some("Access Token"));
    }

    #[test]
    fn test_missing_file_or_field_means_no_token() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_access_token(&dir.path().join("auth.json")).unwrap(), None);

        let mut f = NamedTempFile::new().unwrap();
        write!(f, r#"{{"tokens": {{"access_token": ""}}, "other": 1}}"#).unwrap();
        assert_eq!(load_access_token(f.path()).unwrap(), None);

        let mut f = NamedTempFile::new().unwrap();
        write!(f, "{{}}").unwrap();
        assert_eq!(load_access_token(f.path()).unwrap(), None);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "not json").unwrap();
        assert!(load_access_token(f.path()).is_err());
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&headers_with("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers_with("bearer Access Token")), Some("Access Token"));
        assert_eq!(bearer_token(&headers_with("Basic abc")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_authorize() {
        assert!(authorize(&headers_with("Bearer secret"), Some("secret")).is_ok());
        assert!(authorize(&headers_with("Bearer wrong"), Some("secret")).is_err());
        assert!(authorize(&HeaderMap::new(), Some("secret")).is_err());
        assert!(authorize(&headers_with("Bearer secret"), None).is_err());
    }
}
