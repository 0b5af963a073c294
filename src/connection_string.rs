//! Connection strings for hosted chat-completion endpoints.
//!
//! A connection string packs the endpoint and the API key into one setting:
//!
//! ```text
//! Endpoint=https://my-resource.openai.azure.com/;Key=0123456789abcdef
//! ```
//!
//! Segments are separated by `;` and each segment is `Name=Value`. The names
//! `Endpoint` and `Key` are matched case-insensitively and may appear in either
//! order. A value is split at its first `=` only, so keys ending in `=` padding
//! are preserved. A single trailing `;` is accepted. Anything else is an error.
//!
//! The endpoint is the base that request paths are appended to. For Azure that
//! is the resource URL; for OpenAI it must include the API version segment,
//! e.g. `Endpoint=https://api.openai.com/v1;Key=sk-...`, since requests go to
//! `{endpoint}/chat/completions`.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{Error, Result};

const ENDPOINT: &str = "Endpoint";
const KEY: &str = "Key";

/// An endpoint and API key extracted from a connection string.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    endpoint: String,
    key: String,
}

impl ConnectionString {
    /// Creates a connection string from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionString`] if either part is empty or the
    /// endpoint is not an absolute http(s) URL.
    pub fn new(endpoint: impl Into<String>, key: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        let key = key.into();
        if endpoint.is_empty() {
            return Err(Error::connection_string("Endpoint must not be empty"));
        }
        if key.is_empty() {
            return Err(Error::connection_string("Key must not be empty"));
        }
        validate_endpoint(&endpoint)?;
        Ok(Self { endpoint, key })
    }

    /// Parses a connection string of the form `Endpoint=<url>;Key=<key>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionString`] when a segment lacks `=`, a name is
    /// unknown or repeated, either part is missing or empty, or the endpoint is
    /// not an absolute http(s) URL.
    pub fn parse(input: &str) -> Result<Self> {
        let body = input.trim();
        let body = body.strip_suffix(';').unwrap_or(body);
        if body.trim().is_empty() {
            return Err(Error::connection_string("connection string is empty"));
        }

        let mut endpoint: Option<&str> = None;
        let mut key: Option<&str> = None;
        for segment in body.split(';') {
            let segment = segment.trim();
            let Some((name, value)) = segment.split_once('=') else {
                return Err(Error::connection_string(format!(
                    "segment '{}' is not of the form Name=Value",
                    redact(segment)
                )));
            };
            let slot = if name.trim().eq_ignore_ascii_case(ENDPOINT) {
                &mut endpoint
            } else if name.trim().eq_ignore_ascii_case(KEY) {
                &mut key
            } else {
                return Err(Error::connection_string(format!(
                    "unknown setting '{}'; expected {ENDPOINT} and {KEY}",
                    name.trim()
                )));
            };
            if slot.is_some() {
                return Err(Error::connection_string(format!(
                    "setting '{}' appears more than once",
                    name.trim()
                )));
            }
            *slot = Some(value.trim());
        }

        let endpoint = endpoint.ok_or_else(|| {
            Error::connection_string(format!("missing {ENDPOINT}=<url> segment"))
        })?;
        let key =
            key.ok_or_else(|| Error::connection_string(format!("missing {KEY}=<key> segment")))?;
        Self::new(endpoint, key)
    }

    /// The endpoint URL as written in the connection string.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The API key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Splits the connection string into `(endpoint, key)`.
    pub fn into_parts(self) -> (String, String) {
        (self.endpoint, self.key)
    }
}

impl FromStr for ConnectionString {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ENDPOINT}={};{KEY}={}", self.endpoint, self.key)
    }
}

// Keep the key out of logs and panics.
impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("endpoint", &self.endpoint)
            .field("key", &"<redacted>")
            .finish()
    }
}

fn validate_endpoint(endpoint: &str) -> Result<()> {
    let url = Url::parse(endpoint).map_err(|err| {
        Error::connection_string(format!("Endpoint '{endpoint}' is not a valid URL: {err}"))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::connection_string(format!(
            "Endpoint '{endpoint}' must use http or https, not {other}"
        ))),
    }
}

/// Shortens a malformed segment for error messages; it may hold a key.
fn redact(segment: &str) -> String {
    if segment.len() <= 8 {
        "<redacted>".to_string()
    } else {
        format!("{}...", segment.chars().take(4).collect::<String>())
    }
}
