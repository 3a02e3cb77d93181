use thiserror::Error;
use url::Url;

/// The resource a request asks to reach, as reported by the reverse proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    pub url: Url,
    pub method: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ObjectError {
    #[error("header '{0}' is empty")]
    MissingHeader(&'static str),

    #[error("header '{header}' with value '{value}' has invalid characters")]
    InvalidMethod { header: &'static str, value: String },

    #[error("failed to parse {source_name}: value contains control characters")]
    ControlCharacters { source_name: &'static str },

    #[error("failed to parse {source_name} '{value}': {reason}")]
    InvalidUrl {
        source_name: &'static str,
        value: String,
        reason: String,
    },
}

impl Object {
    pub fn new(url: Url, method: impl Into<String>) -> Self {
        Self {
            url,
            method: method.into(),
        }
    }

    /// Lowercased host of the target, without port.
    pub fn domain(&self) -> String {
        self.url.host_str().unwrap_or_default().to_lowercase()
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Session cookies are only ever issued for secure channels.
    pub fn is_secure(&self) -> bool {
        matches!(self.url.scheme(), "https" | "wss")
    }
}

/// Methods are matched against access rules verbatim, so only plain
/// uppercase ASCII letters are accepted.
pub fn has_invalid_method_chars(method: &str) -> bool {
    method.bytes().any(|b| !b.is_ascii_uppercase())
}

pub fn validate_method(header: &'static str, method: &str) -> Result<(), ObjectError> {
    if has_invalid_method_chars(method) {
        return Err(ObjectError::InvalidMethod {
            header,
            value: method.to_string(),
        });
    }
    Ok(())
}

/// Parse an absolute target URL taken from proxy headers.
pub fn parse_target_url(source_name: &'static str, raw: &str) -> Result<Url, ObjectError> {
    if raw.chars().any(|c| c.is_ascii_control()) {
        return Err(ObjectError::ControlCharacters { source_name });
    }

    let invalid = |reason: String| ObjectError::InvalidUrl {
        source_name,
        value: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(invalid(String::from("missing host"))),
    }
}

pub fn friendly_method(method: &str) -> String {
    if method.is_empty() {
        return String::from("unknown");
    }
    method.to_string()
}
