use std::fmt;
use std::time::Duration;

use anyhow::{Context, Error, Result};
use serde::{Deserialize, Serialize};

/// Strategies an endpoint can be configured with.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrategyName {
    HeaderAuthorization,
    HeaderProxyAuthorization,
    HeaderProxyAuthorizationAuthRequest,
    HeaderLegacy,
    CookieSession,
}

/// How often a cookie session reloads the user details behind it.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub enum RefreshInterval {
    Disable,
    Always,
    Every(Duration),
}

impl Default for RefreshInterval {
    fn default() -> Self {
        Self::Every(Duration::from_secs(5 * 60))
    }
}

impl TryFrom<String> for RefreshInterval {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        match s.trim() {
            "disable" => Ok(Self::Disable),
            "always" => Ok(Self::Always),
            s => {
                let duration = humantime::parse_duration(s)
                    .with_context(|| format!("parse refresh interval '{s}'"))?;
                if duration.is_zero() {
                    return Ok(Self::Always);
                }
                Ok(Self::Every(duration))
            }
        }
    }
}

impl From<RefreshInterval> for String {
    fn from(interval: RefreshInterval) -> Self {
        interval.to_string()
    }
}

impl fmt::Display for RefreshInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disable => write!(f, "disable"),
            Self::Always => write!(f, "always"),
            Self::Every(duration) => write!(f, "{}", humantime::format_duration(*duration)),
        }
    }
}
