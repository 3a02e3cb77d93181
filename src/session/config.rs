use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::CommonConfig;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "SessionConfig::default_name")]
    pub name: String,

    #[serde(default = "SessionConfig::default_expiration_secs")]
    pub expiration_secs: u64,

    #[serde(default = "SessionConfig::default_inactivity_secs")]
    pub inactivity_secs: u64,

    #[serde(default = "SessionConfig::default_remember_me_secs")]
    pub remember_me_secs: u64,

    #[serde(default)]
    pub cookies: Vec<CookieConfig>,
}

/// One cookie domain sessions can be issued for.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CookieConfig {
    pub domain: String,

    /// Where unauthenticated browsers are sent to sign in.
    #[serde(default)]
    pub portal_url: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub expiration_secs: Option<u64>,

    #[serde(default)]
    pub inactivity_secs: Option<u64>,

    #[serde(default)]
    pub remember_me_secs: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            expiration_secs: Self::default_expiration_secs(),
            inactivity_secs: Self::default_inactivity_secs(),
            remember_me_secs: Self::default_remember_me_secs(),
            cookies: Vec::new(),
        }
    }
}

impl CommonConfig for SessionConfig {
    fn complete(&mut self) -> Result<()> {
        if self.name.is_empty() {
            bail!("session name cannot be empty");
        }
        if self.expiration_secs == 0 {
            bail!("session expiration_secs cannot be 0");
        }

        let mut domains = HashSet::with_capacity(self.cookies.len());
        for cookie in self.cookies.iter_mut() {
            cookie
                .complete()
                .with_context(|| format!("validate session cookie '{}'", cookie.domain))?;
            if !domains.insert(cookie.domain.clone()) {
                bail!("duplicate session cookie domain '{}'", cookie.domain);
            }
        }

        Ok(())
    }
}

impl SessionConfig {
    pub fn default_name() -> String {
        String::from("authgate_session")
    }

    pub fn default_expiration_secs() -> u64 {
        60 * 60
    }

    pub fn default_inactivity_secs() -> u64 {
        5 * 60
    }

    pub fn default_remember_me_secs() -> u64 {
        30 * 24 * 60 * 60
    }
}

impl CommonConfig for CookieConfig {
    fn complete(&mut self) -> Result<()> {
        self.domain = self.domain.trim().trim_start_matches('.').to_lowercase();
        if self.domain.is_empty() {
            bail!("domain cannot be empty");
        }
        if self.domain.contains("://") || self.domain.contains('/') {
            bail!("domain must not contain a scheme or path");
        }

        if let Some(portal_url) = self.portal_url.as_ref() {
            let url = Url::parse(portal_url)
                .with_context(|| format!("parse portal_url '{portal_url}'"))?;
            if url.scheme() != "https" {
                bail!("portal_url '{portal_url}' must use the https scheme");
            }
        }

        if matches!(self.name.as_deref(), Some("")) {
            bail!("cookie name cannot be empty");
        }
        if matches!(self.expiration_secs, Some(0)) {
            bail!("expiration_secs cannot be 0");
        }

        Ok(())
    }
}
