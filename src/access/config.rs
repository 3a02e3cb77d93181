use anyhow::{bail, Context, Result};
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::authz::object::has_invalid_method_chars;
use crate::config::CommonConfig;

use super::Level;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AccessControlConfig {
    #[serde(default = "AccessControlConfig::default_policy")]
    pub default_policy: Level,

    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RuleConfig {
    pub domains: Vec<String>,

    /// Path prefixes, e.g. `/admin`. Empty matches every path.
    #[serde(default)]
    pub resources: Vec<String>,

    #[serde(default)]
    pub methods: Vec<String>,

    /// Single addresses or CIDR networks of the caller.
    #[serde(default)]
    pub networks: Vec<String>,

    /// Entries of the form `user:<name>` or `group:<name>`.
    #[serde(default)]
    pub subjects: Vec<String>,

    pub policy: Level,
}

impl Default for AccessControlConfig {
    fn default() -> Self {
        Self {
            default_policy: Self::default_policy(),
            rules: Vec::new(),
        }
    }
}

impl CommonConfig for AccessControlConfig {
    fn complete(&mut self) -> Result<()> {
        for (idx, rule) in self.rules.iter_mut().enumerate() {
            rule.complete()
                .with_context(|| format!("validate access control rule #{}", idx + 1))?;
        }
        Ok(())
    }
}

impl AccessControlConfig {
    pub fn default_policy() -> Level {
        Level::OneFactor
    }
}

/// Parse a single address or a CIDR network. A bare address covers only
/// itself.
pub fn parse_network(s: &str) -> Result<IpNetwork> {
    s.trim()
        .parse::<IpNetwork>()
        .with_context(|| format!("parse network '{s}'"))
}

impl CommonConfig for RuleConfig {
    fn complete(&mut self) -> Result<()> {
        if self.domains.is_empty() {
            bail!("domains is required");
        }
        for domain in self.domains.iter_mut() {
            *domain = domain.trim().to_lowercase();
            if domain.is_empty() {
                bail!("domain cannot be empty");
            }
            if domain.contains("://") {
                bail!("domain '{domain}' must not contain a scheme");
            }
        }

        for resource in self.resources.iter() {
            if !resource.starts_with('/') {
                bail!("resource '{resource}' must start with '/'");
            }
        }

        for method in self.methods.iter_mut() {
            *method = method.to_uppercase();
            if method.is_empty() || has_invalid_method_chars(method) {
                bail!("invalid method '{method}'");
            }
        }

        for network in self.networks.iter() {
            parse_network(network)?;
        }

        for subject in self.subjects.iter() {
            let valid = match subject.split_once(':') {
                Some(("user", name)) | Some(("group", name)) => !name.is_empty(),
                _ => false,
            };
            if !valid {
                bail!("subject '{subject}' must be 'user:<name>' or 'group:<name>'");
            }
        }

        Ok(())
    }
}
