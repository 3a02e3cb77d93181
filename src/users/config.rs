use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::{expandenv, CommonConfig};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UsersConfig {
    #[serde(default = "UsersConfig::default_path")]
    pub path: String,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
        }
    }
}

impl CommonConfig for UsersConfig {
    fn complete(&mut self) -> Result<()> {
        self.path = expandenv("users.path", &self.path)?;
        Ok(())
    }
}

impl UsersConfig {
    pub fn default_path() -> String {
        String::from("/etc/authgate/users.toml")
    }
}
