use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::access::config::AccessControlConfig;
use crate::authz::config::EndpointsConfig;
use crate::config::{expandenv, CommonConfig};
use crate::logs::LogsConfig;
use crate::session::config::SessionConfig;
use crate::users::config::UsersConfig;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_bind")]
    pub bind: String,

    #[serde(default = "ServerConfig::default_ssl")]
    pub ssl: bool,

    #[serde(default = "ServerConfig::default_cert_path")]
    pub cert_path: String,

    #[serde(default = "ServerConfig::default_key_path")]
    pub key_path: String,

    /// 0 keeps the actix-web default.
    #[serde(default = "ServerConfig::default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    /// 0 uses one worker per CPU.
    #[serde(default = "ServerConfig::default_workers")]
    pub workers: u64,

    #[serde(default)]
    pub logs: LogsConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub access_control: AccessControlConfig,

    #[serde(default)]
    pub users: UsersConfig,

    #[serde(default)]
    pub authz: EndpointsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: Self::default_bind(),
            ssl: Self::default_ssl(),
            cert_path: Self::default_cert_path(),
            key_path: Self::default_key_path(),
            keep_alive_secs: Self::default_keep_alive_secs(),
            workers: Self::default_workers(),
            logs: LogsConfig::default(),
            session: SessionConfig::default(),
            access_control: AccessControlConfig::default(),
            users: UsersConfig::default(),
            authz: EndpointsConfig::default(),
        }
    }
}

impl CommonConfig for ServerConfig {
    fn complete(&mut self) -> Result<()> {
        self.bind = expandenv("bind", &self.bind)?;
        if self.bind.is_empty() {
            bail!("bind cannot be empty");
        }

        if self.ssl {
            self.cert_path = expandenv("cert_path", &self.cert_path)?;
            if self.cert_path.is_empty() {
                bail!("cert_path is required when ssl is enabled");
            }
            self.key_path = expandenv("key_path", &self.key_path)?;
            if self.key_path.is_empty() {
                bail!("key_path is required when ssl is enabled");
            }
        }

        self.logs.complete().context("logs")?;
        self.session.complete().context("session")?;
        self.access_control.complete().context("access_control")?;
        self.users.complete().context("users")?;
        self.authz.complete().context("authz")?;

        Ok(())
    }
}

impl ServerConfig {
    pub fn default_bind() -> String {
        String::from("127.0.0.1:9091")
    }

    pub fn default_ssl() -> bool {
        false
    }

    pub fn default_cert_path() -> String {
        String::new()
    }

    pub fn default_key_path() -> String {
        String::new()
    }

    pub fn default_keep_alive_secs() -> u64 {
        0
    }

    pub fn default_workers() -> u64 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete() {
        let mut cfg: ServerConfig = toml::from_str(
            r#"
            bind = "0.0.0.0:9091"

            [logs]
            level = "debug"

            [session]
            expiration_secs = 7200

            [[session.cookies]]
            domain = "Example.com"
            portal_url = "https://auth.example.com/"

            [access_control]
            default_policy = "two_factor"

            [[access_control.rules]]
            domains = ["*.example.com"]
            policy = "one_factor"

            [authz]
            refresh_interval = "10m"
            "#,
        )
        .unwrap();
        cfg.complete().unwrap();

        assert_eq!(cfg.bind, "0.0.0.0:9091");
        assert_eq!(cfg.session.cookies[0].domain, "example.com");
        assert_eq!(cfg.authz.endpoints.len(), 4);
        assert_eq!(cfg.users.path, "/etc/authgate/users.toml");

        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["authz"]["refresh_interval"], "10m");
    }

    #[test]
    fn test_complete_invalid() {
        let cases = [
            r#"bind = """#,
            r#"ssl = true"#,
            r#"
            [[session.cookies]]
            domain = "https://example.com"
            "#,
            r#"
            [[session.cookies]]
            domain = "example.com"
            portal_url = "http://auth.example.com/"
            "#,
            r#"
            [[access_control.rules]]
            domains = ["example.com"]
            methods = ["GE T"]
            policy = "one_factor"
            "#,
            r#"
            [[authz.endpoints]]
            name = "verify"
            implementation = "legacy"
            bad_request_status = 403
            "#,
        ];
        for case in cases {
            let mut cfg: ServerConfig = toml::from_str(case).unwrap();
            assert!(cfg.complete().is_err(), "{case}");
        }
    }

    #[test]
    fn test_default() {
        let mut cfg = ServerConfig::default();
        cfg.complete().unwrap();
        assert_eq!(cfg.bind, ServerConfig::default_bind());
        assert!(cfg.session.cookies.is_empty());
    }
}
