use std::path::{Path, PathBuf};
use std::{env, fs, io};

use anyhow::{Context, Result};
use clap::Args;
use log::warn;
use serde::de::DeserializeOwned;

/// Configuration sections implement this to validate themselves and fill in
/// derived values after deserialization.
pub trait CommonConfig {
    fn complete(&mut self) -> Result<()>;
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// The config file path. Defaults to `$AUTHGATE_CONFIG`, then
    /// `/etc/authgate/config.toml`.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl ConfigArgs {
    const DEFAULT_PATH: &str = "/etc/authgate/config.toml";

    pub fn path(&self) -> PathBuf {
        if let Some(path) = self.config.as_ref() {
            return path.clone();
        }
        if let Ok(path) = env::var("AUTHGATE_CONFIG") {
            return PathBuf::from(path);
        }
        PathBuf::from(Self::DEFAULT_PATH)
    }

    pub fn load<T>(&self) -> Result<T>
    where
        T: CommonConfig + DeserializeOwned + Default,
    {
        load_config(&self.path())
    }
}

pub fn load_config<T>(path: &Path) -> Result<T>
where
    T: CommonConfig + DeserializeOwned + Default,
{
    let mut cfg: T = match fs::read_to_string(path) {
        Ok(s) => toml::from_str(&s)
            .with_context(|| format!("parse config toml '{}'", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!("Config file '{}' not found, using defaults", path.display());
            T::default()
        }
        Err(err) => {
            return Err(err).with_context(|| format!("read config file '{}'", path.display()));
        }
    };

    cfg.complete().context("validate config")?;
    Ok(cfg)
}

/// See: [`shellexpand::full`].
pub fn expandenv(name: &str, s: impl AsRef<str>) -> Result<String> {
    let s =
        shellexpand::full(s.as_ref()).with_context(|| format!("expand env value for '{name}'"))?;
    Ok(s.to_string())
}
