pub mod config;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::code;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user '{0}' not found")]
    NotFound(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDetails {
    pub username: String,
    pub display_name: String,
    pub emails: Vec<String>,
    pub groups: Vec<String>,
}

/// Source of user credentials and profile details.
pub trait UserProvider: Send + Sync {
    fn check_password(&self, username: &str, password: &str) -> Result<bool>;

    /// Fails with [`UserError::NotFound`] when the user no longer exists.
    fn get_details(&self, username: &str) -> Result<UserDetails>;
}

/// Users loaded from a TOML database file:
///
/// ```toml
/// [users.john]
/// display_name = "John Doe"
/// password = "sha256$<salt>$<hex>"
/// emails = ["john@example.com"]
/// groups = ["admins", "dev"]
/// ```
pub struct FileUserProvider {
    users: HashMap<String, UserEntry>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct UsersFile {
    #[serde(default)]
    users: HashMap<String, UserRecord>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
struct UserRecord {
    #[serde(default)]
    display_name: String,

    password: String,

    #[serde(default)]
    emails: Vec<String>,

    #[serde(default)]
    groups: Vec<String>,

    #[serde(default)]
    disabled: bool,
}

struct UserEntry {
    username: String,
    record: UserRecord,
    salt: String,
    hash: String,
}

impl FileUserProvider {
    const HASH_PREFIX: &'static str = "sha256";

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("read users file '{}'", path.display()))?;
        let provider = Self::from_toml(&data)
            .with_context(|| format!("parse users file '{}'", path.display()))?;
        info!(
            "Loaded {} users from '{}'",
            provider.users.len(),
            path.display()
        );
        Ok(provider)
    }

    pub fn from_toml(data: &str) -> Result<Self> {
        let file: UsersFile = toml::from_str(data).context("parse users toml")?;

        let mut users = HashMap::with_capacity(file.users.len());
        for (username, record) in file.users {
            if username.is_empty() {
                bail!("username cannot be empty");
            }
            let (salt, hash) = Self::parse_password(&record.password)
                .with_context(|| format!("invalid password for user '{username}'"))?;

            let key = username.to_lowercase();
            if users.contains_key(&key) {
                bail!("duplicate user '{username}'");
            }
            users.insert(
                key,
                UserEntry {
                    username,
                    record,
                    salt,
                    hash,
                },
            );
        }

        Ok(Self { users })
    }

    fn parse_password(password: &str) -> Result<(String, String)> {
        let fields = password.split('$').collect::<Vec<_>>();
        if fields.len() != 3 || fields[0] != Self::HASH_PREFIX {
            bail!("expect format 'sha256$<salt>$<hex>'");
        }
        if fields[1].is_empty() || fields[2].is_empty() {
            bail!("salt and hash cannot be empty");
        }
        Ok((fields[1].to_string(), fields[2].to_lowercase()))
    }

    fn get_entry(&self, username: &str) -> Option<&UserEntry> {
        self.users
            .get(&username.to_lowercase())
            .filter(|entry| !entry.record.disabled)
    }
}

impl UserProvider for FileUserProvider {
    fn check_password(&self, username: &str, password: &str) -> Result<bool> {
        let entry = match self.get_entry(username) {
            Some(entry) => entry,
            None => return Err(UserError::NotFound(username.to_string()).into()),
        };
        let hash = code::sha256(format!("{password}{}", entry.salt));
        Ok(code::secure_eq(&hash, &entry.hash))
    }

    fn get_details(&self, username: &str) -> Result<UserDetails> {
        let entry = match self.get_entry(username) {
            Some(entry) => entry,
            None => return Err(UserError::NotFound(username.to_string()).into()),
        };
        Ok(UserDetails {
            username: entry.username.clone(),
            display_name: entry.record.display_name.clone(),
            emails: entry.record.emails.clone(),
            groups: entry.record.groups.clone(),
        })
    }
}

/// Hash a password into the users file format.
pub fn hash_password(password: &str, salt: &str) -> String {
    let hash = code::sha256(format!("{password}{salt}"));
    format!("{}${salt}${hash}", FileUserProvider::HASH_PREFIX)
}

pub fn generate_salt() -> String {
    code::random_string(16)
}

pub fn is_not_found(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<UserError>(), Some(UserError::NotFound(_)))
}
