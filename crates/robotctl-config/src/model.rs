//! Dotted configuration keys and the credentials they carry.

use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

use crate::error::ConfigError;

/// Section holding the Robot webservice login.
pub const LOGIN_SECTION: &str = "login";
/// Key of the Robot webservice user name.
pub const USERNAME_KEY: &str = "username";
/// Key of the Robot webservice password.
pub const PASSWORD_KEY: &str = "password";

/// A `section.key` address into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigKey {
    /// Section name.
    pub section: String,
    /// Key within the section.
    pub key: String,
}

impl ConfigKey {
    /// Build a key from already-separated parts.
    #[must_use]
    pub fn new(section: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            key: key.into(),
        }
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (section, key) = value.split_once('.').ok_or_else(|| ConfigError::InvalidKey {
            key: value.to_string(),
            reason: "expected <section>.<key>",
        })?;
        if section.is_empty() || key.is_empty() {
            return Err(ConfigError::InvalidKey {
                key: value.to_string(),
                reason: "section and key must both be non-empty",
            });
        }
        Ok(Self::new(section, key))
    }
}

impl Display for ConfigKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section, self.key)
    }
}

/// Robot webservice login read from the `login` section.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Webservice user name.
    pub username: String,
    /// Webservice password.
    pub password: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
