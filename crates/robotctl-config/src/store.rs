//! INI-style configuration store.
//!
//! # Design
//! - Sections and keys are kept sorted so rendering is deterministic.
//! - Persistence writes a sibling temp file (mode 0600) and renames it over the
//!   target, so a crash mid-write leaves the previous file intact.
//! - Values are stored verbatim. A value with surrounding whitespace, or one
//!   that is itself wrapped in double quotes, is written inside an extra pair
//!   of double quotes; parsing strips exactly one such pair.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{Credentials, LOGIN_SECTION, PASSWORD_KEY, USERNAME_KEY};

/// In-memory view of one configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigStore {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl ConfigStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the store at `path`; a missing file yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file exists but cannot be read and
    /// [`ConfigError::Parse`] when a line is malformed.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let store = Self::parse_with_origin(&contents, &path.display().to_string())?;
                debug!(path = %path.display(), sections = store.sections.len(), "loaded configuration");
                Ok(store)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "configuration file absent; using empty store");
                Ok(Self::new())
            }
            Err(source) => Err(ConfigError::Io {
                operation: "read",
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Parse INI text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for lines that are neither comments,
    /// section headers, nor `key = value` pairs.
    pub fn parse(contents: &str) -> ConfigResult<Self> {
        Self::parse_with_origin(contents, "<input>")
    }

    fn parse_with_origin(contents: &str, origin: &str) -> ConfigResult<Self> {
        let mut store = Self::new();
        let mut current: Option<String> = None;

        for (index, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            let failure = |reason| ConfigError::Parse {
                origin: origin.to_string(),
                line: index + 1,
                reason,
            };

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let name = header
                    .strip_suffix(']')
                    .ok_or_else(|| failure("unterminated section header"))?
                    .trim();
                validate_section(name).map_err(|_| failure("invalid section name"))?;
                store.sections.entry(name.to_string()).or_default();
                current = Some(name.to_string());
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| failure("expected key = value"))?;
            let section = current
                .as_ref()
                .ok_or_else(|| failure("key outside of any section"))?;
            let key = key.trim();
            validate_key(key).map_err(|_| failure("invalid key name"))?;
            store
                .sections
                .entry(section.clone())
                .or_default()
                .insert(key.to_string(), unquote(value.trim()).to_string());
        }

        Ok(store)
    }

    /// Look up a value.
    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    /// Insert or replace a value.
    ///
    /// # Errors
    ///
    /// Returns an error when the section, key, or value cannot be represented
    /// in the file format.
    pub fn set(&mut self, section: &str, key: &str, value: &str) -> ConfigResult<()> {
        validate_section(section)?;
        validate_key(key)?;
        if value.contains(['\n', '\r']) {
            return Err(ConfigError::InvalidValue {
                key: format!("{section}.{key}"),
            });
        }
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Remove a key, dropping its section once empty. Returns the old value.
    pub fn unset(&mut self, section: &str, key: &str) -> Option<String> {
        let entries = self.sections.get_mut(section)?;
        let removed = entries.remove(key);
        if entries.is_empty() {
            self.sections.remove(section);
        }
        removed
    }

    /// Section names in sorted order.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Key/value pairs of `section` in sorted order; empty for unknown sections.
    pub fn items<'a>(&'a self, section: &str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.sections
            .get(section)
            .into_iter()
            .flat_map(|entries| entries.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// `true` when no section is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Robot login from the `login` section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredentials`] naming every absent key.
    pub fn credentials(&self) -> ConfigResult<Credentials> {
        let username = self
            .get(LOGIN_SECTION, USERNAME_KEY)
            .filter(|value| !value.is_empty());
        let password = self
            .get(LOGIN_SECTION, PASSWORD_KEY)
            .filter(|value| !value.is_empty());

        match (username, password) {
            (Some(username), Some(password)) => Ok(Credentials {
                username: username.to_string(),
                password: password.to_string(),
            }),
            (username, password) => {
                let mut missing = Vec::new();
                if username.is_none() {
                    missing.push("login.username");
                }
                if password.is_none() {
                    missing.push("login.password");
                }
                Err(ConfigError::MissingCredentials { missing })
            }
        }
    }

    /// Render the store as INI text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (index, (section, entries)) in self.sections.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            out.push('[');
            out.push_str(section);
            out.push_str("]\n");
            for (key, value) in entries {
                out.push_str(key);
                out.push_str(" = ");
                if needs_quotes(value) {
                    out.push('"');
                    out.push_str(value);
                    out.push('"');
                } else {
                    out.push_str(value);
                }
                out.push('\n');
            }
        }
        out
    }

    /// Write the store to `path` through a temp file and rename.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the directory, temp file, or rename fails.
    pub fn persist(&self, path: &Path) -> ConfigResult<()> {
        let io_error = |operation, source| ConfigError::Io {
            operation,
            path: path.to_path_buf(),
            source,
        };
        let directory = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(directory).map_err(|source| io_error("create directory for", source))?;

        let mut file =
            NamedTempFile::new_in(directory).map_err(|source| io_error("stage", source))?;
        file.write_all(self.render().as_bytes())
            .map_err(|source| io_error("write", source))?;
        file.as_file()
            .sync_all()
            .map_err(|source| io_error("sync", source))?;
        file.persist(path)
            .map_err(|err| io_error("replace", err.error))?;

        debug!(path = %path.display(), "persisted configuration");
        Ok(())
    }
}

fn is_quoted(value: &str) -> bool {
    value.len() >= 2 && value.starts_with('"') && value.ends_with('"')
}

fn needs_quotes(value: &str) -> bool {
    value.trim() != value || is_quoted(value)
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
}

fn validate_section(section: &str) -> ConfigResult<()> {
    let reason = if section.is_empty() {
        Some("section names cannot be empty")
    } else if section.trim() != section {
        Some("section names cannot start or end with whitespace")
    } else if section.contains(['[', ']', '.', '=', '\n', '\r']) {
        Some("section names cannot contain '[', ']', '.', '=' or line breaks")
    } else {
        None
    };
    reason.map_or(Ok(()), |reason| {
        Err(ConfigError::InvalidSection {
            section: section.to_string(),
            reason,
        })
    })
}

fn validate_key(key: &str) -> ConfigResult<()> {
    let reason = if key.is_empty() {
        Some("keys cannot be empty")
    } else if key.trim() != key {
        Some("keys cannot start or end with whitespace")
    } else if key.starts_with(['#', ';', '[']) {
        Some("keys cannot start with '#', ';' or '['")
    } else if key.contains(['=', '\n', '\r']) {
        Some("keys cannot contain '=' or line breaks")
    } else {
        None
    };
    reason.map_or(Ok(()), |reason| {
        Err(ConfigError::InvalidKey {
            key: key.to_string(),
            reason,
        })
    })
}
