//! # Live Configuration
//!
//! [`ConfigStore`] is the single source of configuration for every unit. It is
//! created once, handed to the [`Context`](crate::framework::Context), and never
//! replaced. Reloading re-reads the backing file into the same store, so every
//! accessor call after a reload observes the new values.
//!
//! Units read their own subtree through [`UnitConfig`], a snapshot of the section
//! at `configPath` with typed getters:
//!
//! ```toml
//! [kiss]
//! enabled = true
//! cooldown = 1.5
//! ```
//!
//! ```rust,ignore
//! let config = context.unit_config("kiss");
//! let cooldown = config.get_double("cooldown", 1.0);
//! ```

use crate::framework::ConfigError;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use toml::{Table, Value};
use tracing::{debug, info};

/// Reloadable TOML configuration shared by all units.
#[derive(Debug, Default)]
pub struct ConfigStore {
    table: RwLock<Table>,
    source: Option<PathBuf>,
}

impl ConfigStore {
    /// An empty, in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an in-memory store from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let table: Table = text.parse()?;
        Ok(Self {
            table: RwLock::new(table),
            source: None,
        })
    }

    /// Loads a file-backed store. [`ConfigStore::reload`] re-reads the same file.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let table = read_table(&path)?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(Self {
            table: RwLock::new(table),
            source: Some(path),
        })
    }

    /// The backing file, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Re-reads the backing file. In-memory stores keep their current contents.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.source else {
            debug!("In-memory configuration, nothing to re-read");
            return Ok(());
        };
        let table = read_table(path)?;
        *self.table.write().unwrap_or_else(PoisonError::into_inner) = table;
        info!(path = %path.display(), "Configuration reloaded");
        Ok(())
    }

    /// Sets a value at a dotted path, creating intermediate tables as needed.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<(), ConfigError> {
        let mut guard = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let mut current: &mut Table = &mut guard;
        let mut parts = path.split('.').peekable();
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                current.insert(part.to_string(), value.into());
                return Ok(());
            }
            let entry = current
                .entry(part.to_string())
                .or_insert(Value::Table(Table::new()));
            current = match entry {
                Value::Table(table) => table,
                _ => return Err(ConfigError::NotATable(part.to_string())),
            };
        }
        Ok(())
    }

    /// A copy of the value at a dotted path.
    pub fn value(&self, path: &str) -> Option<Value> {
        let guard = self.table.read().unwrap_or_else(PoisonError::into_inner);
        lookup(&guard, path).cloned()
    }

    /// A copy of the table at a dotted path, or `None` if absent or not a table.
    pub fn section(&self, path: &str) -> Option<Table> {
        match self.value(path)? {
            Value::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Snapshot of one unit's section.
    pub fn unit_config(&self, path: &str) -> UnitConfig {
        UnitConfig {
            path: path.to_string(),
            section: self.section(path),
        }
    }
}

fn read_table(path: &Path) -> Result<Table, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(text.parse()?)
}

fn lookup<'a>(table: &'a Table, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut value = table.get(parts.next()?)?;
    for part in parts {
        value = value.as_table()?.get(part)?;
    }
    Some(value)
}

/// Snapshot of a unit's configuration section.
///
/// A missing section behaves like an empty one: every getter returns its default.
#[derive(Debug, Clone, Default)]
pub struct UnitConfig {
    path: String,
    section: Option<Table>,
}

macro_rules! typed_getters {
    ($($name:ident: $ty:ty => $convert:expr;)*) => {
        paste::paste! {
            $(
                #[doc = "Reads `" $name "` value `key`, or `default` when absent or of the wrong type."]
                pub fn [<get_ $name>](&self, key: &str, default: $ty) -> $ty {
                    self.raw(key).and_then($convert).unwrap_or(default)
                }
            )*
        }
    };
}

impl UnitConfig {
    /// The dotted path this snapshot was taken from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the section exists at all.
    pub fn exists(&self) -> bool {
        self.section.is_some()
    }

    /// Raw value lookup; `key` may itself be dotted.
    pub fn raw(&self, key: &str) -> Option<&Value> {
        lookup(self.section.as_ref()?, key)
    }

    typed_getters! {
        bool: bool => |v: &Value| v.as_bool();
        int: i32 => |v: &Value| v.as_integer().and_then(|i| i32::try_from(i).ok());
        long: i64 => |v: &Value| v.as_integer();
        double: f64 => |v: &Value| v.as_float().or_else(|| v.as_integer().map(|i| i as f64));
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.raw(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    }

    /// String array at `key`; non-string entries are skipped.
    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        self.raw(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Decodes the whole section into a typed settings struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        let table = self.section.clone().unwrap_or_default();
        Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Decode {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }
}
