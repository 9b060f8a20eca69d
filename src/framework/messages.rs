//! # Message Catalog
//!
//! User-facing text keyed by `<unit id>.<key>`, with shared strings under `common`.
//!
//! ```toml
//! prefix = "&6[Units]&r "
//!
//! [common]
//! no-permission = "%prefix%&cYou may not do that."
//!
//! [kiss]
//! success = "%prefix%&aYou kissed {target}!"
//! ```
//!
//! Lookups substitute `%prefix%`, then every `{key}` / `%key%` placeholder, and
//! finally translate `&` color codes into `§` codes.

use crate::framework::ConfigError;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};
use toml::{Table, Value};
use tracing::info;

const DEFAULT_PREFIX: &str = "&6[Units]&r ";
const COLOR_CODES: &str = "0123456789abcdefklmnorABCDEFKLMNOR";

/// Reloadable message lookup with placeholder substitution.
#[derive(Debug, Default)]
pub struct MessageCatalog {
    table: RwLock<Table>,
    source: Option<PathBuf>,
}

impl MessageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            table: RwLock::new(text.parse()?),
            source: None,
        })
    }

    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let catalog = Self {
            table: RwLock::new(Table::new()),
            source: Some(path),
        };
        catalog.reload()?;
        Ok(catalog)
    }

    /// Re-reads the backing file; a no-op for in-memory catalogs.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.source else {
            return Ok(());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let table: Table = text.parse()?;
        *self.table.write().unwrap_or_else(PoisonError::into_inner) = table;
        info!(path = %path.display(), "Messages loaded");
        Ok(())
    }

    /// The colorized global prefix.
    pub fn prefix(&self) -> String {
        colorize(&self.raw_prefix())
    }

    /// Formatted message at `path`, or a visible `[Missing: path]` marker.
    pub fn get(&self, path: &str, replacements: &[(&str, &str)]) -> String {
        let Some(template) = self.raw(path) else {
            return colorize(&format!("&c[Missing: {path}]"));
        };
        colorize(&self.substitute(&template, replacements))
    }

    /// Message under `<unit_id>.<key>`.
    pub fn unit_message(&self, unit_id: &str, key: &str, replacements: &[(&str, &str)]) -> String {
        self.get(&format!("{unit_id}.{key}"), replacements)
    }

    /// Message under `common.<key>`.
    pub fn common_message(&self, key: &str, replacements: &[(&str, &str)]) -> String {
        self.get(&format!("common.{key}"), replacements)
    }

    pub fn has(&self, path: &str) -> bool {
        self.raw(path).is_some()
    }

    /// Every string of the array at `path`, prefix-substituted and colorized.
    pub fn list(&self, path: &str) -> Vec<String> {
        let guard = self.table.read().unwrap_or_else(PoisonError::into_inner);
        let Some(items) = lookup(&guard, path).and_then(Value::as_array) else {
            return Vec::new();
        };
        let prefix = prefix_of(&guard);
        items
            .iter()
            .filter_map(Value::as_str)
            .map(|line| colorize(&line.replace("%prefix%", &prefix)))
            .collect()
    }

    fn raw(&self, path: &str) -> Option<String> {
        let guard = self.table.read().unwrap_or_else(PoisonError::into_inner);
        lookup(&guard, path).and_then(Value::as_str).map(str::to_string)
    }

    fn raw_prefix(&self) -> String {
        let guard = self.table.read().unwrap_or_else(PoisonError::into_inner);
        prefix_of(&guard)
    }

    fn substitute(&self, template: &str, replacements: &[(&str, &str)]) -> String {
        let mut message = template.replace("%prefix%", &self.raw_prefix());
        for (key, value) in replacements {
            message = message
                .replace(&format!("{{{key}}}"), value)
                .replace(&format!("%{key}%"), value);
        }
        message
    }
}

fn prefix_of(table: &Table) -> String {
    table
        .get("prefix")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_PREFIX)
        .to_string()
}

fn lookup<'a>(table: &'a Table, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut value = table.get(parts.next()?)?;
    for part in parts {
        value = value.as_table()?.get(part)?;
    }
    Some(value)
}

/// Translates `&x` color codes into `§x`. A lone `&` is left alone.
pub fn colorize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match chars.peek() {
            Some(&next) if c == '&' && COLOR_CODES.contains(next) => {
                out.push('§');
                out.push(next.to_ascii_lowercase());
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGES: &str = r#"
        prefix = "&6[T]&r "

        [common]
        no-permission = "%prefix%&cNo permission"

        [kiss]
        success = "%prefix%You kissed {target}, %count% times"
        help = ["%prefix%/kiss <player>", "/kiss toggle"]
    "#;

    #[test]
    fn substitutes_prefix_and_placeholders() {
        let catalog = MessageCatalog::from_toml_str(MESSAGES).unwrap();
        let msg = catalog.unit_message("kiss", "success", &[("target", "Steve"), ("count", "3")]);
        assert_eq!(msg, "§6[T]§r You kissed Steve, 3 times");
        assert_eq!(catalog.common_message("no-permission", &[]), "§6[T]§r §cNo permission");
    }

    #[test]
    fn missing_paths_are_marked() {
        let catalog = MessageCatalog::new();
        assert_eq!(catalog.get("kiss.nope", &[]), "§c[Missing: kiss.nope]");
        assert!(!catalog.has("kiss.nope"));
        assert_eq!(catalog.prefix(), "§6[Units]§r ");
    }

    #[test]
    fn lists_are_formatted() {
        let catalog = MessageCatalog::from_toml_str(MESSAGES).unwrap();
        assert_eq!(
            catalog.list("kiss.help"),
            vec!["§6[T]§r /kiss <player>", "/kiss toggle"]
        );
    }

    #[test]
    fn colorize_leaves_plain_ampersands() {
        assert_eq!(colorize("rock & roll &Lbold &"), "rock & roll §lbold &");
    }
}
