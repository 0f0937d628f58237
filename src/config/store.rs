//! Settings store with typed, validated registration.
//!
//! Every setting is keyed by `<module>.<dotted.name>`. Registration follows
//! "initialize" semantics: the first writer wins, and a later `initialize`
//! for the same key leaves the configured value alone. Only `reset` puts
//! the default back.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Errors raised by the settings store
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid setting name '{0}'")]
    InvalidName(String),
    #[error("Malformed validation rule for '{key}': {reason}")]
    MalformedRule { key: String, reason: String },
    #[error("Value for '{key}' rejected: {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("Unknown setting '{0}'")]
    UnknownSetting(String),
    #[error("Setting '{0}' is not deletable")]
    NotDeletable(String),
}

/// A setting value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Integer(i64),
    String(String),
}

impl SettingValue {
    pub fn kind(&self) -> SettingType {
        match self {
            SettingValue::Bool(_) => SettingType::Bool,
            SettingValue::Integer(_) => SettingType::Integer,
            SettingValue::String(_) => SettingType::String,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SettingValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{}", b),
            SettingValue::Integer(n) => write!(f, "{}", n),
            SettingValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Integer(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::String(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::String(value)
    }
}

/// Declared type of a setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingType {
    Bool,
    Integer,
    String,
}

impl SettingType {
    fn as_str(&self) -> &'static str {
        match self {
            SettingType::Bool => "bool",
            SettingType::Integer => "integer",
            SettingType::String => "string",
        }
    }

    /// Parse a raw string (environment variable, CLI argument) as this type
    pub fn parse(&self, raw: &str) -> Option<SettingValue> {
        let raw = raw.trim();
        match self {
            SettingType::Bool => match raw.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(SettingValue::Bool(true)),
                "0" | "false" | "no" | "off" => Some(SettingValue::Bool(false)),
                _ => None,
            },
            SettingType::Integer => raw.parse().ok().map(SettingValue::Integer),
            SettingType::String => Some(SettingValue::String(raw.to_string())),
        }
    }
}

impl fmt::Display for SettingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation rule applied on registration and on every update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Any value of the declared type
    Any,
    /// Non-empty string
    NonEmpty,
    /// Integer within an inclusive range
    Range { min: i64, max: i64 },
    /// String from a fixed list (case-insensitive)
    OneOf(Vec<String>),
}

impl Validation {
    pub fn one_of(values: &[&str]) -> Self {
        Validation::OneOf(values.iter().map(|v| v.to_string()).collect())
    }

    fn check_rule(&self, kind: SettingType) -> Result<(), String> {
        match self {
            Validation::Any => Ok(()),
            Validation::NonEmpty if kind != SettingType::String => {
                Err(format!("NonEmpty applies to strings, not {}", kind))
            }
            Validation::NonEmpty => Ok(()),
            Validation::Range { .. } if kind != SettingType::Integer => {
                Err(format!("Range applies to integers, not {}", kind))
            }
            Validation::Range { min, max } if min > max => {
                Err(format!("range minimum {} exceeds maximum {}", min, max))
            }
            Validation::Range { .. } => Ok(()),
            Validation::OneOf(_) if kind != SettingType::String => {
                Err(format!("OneOf applies to strings, not {}", kind))
            }
            Validation::OneOf(allowed) if allowed.is_empty() => {
                Err("allowed value list is empty".to_string())
            }
            Validation::OneOf(_) => Ok(()),
        }
    }

    fn check(&self, value: &SettingValue) -> Result<(), String> {
        match (self, value) {
            (Validation::Any, _) => Ok(()),
            (Validation::NonEmpty, SettingValue::String(s)) if s.trim().is_empty() => {
                Err("value must not be empty".to_string())
            }
            (Validation::Range { min, max }, SettingValue::Integer(n)) if n < min || n > max => {
                Err(format!("{} is outside {}..={}", n, min, max))
            }
            (Validation::OneOf(allowed), SettingValue::String(s))
                if !allowed.iter().any(|a| a.eq_ignore_ascii_case(s)) =>
            {
                Err(format!("'{}' is not one of {}", s, allowed.join(", ")))
            }
            _ => Ok(()),
        }
    }
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9]*(\.[A-Za-z][A-Za-z0-9]*)*$")
            .expect("setting name pattern is valid")
    })
}

/// A registered setting
#[derive(Debug, Clone)]
pub struct Setting {
    module: String,
    name: String,
    value: SettingValue,
    default: SettingValue,
    validation: Validation,
    description: String,
    deletable: bool,
}

impl Setting {
    /// Create a setting; its declared type is taken from the default.
    pub fn new(module: &str, name: &str, default: impl Into<SettingValue>) -> Self {
        let default = default.into();
        Self {
            module: module.to_string(),
            name: name.to_string(),
            value: default.clone(),
            default,
            validation: Validation::Any,
            description: String::new(),
            deletable: false,
        }
    }

    pub fn validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn deletable(mut self, deletable: bool) -> Self {
        self.deletable = deletable;
        self
    }

    /// Full key: `<module>.<name>`
    pub fn key(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &SettingValue {
        &self.value
    }

    pub fn default_value(&self) -> &SettingValue {
        &self.default
    }

    pub fn kind(&self) -> SettingType {
        self.default.kind()
    }

    pub fn description_text(&self) -> &str {
        &self.description
    }

    pub fn is_deletable(&self) -> bool {
        self.deletable
    }

    /// Environment variable that overrides this setting,
    /// e.g. `Graph.ApiVersion` -> `ENTRA_LAB_GRAPH_APIVERSION`.
    pub fn env_var(&self) -> String {
        format!("ENTRA_LAB_{}", self.name.replace('.', "_").to_uppercase())
    }

    fn accept(&self, value: &SettingValue) -> Result<(), ConfigError> {
        if value.kind() != self.kind() {
            return Err(ConfigError::InvalidValue {
                key: self.key(),
                reason: format!("expected {}, got {}", self.kind(), value.kind()),
            });
        }
        self.validation
            .check(value)
            .map_err(|reason| ConfigError::InvalidValue {
                key: self.key(),
                reason,
            })
    }
}

/// Key/value store of registered settings
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    settings: BTreeMap<String, Setting>,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a setting with its default.
    ///
    /// Returns `Ok(true)` when the setting was added and `Ok(false)` when a
    /// setting with the same key already exists (its value is kept).
    pub fn initialize(&mut self, setting: Setting) -> Result<bool, ConfigError> {
        let key = setting.key();
        if !name_pattern().is_match(&setting.module) || !name_pattern().is_match(&setting.name) {
            return Err(ConfigError::InvalidName(key));
        }
        setting
            .validation
            .check_rule(setting.kind())
            .map_err(|reason| ConfigError::MalformedRule {
                key: key.clone(),
                reason,
            })?;
        setting.accept(&setting.default)?;

        if self.settings.contains_key(&key) {
            trace!("Setting {} already initialized, keeping value", key);
            return Ok(false);
        }

        debug!("Registered setting {} = {}", key, setting.value);
        self.settings.insert(key, setting);
        Ok(true)
    }

    pub fn setting(&self, key: &str) -> Option<&Setting> {
        self.settings.get(key)
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.settings.get(key).map(|s| &s.value)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, ConfigError> {
        self.typed(key, SettingValue::as_bool)
    }

    pub fn get_i64(&self, key: &str) -> Result<i64, ConfigError> {
        self.typed(key, SettingValue::as_i64)
    }

    pub fn get_str(&self, key: &str) -> Result<&str, ConfigError> {
        self.typed(key, SettingValue::as_str)
    }

    fn typed<'a, T>(
        &'a self,
        key: &str,
        extract: impl FnOnce(&'a SettingValue) -> Option<T>,
    ) -> Result<T, ConfigError> {
        let setting = self
            .settings
            .get(key)
            .ok_or_else(|| ConfigError::UnknownSetting(key.to_string()))?;
        extract(&setting.value).ok_or_else(|| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("stored value is {}", setting.value.kind()),
        })
    }

    /// Update a registered setting, validating against its rule.
    pub fn set(&mut self, key: &str, value: impl Into<SettingValue>) -> Result<(), ConfigError> {
        let value = value.into();
        let setting = self
            .settings
            .get_mut(key)
            .ok_or_else(|| ConfigError::UnknownSetting(key.to_string()))?;
        setting.accept(&value)?;
        debug!("Setting {} = {}", key, value);
        setting.value = value;
        Ok(())
    }

    /// Update a registered setting from its string form.
    pub fn set_from_str(&mut self, key: &str, raw: &str) -> Result<(), ConfigError> {
        let kind = self
            .settings
            .get(key)
            .map(Setting::kind)
            .ok_or_else(|| ConfigError::UnknownSetting(key.to_string()))?;
        let value = kind.parse(raw).ok_or_else(|| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("'{}' is not a valid {}", raw, kind),
        })?;
        self.set(key, value)
    }

    /// Restore the registered default.
    pub fn reset(&mut self, key: &str) -> Result<(), ConfigError> {
        let setting = self
            .settings
            .get_mut(key)
            .ok_or_else(|| ConfigError::UnknownSetting(key.to_string()))?;
        setting.value = setting.default.clone();
        Ok(())
    }

    /// Remove a setting. Only settings registered as deletable can be removed.
    pub fn remove(&mut self, key: &str) -> Result<Setting, ConfigError> {
        match self.settings.get(key) {
            None => Err(ConfigError::UnknownSetting(key.to_string())),
            Some(s) if !s.deletable => Err(ConfigError::NotDeletable(key.to_string())),
            Some(_) => self
                .settings
                .remove(key)
                .ok_or_else(|| ConfigError::UnknownSetting(key.to_string())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Setting> {
        self.settings.values()
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}
