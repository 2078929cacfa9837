//! Formatter registry
//!
//! Lookup order: built-in names (exact, case-sensitive), then factories
//! registered under a custom name. Every failure is logged and returned;
//! sinks resolve their formatter while being built, before any event flows.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::FormatterError;

use super::builtin::{HeaderAndTextFormatter, JsonFormatter, TextFormatter, WritableFormatter};
use super::{EventFormatter, FormatterOptions};

/// Formatter used when none is configured
pub const DEFAULT_FORMATTER: &str = "Text";

/// Builds a formatter from its options
pub type FormatterFactory = Arc<
    dyn Fn(&FormatterOptions) -> Result<Box<dyn EventFormatter>, FormatterError> + Send + Sync,
>;

/// Formatters that need no registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFormatter {
    Text,
    HeaderAndText,
    Json,
    Writable,
}

impl BuiltinFormatter {
    pub const ALL: [Self; 4] = [Self::Text, Self::HeaderAndText, Self::Json, Self::Writable];

    /// Exact, case-sensitive match on the built-in name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Text" => Some(Self::Text),
            "HeaderAndText" => Some(Self::HeaderAndText),
            "Json" => Some(Self::Json),
            "Writable" => Some(Self::Writable),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::HeaderAndText => "HeaderAndText",
            Self::Json => "Json",
            Self::Writable => "Writable",
        }
    }

    pub fn create(&self, options: &FormatterOptions) -> Box<dyn EventFormatter> {
        match self {
            Self::Text => Box::new(TextFormatter::new(options)),
            Self::HeaderAndText => Box::new(HeaderAndTextFormatter::new(options)),
            Self::Json => Box::new(JsonFormatter),
            Self::Writable => Box::new(WritableFormatter),
        }
    }
}

/// Name → formatter lookup with a fixed built-in set and registered extras
#[derive(Clone, Default)]
pub struct FormatterRegistry {
    custom: HashMap<String, FormatterFactory>,
}

impl FormatterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom formatter under `name`
    ///
    /// # Errors
    ///
    /// Fails on an empty name, a built-in name, or a name registered before.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), FormatterError>
    where
        F: Fn(&FormatterOptions) -> Result<Box<dyn EventFormatter>, FormatterError>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(FormatterError::EmptyName);
        }
        if BuiltinFormatter::from_name(&name).is_some() || self.custom.contains_key(&name) {
            return Err(FormatterError::duplicate(name));
        }

        tracing::debug!(formatter = %name, "registered custom formatter");
        self.custom.insert(name, Arc::new(factory));
        Ok(())
    }

    /// Whether `name` resolves to a formatter
    pub fn contains(&self, name: &str) -> bool {
        BuiltinFormatter::from_name(name).is_some() || self.custom.contains_key(name)
    }

    /// All resolvable names, built-ins first, custom names sorted
    pub fn names(&self) -> Vec<&str> {
        let mut custom: Vec<&str> = self.custom.keys().map(String::as_str).collect();
        custom.sort_unstable();
        let mut names: Vec<&str> = BuiltinFormatter::ALL.iter().map(|b| b.name()).collect();
        names.extend(custom);
        names
    }

    /// Build the formatter registered as `name`
    pub fn get(
        &self,
        name: &str,
        options: &FormatterOptions,
    ) -> Result<Box<dyn EventFormatter>, FormatterError> {
        let result = self.resolve(name, options);
        if let Err(e) = &result {
            tracing::error!(formatter = %name, error = %e, "formatter resolution failed");
        }
        result
    }

    fn resolve(
        &self,
        name: &str,
        options: &FormatterOptions,
    ) -> Result<Box<dyn EventFormatter>, FormatterError> {
        if name.is_empty() {
            return Err(FormatterError::EmptyName);
        }
        if let Some(builtin) = BuiltinFormatter::from_name(name) {
            return Ok(builtin.create(options));
        }

        tracing::debug!(formatter = %name, "not a built-in formatter, trying registered factories");
        let factory = self
            .custom
            .get(name)
            .ok_or_else(|| FormatterError::unknown(name))?;

        factory(options).map_err(|e| match e {
            FormatterError::Construction { .. } => e,
            other => FormatterError::construction(name, other.to_string()),
        })
    }
}

impl fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatterRegistry")
            .field("names", &self.names())
            .finish()
    }
}
