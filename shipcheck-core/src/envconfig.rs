//! Environment configuration resolver.
//!
//! Turns the user's raw input into the single `EnvironmentConfig` attached to a
//! start request. Two sources exist and they are mutually exclusive: a free-form
//! `.env` blob, or the discrete form (named fields, a comma-separated bulk list,
//! and user-added rows). A non-blank blob always wins; the form is not consulted.
//!
//! Parsing is best-effort. Malformed fragments are dropped, never reported: the
//! analysis service is the final arbiter of what a usable configuration is.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Header line of the rendered preview.
pub const PREVIEW_HEADER: &str = "# Environment Variables for Deployment";

/// Ordered `NAME -> value` mapping.
///
/// Insertion order is preserved. Writing an existing name replaces the value in
/// place, so a key keeps the position of its first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentConfig {
    entries: Vec<(String, String)>,
}

impl EnvironmentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites `key`. Empty keys are ignored.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if key.is_empty() {
            return;
        }
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl Serialize for EnvironmentConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// The fixed, named fields of the discrete form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscreteFields {
    pub database_url: String,
    pub db_host: String,
    pub db_port: String,
    pub secret_key: String,
    pub port: String,
}

impl DiscreteFields {
    /// `(canonical variable name, raw value)` in the order they are applied.
    fn named(&self) -> [(&'static str, &str); 5] {
        [
            ("DATABASE_URL", &self.database_url),
            ("DB_HOST", &self.db_host),
            ("DB_PORT", &self.db_port),
            ("SECRET_KEY", &self.secret_key),
            ("PORT", &self.port),
        ]
    }
}

/// One user-added key/value row of the discrete form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomPair {
    pub key: String,
    pub value: String,
}

impl CustomPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// Resolves raw user input into one canonical configuration.
///
/// If `blob` is non-blank it is parsed as `.env` text and returned immediately;
/// `fields`, `bulk` and `custom` have no influence on the result. Otherwise the
/// discrete fields are applied first, then the bulk list, then the custom rows in
/// order, each later write overwriting an earlier one with the same name.
///
/// Never fails.
pub fn resolve(
    blob: &str,
    fields: &DiscreteFields,
    bulk: &str,
    custom: &[CustomPair],
) -> EnvironmentConfig {
    if !blob.trim().is_empty() {
        return parse_blob(blob);
    }

    let mut config = EnvironmentConfig::new();
    for (name, raw) in fields.named() {
        let value = raw.trim();
        if !value.is_empty() {
            config.insert(name, value);
        }
    }
    apply_bulk_list(&mut config, bulk);
    for pair in custom {
        let (key, value) = (pair.key.trim(), pair.value.trim());
        if key.is_empty() || value.is_empty() {
            tracing::trace!(key, "dropping incomplete custom env row");
            continue;
        }
        config.insert(key, value);
    }
    config
}

/// Parses `.env` style text: `KEY=VALUE` per line, `#` comments and blank lines
/// skipped, one pair of surrounding quotes stripped from values.
pub fn parse_blob(blob: &str) -> EnvironmentConfig {
    let mut config = EnvironmentConfig::new();
    for line in blob.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        // `=` at index 0 means an empty key; no `=` at all means no value.
        let Some(eq) = line.find('=').filter(|&i| i > 0) else {
            tracing::trace!(line, "dropping malformed env line");
            continue;
        };
        let key = line[..eq].trim();
        let value = strip_quotes(line[eq + 1..].trim());
        if !key.is_empty() && !value.is_empty() {
            config.insert(key, value);
        }
    }
    config
}

/// Applies a comma-separated `K=V,K2=V2` list, splitting each segment on its
/// first `=`.
fn apply_bulk_list(config: &mut EnvironmentConfig, bulk: &str) {
    for segment in bulk.split(',') {
        let Some((key, value)) = segment.split_once('=') else {
            if !segment.trim().is_empty() {
                tracing::trace!(segment, "dropping bulk segment without '='");
            }
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if !key.is_empty() && !value.is_empty() {
            config.insert(key, value);
        }
    }
}

/// Removes one matching pair of surrounding quotes (`"…"` or `'…'`).
fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Renders `config` as display text: a header comment then `KEY=VALUE` lines in
/// insertion order. Not meant to be parsed back.
pub fn preview(config: &EnvironmentConfig) -> String {
    let mut out = format!("{PREVIEW_HEADER}\n\n");
    if config.is_empty() {
        out.push_str("# No environment variables specified\n");
        out.push_str("# You can add them above or skip this step");
        return out;
    }
    for (key, value) in config.iter() {
        out.push_str(key);
        out.push('=');
        out.push_str(value);
        out.push('\n');
    }
    out
}
