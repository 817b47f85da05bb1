//! Tableless column declarations.

use std::sync::Arc;

use tableless_codec::{Codec, EncryptionConfig};
use tableless_core::{Result, Schema};

/// Per-column options given to `has_tableless_with`.
#[derive(Debug, Clone, Default)]
pub struct ColumnOptions {
    /// Encrypt the column with keys derived from this configuration.
    pub encryption: Option<EncryptionConfig>,
}

impl ColumnOptions {
    /// Plain column.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encrypt the column with `key`, using default key derivation.
    pub fn encryption_key(mut self, key: impl Into<String>) -> Self {
        self.encryption = Some(EncryptionConfig::new(key));
        self
    }

    /// Encrypt the column with a full encryption configuration.
    pub fn encryption(mut self, config: EncryptionConfig) -> Self {
        self.encryption = Some(config);
        self
    }

    /// The codec these options select.
    pub fn codec(&self) -> Result<Codec> {
        match &self.encryption {
            Some(config) => Codec::encrypted(config),
            None => Ok(Codec::plain()),
        }
    }
}

/// A host column that stores a tableless record.
#[derive(Debug, Clone)]
pub struct TablelessColumn {
    name: String,
    schema: Arc<Schema>,
    codec: Codec,
}

impl TablelessColumn {
    pub fn new(name: impl Into<String>, schema: Arc<Schema>, codec: Codec) -> Self {
        Self {
            name: name.into(),
            schema,
            codec,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema of the tableless model stored here.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// True when the host stores this column through its own structured
    /// serialization (plain columns only).
    pub fn serialized_by_host(&self) -> bool {
        self.codec.uses_host_serialization()
    }
}
