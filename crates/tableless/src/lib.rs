//! Tableless Rust: schema-typed records stored inside a single host column.
//!
//! A tableless model is declared like a regular model, with typed
//! attributes and defaults, but its instances live serialized (optionally
//! encrypted) in one column of a host record instead of in a table of their
//! own.
//!
//! # Quick Start
//!
//! ```ignore
//! use tableless::prelude::*;
//!
//! tableless_model! {
//!     pub struct ModelOptions {
//!         typed_attribute: Integer = 5,
//!         note,
//!     }
//! }
//!
//! let host = HostType::builder("TestModel")
//!     .has_tableless::<ModelOptions>("options")
//!     .build();
//!
//! let record = host.new_record();
//! let mut options = record.tableless("options")?;
//! options.set("typed_attribute", "12")?;
//!
//! assert!(record.changed());
//! assert_eq!(record.send("typed_attribute", &[])?, Value::Int(12));
//! ```
//!
//! # Crates
//!
//! - `tableless-core`: values, the type caster, schemas and the record type
//! - `tableless-codec`: plain and encrypted column codecs
//! - `tableless-host`: host records with dirty tracking and delegation

mod macros;

pub use tableless_codec::{
    Codec, DEFAULT_ITERATIONS, DEFAULT_SALT, EncryptionConfig, MessageEncryptor,
};
pub use tableless_core::{
    AttrType, AttributeDef, AttributeDefault, AttributeOptions, CodecError, CodecErrorKind,
    ColumnOwner, Decimal, DeferredDefault, Error, OwnerBinding, Result, Schema, SchemaBuilder,
    TablelessModel, TablelessRecord, Value, cast, classify, register, schema_for, schema_named,
    truthy,
};
pub use tableless_host::{
    AttributeChange, ColumnOptions, HostType, HostTypeBuilder, MemoryTable, Record,
    TablelessColumn,
};

/// Everything needed to declare models and host types.
pub mod prelude {
    pub use crate::tableless_model;
    pub use crate::{
        AttrType, AttributeOptions, ColumnOptions, EncryptionConfig, Error, HostType,
        MemoryTable, Record, Result, Schema, TablelessModel, TablelessRecord, Value,
    };
}
