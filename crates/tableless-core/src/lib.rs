//! Core types and traits for Tableless Rust.
//!
//! `tableless-core` is the **foundation layer**: it defines the typed value
//! object that lives inside a single host column, and everything that value
//! object needs to stay well-typed.
//!
//! # Role In The Architecture
//!
//! - **Type Caster**: `AttrType` and [`cast`] map any raw [`Value`] onto a
//!   declared type without ever failing.
//! - **Attribute Schema**: `Schema`, `SchemaBuilder` and the
//!   [`TablelessModel`] registry declare attributes once per model type.
//! - **Value object**: `TablelessRecord` enforces schema-only reads and writes.
//! - **Owner Binding**: `OwnerBinding` and the `ColumnOwner` trait push every
//!   nested write back onto the host column.
//!
//! # Who Uses This Crate
//!
//! - `tableless-codec` moves records in and out of their column representation.
//! - `tableless-host` implements `ColumnOwner` for host records and delegates
//!   unknown calls to bound records.
//!
//! Most applications should use the `tableless` facade.

mod pattern;

pub mod decimal;
pub mod error;
pub mod owner;
pub mod record;
pub mod registry;
pub mod schema;
pub mod types;
pub mod value;

pub use decimal::Decimal;
pub use error::{CodecError, CodecErrorKind, Error, Result};
pub use owner::{ColumnOwner, OwnerBinding};
pub use record::TablelessRecord;
pub use registry::{TablelessModel, classify, register, schema_for, schema_named};
#[cfg(any(test, feature = "testing"))]
pub use schema::TypePatch;
pub use schema::{
    AttributeDef, AttributeDefault, AttributeOptions, DeferredDefault, Schema, SchemaBuilder,
};
pub use types::{AttrType, cast, truthy};
pub use value::Value;
