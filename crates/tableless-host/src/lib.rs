//! Host records for Tableless Rust.
//!
//! This crate is the reference host a tableless record lives in: a record
//! type with raw column read/write primitives, dirty tracking, and a small
//! in-memory table to save and reload rows.
//!
//! # Declaring a host type
//!
//! ```ignore
//! let host = HostType::builder("TestModel")
//!     .column("name")
//!     .has_tableless::<ModelOptions>("options")
//!     .has_tableless_with::<ModelSettings>("settings", &ColumnOptions::new().encryption_key(key))?
//!     .build();
//!
//! let record = host.new_record();
//! let mut options = record.tableless("options")?;
//! options.set("typed_attribute", 12)?;   // the host record is now changed
//! record.send("typed_attribute?", &[])?; // delegated to `options`
//! ```

pub mod column;
pub mod host;
pub mod record;
pub mod table;

pub use column::{ColumnOptions, TablelessColumn};
pub use host::{HostType, HostTypeBuilder};
pub use record::{AttributeChange, Record};
pub use table::MemoryTable;
