//! Column codecs for Tableless Rust.
//!
//! A [`Codec`] turns a `TablelessRecord` into the raw value of its host
//! column and back. Columns declared without an encryption key use the
//! plain codec; columns with a key use [`MessageEncryptor`] over a canonical
//! JSON serialization.

pub mod codec;
pub mod config;
pub mod encryptor;

pub use codec::Codec;
pub use config::{DEFAULT_ITERATIONS, DEFAULT_SALT, EncryptionConfig};
pub use encryptor::MessageEncryptor;
