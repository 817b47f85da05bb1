//! Error taxonomy for tableless records.
//!
//! Attribute casting is deliberately absent from this module: a cast never
//! fails, it degrades to the declared type's empty value instead.

use std::error::Error as StdError;
use std::fmt;

/// Result type alias used throughout the tableless crates.
pub type Result<T> = std::result::Result<T, Error>;

/// The primary error type.
#[derive(Debug)]
pub enum Error {
    /// Read or write of a name outside the declared attribute schema.
    AttributeUndefined {
        /// Model (schema) name
        model: String,
        /// The undeclared attribute
        attribute: String,
    },
    /// An operation the record refuses to perform (bulk merging).
    OperationNotSupported {
        /// Model (schema) name
        model: String,
        /// The refused operation
        operation: &'static str,
    },
    /// Encoding or decoding a column value failed.
    Codec(CodecError),
    /// A call on a host record that neither the host nor any bound
    /// tableless column answers.
    UnknownMember {
        /// Host type name
        owner: String,
        /// The requested member
        member: String,
    },
    /// A dynamically dispatched member was called with the wrong number of
    /// arguments.
    WrongArity {
        /// The requested member
        member: String,
        /// Arguments accepted
        expected: usize,
        /// Arguments given
        given: usize,
    },
}

impl Error {
    /// Build an `AttributeUndefined` error.
    pub fn attribute_undefined(model: impl Into<String>, attribute: impl Into<String>) -> Self {
        Error::AttributeUndefined {
            model: model.into(),
            attribute: attribute.into(),
        }
    }

    /// Build an `UnknownMember` error.
    pub fn unknown_member(owner: impl Into<String>, member: impl Into<String>) -> Self {
        Error::UnknownMember {
            owner: owner.into(),
            member: member.into(),
        }
    }

    /// Tag a codec failure with the host column it happened on.
    pub fn in_column(self, column: &str) -> Self {
        match self {
            Error::Codec(err) if err.column.is_none() => Error::Codec(err.for_column(column)),
            other => other,
        }
    }

    /// True for `AttributeUndefined`.
    pub const fn is_attribute_undefined(&self) -> bool {
        matches!(self, Error::AttributeUndefined { .. })
    }

    /// True for `OperationNotSupported`.
    pub const fn is_not_supported(&self) -> bool {
        matches!(self, Error::OperationNotSupported { .. })
    }

    /// True for codec failures.
    pub const fn is_codec(&self) -> bool {
        matches!(self, Error::Codec(_))
    }

    /// True for `UnknownMember`.
    pub const fn is_unknown_member(&self) -> bool {
        matches!(self, Error::UnknownMember { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AttributeUndefined { model, attribute } => {
                write!(f, "the attribute {} is undefined for {}", attribute, model)
            }
            Error::OperationNotSupported { model, operation } => {
                write!(f, "{} does not support {}", model, operation)
            }
            Error::Codec(err) => write!(f, "{}", err),
            Error::UnknownMember { owner, member } => {
                write!(f, "undefined member `{}` for {}", member, owner)
            }
            Error::WrongArity {
                member,
                expected,
                given,
            } => write!(
                f,
                "wrong number of arguments for `{}` (given {}, expected {})",
                member, given, expected
            ),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Codec(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CodecError> for Error {
    fn from(err: CodecError) -> Self {
        Error::Codec(err)
    }
}

/// The stage of the codec that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecErrorKind {
    /// Record to structured text
    Serialize,
    /// Structured text (or raw column value) to attribute map
    Deserialize,
    /// Encryption of serialized text
    Encrypt,
    /// Decryption or authentication of stored text
    Decrypt,
    /// Unusable key material
    Key,
}

impl CodecErrorKind {
    const fn as_str(self) -> &'static str {
        match self {
            CodecErrorKind::Serialize => "serialize",
            CodecErrorKind::Deserialize => "deserialize",
            CodecErrorKind::Encrypt => "encrypt",
            CodecErrorKind::Decrypt => "decrypt",
            CodecErrorKind::Key => "key",
        }
    }
}

/// A failure moving a record in or out of its column.
#[derive(Debug)]
pub struct CodecError {
    pub kind: CodecErrorKind,
    /// Host column involved, when known
    pub column: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl CodecError {
    pub fn new(kind: CodecErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            column: None,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying cause.
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Attach the host column name.
    pub fn for_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(
                f,
                "codec {} error on column {}: {}",
                self.kind.as_str(),
                column,
                self.message
            ),
            None => write!(f, "codec {} error: {}", self.kind.as_str(), self.message),
        }
    }
}

impl StdError for CodecError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}
