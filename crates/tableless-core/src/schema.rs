//! Attribute schemas and the declaration DSL.
//!
//! A [`Schema`] is built once per tableless model type and shared by every
//! record of that type. Attribute types are fixed after [`SchemaBuilder::build`];
//! the only exception is [`Schema::patch_type`], which exists for type-matrix
//! tests and is compiled only under `cfg(test)` or the `testing` feature.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{Error, Result};
use crate::types::AttrType;
use crate::value::Value;

/// A zero-argument default, evaluated at fresh construction.
pub type DeferredDefault = Arc<dyn Fn() -> Value + Send + Sync>;

/// The default value of an attribute.
#[derive(Clone)]
pub enum AttributeDefault {
    /// A fixed value.
    Literal(Value),
    /// Evaluated anew for every freshly constructed record.
    Deferred(DeferredDefault),
}

impl AttributeDefault {
    /// The default's current value.
    pub fn evaluate(&self) -> Value {
        match self {
            AttributeDefault::Literal(value) => value.clone(),
            AttributeDefault::Deferred(f) => f(),
        }
    }

    pub const fn is_deferred(&self) -> bool {
        matches!(self, AttributeDefault::Deferred(_))
    }
}

impl fmt::Debug for AttributeDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeDefault::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            AttributeDefault::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Options accepted by [`SchemaBuilder::attribute`].
#[derive(Debug, Clone, Default)]
pub struct AttributeOptions {
    attr_type: AttrType,
    default: Option<AttributeDefault>,
}

impl AttributeOptions {
    /// `String` type, no default.
    pub fn new() -> Self {
        <Self as Default>::default()
    }

    /// Set the declared type.
    pub fn of_type(mut self, attr_type: AttrType) -> Self {
        self.attr_type = attr_type;
        self
    }

    /// Set a literal default.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(AttributeDefault::Literal(value.into()));
        self
    }

    /// Set a deferred default, evaluated at each fresh construction.
    pub fn default_with<F, V>(mut self, f: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.default = Some(AttributeDefault::Deferred(Arc::new(move || f().into())));
        self
    }
}

impl From<AttrType> for AttributeOptions {
    fn from(attr_type: AttrType) -> Self {
        Self::new().of_type(attr_type)
    }
}

/// A declared attribute.
#[derive(Debug)]
pub struct AttributeDef {
    name: String,
    attr_type: AtomicU8,
    default: Option<AttributeDefault>,
}

impl AttributeDef {
    fn new(name: String, options: AttributeOptions) -> Self {
        Self {
            name,
            attr_type: AtomicU8::new(options.attr_type.to_u8()),
            default: options.default,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared type.
    pub fn attr_type(&self) -> AttrType {
        AttrType::from_u8(self.attr_type.load(Ordering::Acquire))
    }

    pub fn default(&self) -> Option<&AttributeDefault> {
        self.default.as_ref()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Value for a fresh record: the default, or `Null` when there is none.
    pub fn fresh_value(&self) -> Value {
        self.default
            .as_ref()
            .map_or(Value::Null, AttributeDefault::evaluate)
    }

    /// Value for a decoded record missing this attribute: literal defaults
    /// apply, deferred ones are not invoked.
    pub fn decoded_fallback(&self) -> Value {
        match &self.default {
            Some(AttributeDefault::Literal(value)) => value.clone(),
            Some(AttributeDefault::Deferred(_)) | None => Value::Null,
        }
    }
}

impl Clone for AttributeDef {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            attr_type: AtomicU8::new(self.attr_type().to_u8()),
            default: self.default.clone(),
        }
    }
}

/// The ordered attribute schema of one tableless model type.
#[derive(Debug, Clone)]
pub struct Schema {
    model: String,
    attributes: Vec<AttributeDef>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Start declaring a schema for `model`.
    pub fn builder(model: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(model)
    }

    /// Name of the model this schema belongs to.
    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Number of declared attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Look up an attribute by name.
    pub fn get(&self, name: &str) -> Option<&AttributeDef> {
        self.index.get(name).map(|&idx| &self.attributes[idx])
    }

    /// Declaration position of an attribute.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Like [`Schema::position`], failing with `AttributeUndefined`.
    pub fn require(&self, name: &str) -> Result<usize> {
        self.position(name)
            .ok_or_else(|| Error::attribute_undefined(&self.model, name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Attributes in declaration order.
    pub fn attributes(&self) -> &[AttributeDef] {
        &self.attributes
    }

    /// Attribute names in declaration order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(AttributeDef::name)
    }

    /// Replace the declared type of one attribute, restoring it when the
    /// returned guard drops.
    ///
    /// Test-only. The change is visible to every record sharing this schema,
    /// so concurrent tests must not patch a schema other tests read.
    #[cfg(any(test, feature = "testing"))]
    pub fn patch_type(&self, name: &str, attr_type: AttrType) -> Result<TypePatch<'_>> {
        let def = &self.attributes[self.require(name)?];
        let previous = AttrType::from_u8(def.attr_type.swap(attr_type.to_u8(), Ordering::AcqRel));
        tracing::debug!(
            model = %self.model,
            attribute = name,
            from = previous.name(),
            to = attr_type.name(),
            "Patched attribute type"
        );
        Ok(TypePatch { def, previous })
    }
}

/// Restores a patched attribute type on drop.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug)]
pub struct TypePatch<'s> {
    def: &'s AttributeDef,
    previous: AttrType,
}

#[cfg(any(test, feature = "testing"))]
impl TypePatch<'_> {
    /// The type that was declared before the patch.
    pub fn previous(&self) -> AttrType {
        self.previous
    }
}

#[cfg(any(test, feature = "testing"))]
impl Drop for TypePatch<'_> {
    fn drop(&mut self) {
        self.def
            .attr_type
            .store(self.previous.to_u8(), Ordering::Release);
    }
}

/// Accumulates attribute declarations for one model.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    model: String,
    attributes: Vec<AttributeDef>,
}

impl SchemaBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            attributes: Vec::new(),
        }
    }

    /// Declare an attribute. Declaring an existing name again replaces its
    /// type and default in place.
    pub fn attribute(mut self, name: impl Into<String>, options: impl Into<AttributeOptions>) -> Self {
        let def = AttributeDef::new(name.into(), options.into());
        match self.attributes.iter_mut().find(|a| a.name == def.name) {
            Some(existing) => *existing = def,
            None => self.attributes.push(def),
        }
        self
    }

    /// Finish the declaration.
    pub fn build(self) -> Schema {
        let index = self
            .attributes
            .iter()
            .enumerate()
            .map(|(idx, def)| (def.name.clone(), idx))
            .collect();
        Schema {
            model: self.model,
            attributes: self.attributes,
            index,
        }
    }
}
