//! Process-wide registry of tableless model schemas.
//!
//! Each [`TablelessModel`] type declares its attributes once; the registry
//! builds the schema on first use and hands out shared references afterwards.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::schema::{Schema, SchemaBuilder};

/// A tableless model type: a name plus its attribute declarations.
///
/// Usually implemented through the `tableless_model!` macro of the facade
/// crate.
pub trait TablelessModel: 'static {
    /// Model name, used in display output and error messages.
    const MODEL_NAME: &'static str;

    /// Declare the model's attributes.
    fn declare(schema: SchemaBuilder) -> SchemaBuilder;

    /// The shared schema of this model.
    fn schema() -> Arc<Schema> {
        schema_for::<Self>()
    }
}

#[derive(Default)]
struct Registry {
    by_type: HashMap<TypeId, Arc<Schema>>,
    by_name: HashMap<String, Arc<Schema>>,
}

fn registry() -> &'static RwLock<Registry> {
    static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(Registry::default()))
}

/// The schema of `M`, built on first request.
pub fn schema_for<M: TablelessModel + ?Sized>() -> Arc<Schema> {
    let type_id = TypeId::of::<M>();
    {
        let registry = registry().read().unwrap_or_else(PoisonError::into_inner);
        if let Some(schema) = registry.by_type.get(&type_id) {
            return Arc::clone(schema);
        }
    }

    // Built outside the lock so a declaration may itself consult the registry.
    let built = Arc::new(M::declare(Schema::builder(M::MODEL_NAME)).build());

    let mut registry = registry().write().unwrap_or_else(PoisonError::into_inner);
    let schema = Arc::clone(registry.by_type.entry(type_id).or_insert(built));
    registry
        .by_name
        .insert(M::MODEL_NAME.to_string(), Arc::clone(&schema));
    tracing::debug!(
        model = M::MODEL_NAME,
        attributes = schema.len(),
        "Registered tableless model schema"
    );
    schema
}

/// Look up a registered schema by model name.
///
/// Only models whose schema has been requested at least once (through
/// [`schema_for`] or [`register`]) are known.
pub fn schema_named(model: &str) -> Option<Arc<Schema>> {
    registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .by_name
        .get(model)
        .cloned()
}

/// Build and register the schema of `M` eagerly.
pub fn register<M: TablelessModel>() -> Arc<Schema> {
    schema_for::<M>()
}

/// Convert a snake_case column name into a model name: `model_options`
/// becomes `ModelOptions`.
pub fn classify(column: &str) -> String {
    column
        .split(['_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect::<String>()
            })
        })
        .collect()
}
