//! Declaration macro for tableless models.

/// Declare a tableless model type.
///
/// Each attribute is a name, an optional `: Type` (an [`AttrType`] variant,
/// `String` when omitted) and an optional default: `= expr` for a literal,
/// `=> closure` for a deferred default evaluated at each fresh construction.
///
/// ```ignore
/// tableless_model! {
///     /// Options stored in `test_models.options`.
///     pub struct ModelOptions {
///         no_default_value_no_type_attribute,
///         no_default_value_typed_attribute: Integer,
///         no_type_attribute = 111,
///         typed_attribute: Integer = 5,
///         created_at: Time => || chrono::Utc::now(),
///     }
/// }
///
/// let options = TablelessRecord::of::<ModelOptions>();
/// ```
///
/// [`AttrType`]: crate::AttrType
#[macro_export]
macro_rules! tableless_model {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $attr:ident
                $(: $ty:ident)?
                $(= $default:expr)?
                $(=> $deferred:expr)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        $vis struct $name;

        impl $crate::TablelessModel for $name {
            const MODEL_NAME: &'static str = stringify!($name);

            fn declare(schema: $crate::SchemaBuilder) -> $crate::SchemaBuilder {
                schema
                $(
                    .attribute(
                        stringify!($attr),
                        $crate::AttributeOptions::new()
                            $(.of_type($crate::AttrType::$ty))?
                            $(.default($default))?
                            $(.default_with($deferred))?,
                    )
                )*
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{AttrType, TablelessModel, TablelessRecord, Value};

    tableless_model! {
        struct Declared {
            plain,
            count: Integer,
            label = 111,
            ratio: Float = "0.5",
            stamp: Integer => || 42,
        }
    }

    #[test]
    fn test_macro_declares_schema() {
        let schema = Declared::schema();
        assert_eq!(schema.model_name(), "Declared");
        let names: Vec<_> = schema.attribute_names().collect();
        assert_eq!(names, ["plain", "count", "label", "ratio", "stamp"]);
        assert_eq!(schema.get("plain").unwrap().attr_type(), AttrType::String);
        assert_eq!(schema.get("count").unwrap().attr_type(), AttrType::Integer);
        assert!(schema.get("stamp").unwrap().default().unwrap().is_deferred());
    }

    #[test]
    fn test_macro_defaults() {
        let record = TablelessRecord::of::<Declared>();
        assert_eq!(record.get("label").unwrap(), Value::Text("111".to_string()));
        assert_eq!(record.get("ratio").unwrap(), Value::Float(0.5));
        assert_eq!(record.get("stamp").unwrap(), Value::Int(42));
        assert_eq!(record.get("count").unwrap(), Value::Int(0));
    }
}
