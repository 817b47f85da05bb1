//! The tableless record value object.
//!
//! A `TablelessRecord` is a key-value container restricted to the attributes
//! of its [`Schema`]. Every write stores the value cast to the declared type,
//! every read casts again (so a patched type is honored), and names outside
//! the schema fail with `AttributeUndefined`.
//!
//! # Example
//!
//! ```
//! use tableless_core::{AttrType, AttributeOptions, Schema, TablelessRecord, Value};
//! use std::sync::Arc;
//!
//! let schema = Arc::new(
//!     Schema::builder("Options")
//!         .attribute("a", AttributeOptions::new().of_type(AttrType::Integer).default(5))
//!         .attribute("b", AttrType::String)
//!         .build(),
//! );
//!
//! let mut options = TablelessRecord::new(Arc::clone(&schema));
//! assert_eq!(options.get("a").unwrap(), Value::Int(5));
//! assert_eq!(options.get("b").unwrap(), Value::Text(String::new()));
//!
//! options.set("a", "12").unwrap();
//! assert_eq!(options.get("a").unwrap(), Value::Int(12));
//! assert!(options.get("c").is_err());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::{Error, Result};
use crate::owner::{ColumnOwner, OwnerBinding};
use crate::registry::TablelessModel;
use crate::schema::Schema;
use crate::types::{cast, truthy};
use crate::value::Value;

/// Members every record answers besides its attributes.
const CAPABILITIES: &[&str] = &["inspect", "model_name", "to_json"];

/// A dynamically dispatched member name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Member<'a> {
    Read(&'a str),
    Write(&'a str),
    Predicate(&'a str),
}

impl<'a> Member<'a> {
    fn parse(member: &'a str) -> Self {
        if let Some(name) = member.strip_suffix('=') {
            Member::Write(name)
        } else if let Some(name) = member.strip_suffix('?') {
            Member::Predicate(name)
        } else {
            Member::Read(member)
        }
    }
}

/// A schema-typed record stored inside one host column.
#[derive(Clone)]
pub struct TablelessRecord {
    schema: Arc<Schema>,
    /// Cast values, indexed by declaration position.
    values: Vec<Value>,
    binding: Option<OwnerBinding>,
}

impl TablelessRecord {
    /// A fresh record: every attribute holds its default, deferred defaults
    /// are evaluated now.
    pub fn new(schema: Arc<Schema>) -> Self {
        let values = schema
            .attributes()
            .iter()
            .map(|def| cast(def.attr_type(), &def.fresh_value()))
            .collect();
        Self {
            schema,
            values,
            binding: None,
        }
    }

    /// A fresh record with `initial` written over the defaults, each through
    /// [`TablelessRecord::set`].
    pub fn with_attributes<I, K, V>(schema: Arc<Schema>, initial: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut record = Self::new(schema);
        for (name, value) in initial {
            record.set(name.as_ref(), value)?;
        }
        Ok(record)
    }

    /// A fresh record of model `M`.
    pub fn of<M: TablelessModel>() -> Self {
        Self::new(M::schema())
    }

    /// A fresh record of model `M` with `initial` written over the defaults.
    pub fn of_with<M, I, K, V>(initial: I) -> Result<Self>
    where
        M: TablelessModel,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        Self::with_attributes(M::schema(), initial)
    }

    /// A record rebuilt from previously stored values.
    ///
    /// Stored values win and defaults are not re-evaluated: an attribute
    /// missing from `decoded` gets its literal default, or stays empty when
    /// its default is deferred. Undeclared keys fail with `AttributeUndefined`.
    pub fn from_decoded<I, K>(schema: Arc<Schema>, decoded: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut values: Vec<Value> = schema
            .attributes()
            .iter()
            .map(|def| cast(def.attr_type(), &def.decoded_fallback()))
            .collect();
        for (name, value) in decoded {
            let idx = schema.require(name.as_ref())?;
            values[idx] = cast(schema.attributes()[idx].attr_type(), &value);
        }
        Ok(Self {
            schema,
            values,
            binding: None,
        })
    }

    /// [`TablelessRecord::from_decoded`] over a structured (JSON) object.
    pub fn from_json_map(schema: Arc<Schema>, map: &JsonMap<String, JsonValue>) -> Result<Self> {
        Self::from_decoded(schema, map.iter().map(|(k, v)| (k, Value::from_json(v))))
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn model_name(&self) -> &str {
        self.schema.model_name()
    }

    /// Read an attribute, cast to its declared type.
    pub fn get(&self, name: &str) -> Result<Value> {
        let idx = self.schema.require(name)?;
        Ok(cast(self.schema.attributes()[idx].attr_type(), &self.values[idx]))
    }

    /// Write an attribute and return the value as stored.
    ///
    /// The value is cast to the declared type. When the record is bound to a
    /// host column, the whole record is then re-assigned to that column.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<Value> {
        let idx = self.schema.require(name)?;
        let stored = cast(self.schema.attributes()[idx].attr_type(), &value.into());
        self.values[idx] = stored.clone();

        if let Some(binding) = &self.binding {
            binding.propagate(self)?;
        }
        Ok(stored)
    }

    /// Read an attribute as a boolean by truthiness. A trailing `?` on
    /// `name` is accepted.
    pub fn predicate(&self, name: &str) -> Result<bool> {
        let name = name.strip_suffix('?').unwrap_or(name);
        self.get(name).map(|value| truthy(&value))
    }

    /// True when `member` is a declared attribute, its setter (`name=`) or
    /// predicate (`name?`) form, or one of the record's own capabilities.
    pub fn responds_to(&self, member: &str) -> bool {
        match Member::parse(member) {
            Member::Read(name) => self.schema.contains(name) || CAPABILITIES.contains(&name),
            Member::Write(name) | Member::Predicate(name) => self.schema.contains(name),
        }
    }

    /// Dispatch a member call by name: `name` reads, `name=` writes its
    /// single argument and `name?` reads by truthiness.
    pub fn send(&mut self, member: &str, args: &[Value]) -> Result<Value> {
        match Member::parse(member) {
            Member::Write(name) => match args {
                [value] => self.set(name, value.clone()),
                _ => Err(arity(member, 1, args.len())),
            },
            Member::Predicate(name) => {
                expect_no_args(member, args)?;
                self.predicate(name).map(Value::Bool)
            }
            Member::Read(name) => {
                expect_no_args(member, args)?;
                match name {
                    _ if self.schema.contains(name) => self.get(name),
                    "inspect" => Ok(Value::Text(self.to_string())),
                    "model_name" => Ok(Value::Text(self.model_name().to_string())),
                    "to_json" => Ok(Value::Text(self.to_json().to_string())),
                    _ => Err(Error::attribute_undefined(self.model_name(), name)),
                }
            }
        }
    }

    /// Bulk merging is refused: it would bypass the schema.
    pub fn merge<I, K, V>(&self, _other: I) -> Result<TablelessRecord>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        Err(Error::OperationNotSupported {
            model: self.model_name().to_string(),
            operation: "merge",
        })
    }

    /// `(name, value)` pairs in declaration order.
    pub fn attributes(&self) -> Vec<(&str, Value)> {
        self.schema
            .attributes()
            .iter()
            .zip(&self.values)
            .map(|(def, raw)| (def.name(), cast(def.attr_type(), raw)))
            .collect()
    }

    /// Attribute values keyed by name.
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        self.attributes()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }

    /// Structured form: a JSON object of attribute name to cast value.
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.attributes()
                .into_iter()
                .map(|(name, value)| (name.to_string(), value.to_json()))
                .collect(),
        )
    }

    /// The host binding, when this record was materialized from a column.
    pub fn binding(&self) -> Option<&OwnerBinding> {
        self.binding.as_ref()
    }

    /// The owning host record, while it is alive.
    pub fn owner(&self) -> Option<Rc<dyn ColumnOwner>> {
        self.binding.as_ref().and_then(OwnerBinding::owner)
    }

    /// The host column this record represents.
    pub fn column(&self) -> Option<&str> {
        self.binding.as_ref().map(OwnerBinding::column)
    }

    /// Bind this record to a host column. Later writes propagate there.
    pub fn attach(&mut self, binding: OwnerBinding) {
        self.binding = Some(binding);
    }

    /// Builder form of [`TablelessRecord::attach`].
    pub fn bound(mut self, binding: OwnerBinding) -> Self {
        self.attach(binding);
        self
    }

    /// Drop the host binding; the record becomes standalone.
    pub fn detach(&mut self) -> Option<OwnerBinding> {
        self.binding.take()
    }
}

fn arity(member: &str, expected: usize, given: usize) -> Error {
    Error::WrongArity {
        member: member.to_string(),
        expected,
        given,
    }
}

fn expect_no_args(member: &str, args: &[Value]) -> Result<()> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(arity(member, 0, args.len()))
    }
}

impl PartialEq for TablelessRecord {
    fn eq(&self, other: &Self) -> bool {
        self.model_name() == other.model_name() && self.attributes() == other.attributes()
    }
}

/// `<#Model a=1 b="x">`, attributes sorted by name.
impl fmt::Display for TablelessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut attributes = self.attributes();
        attributes.sort_by(|a, b| a.0.cmp(b.0));

        write!(f, "<#{}", self.model_name())?;
        for (name, value) in attributes {
            write!(f, " {}={}", name, value.inspect())?;
        }
        f.write_str(">")
    }
}

impl fmt::Debug for TablelessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Serialize for TablelessRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let attributes = self.attributes();
        let mut map = serializer.serialize_map(Some(attributes.len()))?;
        for (name, value) in &attributes {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Decimal;
    use crate::schema::AttributeOptions;
    use crate::types::AttrType;
    use std::cell::RefCell;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn scenario_schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder("Scenario")
                .attribute("a", AttributeOptions::new().of_type(AttrType::Integer).default(5))
                .attribute("b", AttrType::String)
                .build(),
        )
    }

    fn options_schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder("ModelOptions")
                .attribute("no_default_value_no_type_attribute", AttributeOptions::new())
                .attribute("no_default_value_typed_attribute", AttrType::Integer)
                .attribute("no_type_attribute", AttributeOptions::new().default(111))
                .attribute(
                    "typed_attribute",
                    AttributeOptions::new().of_type(AttrType::Integer).default(5),
                )
                .attribute("typed_attribute_no_default_value", AttrType::Integer)
                .build(),
        )
    }

    /// Host stand-in that records every re-assignment.
    struct RecordingOwner {
        assigned: RefCell<Vec<(String, JsonValue)>>,
    }

    impl ColumnOwner for RecordingOwner {
        fn owner_name(&self) -> &str {
            "RecordingOwner"
        }

        fn reassign_column(&self, column: &str, record: &TablelessRecord) -> Result<()> {
            self.assigned
                .borrow_mut()
                .push((column.to_string(), record.to_json()));
            Ok(())
        }
    }

    #[test]
    fn test_concrete_scenario() {
        let schema = scenario_schema();
        let fresh = TablelessRecord::new(Arc::clone(&schema));
        assert_eq!(fresh.get("a").unwrap(), Value::Int(5));
        assert_eq!(fresh.get("b").unwrap(), Value::Text(String::new()));

        let given =
            TablelessRecord::with_attributes(Arc::clone(&schema), [("a", Value::from("12")), ("b", Value::from(9))])
                .unwrap();
        assert_eq!(given.get("a").unwrap(), Value::Int(12));
        assert_eq!(given.get("b").unwrap(), Value::Text("9".to_string()));

        assert!(given.get("c").unwrap_err().is_attribute_undefined());
    }

    #[test]
    fn test_defaults_without_explicit_value() {
        let options = TablelessRecord::new(options_schema());
        assert_eq!(
            options.get("no_default_value_no_type_attribute").unwrap(),
            Value::Text(String::new())
        );
        assert_eq!(options.get("no_default_value_typed_attribute").unwrap(), Value::Int(0));
        assert_eq!(
            options.get("no_type_attribute").unwrap(),
            Value::Text("111".to_string())
        );
        assert_eq!(options.get("typed_attribute").unwrap(), Value::Int(5));
    }

    #[test]
    fn test_undeclared_names_fail_both_ways() {
        let mut options = TablelessRecord::new(options_schema());
        for name in ["unknown_attribute", "typed"] {
            assert!(options.get(name).unwrap_err().is_attribute_undefined());
            assert!(options.set(name, "whatever").unwrap_err().is_attribute_undefined());
        }
    }

    #[test]
    fn test_set_returns_cast_value() {
        let mut options = TablelessRecord::new(options_schema());
        assert_eq!(options.set("typed_attribute", "1234").unwrap(), Value::Int(1234));
        assert_eq!(options.get("typed_attribute").unwrap(), Value::Int(1234));
        assert_eq!(
            options.set("no_type_attribute", 4.5).unwrap(),
            Value::Text("4.5".to_string())
        );
    }

    #[test]
    fn test_merge_is_refused() {
        let options = TablelessRecord::new(options_schema());
        let err = options
            .merge([("some_new_attribute", Value::from("whatever"))])
            .unwrap_err();
        assert!(err.is_not_supported());
        assert!(options.merge(Vec::<(String, Value)>::new()).is_err());
    }

    #[test]
    fn test_display_sorted_by_name() {
        let options = TablelessRecord::new(options_schema());
        assert_eq!(
            options.to_string(),
            "<#ModelOptions no_default_value_no_type_attribute=\"\" \
             no_default_value_typed_attribute=0 no_type_attribute=\"111\" \
             typed_attribute=5 typed_attribute_no_default_value=0>"
        );
    }

    #[test]
    fn test_predicates_and_dispatch() {
        let mut options = TablelessRecord::new(options_schema());
        assert!(options.responds_to("typed_attribute"));
        assert!(options.responds_to("typed_attribute?"));
        assert!(options.responds_to("typed_attribute="));
        assert!(options.responds_to("inspect"));
        assert!(!options.responds_to("unknown_attribute?"));

        assert_eq!(options.send("typed_attribute?", &[]).unwrap(), Value::Bool(true));
        // Only null and false read as false: "" and 0 are set values.
        assert_eq!(
            options.send("no_default_value_no_type_attribute?", &[]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            options.send("typed_attribute=", &[Value::from("0")]).unwrap(),
            Value::Int(0)
        );
        assert!(options.predicate("typed_attribute").unwrap());
        assert!(matches!(
            options.send("typed_attribute=", &[]),
            Err(Error::WrongArity { expected: 1, given: 0, .. })
        ));
        assert!(options.send("unknown_attribute", &[]).unwrap_err().is_attribute_undefined());
    }

    #[test]
    fn test_decoded_values_skip_deferred_defaults() {
        let calls = Arc::new(AtomicI64::new(0));
        let seen = Arc::clone(&calls);
        let schema = Arc::new(
            Schema::builder("Stamped")
                .attribute(
                    "stamp",
                    AttributeOptions::new()
                        .of_type(AttrType::Integer)
                        .default_with(move || seen.fetch_add(1, Ordering::SeqCst) + 100),
                )
                .attribute("label", AttributeOptions::new().default("fallback"))
                .build(),
        );

        let first = TablelessRecord::new(Arc::clone(&schema));
        let second = TablelessRecord::new(Arc::clone(&schema));
        assert_eq!(first.get("stamp").unwrap(), Value::Int(100));
        assert_eq!(second.get("stamp").unwrap(), Value::Int(101));

        let decoded =
            TablelessRecord::from_decoded(Arc::clone(&schema), [("stamp", Value::Int(7))]).unwrap();
        assert_eq!(decoded.get("stamp").unwrap(), Value::Int(7));
        assert_eq!(decoded.get("label").unwrap(), Value::Text("fallback".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let unknown = TablelessRecord::from_decoded(schema, [("gone", Value::Null)]);
        assert!(unknown.unwrap_err().is_attribute_undefined());
    }

    #[test]
    fn test_bound_record_propagates_whole_record() {
        let owner = Rc::new(RecordingOwner {
            assigned: RefCell::new(Vec::new()),
        });
        let dyn_owner: Rc<dyn ColumnOwner> = owner.clone();

        let mut options = TablelessRecord::new(scenario_schema());
        options.set("a", 1).unwrap();
        assert!(owner.assigned.borrow().is_empty());

        options.attach(OwnerBinding::to(&dyn_owner, "options"));
        assert_eq!(options.column(), Some("options"));
        assert!(options.binding().unwrap().is_owned_by(&dyn_owner));

        options.set("b", "x").unwrap();
        let assigned = owner.assigned.borrow();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].0, "options");
        assert_eq!(assigned[0].1, serde_json::json!({"a": 1, "b": "x"}));
    }

    #[test]
    fn test_dropped_owner_is_not_kept_alive() {
        let owner: Rc<dyn ColumnOwner> = Rc::new(RecordingOwner {
            assigned: RefCell::new(Vec::new()),
        });
        let mut options =
            TablelessRecord::new(scenario_schema()).bound(OwnerBinding::to(&owner, "options"));
        drop(owner);

        assert!(options.owner().is_none());
        assert!(!options.binding().unwrap().is_live());
        assert_eq!(options.set("a", 2).unwrap(), Value::Int(2));

        assert!(options.detach().is_some());
        assert!(options.column().is_none());
    }

    #[test]
    fn test_equality_ignores_binding_and_uses_cast_values() {
        let schema = scenario_schema();
        let a = TablelessRecord::with_attributes(Arc::clone(&schema), [("a", "12")]).unwrap();
        let b = TablelessRecord::with_attributes(Arc::clone(&schema), [("a", 12)]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_serialize_in_declaration_order() {
        let schema = Arc::new(
            Schema::builder("Money")
                .attribute("currency", AttributeOptions::new().default("EUR"))
                .attribute("amount", AttributeOptions::new().of_type(AttrType::Decimal).default("10.50"))
                .build(),
        );
        let money = TablelessRecord::new(schema);
        assert_eq!(
            money.get("amount").unwrap(),
            Value::Decimal(Decimal::parse_lossy("10.5"))
        );
        assert_eq!(
            serde_json::to_string(&money).unwrap(),
            r#"{"currency":"EUR","amount":"10.5"}"#
        );
    }
}
