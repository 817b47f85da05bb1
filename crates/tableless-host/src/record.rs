//! Host records.
//!
//! A [`Record`] holds raw column values, remembers the values it was loaded
//! (or last saved) with, and reports the difference as its change set. It
//! is the owner that tableless records propagate their writes to, and it
//! delegates calls it cannot answer itself to its tableless columns.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tableless_core::{
    ColumnOwner, Error, OwnerBinding, Result, TablelessRecord, Value, truthy,
};

use crate::column::TablelessColumn;
use crate::host::HostType;

/// Members a host record answers besides its columns.
const HOST_CAPABILITIES: &[&str] = &["inspect"];

/// One entry of a record's change set.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeChange {
    /// Value as loaded or last saved; `None` when the column was empty.
    pub previous: Option<JsonValue>,
    /// Current value; `None` when the column has been cleared.
    pub current: Option<JsonValue>,
}

/// A host record with dirty tracking.
///
/// Always handled through `Rc`, so that tableless records materialized from
/// its columns can hold a weak back-reference to it.
pub struct Record {
    host: Arc<HostType>,
    this: Weak<Record>,
    id: Cell<Option<u64>>,
    attributes: RefCell<BTreeMap<String, JsonValue>>,
    original: RefCell<BTreeMap<String, JsonValue>>,
}

impl Record {
    /// A new, unsaved record: every column empty, nothing changed.
    pub fn new(host: Arc<HostType>) -> Rc<Self> {
        Self::with_state(host, None, BTreeMap::new())
    }

    /// A persisted record as loaded from storage.
    pub(crate) fn loaded(
        host: Arc<HostType>,
        id: u64,
        attributes: BTreeMap<String, JsonValue>,
    ) -> Rc<Self> {
        Self::with_state(host, Some(id), attributes)
    }

    fn with_state(
        host: Arc<HostType>,
        id: Option<u64>,
        attributes: BTreeMap<String, JsonValue>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            host,
            this: this.clone(),
            id: Cell::new(id),
            original: RefCell::new(attributes.clone()),
            attributes: RefCell::new(attributes),
        })
    }

    pub fn host_type(&self) -> &Arc<HostType> {
        &self.host
    }

    /// Storage id, once saved.
    pub fn id(&self) -> Option<u64> {
        self.id.get()
    }

    pub fn is_new_record(&self) -> bool {
        self.id.get().is_none()
    }

    // ========================================================================
    // Raw column access
    // ========================================================================

    /// The raw value of `column`, `None` when empty.
    pub fn read_attribute(&self, column: &str) -> Option<JsonValue> {
        self.attributes.borrow().get(column).cloned()
    }

    /// Store a raw value in `column`. `Null` empties the column.
    pub fn write_attribute(&self, column: &str, value: JsonValue) -> Result<()> {
        if !self.host.has_column(column) {
            return Err(Error::unknown_member(self.host.name(), column));
        }
        let mut attributes = self.attributes.borrow_mut();
        if value.is_null() {
            attributes.remove(column);
        } else {
            attributes.insert(column.to_string(), value);
        }
        Ok(())
    }

    // ========================================================================
    // Tableless columns
    // ========================================================================

    /// The tableless record stored in `column`, bound to this record.
    ///
    /// An empty column yields a freshly constructed record with every
    /// default evaluated; reading it does not change the column.
    pub fn tableless(&self, column: &str) -> Result<TablelessRecord> {
        let declared = self.tableless_column(column)?;
        let raw = self.read_attribute(column);
        let record = declared
            .codec()
            .materialize(Arc::clone(declared.schema()), raw.as_ref())
            .map_err(|e| e.in_column(column))?;
        tracing::debug!(
            host = self.host.name(),
            column,
            model = record.model_name(),
            stored = raw.is_some(),
            "Materialized tableless column"
        );

        let owner: Weak<dyn ColumnOwner> = self.this.clone();
        Ok(record.bound(OwnerBinding::new(owner, column)))
    }

    /// Encode `record` into `column`.
    ///
    /// A record of another model is rebuilt as the column's model from its
    /// attributes first, which fails when the column's model does not
    /// declare one of them.
    pub fn assign_tableless(&self, column: &str, record: &TablelessRecord) -> Result<()> {
        let declared = self.tableless_column(column)?;
        let encoded = if Arc::ptr_eq(record.schema(), declared.schema()) {
            declared.codec().encode(record)
        } else {
            let rebuilt =
                TablelessRecord::with_attributes(Arc::clone(declared.schema()), record.attributes())?;
            declared.codec().encode(&rebuilt)
        }
        .map_err(|e| e.in_column(column))?;

        tracing::debug!(
            host = self.host.name(),
            column,
            encrypted = declared.codec().is_encrypted(),
            "Assigned tableless column"
        );
        self.write_attribute(column, encoded)
    }

    /// Build a fresh record of the column's model from `attributes`, store
    /// it, and return it bound to this record.
    pub fn set_tableless_attributes<I, K, V>(&self, column: &str, attributes: I) -> Result<TablelessRecord>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let declared = self.tableless_column(column)?;
        let record = TablelessRecord::with_attributes(Arc::clone(declared.schema()), attributes)?;
        self.assign_tableless(column, &record)?;

        let owner: Weak<dyn ColumnOwner> = self.this.clone();
        Ok(record.bound(OwnerBinding::new(owner, column)))
    }

    fn tableless_column(&self, column: &str) -> Result<&TablelessColumn> {
        self.host
            .tableless_column(column)
            .ok_or_else(|| Error::unknown_member(self.host.name(), column))
    }

    // ========================================================================
    // Dirty tracking
    // ========================================================================

    /// True when any column differs from its loaded (or last saved) value.
    pub fn changed(&self) -> bool {
        let attributes = self.attributes.borrow();
        let original = self.original.borrow();
        *attributes != *original
    }

    /// Changed columns, in declaration order.
    pub fn changed_columns(&self) -> Vec<String> {
        let attributes = self.attributes.borrow();
        let original = self.original.borrow();
        self.host
            .column_names()
            .filter(|column| attributes.get(*column) != original.get(*column))
            .map(str::to_string)
            .collect()
    }

    /// The change set: column name to previous and current value.
    pub fn changes(&self) -> BTreeMap<String, AttributeChange> {
        let attributes = self.attributes.borrow();
        let original = self.original.borrow();
        self.host
            .column_names()
            .filter_map(|column| {
                let previous = original.get(column);
                let current = attributes.get(column);
                (previous != current).then(|| {
                    (
                        column.to_string(),
                        AttributeChange {
                            previous: previous.cloned(),
                            current: current.cloned(),
                        },
                    )
                })
            })
            .collect()
    }

    pub(crate) fn attributes_snapshot(&self) -> BTreeMap<String, JsonValue> {
        self.attributes.borrow().clone()
    }

    /// Record a successful save: the current values become the originals.
    pub(crate) fn mark_saved(&self, id: u64) {
        self.id.set(Some(id));
        *self.original.borrow_mut() = self.attributes.borrow().clone();
    }

    // ========================================================================
    // Dispatch and delegation
    // ========================================================================

    /// True when `send(member, ..)` would find a target: a plain column (as
    /// `name`, `name=` or `name?`), a host capability, or a member any
    /// tableless column's current record responds to.
    pub fn responds_to(&self, member: &str) -> bool {
        let base = member
            .strip_suffix('=')
            .or_else(|| member.strip_suffix('?'))
            .unwrap_or(member);
        if self.host.is_plain_column(base) || HOST_CAPABILITIES.contains(&member) {
            return true;
        }
        self.host.tableless_columns().iter().any(|column| {
            self.tableless(column.name())
                .is_ok_and(|record| record.responds_to(member))
        })
    }

    /// Dispatch a call by name.
    ///
    /// Plain columns are served first. Otherwise the tableless columns are
    /// consulted in declaration order and the call is forwarded, with its
    /// arguments, to the first record that responds to it. A name nobody
    /// answers fails with `UnknownMember`.
    pub fn send(&self, member: &str, args: &[Value]) -> Result<Value> {
        if let Some(result) = self.send_own(member, args) {
            return result;
        }

        for column in self.host.tableless_columns() {
            let mut nested = self.tableless(column.name())?;
            if nested.responds_to(member) {
                tracing::debug!(
                    host = self.host.name(),
                    column = column.name(),
                    member,
                    "Delegating call to tableless column"
                );
                return nested.send(member, args);
            }
        }

        Err(Error::unknown_member(self.host.name(), member))
    }

    fn send_own(&self, member: &str, args: &[Value]) -> Option<Result<Value>> {
        if let Some(column) = member.strip_suffix('=') {
            if !self.host.is_plain_column(column) {
                return None;
            }
            return Some(match args {
                [value] => self
                    .write_attribute(column, value.to_json())
                    .map(|()| value.clone()),
                _ => Err(wrong_arity(member, 1, args.len())),
            });
        }

        let (column, predicate) = match member.strip_suffix('?') {
            Some(column) => (column, true),
            None => (member, false),
        };
        if !self.host.is_plain_column(column) && !HOST_CAPABILITIES.contains(&member) {
            return None;
        }
        if !args.is_empty() {
            return Some(Err(wrong_arity(member, 0, args.len())));
        }
        if member == "inspect" && !self.host.is_plain_column(member) {
            return Some(Ok(Value::Text(self.to_string())));
        }

        let value = self
            .read_attribute(column)
            .map_or(Value::Null, |raw| Value::from_json(&raw));
        Some(Ok(if predicate {
            Value::Bool(truthy(&value))
        } else {
            value
        }))
    }
}

fn wrong_arity(member: &str, expected: usize, given: usize) -> Error {
    Error::WrongArity {
        member: member.to_string(),
        expected,
        given,
    }
}

impl ColumnOwner for Record {
    fn owner_name(&self) -> &str {
        self.host.name()
    }

    fn reassign_column(&self, column: &str, record: &TablelessRecord) -> Result<()> {
        self.assign_tableless(column, record)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<{}", self.host.name())?;
        match self.id.get() {
            Some(id) => write!(f, " id: {}", id)?,
            None => f.write_str(" id: nil")?,
        }
        let attributes = self.attributes.borrow();
        for column in self.host.column_names() {
            match attributes.get(column) {
                Some(value) => write!(f, ", {}: {}", column, value)?,
                None => write!(f, ", {}: nil", column)?,
            }
        }
        f.write_str(">")
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("host", &self.host.name())
            .field("id", &self.id.get())
            .field("attributes", &*self.attributes.borrow())
            .field("changed", &self.changed())
            .finish()
    }
}
