//! Host type declarations.
//!
//! A [`HostType`] describes one kind of host record: its plain columns and
//! the columns that hold tableless records, in declaration order. The order
//! matters for delegation, which consults tableless columns first to last.

use std::rc::Rc;
use std::sync::Arc;

use tableless_codec::Codec;
use tableless_core::{Error, Result, Schema, TablelessModel, classify, schema_named};

use crate::column::{ColumnOptions, TablelessColumn};
use crate::record::Record;

/// Column layout of a host record type.
#[derive(Debug)]
pub struct HostType {
    name: String,
    columns: Vec<String>,
    tableless: Vec<TablelessColumn>,
}

impl HostType {
    pub fn builder(name: impl Into<String>) -> HostTypeBuilder {
        HostTypeBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plain (non-tableless) columns.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Tableless columns in declaration order.
    pub fn tableless_columns(&self) -> &[TablelessColumn] {
        &self.tableless
    }

    pub fn tableless_column(&self, name: &str) -> Option<&TablelessColumn> {
        self.tableless.iter().find(|column| column.name() == name)
    }

    pub fn is_plain_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column == name)
    }

    /// True for any declared column, plain or tableless.
    pub fn has_column(&self, name: &str) -> bool {
        self.is_plain_column(name) || self.tableless_column(name).is_some()
    }

    /// Every column name: plain columns first, then tableless ones.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .map(String::as_str)
            .chain(self.tableless.iter().map(TablelessColumn::name))
    }

    /// A new, unsaved record of this type.
    pub fn new_record(self: &Arc<Self>) -> Rc<Record> {
        Record::new(Arc::clone(self))
    }
}

/// Builder for [`HostType`].
#[derive(Debug)]
pub struct HostTypeBuilder {
    name: String,
    columns: Vec<String>,
    tableless: Vec<TablelessColumn>,
}

impl HostTypeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            tableless: Vec::new(),
        }
    }

    /// Declare a plain column.
    pub fn column(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.columns.contains(&name) {
            self.columns.push(name);
        }
        self
    }

    /// Store model `M` in `column`, unencrypted.
    pub fn has_tableless<M: TablelessModel>(self, column: impl Into<String>) -> Self {
        self.push_tableless(TablelessColumn::new(column, M::schema(), Codec::plain()))
    }

    /// Store model `M` in `column` with explicit options.
    pub fn has_tableless_with<M: TablelessModel>(
        self,
        column: impl Into<String>,
        options: &ColumnOptions,
    ) -> Result<Self> {
        self.has_tableless_schema(column, M::schema(), options)
    }

    /// Store records of `schema` in `column`.
    pub fn has_tableless_schema(
        self,
        column: impl Into<String>,
        schema: Arc<Schema>,
        options: &ColumnOptions,
    ) -> Result<Self> {
        let codec = options.codec()?;
        Ok(self.push_tableless(TablelessColumn::new(column, schema, codec)))
    }

    /// Store in `column` the registered model named after it: `options`
    /// holds an `Options`, `model_options` a `ModelOptions`.
    ///
    /// The model must have been registered beforehand.
    pub fn has_tableless_named(self, column: impl Into<String>) -> Result<Self> {
        let column = column.into();
        let model = classify(&column);
        match schema_named(&model) {
            Some(schema) => Ok(self.push_tableless(TablelessColumn::new(column, schema, Codec::plain()))),
            None => Err(Error::unknown_member(self.name, model)),
        }
    }

    pub fn build(self) -> Arc<HostType> {
        tracing::debug!(
            host = %self.name,
            columns = self.columns.len(),
            tableless = self.tableless.len(),
            "Declared host type"
        );
        Arc::new(HostType {
            name: self.name,
            columns: self.columns,
            tableless: self.tableless,
        })
    }

    /// Redeclaring a column replaces the earlier declaration in place.
    fn push_tableless(mut self, column: TablelessColumn) -> Self {
        self.columns.retain(|name| name != column.name());
        match self.tableless.iter_mut().find(|c| c.name() == column.name()) {
            Some(existing) => *existing = column,
            None => self.tableless.push(column),
        }
        self
    }
}
