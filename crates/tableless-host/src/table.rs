//! In-memory table of host records.
//!
//! Rows are stored the way a text-column database would hold them: every
//! cell is a string. Columns serialized by the host (plain columns and plain
//! tableless columns) are written as JSON text and parsed back on load.
//! Encrypted tableless columns already hold text and are stored verbatim.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tableless_core::{CodecError, CodecErrorKind, Error, Result};

use crate::host::HostType;
use crate::record::Record;

type Row = BTreeMap<String, String>;

/// Rows of one host type, keyed by id.
#[derive(Debug)]
pub struct MemoryTable {
    host: Arc<HostType>,
    rows: BTreeMap<u64, Row>,
    next_id: u64,
}

impl MemoryTable {
    pub fn new(host: Arc<HostType>) -> Self {
        Self {
            host,
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn host_type(&self) -> &Arc<HostType> {
        &self.host
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert a new record or write the changed columns of a persisted one.
    ///
    /// Returns the record's id. The record is clean afterwards.
    #[tracing::instrument(level = "debug", skip(self, record), fields(host = self.host.name()))]
    pub fn save(&mut self, record: &Record) -> Result<u64> {
        if !Arc::ptr_eq(record.host_type(), &self.host) {
            return Err(Error::OperationNotSupported {
                model: record.host_type().name().to_string(),
                operation: "save into another host type's table",
            });
        }

        let attributes = record.attributes_snapshot();
        let id = match record.id() {
            Some(id) if self.rows.contains_key(&id) => {
                let changed = record.changed_columns();
                let mut cells = Vec::with_capacity(changed.len());
                for column in &changed {
                    let cell = attributes
                        .get(column)
                        .map(|value| self.encode_cell(column, value))
                        .transpose()?;
                    cells.push((column, cell));
                }
                let row = self.rows.entry(id).or_default();
                for (column, cell) in cells {
                    match cell {
                        Some(cell) => row.insert(column.clone(), cell),
                        None => row.remove(column),
                    };
                }
                tracing::info!(id, columns = ?changed, "Updated host record");
                id
            }
            _ => {
                let mut row = Row::new();
                for (column, value) in &attributes {
                    row.insert(column.clone(), self.encode_cell(column, value)?);
                }
                let id = self.next_id;
                self.next_id += 1;
                self.rows.insert(id, row);
                tracing::info!(id, columns = attributes.len(), "Inserted host record");
                id
            }
        };

        record.mark_saved(id);
        Ok(id)
    }

    /// The record with the lowest id.
    #[tracing::instrument(level = "debug", skip(self), fields(host = self.host.name()))]
    pub fn first(&self) -> Result<Option<Rc<Record>>> {
        self.rows
            .iter()
            .next()
            .map(|(id, row)| self.load(*id, row))
            .transpose()
    }

    #[tracing::instrument(level = "debug", skip(self), fields(host = self.host.name()))]
    pub fn find(&self, id: u64) -> Result<Option<Rc<Record>>> {
        self.rows.get(&id).map(|row| self.load(id, row)).transpose()
    }

    /// Every record, by ascending id.
    #[tracing::instrument(level = "debug", skip(self), fields(host = self.host.name()))]
    pub fn all(&self) -> Result<Vec<Rc<Record>>> {
        self.rows.iter().map(|(id, row)| self.load(*id, row)).collect()
    }

    /// The stored text of one cell, for inspection.
    pub fn raw_cell(&self, id: u64, column: &str) -> Option<&str> {
        self.rows.get(&id)?.get(column).map(String::as_str)
    }

    fn load(&self, id: u64, row: &Row) -> Result<Rc<Record>> {
        let mut attributes = BTreeMap::new();
        for (column, cell) in row {
            attributes.insert(column.clone(), self.decode_cell(column, cell)?);
        }
        tracing::debug!(id, columns = attributes.len(), "Loaded host record");
        Ok(Record::loaded(Arc::clone(&self.host), id, attributes))
    }

    fn serialized_by_host(&self, column: &str) -> bool {
        self.host
            .tableless_column(column)
            .is_none_or(|declared| declared.serialized_by_host())
    }

    fn encode_cell(&self, column: &str, value: &JsonValue) -> Result<String> {
        if self.serialized_by_host(column) {
            serde_json::to_string(value).map_err(|e| {
                CodecError::new(CodecErrorKind::Serialize, "cell serialization failed")
                    .with_source(e)
                    .for_column(column)
                    .into()
            })
        } else {
            match value {
                JsonValue::String(text) => Ok(text.clone()),
                other => Err(CodecError::new(
                    CodecErrorKind::Serialize,
                    format!("encrypted column holds a non-text value: {}", other),
                )
                .for_column(column)
                .into()),
            }
        }
    }

    fn decode_cell(&self, column: &str, cell: &str) -> Result<JsonValue> {
        if self.serialized_by_host(column) {
            serde_json::from_str(cell).map_err(|e| {
                CodecError::new(CodecErrorKind::Deserialize, "stored cell is not valid JSON")
                    .with_source(e)
                    .for_column(column)
                    .into()
            })
        } else {
            Ok(JsonValue::String(cell.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnOptions;
    use serde_json::json;
    use tableless_codec::EncryptionConfig;
    use tableless_core::{AttributeOptions, SchemaBuilder, TablelessModel, Value};

    struct Notes;

    impl TablelessModel for Notes {
        const MODEL_NAME: &'static str = "Notes";

        fn declare(schema: SchemaBuilder) -> SchemaBuilder {
            schema
                .attribute("aaa", AttributeOptions::new().default(111))
                .attribute("bbb", AttributeOptions::new().default("bbb"))
        }
    }

    fn host() -> Arc<HostType> {
        HostType::builder("TestModel")
            .column("name")
            .has_tableless::<Notes>("options")
            .has_tableless_with::<Notes>(
                "secrets",
                &ColumnOptions::new().encryption(EncryptionConfig::new("k3y").with_iterations(8)),
            )
            .unwrap()
            .build()
    }

    #[test]
    fn test_save_and_reload() {
        let host = host();
        let mut table = MemoryTable::new(Arc::clone(&host));
        let record = host.new_record();
        record
            .set_tableless_attributes("options", [("aaa", "CCC"), ("bbb", "DDD")])
            .unwrap();

        let id = table.save(&record).unwrap();
        assert_eq!(record.id(), Some(id));
        assert!(!record.changed());

        let loaded = table.first().unwrap().unwrap();
        assert!(!loaded.changed());
        let options = loaded.tableless("options").unwrap();
        assert_eq!(options.model_name(), "Notes");
        assert_eq!(options.get("aaa").unwrap(), Value::Text("CCC".to_string()));
        assert_eq!(options.get("bbb").unwrap(), Value::Text("DDD".to_string()));
    }

    #[test]
    fn test_plain_columns_are_json_text() {
        let host = host();
        let mut table = MemoryTable::new(Arc::clone(&host));
        let record = host.new_record();
        record.write_attribute("name", json!("n")).unwrap();
        record.set_tableless_attributes("options", [("aaa", "x")]).unwrap();
        let id = table.save(&record).unwrap();

        assert_eq!(table.raw_cell(id, "name"), Some(r#""n""#));
        let cell: JsonValue = serde_json::from_str(table.raw_cell(id, "options").unwrap()).unwrap();
        assert_eq!(cell, json!({"aaa": "x", "bbb": "bbb"}));
    }

    #[test]
    fn test_encrypted_cell_is_ciphertext() {
        let host = host();
        let mut table = MemoryTable::new(Arc::clone(&host));
        let record = host.new_record();
        record
            .set_tableless_attributes("secrets", [("bbb", "hidden value")])
            .unwrap();
        let id = table.save(&record).unwrap();

        let cell = table.raw_cell(id, "secrets").unwrap();
        assert!(!cell.contains("hidden value"));
        assert_eq!(Some(JsonValue::String(cell.to_string())), record.read_attribute("secrets"));

        let loaded = table.find(id).unwrap().unwrap();
        assert_eq!(
            loaded.tableless("secrets").unwrap(),
            record.tableless("secrets").unwrap()
        );
    }

    #[test]
    fn test_update_writes_changed_columns() {
        let host = host();
        let mut table = MemoryTable::new(Arc::clone(&host));
        let record = host.new_record();
        record.write_attribute("name", json!("before")).unwrap();
        let id = table.save(&record).unwrap();

        let loaded = table.find(id).unwrap().unwrap();
        let mut options = loaded.tableless("options").unwrap();
        options.set("bbb", "after").unwrap();
        assert_eq!(loaded.changed_columns(), ["options".to_string()]);
        assert_eq!(table.save(&loaded).unwrap(), id);

        assert_eq!(table.len(), 1);
        let reloaded = table.find(id).unwrap().unwrap();
        assert_eq!(reloaded.send("name", &[]).unwrap(), Value::Text("before".to_string()));
        assert_eq!(reloaded.send("bbb", &[]).unwrap(), Value::Text("after".to_string()));
        assert!(table.find(id + 1).unwrap().is_none());
    }

    #[test]
    fn test_save_rejects_foreign_record() {
        let mut table = MemoryTable::new(host());
        let other = host().new_record();
        assert!(table.save(&other).unwrap_err().is_not_supported());
        assert!(table.all().unwrap().is_empty());
    }
}
