use serde::{Deserialize, Serialize};

use crate::framework::entity::ObjectKind;

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct KsqlColumn {
    pub name: String,
    pub sql_type: String,
    pub is_key: bool,
}

impl KsqlColumn {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>, is_key: bool) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            is_key,
        }
    }
}

/// Finalized schema of a stream or table declaration. Built once through [`DdlSchemaBuilder`].
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct DdlSchemaDefinition {
    object_name: String,
    topic_name: String,
    kind: ObjectKind,
    partitions: u32,
    replicas: u16,
    key_schema_full_name: Option<String>,
    value_schema_full_name: Option<String>,
    columns: Vec<KsqlColumn>,
    timestamp_column: Option<String>,
}

impl DdlSchemaDefinition {
    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    pub fn topic_name(&self) -> &str {
        &self.topic_name
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn partitions(&self) -> u32 {
        self.partitions
    }

    pub fn replicas(&self) -> u16 {
        self.replicas
    }

    pub fn key_schema_full_name(&self) -> Option<&str> {
        self.key_schema_full_name.as_deref()
    }

    pub fn value_schema_full_name(&self) -> Option<&str> {
        self.value_schema_full_name.as_deref()
    }

    /// Columns in the order they were added.
    pub fn columns(&self) -> &[KsqlColumn] {
        &self.columns
    }

    pub fn key_columns(&self) -> Vec<&KsqlColumn> {
        self.columns.iter().filter(|c| c.is_key).collect()
    }

    pub fn has_keys(&self) -> bool {
        self.columns.iter().any(|c| c.is_key)
    }

    pub fn timestamp_column(&self) -> Option<&str> {
        self.timestamp_column.as_deref()
    }
}

/// Accumulates a [`DdlSchemaDefinition`].
///
/// Callers add key columns first, in declared key order, then the remaining value columns.
#[derive(Debug, Clone)]
pub struct DdlSchemaBuilder {
    definition: DdlSchemaDefinition,
}

impl DdlSchemaBuilder {
    pub fn new(
        object_name: impl Into<String>,
        kind: ObjectKind,
        topic_name: impl Into<String>,
        partitions: u32,
    ) -> Self {
        Self {
            definition: DdlSchemaDefinition {
                object_name: object_name.into(),
                topic_name: topic_name.into(),
                kind,
                partitions,
                replicas: 1,
                key_schema_full_name: None,
                value_schema_full_name: None,
                columns: Vec::new(),
                timestamp_column: None,
            },
        }
    }

    pub fn with_replicas(mut self, replicas: u16) -> Self {
        self.definition.replicas = replicas;
        self
    }

    pub fn add_column(mut self, column: KsqlColumn) -> Self {
        self.definition.columns.push(column);
        self
    }

    pub fn with_schema_full_names(
        mut self,
        key_schema_full_name: Option<String>,
        value_schema_full_name: Option<String>,
    ) -> Self {
        self.definition.key_schema_full_name = key_schema_full_name;
        self.definition.value_schema_full_name = value_schema_full_name;
        self
    }

    pub fn with_timestamp(mut self, column: Option<String>) -> Self {
        self.definition.timestamp_column = column;
        self
    }

    pub fn build(self) -> DdlSchemaDefinition {
        self.definition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_preserves_column_order() {
        let definition = DdlSchemaBuilder::new("bar_1s_rows", ObjectKind::Stream, "bar_1s_rows", 3)
            .with_replicas(2)
            .add_column(KsqlColumn::new("Broker", "VARCHAR", true))
            .add_column(KsqlColumn::new("Symbol", "VARCHAR", true))
            .add_column(KsqlColumn::new("Close", "DECIMAL(18, 4)", false))
            .with_schema_full_names(Some("bar.Key".to_string()), None)
            .with_timestamp(Some("BucketStart".to_string()))
            .build();

        let names: Vec<_> = definition.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Broker", "Symbol", "Close"]);
        assert_eq!(definition.key_columns().len(), 2);
        assert!(definition.has_keys());
        assert_eq!(definition.partitions(), 3);
        assert_eq!(definition.replicas(), 2);
        assert_eq!(definition.key_schema_full_name(), Some("bar.Key"));
        assert_eq!(definition.value_schema_full_name(), None);
        assert_eq!(definition.timestamp_column(), Some("BucketStart"));
    }

    #[test]
    fn test_default_replicas() {
        let definition = DdlSchemaBuilder::new("t", ObjectKind::Table, "t", 1).build();
        assert_eq!(definition.replicas(), 1);
        assert!(!definition.has_keys());
    }
}
