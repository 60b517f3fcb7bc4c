//! Rendering of the `WITH (...)` property list of CREATE statements.
//!
//! Properties always render in the same order:
//! `KAFKA_TOPIC, KEY_FORMAT, VALUE_FORMAT, KEY_SCHEMA_FULL_NAME, VALUE_SCHEMA_FULL_NAME,
//! TIMESTAMP, PARTITIONS, REPLICAS, RETENTION_MS`. Absent properties are skipped.

use tracing::debug;

use crate::framework::entity::ObjectKind;

/// Retention is rejected by the engine on non-windowed tables.
pub fn retention_supported(kind: ObjectKind, windowed: bool) -> bool {
    !(kind == ObjectKind::Table && !windowed)
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WithClause {
    topic: String,
    key_format: Option<String>,
    value_format: Option<String>,
    key_schema_full_name: Option<String>,
    value_schema_full_name: Option<String>,
    timestamp: Option<String>,
    partitions: u32,
    replicas: u16,
    retention_ms: Option<u64>,
}

impl WithClause {
    pub fn new(topic: impl Into<String>, partitions: u32, replicas: u16) -> Self {
        Self {
            topic: topic.into(),
            key_format: None,
            value_format: None,
            key_schema_full_name: None,
            value_schema_full_name: None,
            timestamp: None,
            partitions,
            replicas,
            retention_ms: None,
        }
    }

    pub fn with_formats(mut self, key_format: Option<&str>, value_format: &str) -> Self {
        self.key_format = key_format.map(str::to_string);
        self.value_format = Some(value_format.to_string());
        self
    }

    pub fn with_schema_full_names(
        mut self,
        key_schema_full_name: Option<&str>,
        value_schema_full_name: Option<&str>,
    ) -> Self {
        self.key_schema_full_name = key_schema_full_name.map(str::to_string);
        self.value_schema_full_name = value_schema_full_name.map(str::to_string);
        self
    }

    pub fn with_timestamp(mut self, column: Option<&str>) -> Self {
        self.timestamp = column.map(str::to_string);
        self
    }

    /// Sets `RETENTION_MS` when positive and allowed for `kind`; otherwise it is left out.
    pub fn with_retention(
        mut self,
        retention_ms: Option<u64>,
        kind: ObjectKind,
        windowed: bool,
    ) -> Self {
        self.retention_ms = match retention_ms {
            Some(ms) if ms > 0 && retention_supported(kind, windowed) => Some(ms),
            Some(ms) if ms > 0 => {
                debug!(
                    "Dropping RETENTION_MS={} for non-windowed {} on topic {}",
                    ms, kind, self.topic
                );
                None
            }
            _ => None,
        };
        self
    }

    pub fn render(&self) -> String {
        let mut properties = vec![format!("KAFKA_TOPIC={}", quote(&self.topic))];
        if let Some(format) = &self.key_format {
            properties.push(format!("KEY_FORMAT={}", quote(format)));
        }
        if let Some(format) = &self.value_format {
            properties.push(format!("VALUE_FORMAT={}", quote(format)));
        }
        if let Some(name) = &self.key_schema_full_name {
            properties.push(format!("KEY_SCHEMA_FULL_NAME={}", quote(name)));
        }
        if let Some(name) = &self.value_schema_full_name {
            properties.push(format!("VALUE_SCHEMA_FULL_NAME={}", quote(name)));
        }
        if let Some(column) = &self.timestamp {
            properties.push(format!("TIMESTAMP={}", quote(column)));
        }
        properties.push(format!("PARTITIONS={}", self.partitions));
        properties.push(format!("REPLICAS={}", self.replicas));
        if let Some(ms) = self.retention_ms {
            properties.push(format!("RETENTION_MS={ms}"));
        }
        properties.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_clause() {
        let clause = WithClause::new("bar_1m_live", 1, 1);
        assert_eq!(
            clause.render(),
            "KAFKA_TOPIC='bar_1m_live', PARTITIONS=1, REPLICAS=1"
        );
    }

    #[test]
    fn test_full_clause_order() {
        let clause = WithClause::new("rates", 3, 2)
            .with_formats(Some("AVRO"), "AVRO")
            .with_schema_full_names(Some("rates.Key"), Some("rates.Value"))
            .with_timestamp(Some("Ts"))
            .with_retention(Some(86_400_000), ObjectKind::Stream, false);
        assert_eq!(
            clause.render(),
            "KAFKA_TOPIC='rates', KEY_FORMAT='AVRO', VALUE_FORMAT='AVRO', \
             KEY_SCHEMA_FULL_NAME='rates.Key', VALUE_SCHEMA_FULL_NAME='rates.Value', \
             TIMESTAMP='Ts', PARTITIONS=3, REPLICAS=2, RETENTION_MS=86400000"
        );
    }

    #[test]
    fn test_retention_rules() {
        assert!(retention_supported(ObjectKind::Table, true));
        assert!(retention_supported(ObjectKind::Stream, false));
        assert!(!retention_supported(ObjectKind::Table, false));

        let table = WithClause::new("t", 1, 1).with_retention(Some(1000), ObjectKind::Table, false);
        assert!(!table.render().contains("RETENTION_MS"));

        let zero = WithClause::new("t", 1, 1).with_retention(Some(0), ObjectKind::Table, true);
        assert!(!zero.render().contains("RETENTION_MS"));
    }

    #[test]
    fn test_quotes_are_escaped() {
        let clause = WithClause::new("o'topic", 1, 1);
        assert!(clause.render().starts_with("KAFKA_TOPIC='o''topic'"));
    }
}
