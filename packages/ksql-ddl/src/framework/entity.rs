//! Entity models and the adapter that validates derived entities.
//!
//! A [`DerivedEntity`] is what the model-building front end knows about one mapped type after
//! resolving member tags: its shapes, role, timeframe and sink sizing. [`EntityModelAdapter`]
//! turns it into an [`EntityModel`], the validated input of every statement builder.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use super::column::{ColumnShape, DecimalSpec, TypeDescriptor, ValueType};
use super::role::Role;
use super::window::Timeframe;
use crate::config::CompilerSettings;
use crate::infrastructure::ksql::errors::KsqlError;

pub const SETTING_TIMEFRAME: &str = "timeframe";
pub const SETTING_ROLE: &str = "role";
pub const SETTING_KEYS: &str = "keys";
pub const SETTING_PROJECTION: &str = "projection";
pub const SETTING_RETENTION_MS: &str = "retentionMs";
pub const SETTING_RETENTION_MS_DOTTED: &str = "retention.ms";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Stream,
    Table,
}

impl ObjectKind {
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            ObjectKind::Stream => "STREAM",
            ObjectKind::Table => "TABLE",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.sql_keyword())
    }
}

/// Metadata of one mapped type as produced by the front end.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DerivedEntity {
    pub name: String,
    pub topic: String,
    pub role: Role,
    #[serde(default)]
    pub timeframe: Option<Timeframe>,
    pub key_shape: Vec<ColumnShape>,
    pub value_shape: Vec<ColumnShape>,
    /// Key names taken from a join specification, used when no key members are declared.
    #[serde(default)]
    pub join_keys: Vec<String>,
    #[serde(default)]
    pub partitions: Option<u32>,
    #[serde(default)]
    pub replicas: Option<u16>,
    #[serde(default)]
    pub key_schema_full_name: Option<String>,
    #[serde(default)]
    pub value_schema_full_name: Option<String>,
    #[serde(default)]
    pub timestamp_column: Option<String>,
    /// Retention requested by the front end; beats any retention setting.
    #[serde(default)]
    pub retention_ms: Option<u64>,
    /// Free-form settings carried onto the [`EntityModel`].
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
}

impl DerivedEntity {
    pub fn new(name: impl Into<String>, topic: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            topic: topic.into(),
            role,
            timeframe: None,
            key_shape: Vec::new(),
            value_shape: Vec::new(),
            join_keys: Vec::new(),
            partitions: None,
            replicas: None,
            key_schema_full_name: None,
            value_schema_full_name: None,
            timestamp_column: None,
            retention_ms: None,
            settings: BTreeMap::new(),
        }
    }

    /// Shapes and timestamp column come from the descriptor's member tags.
    pub fn from_type(descriptor: &TypeDescriptor, topic: impl Into<String>, role: Role) -> Self {
        let mut entity = Self::new(descriptor.name.clone(), topic, role);
        entity.key_shape = descriptor.key_shapes();
        entity.value_shape = descriptor.value_shapes();
        entity.timestamp_column = descriptor.timestamp_member().map(|m| m.name.clone());
        entity
    }

    pub fn with_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = Some(timeframe);
        self
    }

    pub fn with_join_keys<I, S>(mut self, join_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.join_keys = join_keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sizing(mut self, partitions: u32, replicas: u16) -> Self {
        self.partitions = Some(partitions);
        self.replicas = Some(replicas);
        self
    }

    pub fn with_retention(mut self, retention_ms: u64) -> Self {
        self.retention_ms = Some(retention_ms);
        self
    }

    pub fn with_setting(mut self, key: &str, value: Value) -> Self {
        self.settings.insert(key.to_string(), value);
        self
    }
}

/// Validated entity: non-empty key and value columns, resolved decimals, classified kind.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct EntityModel {
    pub entity_name: String,
    pub topic_name: String,
    /// `None` leaves the choice to the caller.
    pub kind: Option<ObjectKind>,
    /// Key order is the composite-key encoding order and is never re-sorted.
    pub key_columns: Vec<ColumnShape>,
    pub value_columns: Vec<ColumnShape>,
    pub partitions: u32,
    pub replication_factor: u16,
    pub key_schema_full_name: Option<String>,
    pub value_schema_full_name: Option<String>,
    pub timestamp_column: Option<String>,
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
}

impl EntityModel {
    pub fn new(entity_name: impl Into<String>, topic_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            topic_name: topic_name.into(),
            kind: None,
            key_columns: Vec::new(),
            value_columns: Vec::new(),
            partitions: 1,
            replication_factor: 1,
            key_schema_full_name: None,
            value_schema_full_name: None,
            timestamp_column: None,
            settings: BTreeMap::new(),
        }
    }

    pub fn with_key(mut self, column: ColumnShape) -> Self {
        self.key_columns.push(column);
        self
    }

    pub fn with_value(mut self, column: ColumnShape) -> Self {
        self.value_columns.push(column);
        self
    }

    pub fn with_setting(mut self, key: &str, value: Value) -> Self {
        self.settings.insert(key.to_string(), value);
        self
    }

    pub fn kind_or(&self, default: ObjectKind) -> ObjectKind {
        self.kind.unwrap_or(default)
    }

    /// Key columns followed by value columns.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnShape> {
        self.key_columns.iter().chain(self.value_columns.iter())
    }

    pub fn column(&self, name: &str) -> Option<&ColumnShape> {
        self.columns().find(|c| c.name == name)
    }

    /// Decimal columns with their precision/scale; unresolved ones fall back to the default.
    pub fn decimal_columns(&self) -> Vec<(&ColumnShape, DecimalSpec)> {
        self.columns()
            .filter(|c| c.value_type.is_decimal())
            .map(|c| (c, c.decimal.unwrap_or_default()))
            .collect()
    }

    pub fn timeframe(&self) -> Result<Option<Timeframe>, KsqlError> {
        match self.settings.get(SETTING_TIMEFRAME) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(token)) => Timeframe::parse(token).map(Some),
            Some(other) => Err(KsqlError::InvalidWindowSpec {
                token: other.to_string(),
            }),
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.settings
            .get(SETTING_ROLE)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }

    /// Positive retention from `retentionMs`, else from `retention.ms`.
    ///
    /// Integers and numeric strings are accepted; anything else is ignored.
    pub fn retention_ms(&self) -> Option<u64> {
        [SETTING_RETENTION_MS, SETTING_RETENTION_MS_DOTTED]
            .iter()
            .filter_map(|key| match self.settings.get(*key)? {
                Value::Number(number) => number.as_u64(),
                Value::String(text) => text.trim().parse().ok(),
                _ => None,
            })
            .find(|ms| *ms > 0)
    }

    /// Explicit key column names, overriding the declared key order.
    pub fn keys(&self) -> Result<Option<Vec<String>>, KsqlError> {
        self.string_list_setting(SETTING_KEYS)
    }

    /// Explicit projection column names.
    pub fn projection(&self) -> Result<Option<Vec<String>>, KsqlError> {
        self.string_list_setting(SETTING_PROJECTION)
    }

    fn string_list_setting(&self, key: &str) -> Result<Option<Vec<String>>, KsqlError> {
        let invalid = || KsqlError::InvalidParameters {
            message: format!(
                "setting '{}' of entity '{}' must be an array of column names",
                key, self.entity_name
            ),
        };

        match self.settings.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(_) => Err(invalid()),
        }
    }
}

pub struct EntityModelAdapter;

impl EntityModelAdapter {
    pub fn adapt(
        entity: &DerivedEntity,
        settings: &CompilerSettings,
    ) -> Result<EntityModel, KsqlError> {
        let mut key_columns = entity.key_shape.clone();
        if key_columns.is_empty() && !entity.join_keys.is_empty() {
            debug!(
                "Entity {} declares no keys, using join keys {:?}",
                entity.name, entity.join_keys
            );
            key_columns = entity
                .join_keys
                .iter()
                .map(|name| ColumnShape::new(name.clone(), ValueType::String, false))
                .collect();
        }
        let mut value_columns = entity.value_shape.clone();

        if key_columns.is_empty() || value_columns.is_empty() {
            return Err(KsqlError::EmptyKeyOrValueShape {
                entity: entity.name.clone(),
            });
        }

        for column in key_columns.iter_mut().chain(value_columns.iter_mut()) {
            if column.value_type.is_decimal() {
                column.decimal =
                    Some(settings.decimal.resolve(&entity.name, &column.name, column.decimal));
            }
        }

        let kind = match entity.role {
            Role::Live => Some(ObjectKind::Table),
            Role::Final1sStream => Some(ObjectKind::Stream),
            Role::Other(_) => None,
        };

        let mut model_settings = entity.settings.clone();
        model_settings.insert(
            SETTING_ROLE.to_string(),
            Value::String(entity.role.to_string()),
        );
        if let Some(timeframe) = &entity.timeframe {
            model_settings.insert(
                SETTING_TIMEFRAME.to_string(),
                Value::String(timeframe.to_string()),
            );
        }

        Ok(EntityModel {
            entity_name: entity.name.clone(),
            topic_name: entity.topic.clone(),
            kind,
            key_columns,
            value_columns,
            partitions: entity
                .partitions
                .filter(|p| *p > 0)
                .unwrap_or(settings.sink.partitions),
            replication_factor: entity
                .replicas
                .filter(|r| *r > 0)
                .unwrap_or(settings.sink.replicas),
            key_schema_full_name: entity.key_schema_full_name.clone(),
            value_schema_full_name: entity.value_schema_full_name.clone(),
            timestamp_column: entity.timestamp_column.clone(),
            settings: model_settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DecimalOverride, DecimalSettings};
    use crate::framework::column::{IntType, MemberDescriptor, MemberTag};
    use serde_json::json;

    fn bar_descriptor() -> TypeDescriptor {
        TypeDescriptor::new(
            "Bar",
            vec![
                MemberDescriptor::new("Broker", ValueType::String).tagged(MemberTag::Key(0)),
                MemberDescriptor::new("Symbol", ValueType::String).tagged(MemberTag::Key(1)),
                MemberDescriptor::new("BucketStart", ValueType::DateTime)
                    .tagged(MemberTag::Timestamp),
                MemberDescriptor::new("Open", ValueType::Decimal).tagged(MemberTag::Decimal {
                    precision: 18,
                    scale: 4,
                }),
                MemberDescriptor::new("Volume", ValueType::Decimal),
            ],
        )
    }

    #[test]
    fn test_adapt_classifies_by_role() {
        let settings = CompilerSettings::default();

        let live = DerivedEntity::from_type(&bar_descriptor(), "bar_1m_live", Role::Live);
        let model = EntityModelAdapter::adapt(&live, &settings).unwrap();
        assert_eq!(model.kind, Some(ObjectKind::Table));
        assert_eq!(model.timestamp_column.as_deref(), Some("BucketStart"));
        assert_eq!(model.role(), Some(Role::Live));

        let rows = DerivedEntity::from_type(&bar_descriptor(), "bar_1s_rows", Role::Final1sStream);
        let model = EntityModelAdapter::adapt(&rows, &settings).unwrap();
        assert_eq!(model.kind, Some(ObjectKind::Stream));

        let other =
            DerivedEntity::from_type(&bar_descriptor(), "bar_1h", Role::Other("Archive".into()));
        let model = EntityModelAdapter::adapt(&other, &settings).unwrap();
        assert_eq!(model.kind, None);
        assert_eq!(model.kind_or(ObjectKind::Stream), ObjectKind::Stream);
    }

    #[test]
    fn test_adapt_synthesizes_join_keys() {
        let mut entity = DerivedEntity::new("Quote", "quote", Role::Live)
            .with_join_keys(["Broker", "Symbol", "Venue"]);
        entity.value_shape = vec![ColumnShape::new("Bid", ValueType::Decimal, false)];

        let model = EntityModelAdapter::adapt(&entity, &CompilerSettings::default()).unwrap();
        let names: Vec<_> = model.key_columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Broker", "Symbol", "Venue"]);
        assert!(model
            .key_columns
            .iter()
            .all(|c| c.value_type == ValueType::String && !c.nullable));
    }

    #[test]
    fn test_declared_keys_win_over_join_keys() {
        let entity = DerivedEntity::from_type(&bar_descriptor(), "bar", Role::Live)
            .with_join_keys(["Other"]);
        let model = EntityModelAdapter::adapt(&entity, &CompilerSettings::default()).unwrap();
        let names: Vec<_> = model.key_columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Broker", "Symbol"]);
    }

    #[test]
    fn test_empty_shapes_rejected() {
        let settings = CompilerSettings::default();

        let mut no_keys = DerivedEntity::new("Tick", "tick", Role::Live);
        no_keys.value_shape = vec![ColumnShape::new("Price", ValueType::Decimal, false)];
        assert!(matches!(
            EntityModelAdapter::adapt(&no_keys, &settings),
            Err(KsqlError::EmptyKeyOrValueShape { entity }) if entity == "Tick"
        ));

        let no_values = DerivedEntity::new("Tick", "tick", Role::Live).with_join_keys(["Symbol"]);
        assert!(matches!(
            EntityModelAdapter::adapt(&no_values, &settings),
            Err(KsqlError::EmptyKeyOrValueShape { .. })
        ));
    }

    #[test]
    fn test_decimal_resolution_and_sizing() {
        let settings = CompilerSettings {
            decimal: DecimalSettings {
                precision: 20,
                scale: 8,
                overrides: vec![DecimalOverride {
                    entity: "Bar".to_string(),
                    property: "Open".to_string(),
                    precision: 12,
                    scale: 2,
                }],
            },
            ..Default::default()
        };
        let entity = DerivedEntity::from_type(&bar_descriptor(), "bar", Role::Live)
            .with_sizing(6, 3);

        let model = EntityModelAdapter::adapt(&entity, &settings).unwrap();
        assert_eq!(model.partitions, 6);
        assert_eq!(model.replication_factor, 3);
        assert_eq!(model.column("Open").unwrap().decimal, Some(DecimalSpec::new(12, 2)));
        assert_eq!(model.column("Volume").unwrap().decimal, Some(DecimalSpec::new(20, 8)));
        assert_eq!(model.decimal_columns().len(), 2);
    }

    #[test]
    fn test_zero_sizing_falls_back_to_sink_settings() {
        let mut settings = CompilerSettings::default();
        settings.sink.partitions = 4;
        settings.sink.replicas = 2;
        let entity = DerivedEntity::from_type(&bar_descriptor(), "bar", Role::Live)
            .with_sizing(0, 0);

        let model = EntityModelAdapter::adapt(&entity, &settings).unwrap();
        assert_eq!(model.partitions, 4);
        assert_eq!(model.replication_factor, 2);
    }

    #[test]
    fn test_retention_setting_lookup() {
        let base = || {
            EntityModel::new("Bar", "bar")
                .with_key(ColumnShape::new("Broker", ValueType::String, false))
                .with_value(ColumnShape::new("Close", ValueType::Decimal, false))
        };

        assert_eq!(base().retention_ms(), None);
        assert_eq!(
            base()
                .with_setting(SETTING_RETENTION_MS, json!(3_600_000))
                .with_setting(SETTING_RETENTION_MS_DOTTED, json!(60_000))
                .retention_ms(),
            Some(3_600_000)
        );
        // a non-positive camel-case value gives way to the dotted one
        assert_eq!(
            base()
                .with_setting(SETTING_RETENTION_MS, json!(0))
                .with_setting(SETTING_RETENTION_MS_DOTTED, json!("60000"))
                .retention_ms(),
            Some(60_000)
        );
        assert_eq!(
            base()
                .with_setting(SETTING_RETENTION_MS, json!("forever"))
                .retention_ms(),
            None
        );
    }

    #[test]
    fn test_entity_settings_survive_adapt() {
        let entity = DerivedEntity::from_type(&bar_descriptor(), "bar", Role::Live)
            .with_setting(SETTING_RETENTION_MS, json!(86_400_000))
            .with_setting(SETTING_ROLE, json!("Other"));

        let model = EntityModelAdapter::adapt(&entity, &CompilerSettings::default()).unwrap();
        assert_eq!(model.retention_ms(), Some(86_400_000));
        // the entity's own role wins over a stale setting
        assert_eq!(model.role(), Some(Role::Live));
    }

    #[test]
    fn test_settings_accessors() {
        let model = EntityModel::new("Bar", "bar")
            .with_key(ColumnShape::new("Broker", ValueType::String, false))
            .with_value(ColumnShape::new("Count", ValueType::Int(IntType::Int64), false))
            .with_setting(SETTING_TIMEFRAME, json!("5m"))
            .with_setting(SETTING_ROLE, json!("final1sstream"))
            .with_setting(SETTING_KEYS, json!(["Broker"]))
            .with_setting(SETTING_PROJECTION, json!("Broker"));

        assert_eq!(model.timeframe().unwrap(), Some(Timeframe::parse("5m").unwrap()));
        assert_eq!(model.role(), Some(Role::Final1sStream));
        assert_eq!(model.keys().unwrap(), Some(vec!["Broker".to_string()]));
        assert!(matches!(
            model.projection(),
            Err(KsqlError::InvalidParameters { .. })
        ));

        let bad_timeframe =
            EntityModel::new("Bar", "bar").with_setting(SETTING_TIMEFRAME, json!("1x"));
        assert!(matches!(
            bad_timeframe.timeframe(),
            Err(KsqlError::InvalidWindowSpec { .. })
        ));
    }
}
