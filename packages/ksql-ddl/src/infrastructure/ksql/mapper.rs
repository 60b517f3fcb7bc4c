use tracing::warn;

use crate::framework::column::{ColumnShape, DecimalSpec, FloatType, IntType, ValueType};
use crate::framework::entity::{EntityModel, ObjectKind};
use crate::framework::query::Projection;
use crate::infrastructure::ksql::model::{DdlSchemaBuilder, DdlSchemaDefinition, KsqlColumn};

use super::errors::{validate_ksql_identifier, KsqlError};

/// Maps a value type to its ksqlDB type name.
///
/// `precision`/`scale` are only read for decimals and must already be resolved by the caller;
/// missing values fall back to the global default.
pub fn map_type(
    value_type: &ValueType,
    precision: Option<u8>,
    scale: Option<u8>,
) -> Result<String, KsqlError> {
    match value_type {
        ValueType::Int(IntType::Int8 | IntType::Int16 | IntType::Int32) => Ok("INT".to_string()),
        ValueType::Int(IntType::Int64) => Ok("BIGINT".to_string()),
        ValueType::Float(FloatType::Float32) | ValueType::Float(FloatType::Float64) => {
            Ok("DOUBLE".to_string())
        }
        ValueType::Decimal => Ok(format!(
            "DECIMAL({}, {})",
            precision.unwrap_or(DecimalSpec::DEFAULT_PRECISION),
            scale.unwrap_or(DecimalSpec::DEFAULT_SCALE)
        )),
        ValueType::String | ValueType::Char | ValueType::Guid => Ok("VARCHAR".to_string()),
        ValueType::Boolean => Ok("BOOLEAN".to_string()),
        ValueType::Date | ValueType::DateTime | ValueType::DateTimeOffset => {
            Ok("TIMESTAMP".to_string())
        }
        ValueType::Bytes => Ok("BYTES".to_string()),
        ValueType::Map { key, value } => match (key.as_ref(), value.as_ref()) {
            (ValueType::String, ValueType::String) => Ok("MAP<STRING, STRING>".to_string()),
            (key, value) => Err(KsqlError::UnsupportedMapShape {
                key_type: key.to_string(),
                value_type: value.to_string(),
            }),
        },
        ValueType::Enum(_) | ValueType::Other(_) => Err(KsqlError::UnsupportedType {
            type_name: value_type.to_string(),
        }),
    }
}

pub fn shape_to_ksql_column(shape: &ColumnShape, is_key: bool) -> Result<KsqlColumn, KsqlError> {
    let decimal = shape.decimal;
    let sql_type = map_type(
        &shape.value_type,
        decimal.map(|d| d.precision),
        decimal.map(|d| d.scale),
    )?;
    Ok(KsqlColumn::new(shape.name.clone(), sql_type, is_key))
}

/// Columns of an object-construction projection, in the target type's declaration order.
pub fn build_columns(projection: &Projection) -> Result<Vec<KsqlColumn>, KsqlError> {
    let Projection::Object { target, .. } = projection else {
        return Err(KsqlError::UnsupportedProjectionShape {
            shape: projection.shape_name().to_string(),
        });
    };

    target
        .members
        .iter()
        .filter(|member| !member.is_ignored())
        .map(|member| shape_to_ksql_column(&member.to_shape(), member.is_key()))
        .collect()
}

/// Builds the source declaration schema of an entity.
///
/// The `keys` and `projection` settings override the declared columns; names that match no
/// column are skipped. Keys come first, in key order, followed by the remaining columns.
pub fn entity_to_ddl_schema(
    model: &EntityModel,
    object_name: &str,
    default_kind: ObjectKind,
) -> Result<DdlSchemaDefinition, KsqlError> {
    validate_ksql_identifier(object_name, "object name")?;

    let key_names: Vec<String> = match model.keys()? {
        Some(keys) => keys,
        None => model.key_columns.iter().map(|c| c.name.clone()).collect(),
    };
    let value_names: Vec<String> = match model.projection()? {
        Some(projection) => projection,
        None => model.columns().map(|c| c.name.clone()).collect(),
    };

    let mut builder = DdlSchemaBuilder::new(
        object_name,
        model.kind_or(default_kind),
        model.topic_name.clone(),
        model.partitions,
    )
    .with_replicas(model.replication_factor)
    .with_schema_full_names(
        model.key_schema_full_name.clone(),
        model.value_schema_full_name.clone(),
    )
    .with_timestamp(model.timestamp_column.clone());

    let mut added: Vec<&str> = Vec::new();
    let mut key_count = 0;
    let mut value_count = 0;
    for (names, is_key) in [(&key_names, true), (&value_names, false)] {
        for name in names {
            if added.contains(&name.as_str()) {
                continue;
            }
            let Some(shape) = model.column(name) else {
                warn!(
                    "Skipping unknown column '{}' for {} of entity {}",
                    name, object_name, model.entity_name
                );
                continue;
            };
            validate_ksql_identifier(&shape.name, "column name")?;
            builder = builder.add_column(shape_to_ksql_column(shape, is_key)?);
            added.push(name.as_str());
            if is_key {
                key_count += 1;
            } else {
                value_count += 1;
            }
        }
    }

    if key_count == 0 || value_count == 0 {
        return Err(KsqlError::EmptyKeyOrValueShape {
            entity: model.entity_name.clone(),
        });
    }

    Ok(builder.build())
}
