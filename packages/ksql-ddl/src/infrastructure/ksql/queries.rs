use handlebars::{no_escape, Handlebars};
use serde_json::json;

use crate::config::FormatSettings;
use crate::framework::entity::ObjectKind;
use crate::infrastructure::ksql::model::DdlSchemaDefinition;
use crate::infrastructure::ksql::with_clause::WithClause;

use super::errors::{validate_ksql_identifier, KsqlError};

static CREATE_WINDOWED_TABLE_TEMPLATE: &str = r#"CREATE TABLE IF NOT EXISTS {{name}} WITH ({{with_clause}}) AS
SELECT {{select_list}}
FROM {{input}}{{#if alias}} {{alias}}{{/if}} WINDOW TUMBLING ({{size_clause}}{{#if grace_seconds}}, GRACE PERIOD {{grace_seconds}} SECONDS{{/if}})
GROUP BY {{group_by}}{{#if emit_clause}}
{{emit_clause}}{{/if}};"#;

/// Pieces of a windowed CTAS, rendered by the planner.
#[derive(Debug, Clone)]
pub struct WindowedTableQuery<'a> {
    pub name: &'a str,
    pub with_clause: &'a WithClause,
    pub select_list: String,
    pub input: &'a str,
    pub alias: Option<&'a str>,
    pub size_clause: String,
    /// Only positive values produce a GRACE PERIOD clause.
    pub grace_seconds: Option<u32>,
    pub group_by: String,
    pub emit_clause: Option<String>,
}

pub fn create_windowed_table_query(query: &WindowedTableQuery) -> Result<String, KsqlError> {
    validate_ksql_identifier(query.name, "table name")?;
    validate_ksql_identifier(query.input, "input name")?;
    if let Some(alias) = query.alias {
        validate_ksql_identifier(alias, "source alias")?;
    }
    if query.group_by.is_empty() {
        return Err(KsqlError::InvalidParameters {
            message: format!("windowed table {} requires a GROUP BY", query.name),
        });
    }

    let mut reg = Handlebars::new();
    reg.register_escape_fn(no_escape);

    let context = json!({
        "name": query.name,
        "with_clause": query.with_clause.render(),
        "select_list": query.select_list,
        "input": query.input,
        "alias": query.alias,
        "size_clause": query.size_clause,
        "grace_seconds": query.grace_seconds.filter(|g| *g > 0),
        "group_by": query.group_by,
        "emit_clause": query.emit_clause,
    });

    Ok(reg.render_template(CREATE_WINDOWED_TABLE_TEMPLATE, &context)?)
}

static CREATE_ROWS_LAST_TABLE_TEMPLATE: &str = r#"CREATE TABLE IF NOT EXISTS {{target}} WITH ({{with_clause}}) AS
SELECT {{#each keys}}{{this}}, {{/each}}{{#each values}}LATEST_BY_OFFSET({{this}}) AS {{this}}{{#unless @last}}, {{/unless}}{{/each}}
FROM {{source}}
GROUP BY {{#each keys}}{{this}}{{#unless @last}}, {{/unless}}{{/each}}{{#if emit_clause}}
{{emit_clause}}{{/if}};"#;

/// Table keeping the latest value of every column per key of `source`.
pub fn create_rows_last_query(
    target: &str,
    source: &str,
    with_clause: &WithClause,
    key_columns: &[String],
    value_columns: &[String],
    emit_clause: Option<&str>,
) -> Result<String, KsqlError> {
    validate_ksql_identifier(target, "table name")?;
    validate_ksql_identifier(source, "source name")?;
    if key_columns.is_empty() || value_columns.is_empty() {
        return Err(KsqlError::EmptyKeyOrValueShape {
            entity: target.to_string(),
        });
    }
    for column in key_columns.iter().chain(value_columns) {
        validate_ksql_identifier(column, "column name")?;
    }

    let mut reg = Handlebars::new();
    reg.register_escape_fn(no_escape);

    let context = json!({
        "target": target,
        "source": source,
        "with_clause": with_clause.render(),
        "keys": key_columns,
        "values": value_columns,
        "emit_clause": emit_clause,
    });

    Ok(reg.render_template(CREATE_ROWS_LAST_TABLE_TEMPLATE, &context)?)
}

static CREATE_SOURCE_TEMPLATE: &str = r#"CREATE {{kind}} IF NOT EXISTS {{name}} ({{#each columns}}{{name}} {{sql_type}}{{#if key_marker}} {{key_marker}}{{/if}}{{#unless @last}}, {{/unless}}{{/each}}) WITH ({{with_clause}});"#;

/// Declares a stream or table over an existing topic.
pub fn create_source_query(
    definition: &DdlSchemaDefinition,
    formats: &FormatSettings,
    retention_ms: Option<u64>,
) -> Result<String, KsqlError> {
    validate_ksql_identifier(definition.object_name(), "object name")?;
    if definition.columns().is_empty() {
        return Err(KsqlError::InvalidParameters {
            message: format!("{} declares no columns", definition.object_name()),
        });
    }

    let key_marker = match definition.kind() {
        ObjectKind::Stream => "KEY",
        ObjectKind::Table => "PRIMARY KEY",
    };

    let mut reg = Handlebars::new();
    reg.register_escape_fn(no_escape);

    let columns = definition
        .columns()
        .iter()
        .map(|column| {
            validate_ksql_identifier(&column.name, "column name")?;
            Ok(json!({
                "name": column.name,
                "sql_type": column.sql_type,
                "key_marker": column.is_key.then_some(key_marker),
            }))
        })
        .collect::<Result<Vec<_>, KsqlError>>()?;

    let key_format = definition
        .has_keys()
        .then_some(formats.key_format.as_str());
    // source declarations are never windowed
    let with_clause = WithClause::new(
        definition.topic_name(),
        definition.partitions(),
        definition.replicas(),
    )
    .with_formats(key_format, &formats.value_format)
    .with_schema_full_names(
        definition.key_schema_full_name(),
        definition.value_schema_full_name(),
    )
    .with_timestamp(definition.timestamp_column())
    .with_retention(retention_ms, definition.kind(), false);

    let context = json!({
        "kind": definition.kind().sql_keyword(),
        "name": definition.object_name(),
        "columns": columns,
        "with_clause": with_clause.render(),
    });

    Ok(reg.render_template(CREATE_SOURCE_TEMPLATE, &context)?)
}

static DROP_OBJECT_TEMPLATE: &str =
    r#"DROP {{kind}} IF EXISTS {{name}}{{#if delete_topic}} DELETE TOPIC{{/if}};"#;

pub fn drop_object_query(
    kind: ObjectKind,
    name: &str,
    delete_topic: bool,
) -> Result<String, KsqlError> {
    validate_ksql_identifier(name, "object name")?;

    let mut reg = Handlebars::new();
    reg.register_escape_fn(no_escape);

    let context = json!({
        "kind": kind.sql_keyword(),
        "name": name,
        "delete_topic": delete_topic,
    });

    Ok(reg.render_template(DROP_OBJECT_TEMPLATE, &context)?)
}
