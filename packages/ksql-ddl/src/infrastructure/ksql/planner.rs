//! Builds the final statements of windowed and rows-last tables.
//!
//! All methods are pure: the same request and settings always produce the same text, so the
//! caller can diff it against what was submitted on a previous run.

use itertools::Itertools;
use tracing::{debug, info};

use crate::config::CompilerSettings;
use crate::framework::entity::{DerivedEntity, EntityModel, EntityModelAdapter, ObjectKind};
use crate::framework::hub::{is_hub_input, ProjectionAdapter, HUB_ROWS_SUFFIX};
use crate::framework::query::QueryModel;
use crate::framework::role::{Role, RoleTraits};
use crate::framework::window::Timeframe;

use super::decimal_cast::inject_casts;
use super::errors::KsqlError;
use super::mapper::entity_to_ddl_schema;
use super::queries::{
    create_rows_last_query, create_source_query, create_windowed_table_query, WindowedTableQuery,
};
use super::select::{render_group_by, render_select_list};
use super::with_clause::WithClause;

/// Request for a windowed CTAS.
#[derive(Debug, Clone)]
pub struct WindowedCtas<'a> {
    pub name: &'a str,
    pub model: &'a QueryModel,
    /// Window-size token, e.g. `1m`.
    pub timeframe: &'a str,
    pub role: Role,
    /// Takes precedence over the model's grace period.
    pub grace_seconds: Option<u32>,
    /// Reads from this object instead of the model's primary source.
    pub input_override: Option<&'a str>,
    pub partitions: Option<u32>,
    pub replicas: Option<u16>,
    pub retention_ms: Option<u64>,
}

impl<'a> WindowedCtas<'a> {
    pub fn new(name: &'a str, model: &'a QueryModel, timeframe: &'a str, role: Role) -> Self {
        Self {
            name,
            model,
            timeframe,
            role,
            grace_seconds: None,
            input_override: None,
            partitions: None,
            replicas: None,
            retention_ms: None,
        }
    }
}

/// Request for a table holding the latest row per key of a rows object.
#[derive(Debug, Clone)]
pub struct RowsLastCtas {
    pub target: String,
    pub source: String,
    pub key_columns: Vec<String>,
    pub value_columns: Vec<String>,
    pub partitions: Option<u32>,
    pub replicas: Option<u16>,
    pub retention_ms: Option<u64>,
}

impl RowsLastCtas {
    /// Keys and values of `model`, in their declared order.
    pub fn for_entity(
        model: &EntityModel,
        target: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            source: source.into(),
            key_columns: model.key_columns.iter().map(|c| c.name.clone()).collect(),
            value_columns: model.value_columns.iter().map(|c| c.name.clone()).collect(),
            partitions: Some(model.partitions),
            replicas: Some(model.replication_factor),
            retention_ms: None,
        }
    }
}

/// One statement produced for a derived entity.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PlannedStatement {
    pub object_name: String,
    pub kind: ObjectKind,
    pub role: Role,
    pub timeframe: Timeframe,
    pub sql: String,
}

#[derive(Debug, Clone, Default)]
pub struct DdlPlanner {
    settings: CompilerSettings,
}

impl DdlPlanner {
    pub fn new(settings: CompilerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    /// Requested sizing, with zero or missing values taken from the sink settings.
    fn sizing(&self, partitions: Option<u32>, replicas: Option<u16>) -> (u32, u16) {
        (
            partitions
                .filter(|p| *p > 0)
                .unwrap_or(self.settings.sink.partitions),
            replicas
                .filter(|r| *r > 0)
                .unwrap_or(self.settings.sink.replicas),
        )
    }

    /// Retention of an entity's statement: the entity's own value, then its
    /// `retentionMs`/`retention.ms` setting, then the sink default.
    fn resolve_retention(&self, entity: &DerivedEntity, model: &EntityModel) -> Option<u64> {
        entity
            .retention_ms
            .filter(|ms| *ms > 0)
            .or_else(|| model.retention_ms())
            .or(Some(self.settings.sink.retention_ms).filter(|ms| *ms > 0))
    }

    pub fn build_windowed_ctas(&self, request: &WindowedCtas) -> Result<String, KsqlError> {
        let model = request.model;
        let timeframe = Timeframe::parse(request.timeframe)?;

        let explicit_grace = request.grace_seconds.filter(|g| *g > 0);
        let model_grace = model.grace_seconds.filter(|g| *g > 0);
        if let (Some(explicit), Some(carried)) = (explicit_grace, model_grace) {
            debug!(
                "{}: grace period {}s replaces the model's {}s",
                request.name, explicit, carried
            );
        }
        let grace_seconds = explicit_grace.or(model_grace);

        let input = request
            .input_override
            .or_else(|| model.primary_source())
            .ok_or_else(|| KsqlError::InvalidParameters {
                message: format!("windowed table {} has no input", request.name),
            })?;

        if !model.has_group_by() {
            return Err(KsqlError::InvalidParameters {
                message: format!("windowed table {} requires a GROUP BY", request.name),
            });
        }

        let alias = model.source_alias.as_deref();
        let projection = match model.select_projection.as_ref() {
            Some(projection) if is_hub_input(input) => {
                let adapted = ProjectionAdapter::adapt(projection);
                let members = adapted.window_start_members();
                if !members.is_empty() {
                    debug!("{}: window start bound to {:?}", request.name, members);
                }
                Some(adapted)
            }
            other => other.cloned(),
        };
        let select_list = render_select_list(projection.as_ref(), alias)?;
        let group_by = render_group_by(&model.group_by, alias)?;

        let (partitions, replicas) = self.sizing(request.partitions, request.replicas);
        let with_clause = WithClause::new(request.name, partitions, replicas).with_retention(
            request.retention_ms,
            ObjectKind::Table,
            true,
        );

        let sql = create_windowed_table_query(&WindowedTableQuery {
            name: request.name,
            with_clause: &with_clause,
            select_list,
            input,
            alias,
            size_clause: timeframe.size_clause(),
            grace_seconds,
            group_by,
            emit_clause: RoleTraits::policy_for(&request.role).emit_clause(),
        })?;

        info!(
            "Built windowed table {} ({} over {})",
            request.name, timeframe, input
        );
        debug!("{}", sql);
        Ok(sql)
    }

    pub fn build_rows_last_ctas(&self, request: &RowsLastCtas) -> Result<String, KsqlError> {
        // rows-last targets are non-windowed tables; retention is never emitted
        let (partitions, replicas) = self.sizing(request.partitions, request.replicas);
        let with_clause = WithClause::new(request.target.as_str(), partitions, replicas)
            .with_retention(request.retention_ms, ObjectKind::Table, false);

        let emit_clause = RoleTraits::policy_for(&Role::Live).emit_clause();
        let sql = create_rows_last_query(
            &request.target,
            &request.source,
            &with_clause,
            &request.key_columns,
            &request.value_columns,
            emit_clause.as_deref(),
        )?;

        info!(
            "Built rows-last table {} over {}",
            request.target, request.source
        );
        debug!("{}", sql);
        Ok(sql)
    }

    /// Statement for one derived entity of `base_name`.
    ///
    /// Per-second rows become a stream declared over the topic named after the stream; every
    /// other role becomes a windowed table aggregated from `<base_name>_1s_rows`.
    pub fn plan_entity(
        &self,
        entity: &DerivedEntity,
        query: &QueryModel,
        base_name: &str,
    ) -> Result<PlannedStatement, KsqlError> {
        let mut model = EntityModelAdapter::adapt(entity, &self.settings)?;

        let timeframe = match (model.timeframe()?, query.windows.first()) {
            (Some(timeframe), _) => timeframe,
            (None, Some(token)) => Timeframe::parse(token)?,
            (None, None) => {
                return Err(KsqlError::InvalidParameters {
                    message: format!("entity {} has no timeframe", entity.name),
                })
            }
        };
        let object_name = entity.role.derived_name(base_name, &timeframe);
        let retention_ms = self.resolve_retention(entity, &model);

        let (kind, sql) = match entity.role {
            Role::Final1sStream => {
                // the rows stream owns a topic of the same name
                if model.topic_name != object_name {
                    debug!(
                        "Rows stream {} ignores entity topic {}",
                        object_name, model.topic_name
                    );
                    model.topic_name = object_name.clone();
                }
                let definition = entity_to_ddl_schema(&model, &object_name, ObjectKind::Stream)?;
                (
                    definition.kind(),
                    create_source_query(&definition, &self.settings.formats, retention_ms)?,
                )
            }
            Role::Live | Role::Other(_) => {
                let hub = format!("{base_name}{HUB_ROWS_SUFFIX}");
                let token = timeframe.to_string();
                let mut request =
                    WindowedCtas::new(&object_name, query, &token, entity.role.clone());
                request.input_override = Some(hub.as_str());
                request.partitions = Some(model.partitions);
                request.replicas = Some(model.replication_factor);
                request.retention_ms = retention_ms;

                let sql = self.build_windowed_ctas(&request)?;
                (ObjectKind::Table, inject_casts(&sql, &model))
            }
        };

        Ok(PlannedStatement {
            object_name,
            kind,
            role: entity.role.clone(),
            timeframe,
            sql,
        })
    }

    /// Plans every entity, ordered so that inputs are created before what reads them.
    pub fn plan_entities(
        &self,
        entities: &[(DerivedEntity, QueryModel)],
        base_name: &str,
    ) -> Result<Vec<PlannedStatement>, KsqlError> {
        let plans = entities
            .iter()
            .map(|(entity, query)| self.plan_entity(entity, query, base_name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(plans
            .into_iter()
            .sorted_by_key(|plan| (plan.role.priority(), plan.timeframe.to_seconds()))
            .collect())
    }
}
