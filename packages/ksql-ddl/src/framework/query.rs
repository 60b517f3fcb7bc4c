//! Structured query model handed over by the expression front end.
//!
//! The front end has already validated and lowered its expression trees; what arrives here
//! is a small closed expression language plus the shape of the select projection.

use serde::{Deserialize, Serialize};

use super::column::TypeDescriptor;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AggregateFunction {
    Min,
    Max,
    Sum,
    Avg,
    Count,
    EarliestByOffset,
    LatestByOffset,
}

impl AggregateFunction {
    pub fn sql_name(&self) -> &'static str {
        match self {
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Count => "COUNT",
            AggregateFunction::EarliestByOffset => "EARLIEST_BY_OFFSET",
            AggregateFunction::LatestByOffset => "LATEST_BY_OFFSET",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Literal {
    Integer(i64),
    // kept textual so rendering is byte-stable
    Decimal(String),
    String(String),
    Boolean(bool),
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Expr {
    /// A column of the source row.
    Column(String),
    /// A member of the grouping key; renders as the grouped column.
    GroupKey(String),
    Aggregate {
        function: AggregateFunction,
        /// `None` only for `COUNT(*)`.
        argument: Option<Box<Expr>>,
    },
    /// The engine-native start of the current window.
    WindowStart,
    /// The engine-native end of the current window.
    WindowEnd,
    Literal(Literal),
    Call {
        function: String,
        arguments: Vec<Expr>,
    },
    /// A value computed on the host side; it has no SQL rendering.
    Host(String),
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    pub fn key(name: impl Into<String>) -> Self {
        Expr::GroupKey(name.into())
    }

    pub fn aggregate(function: AggregateFunction, argument: Expr) -> Self {
        Expr::Aggregate {
            function,
            argument: Some(Box::new(argument)),
        }
    }

    pub fn count_all() -> Self {
        Expr::Aggregate {
            function: AggregateFunction::Count,
            argument: None,
        }
    }

    pub fn is_window_start(&self) -> bool {
        matches!(self, Expr::WindowStart)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ParameterKind {
    /// The projection is applied to a windowed grouping.
    Grouping,
    /// The projection is applied to individual source rows.
    Row,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
}

impl Parameter {
    pub fn grouping(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParameterKind::Grouping,
        }
    }

    pub fn row(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParameterKind::Row,
        }
    }
}

/// `member = expression` inside an object construction.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct MemberBinding {
    pub member: String,
    pub expr: Expr,
}

impl MemberBinding {
    pub fn new(member: impl Into<String>, expr: Expr) -> Self {
        Self {
            member: member.into(),
            expr,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Projection {
    /// `new Target { Member = expr, ... }`: the only shape that carries declared members.
    Object {
        parameters: Vec<Parameter>,
        target: TypeDescriptor,
        bindings: Vec<MemberBinding>,
    },
    /// Anonymous/tuple projection; members are named but have no declared target type.
    Anonymous {
        parameters: Vec<Parameter>,
        members: Vec<MemberBinding>,
    },
    /// A single value, not an object.
    Scalar { parameters: Vec<Parameter>, expr: Expr },
}

impl Projection {
    pub fn parameters(&self) -> &[Parameter] {
        match self {
            Projection::Object { parameters, .. }
            | Projection::Anonymous { parameters, .. }
            | Projection::Scalar { parameters, .. } => parameters,
        }
    }

    pub fn shape_name(&self) -> &'static str {
        match self {
            Projection::Object { .. } => "object construction",
            Projection::Anonymous { .. } => "anonymous projection",
            Projection::Scalar { .. } => "scalar projection",
        }
    }

    /// Members bound to the engine's window start.
    pub fn window_start_members(&self) -> Vec<&str> {
        let bindings = match self {
            Projection::Object { bindings, .. } => bindings,
            Projection::Anonymous { members, .. } => members,
            Projection::Scalar { .. } => return Vec::new(),
        };
        bindings
            .iter()
            .filter(|b| b.expr.is_window_start())
            .map(|b| b.member.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct QueryModel {
    pub source_types: Vec<String>,
    /// Alias of the primary source, if the front end decided one is required.
    #[serde(default)]
    pub source_alias: Option<String>,
    #[serde(default)]
    pub select_projection: Option<Projection>,
    #[serde(default)]
    pub group_by: Vec<Expr>,
    /// Window-size tokens, e.g. `["1m", "5m"]`.
    #[serde(default)]
    pub windows: Vec<String>,
    #[serde(default)]
    pub grace_seconds: Option<u32>,
}

impl QueryModel {
    pub fn primary_source(&self) -> Option<&str> {
        self.source_types.first().map(String::as_str)
    }

    pub fn has_group_by(&self) -> bool {
        !self.group_by.is_empty()
    }
}
