//! ksqlDB dialect: type mapping, schema definitions, statement templates and planning.

pub mod decimal_cast;
pub mod errors;
pub mod mapper;
pub mod model;
pub mod planner;
pub mod queries;
pub mod select;
pub mod with_clause;

pub use errors::KsqlError;
pub use planner::{DdlPlanner, PlannedStatement, RowsLastCtas, WindowedCtas};
