//! Entity roles and the windowing/emit policy each one carries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::window::Timeframe;

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Continuously updated windowed table, served by point lookups.
    Live,
    /// Finalized per-second rows, consumed as a stream.
    Final1sStream,
    Other(String),
}

impl Role {
    /// Creation priority: rows streams before live tables before everything else.
    pub fn priority(&self) -> u8 {
        match self {
            Role::Final1sStream => 0,
            Role::Live => 1,
            Role::Other(_) => 9,
        }
    }

    /// Name of the object derived from `base_name` for this role at `timeframe`.
    pub fn derived_name(&self, base_name: &str, timeframe: &Timeframe) -> String {
        match self {
            Role::Final1sStream => format!("{base_name}_{timeframe}_rows"),
            Role::Live => format!("{base_name}_{timeframe}_live"),
            Role::Other(_) => format!("{base_name}_{timeframe}"),
        }
    }
}

impl FromStr for Role {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(if trimmed.eq_ignore_ascii_case("live") {
            Role::Live
        } else if trimmed.eq_ignore_ascii_case("final1sstream") {
            Role::Final1sStream
        } else {
            Role::Other(trimmed.to_string())
        })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Role::Live => write!(f, "Live"),
            Role::Final1sStream => write!(f, "Final1sStream"),
            Role::Other(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct OperationSpec {
    pub requires_emit: bool,
    pub emit_keyword: Option<&'static str>,
}

impl OperationSpec {
    const NO_EMIT: OperationSpec = OperationSpec {
        requires_emit: false,
        emit_keyword: None,
    };

    /// The `EMIT ...` clause for statements built under this policy, if any.
    pub fn emit_clause(&self) -> Option<String> {
        match (self.requires_emit, self.emit_keyword) {
            (true, Some(keyword)) => Some(format!("EMIT {keyword}")),
            _ => None,
        }
    }
}

/// Lookup table from role to operation policy. Every EMIT decision goes through here.
pub struct RoleTraits;

impl RoleTraits {
    pub fn policy_for(role: &Role) -> OperationSpec {
        match role {
            Role::Final1sStream => OperationSpec::NO_EMIT,
            Role::Live => OperationSpec {
                requires_emit: true,
                emit_keyword: Some("CHANGES"),
            },
            Role::Other(_) => OperationSpec::NO_EMIT,
        }
    }
}
