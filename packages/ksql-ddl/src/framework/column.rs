//! Column-level domain model.
//!
//! Member metadata (key order, ignore flags, decimal precision, timestamp markers) is resolved
//! by the caller into plain descriptors; nothing in this crate inspects host types directly.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum IntType {
    Int8,
    Int16,
    Int32,
    Int64,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum FloatType {
    Float32,
    Float64,
}

/// Semantic value type of a member, as seen by the host model.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Int(IntType),
    Float(FloatType),
    Decimal,
    String,
    Char,
    Guid,
    Boolean,
    Date,
    DateTime,
    DateTimeOffset,
    Bytes,
    Map {
        key: Box<ValueType>,
        value: Box<ValueType>,
    },
    Enum(String),
    // Any other host type (nested records, lists, ...), carried by name for diagnostics.
    Other(String),
}

impl ValueType {
    pub fn is_decimal(&self) -> bool {
        matches!(self, ValueType::Decimal)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValueType::Int(int) => write!(f, "{int:?}"),
            ValueType::Float(float) => write!(f, "{float:?}"),
            ValueType::Map { key, value } => write!(f, "Map<{key}, {value}>"),
            ValueType::Enum(name) => write!(f, "Enum {name}"),
            ValueType::Other(name) => write!(f, "{name}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Precision/scale pair for fixed-point columns.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct DecimalSpec {
    pub precision: u8,
    pub scale: u8,
}

impl DecimalSpec {
    pub const DEFAULT_PRECISION: u8 = 18;
    pub const DEFAULT_SCALE: u8 = 2;

    pub fn new(precision: u8, scale: u8) -> Self {
        Self { precision, scale }
    }
}

impl Default for DecimalSpec {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PRECISION, Self::DEFAULT_SCALE)
    }
}

/// A named, typed column of an entity's key or value shape.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ColumnShape {
    pub name: String,
    pub value_type: ValueType,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub decimal: Option<DecimalSpec>,
}

impl ColumnShape {
    pub fn new(name: impl Into<String>, value_type: ValueType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            value_type,
            nullable,
            decimal: None,
        }
    }

    pub fn with_decimal(mut self, precision: u8, scale: u8) -> Self {
        self.decimal = Some(DecimalSpec::new(precision, scale));
        self
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum MemberTag {
    Key(u32),
    Ignore,
    Decimal { precision: u8, scale: u8 },
    Timestamp,
}

/// One declared member of a target type, in declaration order.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct MemberDescriptor {
    pub name: String,
    pub value_type: ValueType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub tags: Vec<MemberTag>,
}

impl MemberDescriptor {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            nullable: false,
            tags: Vec::new(),
        }
    }

    pub fn tagged(mut self, tag: MemberTag) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn key_order(&self) -> Option<u32> {
        self.tags.iter().find_map(|tag| match tag {
            MemberTag::Key(order) => Some(*order),
            _ => None,
        })
    }

    pub fn is_key(&self) -> bool {
        self.key_order().is_some()
    }

    pub fn is_ignored(&self) -> bool {
        self.tags.contains(&MemberTag::Ignore)
    }

    pub fn is_timestamp(&self) -> bool {
        self.tags.contains(&MemberTag::Timestamp)
    }

    pub fn decimal(&self) -> Option<DecimalSpec> {
        self.tags.iter().find_map(|tag| match tag {
            MemberTag::Decimal { precision, scale } => Some(DecimalSpec::new(*precision, *scale)),
            _ => None,
        })
    }

    pub fn to_shape(&self) -> ColumnShape {
        ColumnShape {
            name: self.name.clone(),
            value_type: self.value_type.clone(),
            nullable: self.nullable,
            decimal: self.decimal(),
        }
    }
}

/// Resolved description of a host type: its name and members in declaration order.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub name: String,
    pub members: Vec<MemberDescriptor>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>, members: Vec<MemberDescriptor>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }

    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Key members ordered by their key order; ties keep declaration order.
    pub fn key_shapes(&self) -> Vec<ColumnShape> {
        let mut keys: Vec<(u32, &MemberDescriptor)> = self
            .members
            .iter()
            .filter(|m| !m.is_ignored())
            .filter_map(|m| m.key_order().map(|order| (order, m)))
            .collect();
        keys.sort_by_key(|(order, _)| *order);
        keys.into_iter().map(|(_, m)| m.to_shape()).collect()
    }

    /// Non-key, non-ignored members in declaration order.
    pub fn value_shapes(&self) -> Vec<ColumnShape> {
        self.members
            .iter()
            .filter(|m| !m.is_ignored() && !m.is_key())
            .map(MemberDescriptor::to_shape)
            .collect()
    }

    pub fn timestamp_member(&self) -> Option<&MemberDescriptor> {
        self.members
            .iter()
            .find(|m| m.is_timestamp() && !m.is_ignored())
    }
}
