//! # Compiler Settings
//!
//! Settings are read from an optional TOML file and then from environment variables prefixed
//! with `KSQL_DDL_`, using `__` to separate nested keys:
//!
//! ```bash
//! KSQL_DDL_DECIMAL__PRECISION=20
//! KSQL_DDL_FORMATS__VALUE_FORMAT=JSON
//! KSQL_DDL_SINK__RETENTION_MS=86400000
//! KSQL_DDL_LOGGER__LEVEL=debug
//! ```
//!
//! Per-property decimal overrides are only read from the file:
//!
//! ```toml
//! [[decimal.overrides]]
//! entity = "Bar"
//! property = "Close"
//! precision = 18
//! scale = 4
//! ```

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::framework::column::DecimalSpec;
use crate::logger::LoggerSettings;

pub const ENV_PREFIX: &str = "KSQL_DDL";

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DecimalOverride {
    pub entity: String,
    pub property: String,
    pub precision: u8,
    pub scale: u8,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DecimalSettings {
    #[serde(default = "default_decimal_precision")]
    pub precision: u8,
    #[serde(default = "default_decimal_scale")]
    pub scale: u8,
    #[serde(default)]
    pub overrides: Vec<DecimalOverride>,
}

fn default_decimal_precision() -> u8 {
    DecimalSpec::DEFAULT_PRECISION
}

fn default_decimal_scale() -> u8 {
    DecimalSpec::DEFAULT_SCALE
}

impl Default for DecimalSettings {
    fn default() -> Self {
        Self {
            precision: default_decimal_precision(),
            scale: default_decimal_scale(),
            overrides: Vec::new(),
        }
    }
}

impl DecimalSettings {
    /// Resolves precision/scale for `entity.property`: configured override first, then the
    /// explicit column tag, then the global default.
    pub fn resolve(
        &self,
        entity: &str,
        property: &str,
        explicit: Option<DecimalSpec>,
    ) -> DecimalSpec {
        self.overrides
            .iter()
            .find(|o| {
                o.entity.eq_ignore_ascii_case(entity) && o.property.eq_ignore_ascii_case(property)
            })
            .map(|o| DecimalSpec::new(o.precision, o.scale))
            .or(explicit)
            .unwrap_or_else(|| self.global())
    }

    pub fn global(&self) -> DecimalSpec {
        DecimalSpec::new(self.precision, self.scale)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FormatSettings {
    #[serde(default = "default_format")]
    pub key_format: String,
    #[serde(default = "default_format")]
    pub value_format: String,
}

fn default_format() -> String {
    "AVRO".to_string()
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            key_format: default_format(),
            value_format: default_format(),
        }
    }
}

/// Sizing and retention used for sink topics when a request does not carry its own.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SinkSettings {
    #[serde(default = "default_partitions")]
    pub partitions: u32,
    #[serde(default = "default_replicas")]
    pub replicas: u16,
    /// Retention of per-second rows streams and windowed sinks; `0` emits none.
    #[serde(default = "default_retention_ms")]
    pub retention_ms: u64,
}

fn default_partitions() -> u32 {
    1
}

fn default_replicas() -> u16 {
    1
}

fn default_retention_ms() -> u64 {
    7 * 24 * 60 * 60 * 1000
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            partitions: default_partitions(),
            replicas: default_replicas(),
            retention_ms: default_retention_ms(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct CompilerSettings {
    #[serde(default)]
    pub decimal: DecimalSettings,
    #[serde(default)]
    pub formats: FormatSettings,
    #[serde(default)]
    pub sink: SinkSettings,
    #[serde(default)]
    pub logger: LoggerSettings,
}

impl CompilerSettings {
    /// Loads settings from `path` (if given and present) layered under the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
