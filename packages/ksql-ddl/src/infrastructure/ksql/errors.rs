#[derive(Debug, thiserror::Error)]
#[error("failed to compile ksql statement")]
#[non_exhaustive]
pub enum KsqlError {
    #[error("Ksql - Unsupported data type: {type_name}")]
    UnsupportedType { type_name: String },
    #[error("Ksql - Unsupported map shape: MAP<{key_type}, {value_type}> (only MAP<STRING, STRING> is supported)")]
    UnsupportedMapShape {
        key_type: String,
        value_type: String,
    },
    #[error("Ksql - Unsupported projection shape: {shape}")]
    UnsupportedProjectionShape { shape: String },
    #[error("Ksql - Key and value shapes must not be empty for entity '{entity}'")]
    EmptyKeyOrValueShape { entity: String },
    #[error("Ksql - Invalid window spec: '{token}'")]
    InvalidWindowSpec { token: String },
    #[error("Ksql - Invalid parameters: {message}")]
    InvalidParameters { message: String },
    #[error("Ksql - Invalid {identifier_type}: '{name}' - {reason}")]
    InvalidIdentifier {
        identifier_type: String,
        name: String,
        reason: String,
    },
    QueryRender(#[from] handlebars::RenderError),
}

/// Checks if a string can be used as an unquoted ksqlDB identifier.
///
/// Names are emitted without backtick quoting or case folding, so the statement text stays
/// byte-for-byte identical across builds. That only works for names the engine accepts bare.
///
/// Identifiers (stream, table, column and topic names emitted by this crate) must:
/// - Be non-empty
/// - Contain only alphanumeric characters and underscores
/// - Not start with a digit
pub fn is_valid_ksql_identifier(name: &str) -> bool {
    match name.chars().next() {
        Some(first) => {
            !first.is_ascii_digit() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}

/// Validates that a string is a valid ksqlDB identifier, returning a typed error on failure.
pub fn validate_ksql_identifier(name: &str, identifier_type: &str) -> Result<(), KsqlError> {
    if is_valid_ksql_identifier(name) {
        return Ok(());
    }

    let reason = if name.is_empty() {
        "cannot be empty"
    } else if name.starts_with(|c: char| c.is_ascii_digit()) {
        "cannot start with a digit"
    } else {
        "contains invalid characters (only alphanumeric and underscore allowed)"
    };

    Err(KsqlError::InvalidIdentifier {
        identifier_type: identifier_type.to_string(),
        name: name.to_string(),
        reason: reason.to_string(),
    })
}
