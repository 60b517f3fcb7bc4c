//! Precision-preserving casts for decimal outputs.
//!
//! Aggregates over DECIMAL columns may widen or rescale their result. Every aliased select
//! member whose alias names a decimal column of the entity is wrapped in
//! `CAST(<expr> AS DECIMAL(p, s))`. Rewriting is idempotent.
//!
//! Bare columns (no `AS`) are left alone; they already carry their declared type.

use itertools::Itertools;
use regex::Regex;
use std::sync::LazyLock;

use crate::framework::column::DecimalSpec;
use crate::framework::entity::EntityModel;

static SELECT_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bSELECT\b").expect("SELECT regex should compile"));

static FROM_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bFROM\b").expect("FROM regex should compile"));

static ALIASED_MEMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^(?P<expr>.+?)\s+AS\s+(?P<alias>[A-Za-z_][A-Za-z0-9_]*)$")
        .expect("aliased member regex should compile")
});

static DECIMAL_CAST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)^CAST\s*\((?P<inner>.+)\s+AS\s+DECIMAL\s*\(\s*(?P<p>\d+)\s*,\s*(?P<s>\d+)\s*\)\s*\)$",
    )
    .expect("decimal cast regex should compile")
});

/// Paren depth before each byte of `text`; single-quoted literals count as nested.
fn depths(text: &str) -> Vec<i32> {
    let mut depth = 0;
    let mut in_quote = false;
    let mut result = Vec::with_capacity(text.len());
    for byte in text.bytes() {
        result.push(if in_quote { depth + 1 } else { depth });
        match byte {
            b'\'' => in_quote = !in_quote,
            b'(' if !in_quote => depth += 1,
            b')' if !in_quote => depth -= 1,
            _ => {}
        }
    }
    result
}

/// Byte range of the first select list, between `SELECT` and the first top-level `FROM`.
fn select_list_range(sql: &str) -> Option<(usize, usize)> {
    let select = SELECT_KEYWORD.find(sql)?;
    let depth = depths(sql);
    let from = FROM_KEYWORD
        .find_iter(&sql[select.end()..])
        .map(|m| m.start() + select.end())
        .find(|start| depth[*start] == depth[select.start()])?;
    Some((select.end(), from))
}

fn split_top_level(list: &str) -> Vec<&str> {
    let depth = depths(list);
    let mut parts = Vec::new();
    let mut start = 0;
    for (index, byte) in list.bytes().enumerate() {
        if byte == b',' && depth[index] == 0 {
            parts.push(&list[start..index]);
            start = index + 1;
        }
    }
    parts.push(&list[start..]);
    parts
}

/// Spec of `expr` if it is exactly one `CAST(... AS DECIMAL(p, s))` call.
fn existing_cast(expr: &str) -> Option<(&str, DecimalSpec)> {
    let captures = DECIMAL_CAST.captures(expr)?;
    // the CAST's own parenthesis has to close at the very end
    let open = expr.find('(')?;
    let depth = depths(expr);
    if expr[open + 1..expr.len() - 1]
        .bytes()
        .enumerate()
        .any(|(i, b)| b == b')' && depth[open + 1 + i] == 1)
    {
        return None;
    }
    let precision = captures.name("p")?.as_str().parse().ok()?;
    let scale = captures.name("s")?.as_str().parse().ok()?;
    Some((captures.name("inner")?.as_str(), DecimalSpec::new(precision, scale)))
}

fn cast_member(member: &str, decimals: &[(&str, DecimalSpec)]) -> Option<String> {
    let captures = ALIASED_MEMBER.captures(member)?;
    let expr = captures.name("expr")?.as_str();
    let alias = captures.name("alias")?.as_str();
    let (_, spec) = decimals
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(alias))?;

    let inner = match existing_cast(expr) {
        Some((_, existing)) if existing == *spec => return None,
        Some((inner, _)) => inner,
        None => expr,
    };
    Some(format!(
        "CAST({} AS DECIMAL({}, {})) AS {}",
        inner, spec.precision, spec.scale, alias
    ))
}

pub fn inject_casts(sql: &str, model: &EntityModel) -> String {
    let decimals: Vec<(&str, DecimalSpec)> = model
        .decimal_columns()
        .into_iter()
        .map(|(column, spec)| (column.name.as_str(), spec))
        .collect();
    if decimals.is_empty() {
        return sql.to_string();
    }
    let Some((start, end)) = select_list_range(sql) else {
        return sql.to_string();
    };

    let members = split_top_level(&sql[start..end])
        .into_iter()
        .map(|part| {
            let trimmed = part.trim();
            match cast_member(trimmed, &decimals) {
                Some(cast) => {
                    let leading = &part[..part.len() - part.trim_start().len()];
                    let trailing = &part[part.trim_end().len()..];
                    format!("{leading}{cast}{trailing}")
                }
                None => part.to_string(),
            }
        })
        .join(",");

    format!("{}{}{}", &sql[..start], members, &sql[end..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::column::{ColumnShape, ValueType};

    fn assert_cast(sql: &str, model: &EntityModel, expected: &str) {
        let once = inject_casts(sql, model);
        assert_eq!(once, expected);
        assert_eq!(inject_casts(&once, model), once);
    }

    fn price_model() -> EntityModel {
        EntityModel::new("Bar", "bar")
            .with_key(ColumnShape::new("Broker", ValueType::String, false))
            .with_value(ColumnShape::new("Price", ValueType::Decimal, false).with_decimal(18, 4))
            .with_value(ColumnShape::new("Volume", ValueType::Decimal, false))
    }

    #[test]
    fn test_wraps_aliased_decimal() {
        let sql = "SELECT o.Broker AS Broker, MAX(o.Price) AS Price FROM ticks o GROUP BY o.Broker";
        let cast = inject_casts(sql, &price_model());
        assert_eq!(
            cast,
            "SELECT o.Broker AS Broker, CAST(MAX(o.Price) AS DECIMAL(18, 4)) AS Price FROM ticks o GROUP BY o.Broker"
        );
        assert_eq!(inject_casts(&cast, &price_model()), cast);
    }

    #[test]
    fn test_alias_match_is_case_insensitive_and_default_precision() {
        assert_cast(
            "SELECT SUM(Qty) as volume FROM t",
            &price_model(),
            "SELECT CAST(SUM(Qty) AS DECIMAL(18, 2)) AS volume FROM t",
        );
    }

    #[test]
    fn test_existing_cast_with_other_precision_is_replaced() {
        assert_cast(
            "SELECT CAST(MAX(Price) AS DECIMAL(10, 1)) AS Price FROM t",
            &price_model(),
            "SELECT CAST(MAX(Price) AS DECIMAL(18, 4)) AS Price FROM t",
        );
    }

    #[test]
    fn test_two_casts_are_not_one() {
        assert_cast(
            "SELECT CAST(a AS DECIMAL(18, 4)) + CAST(b AS DECIMAL(18, 4)) AS Price FROM t",
            &price_model(),
            "SELECT CAST(CAST(a AS DECIMAL(18, 4)) + CAST(b AS DECIMAL(18, 4)) AS DECIMAL(18, 4)) AS Price FROM t",
        );
    }

    #[test]
    fn test_nested_commas_and_untouched_members() {
        let sql = "CREATE TABLE x WITH (KAFKA_TOPIC='x', PARTITIONS=1, REPLICAS=1) AS\nSELECT Broker,\n  ROUND(AVG(Price), 2) AS Price,\n  COUNT(*) AS Trades\nFROM t WINDOW TUMBLING (SIZE 1 MINUTES)\nGROUP BY Broker;";
        let expected = "CREATE TABLE x WITH (KAFKA_TOPIC='x', PARTITIONS=1, REPLICAS=1) AS\nSELECT Broker,\n  CAST(ROUND(AVG(Price), 2) AS DECIMAL(18, 4)) AS Price,\n  COUNT(*) AS Trades\nFROM t WINDOW TUMBLING (SIZE 1 MINUTES)\nGROUP BY Broker;";
        assert_cast(sql, &price_model(), expected);
    }

    #[test]
    fn test_nested_from_is_not_the_clause() {
        assert_cast(
            "SELECT EXTRACT_PRICE(x FROM y) AS Price FROM t",
            &price_model(),
            "SELECT CAST(EXTRACT_PRICE(x FROM y) AS DECIMAL(18, 4)) AS Price FROM t",
        );
    }

    #[test]
    fn test_no_decimals_or_no_select() {
        let model = EntityModel::new("Bar", "bar")
            .with_key(ColumnShape::new("Broker", ValueType::String, false));
        let sql = "SELECT MAX(Price) AS Price FROM t";
        assert_cast(sql, &model, sql);
        assert_cast("DROP TABLE t;", &price_model(), "DROP TABLE t;");
    }
}
