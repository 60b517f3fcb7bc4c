//! Rendering of query-model expressions into select lists and GROUP BY lists.

use tracing::debug;

use crate::framework::query::{Expr, Literal, MemberBinding, Projection};

use super::errors::{validate_ksql_identifier, KsqlError};

fn qualify(name: &str, alias: Option<&str>) -> String {
    match alias {
        Some(alias) => format!("{alias}.{name}"),
        None => name.to_string(),
    }
}

pub fn render_expr(expr: &Expr, alias: Option<&str>) -> Result<String, KsqlError> {
    match expr {
        Expr::Column(name) | Expr::GroupKey(name) => Ok(qualify(name, alias)),
        Expr::Aggregate { function, argument } => match argument {
            Some(argument) => Ok(format!(
                "{}({})",
                function.sql_name(),
                render_expr(argument, alias)?
            )),
            None => Ok(format!("{}(*)", function.sql_name())),
        },
        Expr::WindowStart => Ok("WINDOWSTART".to_string()),
        Expr::WindowEnd => Ok("WINDOWEND".to_string()),
        Expr::Literal(literal) => Ok(match literal {
            Literal::Integer(value) => value.to_string(),
            Literal::Decimal(text) => text.clone(),
            Literal::String(text) => format!("'{}'", text.replace('\'', "''")),
            Literal::Boolean(true) => "TRUE".to_string(),
            Literal::Boolean(false) => "FALSE".to_string(),
        }),
        Expr::Call {
            function,
            arguments,
        } => {
            validate_ksql_identifier(function, "function name")?;
            let arguments = arguments
                .iter()
                .map(|argument| render_expr(argument, alias))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("{}({})", function, arguments.join(", ")))
        }
        Expr::Host(description) => Err(KsqlError::UnsupportedProjectionShape {
            shape: format!("host-computed expression '{description}'"),
        }),
    }
}

/// `<expr> AS <member>`, or just the column when it already carries the member's name.
pub fn render_member(binding: &MemberBinding, alias: Option<&str>) -> Result<String, KsqlError> {
    let rendered = render_expr(&binding.expr, alias)?;
    if rendered == binding.member {
        Ok(rendered)
    } else {
        Ok(format!("{} AS {}", rendered, binding.member))
    }
}

/// Select list of a projection. A missing projection selects everything.
pub fn render_select_list(
    projection: Option<&Projection>,
    alias: Option<&str>,
) -> Result<String, KsqlError> {
    let members = match projection {
        None => return Ok("*".to_string()),
        Some(Projection::Object {
            target, bindings, ..
        }) => {
            if let Some(stray) = bindings.iter().find(|b| target.member(&b.member).is_none()) {
                return Err(KsqlError::InvalidParameters {
                    message: format!(
                        "member '{}' is not declared on {}",
                        stray.member, target.name
                    ),
                });
            }

            let mut rendered = Vec::new();
            for member in target.members.iter().filter(|m| !m.is_ignored()) {
                match bindings.iter().find(|b| b.member == member.name) {
                    Some(binding) => rendered.push(render_member(binding, alias)?),
                    None => debug!("{}.{} has no binding, leaving it out", target.name, member.name),
                }
            }
            rendered
        }
        Some(Projection::Anonymous { members, .. }) => members
            .iter()
            .map(|binding| render_member(binding, alias))
            .collect::<Result<Vec<_>, _>>()?,
        Some(scalar @ Projection::Scalar { .. }) => {
            return Err(KsqlError::UnsupportedProjectionShape {
                shape: scalar.shape_name().to_string(),
            })
        }
    };

    if members.is_empty() {
        return Err(KsqlError::InvalidParameters {
            message: "select projection binds no members".to_string(),
        });
    }
    Ok(members.join(", "))
}

pub fn render_group_by(group_by: &[Expr], alias: Option<&str>) -> Result<String, KsqlError> {
    Ok(group_by
        .iter()
        .map(|expr| render_expr(expr, alias))
        .collect::<Result<Vec<_>, _>>()?
        .join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::column::{MemberDescriptor, MemberTag, TypeDescriptor, ValueType};
    use crate::framework::query::{AggregateFunction, Parameter};

    #[test]
    fn test_render_expressions() {
        let max = Expr::aggregate(AggregateFunction::Max, Expr::column("Price"));
        assert_eq!(render_expr(&max, Some("o")).unwrap(), "MAX(o.Price)");
        assert_eq!(render_expr(&Expr::count_all(), None).unwrap(), "COUNT(*)");
        assert_eq!(render_expr(&Expr::WindowEnd, Some("o")).unwrap(), "WINDOWEND");

        let call = Expr::Call {
            function: "ROUND".to_string(),
            arguments: vec![
                Expr::column("Price"),
                Expr::Literal(Literal::Integer(2)),
            ],
        };
        assert_eq!(render_expr(&call, None).unwrap(), "ROUND(Price, 2)");
        assert_eq!(
            render_expr(&Expr::Literal(Literal::String("it's".to_string())), None).unwrap(),
            "'it''s'"
        );
    }

    #[test]
    fn test_host_expression_rejected() {
        let host = Expr::Host("DateTime.UtcNow".to_string());
        assert!(matches!(
            render_expr(&host, None),
            Err(KsqlError::UnsupportedProjectionShape { .. })
        ));
    }

    #[test]
    fn test_render_member_aliasing() {
        let same = MemberBinding::new("Broker", Expr::key("Broker"));
        assert_eq!(render_member(&same, None).unwrap(), "Broker");
        assert_eq!(render_member(&same, Some("o")).unwrap(), "o.Broker AS Broker");

        let start = MemberBinding::new("BucketStart", Expr::WindowStart);
        assert_eq!(render_member(&start, None).unwrap(), "WINDOWSTART AS BucketStart");
    }

    #[test]
    fn test_select_list_uses_declaration_order() {
        let projection = Projection::Object {
            parameters: vec![Parameter::grouping("g")],
            target: TypeDescriptor::new(
                "Bar",
                vec![
                    MemberDescriptor::new("Broker", ValueType::String).tagged(MemberTag::Key(0)),
                    MemberDescriptor::new("Open", ValueType::Decimal),
                    MemberDescriptor::new("High", ValueType::Decimal),
                ],
            ),
            bindings: vec![
                MemberBinding::new(
                    "High",
                    Expr::aggregate(AggregateFunction::Max, Expr::column("Price")),
                ),
                MemberBinding::new("Broker", Expr::key("Broker")),
                MemberBinding::new(
                    "Open",
                    Expr::aggregate(AggregateFunction::EarliestByOffset, Expr::column("Price")),
                ),
            ],
        };
        assert_eq!(
            render_select_list(Some(&projection), None).unwrap(),
            "Broker, EARLIEST_BY_OFFSET(Price) AS Open, MAX(Price) AS High"
        );
    }

    #[test]
    fn test_select_list_shapes() {
        assert_eq!(render_select_list(None, None).unwrap(), "*");

        let scalar = Projection::Scalar {
            parameters: vec![Parameter::row("t")],
            expr: Expr::column("Price"),
        };
        assert!(matches!(
            render_select_list(Some(&scalar), None),
            Err(KsqlError::UnsupportedProjectionShape { .. })
        ));

        let stray = Projection::Object {
            parameters: vec![Parameter::grouping("g")],
            target: TypeDescriptor::new("Bar", vec![]),
            bindings: vec![MemberBinding::new("Ghost", Expr::column("x"))],
        };
        assert!(matches!(
            render_select_list(Some(&stray), None),
            Err(KsqlError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn test_group_by() {
        let keys = vec![Expr::key("Broker"), Expr::key("Symbol")];
        assert_eq!(render_group_by(&keys, Some("t")).unwrap(), "t.Broker, t.Symbol");
    }
}
