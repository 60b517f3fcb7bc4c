//! Projection rewrite for aggregations retargeted at the per-second hub rows.
//!
//! A bar projection written against a coarser grouping computes its bucket start on the host.
//! Once the same projection runs as a windowed aggregation over `<base>_1s_rows`, the bucket
//! start has to come from the engine's window instead. Only that one member is rewritten.

use tracing::debug;

use super::query::{Expr, ParameterKind, Projection};

/// Member name that carries the start of the aggregation bucket.
pub const BUCKET_START_MEMBER: &str = "BucketStart";

/// Suffix of the per-second rows object that feeds windowed aggregations.
pub const HUB_ROWS_SUFFIX: &str = "_1s_rows";

pub fn is_hub_input(input: &str) -> bool {
    input.to_ascii_lowercase().ends_with(HUB_ROWS_SUFFIX)
}

pub struct ProjectionAdapter;

impl ProjectionAdapter {
    /// Returns the projection with its bucket-start member bound to the window start.
    ///
    /// Only single-parameter grouping projections built as object constructions are touched;
    /// anything else comes back unchanged.
    pub fn adapt(projection: &Projection) -> Projection {
        let Projection::Object {
            parameters,
            target,
            bindings,
        } = projection
        else {
            return projection.clone();
        };

        match parameters.as_slice() {
            [parameter] if parameter.kind == ParameterKind::Grouping => {}
            _ => return projection.clone(),
        }

        let bindings = bindings
            .iter()
            .map(|binding| {
                if binding.member.eq_ignore_ascii_case(BUCKET_START_MEMBER)
                    && !binding.expr.is_window_start()
                {
                    debug!(
                        "Binding {}.{} to WINDOWSTART",
                        target.name, binding.member
                    );
                    let mut replaced = binding.clone();
                    replaced.expr = Expr::WindowStart;
                    replaced
                } else {
                    binding.clone()
                }
            })
            .collect();

        Projection::Object {
            parameters: parameters.clone(),
            target: target.clone(),
            bindings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::column::{MemberDescriptor, MemberTag, TypeDescriptor, ValueType};
    use crate::framework::query::{AggregateFunction, MemberBinding, Parameter};

    fn bar_projection(parameters: Vec<Parameter>) -> Projection {
        Projection::Object {
            parameters,
            target: TypeDescriptor::new(
                "Bar",
                vec![
                    MemberDescriptor::new("Broker", ValueType::String).tagged(MemberTag::Key(0)),
                    MemberDescriptor::new("BucketStart", ValueType::DateTime),
                    MemberDescriptor::new("Close", ValueType::Decimal).tagged(MemberTag::Decimal {
                        precision: 18,
                        scale: 4,
                    }),
                ],
            ),
            bindings: vec![
                MemberBinding::new("Broker", Expr::key("Broker")),
                MemberBinding::new("BucketStart", Expr::Host("g.Key.BucketStart".to_string())),
                MemberBinding::new(
                    "Close",
                    Expr::aggregate(AggregateFunction::LatestByOffset, Expr::column("Price")),
                ),
            ],
        }
    }

    #[test]
    fn test_bucket_start_rewritten_to_window_start() {
        let adapted = ProjectionAdapter::adapt(&bar_projection(vec![Parameter::grouping("g")]));
        let Projection::Object { bindings, .. } = &adapted else {
            panic!("expected object projection");
        };
        assert_eq!(bindings[1].expr, Expr::WindowStart);
        // other members pass through untouched
        assert_eq!(bindings[0].expr, Expr::key("Broker"));
        assert_eq!(
            bindings[2].expr,
            Expr::aggregate(AggregateFunction::LatestByOffset, Expr::column("Price"))
        );
        assert_eq!(adapted.window_start_members(), vec!["BucketStart"]);
    }

    #[test]
    fn test_adapt_is_stable() {
        let once = ProjectionAdapter::adapt(&bar_projection(vec![Parameter::grouping("g")]));
        let twice = ProjectionAdapter::adapt(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_non_grouping_projection_unchanged() {
        let original = bar_projection(vec![Parameter::row("x")]);
        assert_eq!(ProjectionAdapter::adapt(&original), original);

        let two_params = bar_projection(vec![Parameter::grouping("g"), Parameter::row("x")]);
        assert_eq!(ProjectionAdapter::adapt(&two_params), two_params);
    }

    #[test]
    fn test_anonymous_projection_unchanged() {
        let original = Projection::Anonymous {
            parameters: vec![Parameter::grouping("g")],
            members: vec![MemberBinding::new(
                "BucketStart",
                Expr::Host("g.Key.BucketStart".to_string()),
            )],
        };
        assert_eq!(ProjectionAdapter::adapt(&original), original);
    }

    #[test]
    fn test_hub_input_detection() {
        assert!(is_hub_input("bar_1s_rows"));
        assert!(is_hub_input("BAR_1S_ROWS"));
        assert!(!is_hub_input("bar_1m_live"));
        assert!(!is_hub_input("rows"));
    }
}
