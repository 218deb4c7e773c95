use crate::estimate::estimate_subtree;
use common::logical_plan::{
    FieldIdentifier, LogicalOp, LogicalPlan, OpIndex, PredExpr, PredicateNode, PredicateOp,
    ThetaJoinNode,
};
use common::statistics::Statistics;
use common::MiniRelError;

/// Topmost NaturalJoin nodes of the plan: none of them sits under another
/// NaturalJoin.
pub fn topmost_natural_joins(plan: &LogicalPlan) -> Vec<OpIndex> {
    fn aux(plan: &LogicalPlan, node: OpIndex, out: &mut Vec<OpIndex>) {
        if let Some(LogicalOp::NaturalJoin) = plan.get_operator(node) {
            out.push(node);
            return;
        }
        for child in plan.children(node).to_vec() {
            aux(plan, child, out);
        }
    }
    let mut out = Vec::new();
    if let Some(root) = plan.root() {
        aux(plan, root, &mut out);
    }
    out
}

/// Flattens a NaturalJoin subtree into its ordered participant list: the
/// subtrees joined directly, recursing only through nested NaturalJoins.
pub fn flatten_participants(plan: &LogicalPlan, root: OpIndex) -> Vec<OpIndex> {
    fn aux(plan: &LogicalPlan, node: OpIndex, out: &mut Vec<OpIndex>) {
        match plan.get_operator(node) {
            Some(LogicalOp::NaturalJoin) => {
                for child in plan.children(node).to_vec() {
                    aux(plan, child, out);
                }
            }
            _ => out.push(node),
        }
    }
    let mut out = Vec::new();
    aux(plan, root, &mut out);
    out
}

/// Resolves every NaturalJoin left in the plan via statistics.
///
/// The shared attribute set of the two sides becomes qualified equality
/// predicates on a ThetaJoin; a join with no shared attributes degenerates to
/// a CartesianProduct. Join-order passes finish with this step so that no raw
/// NaturalJoin ever reaches translate.
pub fn resolve_natural_joins(
    plan: &mut LogicalPlan,
    stats: &Statistics,
) -> Result<(), MiniRelError> {
    for node in plan.preorder() {
        if let Some(LogicalOp::NaturalJoin) = plan.get_operator(node) {
            let children = plan.children(node).to_vec();
            assert_eq!(children.len(), 2, "natural join requires exactly two children");
            let left = estimate_subtree(plan, children[0], stats)?;
            let right = estimate_subtree(plan, children[1], stats)?;
            let shared: Vec<String> = left
                .attribute_names()
                .intersection(&right.attribute_names())
                .map(|s| s.to_string())
                .collect();
            let lowered = if shared.is_empty() {
                LogicalOp::CartesianProduct
            } else {
                let mut predicates = Vec::new();
                for attr in &shared {
                    let left_ns = namespace_of(plan, children[0], attr, stats)?;
                    let right_ns = namespace_of(plan, children[1], attr, stats)?;
                    predicates.push(PredicateNode::new(
                        PredExpr::Ident(FieldIdentifier::new(&left_ns, attr)),
                        PredicateOp::Equals,
                        PredExpr::Ident(FieldIdentifier::new(&right_ns, attr)),
                    ));
                }
                LogicalOp::ThetaJoin(ThetaJoinNode { predicates })
            };
            debug!("lowering natural join {} to {}", node, lowered);
            *plan.get_operator_mut(node).unwrap() = lowered;
        }
    }
    Ok(())
}

/// First relation under `side` (pre-order) whose statistics carry `attr`;
/// used to qualify the predicates of a lowered natural join.
fn namespace_of(
    plan: &LogicalPlan,
    side: OpIndex,
    attr: &str,
    stats: &Statistics,
) -> Result<String, MiniRelError> {
    for node in plan.preorder_from(side) {
        if let Some(LogicalOp::Relation(r)) = plan.get_operator(node) {
            if stats.get(&r.name).map_or(false, |s| s.distinct(attr).is_some()) {
                return Ok(r.name.clone());
            }
        }
    }
    Err(MiniRelError::OptimizationError(format!(
        "no relation carrying attribute {} under join side",
        attr
    )))
}
