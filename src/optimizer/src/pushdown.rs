use common::logical_plan::{
    LogicalOp, LogicalPlan, OpIndex, PredicateNode, SelectionNode,
};
use common::MiniRelError;
use std::collections::BTreeSet;

enum Side {
    Left,
    Right,
}

/// Selection pushdown.
///
/// Walks every selection pre-order; beneath it, every cartesian product.
/// Predicates that fit entirely within one side's namespace set move into a
/// new single-predicate selection directly above that side (stacking when
/// several push to the same side). Predicates spanning both sides, with an
/// unqualified field, or with no field reference at all stay at the outer
/// selection. An emptied outer selection is spliced out.
///
/// Freshly created selections are pushed recursively in the same run, so one
/// run reaches the fixpoint and a second run changes nothing.
pub struct PushSelectionsDown;

impl PushSelectionsDown {
    pub fn run(&self, mut plan: LogicalPlan) -> Result<LogicalPlan, MiniRelError> {
        for node in plan.preorder() {
            if let Some(LogicalOp::Selection(_)) = plan.get_operator(node) {
                self.push_selection(&mut plan, node);
            }
        }
        debug!("selection pushdown produced:\n{}", plan.pretty());
        Ok(plan)
    }

    fn push_selection(&self, plan: &mut LogicalPlan, node: OpIndex) {
        let mut created = Vec::new();
        let products: Vec<OpIndex> = plan
            .preorder_from(node)
            .into_iter()
            .filter(|n| matches!(plan.get_operator(*n), Some(LogicalOp::CartesianProduct)))
            .collect();
        for product in products {
            let conds = match plan.get_operator_mut(node) {
                Some(LogicalOp::Selection(s)) => std::mem::take(&mut s.predicates),
                _ => unreachable!("push_selection on a non-selection node"),
            };
            if conds.is_empty() {
                break;
            }
            let children = plan.children(product).to_vec();
            assert_eq!(children.len(), 2, "product requires exactly two children");
            let (mut child_p, mut child_q) = (children[0], children[1]);
            let ns_p = plan.collect_namespaces(child_p);
            let ns_q = plan.collect_namespaces(child_q);

            let mut remaining = Vec::new();
            for cond in conds {
                match side_for(&cond, &ns_p, &ns_q) {
                    Some(Side::Left) => {
                        let sel = plan.insert_above(
                            child_p,
                            LogicalOp::Selection(SelectionNode {
                                predicates: vec![cond],
                            }),
                        );
                        child_p = sel;
                        created.push(sel);
                    }
                    Some(Side::Right) => {
                        let sel = plan.insert_above(
                            child_q,
                            LogicalOp::Selection(SelectionNode {
                                predicates: vec![cond],
                            }),
                        );
                        child_q = sel;
                        created.push(sel);
                    }
                    None => remaining.push(cond),
                }
            }
            if let Some(LogicalOp::Selection(s)) = plan.get_operator_mut(node) {
                s.predicates = remaining;
            }
        }

        // freshly created single-predicate selections keep sinking through
        // any products below their new position
        for sel in created {
            self.push_selection(plan, sel);
        }

        let emptied = match plan.get_operator(node) {
            Some(LogicalOp::Selection(s)) => s.predicates.is_empty(),
            _ => false,
        };
        if emptied && plan.children(node).len() == 1 {
            plan.splice_out(node);
        }
    }
}

/// Which product side a predicate's namespaces fit entirely within, if any.
/// Unqualified fields and predicates without field references stay put.
fn side_for(
    cond: &PredicateNode,
    ns_p: &BTreeSet<String>,
    ns_q: &BTreeSet<String>,
) -> Option<Side> {
    let mut related = BTreeSet::new();
    for ident in cond.idents() {
        match ident.table() {
            Some(table) => {
                related.insert(table.to_string());
            }
            None => return None,
        }
    }
    if related.is_empty() {
        return None;
    }
    if related.is_subset(ns_p) {
        Some(Side::Left)
    } else if related.is_subset(ns_q) {
        Some(Side::Right)
    } else {
        None
    }
}
