use common::logical_plan::{LogicalOp, LogicalPlan};
use common::MiniRelError;

/// Collapses each maximal run of consecutive selections into one
/// multi-predicate selection, predicates in top-to-bottom order. Useful after
/// pushdown has stacked many single-predicate selections.
pub struct MergeSelections;

impl MergeSelections {
    pub fn run(&self, mut plan: LogicalPlan) -> Result<LogicalPlan, MiniRelError> {
        for node in plan.preorder() {
            if !matches!(plan.get_operator(node), Some(LogicalOp::Selection(_))) {
                continue;
            }
            if plan.parent(node).is_none() && plan.root() != Some(node) {
                // consumed by an earlier merge
                continue;
            }
            if let Some(parent) = plan.parent(node) {
                if matches!(plan.get_operator(parent), Some(LogicalOp::Selection(_))) {
                    continue;
                }
            }
            let mut chain = vec![node];
            loop {
                let children = plan.children(*chain.last().unwrap());
                assert_eq!(children.len(), 1, "selection requires exactly one child");
                let child = children[0];
                if matches!(plan.get_operator(child), Some(LogicalOp::Selection(_))) {
                    chain.push(child);
                } else {
                    break;
                }
            }
            if chain.len() < 2 {
                continue;
            }
            let mut merged = Vec::new();
            for sel in &chain {
                if let Some(LogicalOp::Selection(s)) = plan.get_operator(*sel) {
                    merged.extend(s.predicates.iter().cloned());
                }
            }
            if let Some(LogicalOp::Selection(s)) = plan.get_operator_mut(node) {
                s.predicates = merged;
            }
            for sel in &chain[1..] {
                plan.splice_out(*sel);
            }
        }
        Ok(plan)
    }
}
