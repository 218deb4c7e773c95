use crate::enumeration::ExhaustiveSearch;
use crate::greedy::GreedyJoinOrder;
use crate::join_conversion::CartesianToJoin;
use crate::merge_selections::MergeSelections;
use crate::pushdown::PushSelectionsDown;
use common::logical_plan::LogicalPlan;
use common::statistics::Statistics;
use common::MiniRelError;

/// Optimization passes a caller can chain.
///
/// The caller supplies an explicit ordered list of pass values and folds the
/// plan through `run_pass`; there is no name-keyed registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerPass {
    /// Rule-based: sink selection predicates below cartesian products.
    PushSelectionsDown,
    /// Rule-based: collapse selection chains over products into joins.
    /// Run after PushSelectionsDown.
    CartesianToJoin,
    /// Rule-based: merge stacked selections into one multi-predicate node.
    MergeSelections,
    /// Cost-based: greedy join ordering; lowers every natural join.
    GreedyJoinOrder,
    /// Cost-based: exhaustive selection-order and join-order enumeration;
    /// lowers every natural join.
    ExhaustiveSearch,
}

/// Runs one optimization pass over a plan, consuming it and returning the
/// rewritten plan. Ownership transfers totally: the input shape must not be
/// referenced again.
///
/// # Arguments
///
/// * `pass` - Pass to run.
/// * `plan` - Plan to rewrite.
/// * `stats` - Statistics consumed by the statistics-driven passes.
pub fn run_pass(
    pass: &OptimizerPass,
    plan: LogicalPlan,
    stats: &Statistics,
) -> Result<LogicalPlan, MiniRelError> {
    info!("running optimizer pass {:?}", pass);
    match pass {
        OptimizerPass::PushSelectionsDown => PushSelectionsDown.run(plan),
        OptimizerPass::CartesianToJoin => CartesianToJoin::new(stats).run(plan),
        OptimizerPass::MergeSelections => MergeSelections.run(plan),
        OptimizerPass::GreedyJoinOrder => GreedyJoinOrder::new(stats).run(plan),
        OptimizerPass::ExhaustiveSearch => ExhaustiveSearch::new(stats).run(plan),
    }
}
