use crate::estimate::{plan_cost, validate_statistics};
use crate::natural_join::{flatten_participants, resolve_natural_joins, topmost_natural_joins};
use common::logical_plan::{LogicalOp, LogicalPlan, OpIndex, PredicateNode, SelectionNode};
use common::statistics::Statistics;
use common::MiniRelError;

/// Exhaustive plan enumeration: an intentionally combinatorial baseline, not
/// a scalable planner.
///
/// Two composed searches. First, every maximal run of two or more stacked
/// selections is rebuilt once per permutation of the run's predicates (the
/// cardinality trace is order-sensitive even though the final rows are not).
/// Second, every topmost NaturalJoin subtree is rebuilt in every left-deep
/// and every balanced (bushy) participant ordering. Candidates are
/// whole-plan clones sharing no nodes with the working plan; the plan with
/// the smallest summed estimated cardinality wins, first candidate on ties.
///
/// Bounding the search is the caller's concern: an optional candidate limit
/// truncates each candidate list between enumeration and cost evaluation.
pub struct ExhaustiveSearch<'a> {
    stats: &'a Statistics,
    candidate_limit: Option<usize>,
}

impl<'a> ExhaustiveSearch<'a> {
    pub fn new(stats: &'a Statistics) -> Self {
        Self {
            stats,
            candidate_limit: None,
        }
    }

    /// Caps how many candidates per rewrite site are cost-evaluated.
    pub fn with_candidate_limit(mut self, limit: usize) -> Self {
        self.candidate_limit = Some(limit);
        self
    }

    pub fn run(&self, plan: LogicalPlan) -> Result<LogicalPlan, MiniRelError> {
        validate_statistics(&plan, self.stats)?;
        let plan = self.search_selection_orders(plan)?;
        let mut plan = self.search_join_orders(plan)?;
        resolve_natural_joins(&mut plan, self.stats)?;
        debug!("exhaustive search produced:\n{}", plan.pretty());
        Ok(plan)
    }

    fn search_selection_orders(&self, plan: LogicalPlan) -> Result<LogicalPlan, MiniRelError> {
        let runs = selection_runs(&plan);
        let mut current = plan;
        for run in runs {
            let mut preds: Vec<PredicateNode> = Vec::new();
            for sel in &run {
                if let Some(LogicalOp::Selection(s)) = current.get_operator(*sel) {
                    preds.extend(s.predicates.iter().cloned());
                }
            }
            if preds.len() < 2 {
                continue;
            }
            let mut candidates = Vec::new();
            for perm in permutations(preds.len()) {
                let mut cand = current.clone();
                let ordered: Vec<PredicateNode> =
                    perm.iter().map(|i| preds[*i].clone()).collect();
                rebuild_selection_run(&mut cand, &run, ordered);
                candidates.push(cand);
            }
            current = self.pick_best(current, candidates)?;
        }
        Ok(current)
    }

    fn search_join_orders(&self, plan: LogicalPlan) -> Result<LogicalPlan, MiniRelError> {
        let mut current = plan;
        for root in topmost_natural_joins(&current) {
            let participants = flatten_participants(&current, root);
            if participants.len() < 3 {
                continue;
            }
            let mut candidates = Vec::new();
            for perm in permutations(participants.len()) {
                let order: Vec<OpIndex> = perm.iter().map(|i| participants[*i]).collect();
                candidates.push(rebuild_join(&current, root, &order, fold_left_deep));
                // a balanced fold only differs from left-deep past three
                if participants.len() >= 4 {
                    candidates.push(rebuild_join(&current, root, &order, fold_balanced));
                }
            }
            current = self.pick_best(current, candidates)?;
        }
        Ok(current)
    }

    fn pick_best(
        &self,
        incumbent: LogicalPlan,
        mut candidates: Vec<LogicalPlan>,
    ) -> Result<LogicalPlan, MiniRelError> {
        if let Some(limit) = self.candidate_limit {
            if candidates.len() > limit {
                warn!(
                    "exhaustive search dropping {} of {} candidates over the candidate limit",
                    candidates.len() - limit,
                    candidates.len()
                );
                candidates.truncate(limit);
            }
        }
        let mut best = incumbent;
        let mut best_cost = plan_cost(&best, self.stats)?;
        for cand in candidates {
            let cost = plan_cost(&cand, self.stats)?;
            if cost < best_cost {
                best_cost = cost;
                best = cand;
            }
        }
        debug!("exhaustive search kept a plan costing {}", best_cost);
        Ok(best)
    }
}

/// Maximal runs of two or more consecutive selection nodes, top to bottom.
fn selection_runs(plan: &LogicalPlan) -> Vec<Vec<OpIndex>> {
    let is_selection =
        |n: OpIndex| matches!(plan.get_operator(n), Some(LogicalOp::Selection(_)));
    let mut runs = Vec::new();
    for node in plan.preorder() {
        if !is_selection(node) {
            continue;
        }
        if plan.parent(node).map_or(false, &is_selection) {
            continue;
        }
        let mut run = vec![node];
        loop {
            let children = plan.children(*run.last().unwrap());
            if children.len() == 1 && is_selection(children[0]) {
                run.push(children[0]);
            } else {
                break;
            }
        }
        if run.len() >= 2 {
            runs.push(run);
        }
    }
    runs
}

/// Replaces the selection run with a stack of single-predicate selections in
/// the given top-to-bottom order.
fn rebuild_selection_run(plan: &mut LogicalPlan, run: &[OpIndex], ordered: Vec<PredicateNode>) {
    let top = run[0];
    let bottom = *run.last().unwrap();
    let child = plan.children(bottom)[0];
    let mut nodes = Vec::new();
    for pred in ordered {
        nodes.push(plan.add_node(LogicalOp::Selection(SelectionNode {
            predicates: vec![pred],
        })));
    }
    for pair in nodes.windows(2) {
        plan.set_parent(pair[1], Some(pair[0]));
    }
    plan.set_parent(child, Some(*nodes.last().unwrap()));
    plan.replace_subtree(top, nodes[0]);
}

/// Clones the working plan and rebuilds the join subtree at `root` over the
/// given participant order using `fold`.
fn rebuild_join(
    current: &LogicalPlan,
    root: OpIndex,
    order: &[OpIndex],
    fold: fn(&mut LogicalPlan, &[OpIndex]) -> OpIndex,
) -> LogicalPlan {
    let mut cand = current.clone();
    for p in order {
        cand.detach(*p);
    }
    let folded = fold(&mut cand, order);
    cand.replace_subtree(root, folded);
    cand
}

fn fold_left_deep(plan: &mut LogicalPlan, items: &[OpIndex]) -> OpIndex {
    let mut acc = items[0];
    for p in &items[1..] {
        let join = plan.add_node(LogicalOp::NaturalJoin);
        plan.set_parent(acc, Some(join));
        plan.set_parent(*p, Some(join));
        acc = join;
    }
    acc
}

fn fold_balanced(plan: &mut LogicalPlan, items: &[OpIndex]) -> OpIndex {
    if items.len() == 1 {
        return items[0];
    }
    let mid = (items.len() + 1) / 2;
    let left = fold_balanced(plan, &items[..mid]);
    let right = fold_balanced(plan, &items[mid..]);
    let join = plan.add_node(LogicalOp::NaturalJoin);
    plan.set_parent(left, Some(join));
    plan.set_parent(right, Some(join));
    join
}

/// All orderings of 0..n, lexicographic.
fn permutations(n: usize) -> Vec<Vec<usize>> {
    fn aux(current: &mut Vec<usize>, remaining: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if remaining.is_empty() {
            out.push(current.clone());
            return;
        }
        for i in 0..remaining.len() {
            let value = remaining.remove(i);
            current.push(value);
            aux(current, remaining, out);
            current.pop();
            remaining.insert(i, value);
        }
    }
    let mut out = Vec::new();
    aux(&mut Vec::new(), &mut (0..n).collect(), &mut out);
    out
}
