use crate::estimate::{estimate_subtree, validate_statistics, CardinalityEstimate};
use crate::natural_join::{flatten_participants, resolve_natural_joins, topmost_natural_joins};
use common::logical_plan::{LogicalOp, LogicalPlan, OpIndex};
use common::statistics::Statistics;
use common::MiniRelError;

/// Greedy join ordering.
///
/// Each topmost NaturalJoin subtree is flattened into its participant list;
/// the remaining pair with the lowest estimated join cardinality folds into a
/// new NaturalJoin until one participant remains. Strict improvement keeps
/// ties on the first pair in enumeration order, and the folded pair takes the
/// first partner's slot in the list. A heuristic, not guaranteed optimal.
///
/// Finishes by lowering every NaturalJoin to its statistics-resolved form, so
/// the output plan is ready for translation.
pub struct GreedyJoinOrder<'a> {
    stats: &'a Statistics,
}

impl<'a> GreedyJoinOrder<'a> {
    pub fn new(stats: &'a Statistics) -> Self {
        Self { stats }
    }

    pub fn run(&self, mut plan: LogicalPlan) -> Result<LogicalPlan, MiniRelError> {
        validate_statistics(&plan, self.stats)?;
        for root in topmost_natural_joins(&plan) {
            self.reorder(&mut plan, root)?;
        }
        resolve_natural_joins(&mut plan, self.stats)?;
        debug!("greedy join order produced:\n{}", plan.pretty());
        Ok(plan)
    }

    fn reorder(&self, plan: &mut LogicalPlan, root: OpIndex) -> Result<(), MiniRelError> {
        let participants = flatten_participants(plan, root);
        if participants.len() < 3 {
            return Ok(());
        }
        let mut entries: Vec<(OpIndex, CardinalityEstimate)> = Vec::new();
        for p in &participants {
            entries.push((*p, estimate_subtree(plan, *p, self.stats)?));
        }
        for p in &participants {
            plan.detach(*p);
        }

        while entries.len() > 1 {
            let mut best: Option<(usize, usize, CardinalityEstimate)> = None;
            for i in 0..entries.len() {
                for j in (i + 1)..entries.len() {
                    let est = entries[i].1.join(&entries[j].1);
                    let improves = match &best {
                        Some((_, _, b)) => est.rows() < b.rows(),
                        None => true,
                    };
                    if improves {
                        best = Some((i, j, est));
                    }
                }
            }
            let (i, j, est) = best.unwrap();
            debug!(
                "greedy fold joins participants {} and {} at {} rows",
                entries[i].0,
                entries[j].0,
                est.rows()
            );
            let joined = plan.add_node(LogicalOp::NaturalJoin);
            plan.set_parent(entries[i].0, Some(joined));
            plan.set_parent(entries[j].0, Some(joined));
            entries.remove(j);
            entries[i] = (joined, est);
        }

        let (new_root, _) = entries.pop().unwrap();
        plan.replace_subtree(root, new_root);
        Ok(())
    }
}
