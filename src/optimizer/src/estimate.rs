use common::logical_plan::{LogicalOp, LogicalPlan, OpIndex, PredicateNode, PredicateOp};
use common::statistics::{RelationStatistics, Statistics};
use common::MiniRelError;
use std::collections::{BTreeSet, HashMap};

/// Derived cardinality estimate for a plan subtree: an estimated row count
/// plus estimated distinct counts for every attribute the subtree exposes.
///
/// Estimates are always independent copies; they never alias the Statistics
/// they were derived from.
#[derive(Debug, Clone)]
pub struct CardinalityEstimate {
    rows: f64,
    distinct: HashMap<String, f64>,
}

impl CardinalityEstimate {
    /// Copies a base relation's statistics into an estimate.
    ///
    /// # Arguments
    ///
    /// * `stats` - Relation statistics to copy.
    pub fn from_relation(stats: &RelationStatistics) -> Self {
        let distinct = stats
            .distinct_values()
            .map(|(k, v)| (k.clone(), *v as f64))
            .collect();
        Self {
            rows: stats.total_rows() as f64,
            distinct,
        }
    }

    /// Estimated number of output rows.
    pub fn rows(&self) -> f64 {
        self.rows
    }

    /// Estimated distinct count of an attribute, if the subtree exposes it.
    pub fn distinct(&self, attr: &str) -> Option<f64> {
        self.distinct.get(attr).copied()
    }

    /// Names of the attributes the subtree exposes.
    pub fn attribute_names(&self) -> BTreeSet<&str> {
        self.distinct.keys().map(|s| s.as_str()).collect()
    }

    /// Applies an equality selection on `attr`: `T' = T / V[attr]`.
    ///
    /// The selected attribute keeps one distinct value; every other attribute
    /// is capped at the new row count.
    ///
    /// # Panics
    ///
    /// Asserts that the estimate does not drop below one row; underflow means
    /// the statistics are inconsistent with the model and is never clamped.
    pub fn apply_equality(&self, attr: &str) -> Result<Self, MiniRelError> {
        let v = self.distinct.get(attr).copied().ok_or_else(|| {
            MiniRelError::OptimizationError(format!(
                "no distinct-value statistics for attribute {}",
                attr
            ))
        })?;
        let rows = self.rows / v;
        assert!(
            rows >= 1.0,
            "cardinality estimate underflow: {} rows after equality selection on {}",
            rows,
            attr
        );
        let mut distinct = HashMap::new();
        for (name, value) in self.distinct.iter() {
            let capped = if name == attr { 1.0 } else { value.min(rows) };
            distinct.insert(name.clone(), capped);
        }
        Ok(Self { rows, distinct })
    }

    /// Joins two estimates over their shared attribute set `S`:
    /// `T' = T_l * T_r / prod_{a in S} max(V_l[a], V_r[a])`.
    ///
    /// Shared attributes take the smaller distinct count; attributes carried
    /// from one side only are capped at the new row count. An empty shared
    /// set degenerates to the cartesian product estimate.
    ///
    /// # Panics
    ///
    /// Asserts that the estimate does not drop below one row.
    pub fn join(&self, other: &Self) -> Self {
        let mut denominator = 1.0;
        for (name, vl) in self.distinct.iter() {
            if let Some(vr) = other.distinct.get(name) {
                denominator *= vl.max(*vr);
            }
        }
        let rows = self.rows * other.rows / denominator;
        assert!(
            rows >= 1.0,
            "cardinality estimate underflow: {} rows after join",
            rows
        );
        let mut distinct = HashMap::new();
        for (name, vl) in self.distinct.iter() {
            let value = match other.distinct.get(name) {
                Some(vr) => vl.min(*vr),
                None => vl.min(rows),
            };
            distinct.insert(name.clone(), value);
        }
        for (name, vr) in other.distinct.iter() {
            if !self.distinct.contains_key(name) {
                distinct.insert(name.clone(), vr.min(rows));
            }
        }
        Self { rows, distinct }
    }

    /// Cross product of two estimates: `T' = T_l * T_r`, attributes merged
    /// (smaller distinct count on a name collision), each capped at `T'`.
    pub fn product(&self, other: &Self) -> Self {
        let rows = self.rows * other.rows;
        let mut distinct = HashMap::new();
        for (name, vl) in self.distinct.iter() {
            let value = match other.distinct.get(name) {
                Some(vr) => vl.min(*vr),
                None => *vl,
            };
            distinct.insert(name.clone(), value.min(rows));
        }
        for (name, vr) in other.distinct.iter() {
            if !self.distinct.contains_key(name) {
                distinct.insert(name.clone(), vr.min(rows));
            }
        }
        Self { rows, distinct }
    }
}

/// True for `x = y` predicates equating one attribute name with itself on two
/// field references; the only join predicate shape the cost model covers.
pub fn is_same_name_equality(pred: &PredicateNode) -> bool {
    if !pred.is_field_equality() {
        return false;
    }
    let left = pred.left.ident().unwrap();
    let right = pred.right.ident().unwrap();
    left.column() == right.column()
}

fn apply_selection_predicate(
    est: CardinalityEstimate,
    pred: &PredicateNode,
) -> Result<CardinalityEstimate, MiniRelError> {
    if pred.op != PredicateOp::Equals {
        return Err(MiniRelError::OptimizationError(format!(
            "cost model requires equality predicates, got '{}'",
            pred
        )));
    }
    // a field = field selection is modeled as an equality on the left column
    let ident = pred
        .left
        .ident()
        .or_else(|| pred.right.ident())
        .ok_or_else(|| {
            MiniRelError::OptimizationError(format!(
                "cost model requires a field operand in '{}'",
                pred
            ))
        })?;
    est.apply_equality(ident.column())
}

/// Estimates the output cardinality of the subtree rooted at `node`.
///
/// # Panics
///
/// Panics on arity violations; estimation consumes complete trees only.
pub fn estimate_subtree(
    plan: &LogicalPlan,
    node: OpIndex,
    stats: &Statistics,
) -> Result<CardinalityEstimate, MiniRelError> {
    let op = plan
        .get_operator(node)
        .ok_or_else(|| MiniRelError::OptimizationError(String::from("dangling plan node")))?;
    let children = plan.children(node);
    match op {
        LogicalOp::Relation(r) => {
            let relation_stats = stats.get(&r.name).ok_or_else(|| {
                MiniRelError::OptimizationError(format!(
                    "missing statistics for relation {}",
                    r.name
                ))
            })?;
            Ok(CardinalityEstimate::from_relation(relation_stats))
        }
        LogicalOp::Projection(_) => {
            assert_eq!(children.len(), 1, "projection requires exactly one child");
            estimate_subtree(plan, children[0], stats)
        }
        LogicalOp::Selection(s) => {
            assert_eq!(children.len(), 1, "selection requires exactly one child");
            let mut est = estimate_subtree(plan, children[0], stats)?;
            for pred in &s.predicates {
                est = apply_selection_predicate(est, pred)?;
            }
            Ok(est)
        }
        LogicalOp::CartesianProduct => {
            assert_eq!(children.len(), 2, "product requires exactly two children");
            let left = estimate_subtree(plan, children[0], stats)?;
            let right = estimate_subtree(plan, children[1], stats)?;
            Ok(left.product(&right))
        }
        LogicalOp::NaturalJoin => {
            assert_eq!(children.len(), 2, "join requires exactly two children");
            let left = estimate_subtree(plan, children[0], stats)?;
            let right = estimate_subtree(plan, children[1], stats)?;
            Ok(left.join(&right))
        }
        LogicalOp::ThetaJoin(t) => {
            assert_eq!(children.len(), 2, "join requires exactly two children");
            // only the lowered natural-join shape is estimable; anything else
            // is outside the model and rejected rather than guessed
            if t.predicates.is_empty() || !t.predicates.iter().all(is_same_name_equality) {
                return Err(MiniRelError::OptimizationError(format!(
                    "cost model supports only same-name equality join predicates, got '{}'",
                    plan.get_operator(node).unwrap()
                )));
            }
            let left = estimate_subtree(plan, children[0], stats)?;
            let right = estimate_subtree(plan, children[1], stats)?;
            Ok(left.join(&right))
        }
    }
}

/// Cost of a plan: the sum of every operator's estimated output cardinality.
pub fn plan_cost(plan: &LogicalPlan, stats: &Statistics) -> Result<f64, MiniRelError> {
    let mut total = 0.0;
    for node in plan.preorder() {
        total += estimate_subtree(plan, node, stats)?.rows();
    }
    Ok(total)
}

/// Checks that statistics exist for every relation the plan references.
/// Cost-based passes call this before mutating anything.
pub fn validate_statistics(plan: &LogicalPlan, stats: &Statistics) -> Result<(), MiniRelError> {
    for node in plan.preorder() {
        if let Some(LogicalOp::Relation(r)) = plan.get_operator(node) {
            if !stats.contains(&r.name) {
                return Err(MiniRelError::OptimizationError(format!(
                    "missing statistics for relation {}",
                    r.name
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use common::logical_plan::{RelationNode, SelectionNode};
    use common::statistics::RelationStatistics;
    use common::testutil::*;

    fn alpha_stats() -> Statistics {
        let mut stats = Statistics::new();
        stats.insert(
            "Alpha",
            RelationStatistics::new(100)
                .with_attribute("a", 10)
                .with_attribute("b", 5),
        );
        stats
    }

    #[test]
    fn test_equality_selectivity_monotonicity() {
        let stats = alpha_stats();
        let base = CardinalityEstimate::from_relation(stats.get("Alpha").unwrap());
        let first = base.apply_equality("a").unwrap();
        assert_eq!(first.rows(), 10.0);
        assert_eq!(first.distinct("a"), Some(1.0));
        // remaining attrs capped at the new row count
        assert_eq!(first.distinct("b"), Some(5.0));
        let second = first.apply_equality("b").unwrap();
        assert_eq!(second.rows(), 2.0);
        assert_eq!(second.distinct("b"), Some(1.0));
    }

    #[test]
    #[should_panic(expected = "underflow")]
    fn test_equality_underflow_asserts() {
        // distinct count larger than the row count is inconsistent
        let stats = RelationStatistics::new(3).with_attribute("a", 10);
        let base = CardinalityEstimate::from_relation(&stats);
        let _ = base.apply_equality("a");
    }

    #[test]
    fn test_join_formula() {
        let left = CardinalityEstimate::from_relation(
            &RelationStatistics::new(100)
                .with_attribute("a", 20)
                .with_attribute("k", 10),
        );
        let right = CardinalityEstimate::from_relation(
            &RelationStatistics::new(50)
                .with_attribute("k", 25)
                .with_attribute("c", 7),
        );
        let joined = left.join(&right);
        // 100 * 50 / max(10, 25)
        assert_eq!(joined.rows(), 200.0);
        assert_eq!(joined.distinct("k"), Some(10.0));
        assert_eq!(joined.distinct("a"), Some(20.0));
        assert_eq!(joined.distinct("c"), Some(7.0));
    }

    #[test]
    fn test_product_merges_attributes() {
        let left = CardinalityEstimate::from_relation(
            &RelationStatistics::new(4).with_attribute("a", 2),
        );
        let right = CardinalityEstimate::from_relation(
            &RelationStatistics::new(3).with_attribute("b", 3),
        );
        let product = left.product(&right);
        assert_eq!(product.rows(), 12.0);
        assert_eq!(product.distinct("a"), Some(2.0));
        assert_eq!(product.distinct("b"), Some(3.0));
    }

    #[test]
    fn test_estimate_selection_over_relation() {
        let stats = alpha_stats();
        let mut plan = LogicalPlan::new();
        let sel = plan.add_node(LogicalOp::Selection(SelectionNode {
            predicates: vec![pred_eq_int("Alpha.a", 3)],
        }));
        let rel = plan.add_node(LogicalOp::Relation(RelationNode {
            name: String::from("Alpha"),
        }));
        plan.add_edge(sel, rel);
        let est = estimate_subtree(&plan, sel, &stats).unwrap();
        assert_eq!(est.rows(), 10.0);
        // plan cost sums every operator: 10 (selection) + 100 (relation)
        assert_eq!(plan_cost(&plan, &stats).unwrap(), 110.0);
    }

    #[test]
    fn test_validate_statistics_missing_relation() {
        let stats = alpha_stats();
        let mut plan = LogicalPlan::new();
        plan.add_node(LogicalOp::Relation(RelationNode {
            name: String::from("Missing"),
        }));
        assert!(validate_statistics(&plan, &stats).is_err());
    }

    #[test]
    fn test_theta_join_estimation_rejected() {
        use common::logical_plan::ThetaJoinNode;
        let mut stats = alpha_stats();
        stats.insert("Beta", RelationStatistics::new(10).with_attribute("c", 2));
        let mut plan = LogicalPlan::new();
        let join = plan.add_node(LogicalOp::ThetaJoin(ThetaJoinNode {
            predicates: vec![pred_eq_fields("Alpha.a", "Beta.c")],
        }));
        let l = plan.add_node(LogicalOp::Relation(RelationNode {
            name: String::from("Alpha"),
        }));
        let r = plan.add_node(LogicalOp::Relation(RelationNode {
            name: String::from("Beta"),
        }));
        plan.add_edge(join, l);
        plan.add_edge(join, r);
        assert!(estimate_subtree(&plan, join, &stats).is_err());
    }
}
