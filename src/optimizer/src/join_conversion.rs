use crate::estimate::validate_statistics;
use common::logical_plan::{
    LogicalOp, LogicalPlan, OpIndex, PredicateNode, ThetaJoinNode,
};
use common::statistics::Statistics;
use common::MiniRelError;
use std::collections::BTreeSet;

/// Cartesian-to-join conversion. Run after selection pushdown, otherwise the
/// predicates stay folded in the outer selection.
///
/// Every maximal selection chain sitting directly above a cartesian product
/// collapses, together with the product, into a single join carrying all the
/// chain's predicates: a NaturalJoin when the predicates equate exactly the
/// attribute names the two sides share, a ThetaJoin otherwise.
pub struct CartesianToJoin<'a> {
    stats: &'a Statistics,
}

impl<'a> CartesianToJoin<'a> {
    pub fn new(stats: &'a Statistics) -> Self {
        Self { stats }
    }

    pub fn run(&self, mut plan: LogicalPlan) -> Result<LogicalPlan, MiniRelError> {
        validate_statistics(&plan, self.stats)?;
        for node in plan.preorder() {
            self.try_convert(&mut plan, node)?;
        }
        debug!("cartesian-to-join produced:\n{}", plan.pretty());
        Ok(plan)
    }

    fn try_convert(&self, plan: &mut LogicalPlan, node: OpIndex) -> Result<(), MiniRelError> {
        if !matches!(plan.get_operator(node), Some(LogicalOp::Selection(_))) {
            return Ok(());
        }
        // only the top of a chain converts; nodes consumed by an earlier
        // conversion end up detached and are skipped
        if plan.parent(node).is_none() && plan.root() != Some(node) {
            return Ok(());
        }
        if let Some(parent) = plan.parent(node) {
            if matches!(plan.get_operator(parent), Some(LogicalOp::Selection(_))) {
                return Ok(());
            }
        }

        // walk the stacked selection chain down to the product
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
        let below = plan.children(*chain.last().unwrap())[0];
        if !matches!(plan.get_operator(below), Some(LogicalOp::CartesianProduct)) {
            return Ok(());
        }
        let product_children = plan.children(below).to_vec();
        assert_eq!(
            product_children.len(),
            2,
            "product requires exactly two children"
        );

        let mut predicates: Vec<PredicateNode> = Vec::new();
        for sel in &chain {
            if let Some(LogicalOp::Selection(s)) = plan.get_operator(*sel) {
                predicates.extend(s.predicates.iter().cloned());
            }
        }

        let left_attrs = self.attribute_names(plan, product_children[0]);
        let right_attrs = self.attribute_names(plan, product_children[1]);
        let join_op = match (left_attrs, right_attrs) {
            (Some(l), Some(r)) if natural_join_applies(&predicates, &l, &r) => {
                LogicalOp::NaturalJoin
            }
            _ => LogicalOp::ThetaJoin(ThetaJoinNode { predicates }),
        };
        debug!("converting selection chain over product into {}", join_op);

        let join = plan.add_node(join_op);
        plan.set_parent(product_children[0], Some(join));
        plan.set_parent(product_children[1], Some(join));
        plan.replace_subtree(chain[0], join);

        // nested products may now sit directly under further selections
        for n in plan.preorder_from(join) {
            if n != join {
                self.try_convert(plan, n)?;
            }
        }
        Ok(())
    }

    /// Attribute names a side exposes, read from statistics, recursing through
    /// selections and products only. Joins and projections are opaque: no
    /// natural-join upgrade across them.
    fn attribute_names(&self, plan: &LogicalPlan, node: OpIndex) -> Option<BTreeSet<String>> {
        match plan.get_operator(node)? {
            LogicalOp::Relation(r) => Some(
                self.stats
                    .get(&r.name)?
                    .attribute_names()
                    .into_iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
            LogicalOp::Selection(_) => self.attribute_names(plan, plan.children(node)[0]),
            LogicalOp::CartesianProduct => {
                let children = plan.children(node).to_vec();
                let mut left = self.attribute_names(plan, children[0])?;
                let right = self.attribute_names(plan, children[1])?;
                left.extend(right);
                Some(left)
            }
            _ => None,
        }
    }
}

/// A natural join applies when every predicate equates an attribute name with
/// itself across two field references and the equated-name set is exactly the
/// intersection of the two sides' attribute names.
fn natural_join_applies(
    predicates: &[PredicateNode],
    left_attrs: &BTreeSet<String>,
    right_attrs: &BTreeSet<String>,
) -> bool {
    let mut equated = BTreeSet::new();
    for pred in predicates {
        if !pred.is_field_equality() {
            return false;
        }
        let left = pred.left.ident().unwrap();
        let right = pred.right.ident().unwrap();
        if left.column() != right.column() {
            return false;
        }
        equated.insert(left.column().to_string());
    }
    let shared: BTreeSet<String> = left_attrs.intersection(right_attrs).cloned().collect();
    equated == shared
}

#[cfg(test)]
mod test {
    use super::*;
    use common::logical_plan::{RelationNode, SelectionNode};
    use common::statistics::RelationStatistics;
    use common::testutil::*;

    fn ab_stats() -> Statistics {
        let mut stats = Statistics::new();
        stats.insert(
            "A",
            RelationStatistics::new(10)
                .with_attribute("a", 5)
                .with_attribute("b", 2),
        );
        stats.insert(
            "B",
            RelationStatistics::new(20)
                .with_attribute("b", 4)
                .with_attribute("c", 10),
        );
        stats
    }

    /// Selection chain (one node per predicate list) over A x B.
    fn chain_over_product(pred_lists: Vec<Vec<PredicateNode>>) -> LogicalPlan {
        let mut plan = LogicalPlan::new();
        let a = plan.add_node(LogicalOp::Relation(RelationNode {
            name: String::from("A"),
        }));
        let b = plan.add_node(LogicalOp::Relation(RelationNode {
            name: String::from("B"),
        }));
        let product = plan.add_node(LogicalOp::CartesianProduct);
        plan.add_edge(product, a);
        plan.add_edge(product, b);
        let mut top = product;
        for predicates in pred_lists.into_iter().rev() {
            let sel = plan.add_node(LogicalOp::Selection(SelectionNode { predicates }));
            plan.add_edge(sel, top);
            top = sel;
        }
        plan
    }

    #[test]
    fn test_natural_join_detected() {
        // A(a,b), B(b,c), predicate A.b = B.b: shared set {b} equals equated set
        let stats = ab_stats();
        let plan = chain_over_product(vec![vec![pred_eq_fields("A.b", "B.b")]]);
        let plan = CartesianToJoin::new(&stats).run(plan).unwrap();
        let root = plan.root().unwrap();
        match plan.get_operator(root) {
            Some(LogicalOp::NaturalJoin) => (),
            other => panic!("expected natural join, got {:?}", other),
        }
        assert_eq!(plan.children(root).len(), 2);
    }

    #[test]
    fn test_theta_join_when_no_shared_name() {
        // A.a = B.c equates different names: theta join carrying the predicate
        let stats = ab_stats();
        let plan = chain_over_product(vec![vec![pred_eq_fields("A.a", "B.c")]]);
        let plan = CartesianToJoin::new(&stats).run(plan).unwrap();
        let root = plan.root().unwrap();
        match plan.get_operator(root) {
            Some(LogicalOp::ThetaJoin(t)) => {
                assert_eq!(t.predicates.len(), 1);
                assert_eq!(t.predicates[0].to_string(), "A.a = B.c");
            }
            other => panic!("expected theta join, got {:?}", other),
        }
    }

    #[test]
    fn test_literal_predicate_forces_theta() {
        let stats = ab_stats();
        let plan = chain_over_product(vec![vec![
            pred_eq_fields("A.b", "B.b"),
            pred_eq_int("A.a", 3),
        ]]);
        let plan = CartesianToJoin::new(&stats).run(plan).unwrap();
        match plan.get_operator(plan.root().unwrap()) {
            Some(LogicalOp::ThetaJoin(t)) => assert_eq!(t.predicates.len(), 2),
            other => panic!("expected theta join, got {:?}", other),
        }
    }

    #[test]
    fn test_stacked_chain_collapses() {
        // stacked single-predicate selections collapse into one join
        let stats = ab_stats();
        let plan = chain_over_product(vec![
            vec![pred_eq_fields("A.b", "B.b")],
            vec![pred_eq_fields("A.a", "B.c")],
        ]);
        let plan = CartesianToJoin::new(&stats).run(plan).unwrap();
        let root = plan.root().unwrap();
        match plan.get_operator(root) {
            Some(LogicalOp::ThetaJoin(t)) => assert_eq!(t.predicates.len(), 2),
            other => panic!("expected theta join, got {:?}", other),
        }
        // nothing but the join and the two relations remains reachable
        assert_eq!(plan.node_count(), 3);
    }

    #[test]
    fn test_missing_statistics_rejected() {
        let stats = Statistics::new();
        let plan = chain_over_product(vec![vec![pred_eq_fields("A.b", "B.b")]]);
        assert!(CartesianToJoin::new(&stats).run(plan).is_err());
    }

    #[test]
    fn test_nested_products_convert_recursively() {
        let mut stats = ab_stats();
        stats.insert("C", RelationStatistics::new(5).with_attribute("c", 5));
        // Selection(B.c = C.c) over ( Selection(A.b = B.b) over (A x B) ) x C
        let mut plan = LogicalPlan::new();
        let a = plan.add_node(LogicalOp::Relation(RelationNode {
            name: String::from("A"),
        }));
        let b = plan.add_node(LogicalOp::Relation(RelationNode {
            name: String::from("B"),
        }));
        let inner_product = plan.add_node(LogicalOp::CartesianProduct);
        plan.add_edge(inner_product, a);
        plan.add_edge(inner_product, b);
        let inner_sel = plan.add_node(LogicalOp::Selection(SelectionNode {
            predicates: vec![pred_eq_fields("A.b", "B.b")],
        }));
        plan.add_edge(inner_sel, inner_product);
        let c = plan.add_node(LogicalOp::Relation(RelationNode {
            name: String::from("C"),
        }));
        let outer_product = plan.add_node(LogicalOp::CartesianProduct);
        plan.add_edge(outer_product, inner_sel);
        plan.add_edge(outer_product, c);
        let outer_sel = plan.add_node(LogicalOp::Selection(SelectionNode {
            predicates: vec![pred_eq_fields("B.c", "C.c")],
        }));
        plan.add_edge(outer_sel, outer_product);

        let plan = CartesianToJoin::new(&stats).run(plan).unwrap();
        // pre-order: the outer chain converts while its side is still a plain
        // selection-over-product (transparent), then the recursion converts
        // the inner chain, so both become natural joins
        let root = plan.root().unwrap();
        match plan.get_operator(root) {
            Some(LogicalOp::NaturalJoin) => (),
            other => panic!("expected natural join at root, got {:?}", other),
        }
        let inner = plan.children(root)[0];
        match plan.get_operator(inner) {
            Some(LogicalOp::NaturalJoin) => (),
            other => panic!("expected inner natural join, got {:?}", other),
        }
        assert_eq!(plan.node_count(), 5);
    }

    #[test]
    fn test_preexisting_join_side_is_opaque() {
        let mut stats = ab_stats();
        stats.insert("C", RelationStatistics::new(5).with_attribute("c", 5));
        // Selection(B.c = C.c) over ( NaturalJoin(A, B) x C ): the join side's
        // attribute set is unknown to the conversion, so no natural upgrade
        let mut plan = LogicalPlan::new();
        let a = plan.add_node(LogicalOp::Relation(RelationNode {
            name: String::from("A"),
        }));
        let b = plan.add_node(LogicalOp::Relation(RelationNode {
            name: String::from("B"),
        }));
        let join = plan.add_node(LogicalOp::NaturalJoin);
        plan.add_edge(join, a);
        plan.add_edge(join, b);
        let c = plan.add_node(LogicalOp::Relation(RelationNode {
            name: String::from("C"),
        }));
        let product = plan.add_node(LogicalOp::CartesianProduct);
        plan.add_edge(product, join);
        plan.add_edge(product, c);
        let sel = plan.add_node(LogicalOp::Selection(SelectionNode {
            predicates: vec![pred_eq_fields("B.c", "C.c")],
        }));
        plan.add_edge(sel, product);

        let plan = CartesianToJoin::new(&stats).run(plan).unwrap();
        match plan.get_operator(plan.root().unwrap()) {
            Some(LogicalOp::ThetaJoin(t)) => {
                assert_eq!(t.predicates[0].to_string(), "B.c = C.c");
            }
            other => panic!("expected theta join at root, got {:?}", other),
        }
    }
}
