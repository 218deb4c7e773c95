use crate::opiterator::*;
use common::logical_plan::*;
use common::{MiniRelError, QueryResult, Tuple};
use filestore::FileCatalog;

/// Manages the execution of queries: converts a LogicalPlan to a tree of
/// OpIterators and runs it, collecting the result tuples and the pre-order
/// cost trace of per-operator observed cardinalities.
pub struct Executor {
    /// Executor state
    pub plan: Option<Box<dyn OpIterator>>,
}

impl Executor {
    /// Initializes an executor with no query configured.
    pub fn new_ref() -> Self {
        Self { plan: None }
    }

    /// Sets the physical plan to run.
    ///
    /// # Arguments
    ///
    /// * `physical_plan` - Root of the OpIterator tree.
    pub fn configure_query(&mut self, physical_plan: Box<dyn OpIterator>) {
        self.plan = Some(physical_plan);
    }

    /// Opens the physical plan iterator to begin execution.
    pub fn start(&mut self) -> Result<(), MiniRelError> {
        self.plan.as_mut().unwrap().open()
    }

    /// Returns the next tuple or None if there is no such tuple.
    ///
    /// # Panics
    ///
    /// Panics if the physical plan iterator is closed or unopened.
    pub fn next(&mut self) -> Result<Option<Tuple>, MiniRelError> {
        self.plan.as_mut().unwrap().next()
    }

    /// Closes the physical plan iterator.
    pub fn close(&mut self) -> Result<(), MiniRelError> {
        self.plan.as_mut().unwrap().close()
    }

    /// Consumes the physical plan iterator and stores the result in a
    /// QueryResult, cost trace included.
    pub fn execute(&mut self) -> Result<QueryResult, MiniRelError> {
        let mut tuples = Vec::new();
        self.start()?;
        while let Some(tuple) = self.next()? {
            tuples.push(tuple);
        }
        self.close()?;
        let mut cardinalities = Vec::new();
        self.plan
            .as_ref()
            .unwrap()
            .collect_cardinalities(&mut cardinalities);
        debug!("query produced {} tuples", tuples.len());
        Ok(QueryResult::new(tuples, cardinalities))
    }

    /// Converts a logical plan to a physical plan of op iterators.
    ///
    /// # Arguments
    ///
    /// * `catalog` - Catalog resolving relation names to files and schemas.
    /// * `lp` - Logical plan of the query.
    ///
    /// # Panics
    ///
    /// Panics on structural precondition violations: wrong operator arity,
    /// or a raw NaturalJoin that no join-order pass lowered.
    pub fn logical_plan_to_op_iterator(
        catalog: &FileCatalog,
        lp: &LogicalPlan,
    ) -> Result<Box<dyn OpIterator>, MiniRelError> {
        let start = lp
            .root()
            .ok_or_else(|| MiniRelError::ExecutionError(String::from("No root node")))?;
        Executor::logical_plan_to_op_iterator_helper(catalog, lp, start)
    }

    /// Recursive helper converting the node `start` and everything below it.
    fn logical_plan_to_op_iterator_helper(
        catalog: &FileCatalog,
        lp: &LogicalPlan,
        start: OpIndex,
    ) -> Result<Box<dyn OpIterator>, MiniRelError> {
        let err = MiniRelError::ExecutionError(String::from("Malformed logical plan"));
        let children: Vec<OpIndex> = lp.edges(start).collect();
        let op = lp.get_operator(start).ok_or_else(|| err.clone())?;
        match op {
            LogicalOp::Relation(RelationNode { name }) => {
                assert!(children.is_empty(), "relation is a leaf operator");
                let file = catalog.relation_file(name)?;
                Ok(Box::new(RelationScan::new(file)))
            }
            LogicalOp::Projection(ProjectionNode { fields }) => {
                assert_eq!(children.len(), 1, "projection requires exactly one child");
                let child =
                    Executor::logical_plan_to_op_iterator_helper(catalog, lp, children[0])?;
                Ok(Box::new(ProjectIterator::new(fields.clone(), child)))
            }
            LogicalOp::Selection(SelectionNode { predicates }) => {
                assert_eq!(children.len(), 1, "selection requires exactly one child");
                let child =
                    Executor::logical_plan_to_op_iterator_helper(catalog, lp, children[0])?;
                Ok(Box::new(Filter::new(predicates.clone(), child)))
            }
            LogicalOp::CartesianProduct => {
                assert_eq!(children.len(), 2, "product requires exactly two children");
                let left = Executor::logical_plan_to_op_iterator_helper(catalog, lp, children[0])?;
                let right =
                    Executor::logical_plan_to_op_iterator_helper(catalog, lp, children[1])?;
                Ok(Box::new(CrossProduct::new(left, right)))
            }
            LogicalOp::ThetaJoin(ThetaJoinNode { predicates }) => {
                assert_eq!(children.len(), 2, "join requires exactly two children");
                let left = Executor::logical_plan_to_op_iterator_helper(catalog, lp, children[0])?;
                let right =
                    Executor::logical_plan_to_op_iterator_helper(catalog, lp, children[1])?;
                Ok(Box::new(NestedLoopJoin::new(
                    predicates.clone(),
                    left,
                    right,
                )))
            }
            LogicalOp::NaturalJoin => {
                panic!("unlowered NaturalJoin reached translate; run a join-order pass first")
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use common::logical_plan::LogicalPlan;
    use common::Field;
    use filestore::testutil::setup_data_dir;

    fn alpha_beta_catalog() -> FileCatalog {
        let dir = setup_data_dir(
            &["Alpha(a1:INT,a2:STR)", "Beta(b1:INT)"],
            &[("Alpha", &["3#x"]), ("Beta", &["3"])],
        );
        FileCatalog::load(&dir).unwrap()
    }

    /// Selection(a1 = b1) over CartesianProduct(Alpha, Beta), fields
    /// unqualified as an upstream adapter may leave them.
    fn selection_over_product() -> LogicalPlan {
        use common::testutil::pred_eq_fields;
        let mut lp = LogicalPlan::new();
        let alpha = lp.add_node(LogicalOp::Relation(RelationNode {
            name: String::from("Alpha"),
        }));
        let beta = lp.add_node(LogicalOp::Relation(RelationNode {
            name: String::from("Beta"),
        }));
        let product = lp.add_node(LogicalOp::CartesianProduct);
        lp.add_edge(product, alpha);
        lp.add_edge(product, beta);
        let sel = lp.add_node(LogicalOp::Selection(SelectionNode {
            predicates: vec![pred_eq_fields("a1", "b1")],
        }));
        lp.add_edge(sel, product);
        lp
    }

    #[test]
    fn test_execute_selection_over_product() {
        let catalog = alpha_beta_catalog();
        let lp = selection_over_product();
        let op = Executor::logical_plan_to_op_iterator(&catalog, &lp).unwrap();
        let mut executor = Executor::new_ref();
        executor.configure_query(op);
        let result = executor.execute().unwrap();
        assert_eq!(result.tuples().len(), 1);
        let row = &result.tuples()[0];
        assert_eq!(
            row.get(&FieldIdentifier::new("Alpha", "a1")),
            Some(&Field::IntField(3))
        );
        assert_eq!(
            row.get(&FieldIdentifier::new("Alpha", "a2")),
            Some(&Field::StringField(String::from("x")))
        );
        assert_eq!(
            row.get(&FieldIdentifier::new("Beta", "b1")),
            Some(&Field::IntField(3))
        );
        // pre-order trace: selection, product, then the two scans
        let labels: Vec<&str> = result
            .cardinalities()
            .iter()
            .map(|(l, _)| l.as_str())
            .collect();
        assert_eq!(
            labels,
            vec![
                "Selection",
                "CartesianProduct",
                "RelationScan(Alpha)",
                "RelationScan(Beta)"
            ]
        );
        let rows: Vec<u64> = result.cardinalities().iter().map(|(_, r)| *r).collect();
        assert_eq!(rows, vec![1, 1, 1, 1]);
    }

    #[test]
    #[should_panic(expected = "unlowered NaturalJoin")]
    fn test_raw_natural_join_panics() {
        let catalog = alpha_beta_catalog();
        let mut lp = LogicalPlan::new();
        let alpha = lp.add_node(LogicalOp::Relation(RelationNode {
            name: String::from("Alpha"),
        }));
        let beta = lp.add_node(LogicalOp::Relation(RelationNode {
            name: String::from("Beta"),
        }));
        let join = lp.add_node(LogicalOp::NaturalJoin);
        lp.add_edge(join, alpha);
        lp.add_edge(join, beta);
        let _ = Executor::logical_plan_to_op_iterator(&catalog, &lp);
    }

    #[test]
    #[should_panic(expected = "exactly one child")]
    fn test_wrong_arity_panics() {
        let catalog = alpha_beta_catalog();
        let mut lp = LogicalPlan::new();
        lp.add_node(LogicalOp::Selection(SelectionNode {
            predicates: vec![],
        }));
        let _ = Executor::logical_plan_to_op_iterator(&catalog, &lp);
    }

    #[test]
    fn test_missing_table_is_error() {
        let catalog = alpha_beta_catalog();
        let mut lp = LogicalPlan::new();
        lp.add_node(LogicalOp::Relation(RelationNode {
            name: String::from("Nope"),
        }));
        assert!(Executor::logical_plan_to_op_iterator(&catalog, &lp).is_err());
    }
}
