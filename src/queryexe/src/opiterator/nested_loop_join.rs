use super::{check_open, check_unopened, eval_predicates, OpIterator, OpState};
use common::logical_plan::PredicateNode;
use common::{MiniRelError, Tuple};

/// Nested loop join: for every left tuple the right child is fully
/// re-iterated; each merged pair (right keys win on collision) is tested
/// against the join predicates.
pub struct NestedLoopJoin {
    predicates: Vec<PredicateNode>,
    left: Box<dyn OpIterator>,
    right: Box<dyn OpIterator>,
    current_left: Option<Tuple>,
    state: OpState,
    rows: u64,
}

impl NestedLoopJoin {
    /// Creates a join of two child iterators.
    ///
    /// # Arguments
    ///
    /// * `predicates` - Join predicates, tested against the merged tuple.
    /// * `left` - Driving child.
    /// * `right` - Child re-iterated per left tuple.
    pub fn new(
        predicates: Vec<PredicateNode>,
        left: Box<dyn OpIterator>,
        right: Box<dyn OpIterator>,
    ) -> Self {
        Self {
            predicates,
            left,
            right,
            current_left: None,
            state: OpState::Unopened,
            rows: 0,
        }
    }
}

impl OpIterator for NestedLoopJoin {
    fn open(&mut self) -> Result<(), MiniRelError> {
        check_unopened(self.state, "nested loop join");
        self.left.open()?;
        self.right.open()?;
        self.state = OpState::Open;
        self.current_left = None;
        self.rows = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, MiniRelError> {
        check_open(self.state, "nested loop join");
        loop {
            if self.current_left.is_none() {
                match self.left.next()? {
                    Some(tuple) => {
                        self.current_left = Some(tuple);
                        self.right.rewind()?;
                    }
                    None => return Ok(None),
                }
            }
            match self.right.next()? {
                Some(right) => {
                    let merged = self.current_left.as_ref().unwrap().merge(&right);
                    if eval_predicates(&merged, &self.predicates)? {
                        self.rows += 1;
                        return Ok(Some(merged));
                    }
                }
                None => self.current_left = None,
            }
        }
    }

    fn close(&mut self) -> Result<(), MiniRelError> {
        check_open(self.state, "nested loop join");
        self.left.close()?;
        self.state = OpState::Closed;
        Ok(())
    }

    fn rewind(&mut self) -> Result<(), MiniRelError> {
        check_open(self.state, "nested loop join");
        self.left.rewind()?;
        self.right.rewind()?;
        self.current_left = None;
        self.rows = 0;
        Ok(())
    }

    fn rows_returned(&self) -> u64 {
        self.rows
    }

    fn collect_cardinalities(&self, out: &mut Vec<(String, u64)>) {
        out.push((String::from("NestedLoopJoin"), self.rows));
        self.left.collect_cardinalities(out);
        self.right.collect_cardinalities(out);
    }
}
