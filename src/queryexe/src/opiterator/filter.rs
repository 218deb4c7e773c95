use super::{check_open, check_unopened, eval_predicates, OpIterator, OpState};
use common::logical_plan::PredicateNode;
use common::{MiniRelError, Tuple};

/// Selection operator: passes through the tuples satisfying an AND list of
/// predicates.
pub struct Filter {
    predicates: Vec<PredicateNode>,
    child: Box<dyn OpIterator>,
    state: OpState,
    rows: u64,
}

impl Filter {
    /// Creates a filter over a child iterator.
    ///
    /// # Arguments
    ///
    /// * `predicates` - AND list to evaluate per tuple.
    /// * `child` - Iterator to filter.
    pub fn new(predicates: Vec<PredicateNode>, child: Box<dyn OpIterator>) -> Self {
        Self {
            predicates,
            child,
            state: OpState::Unopened,
            rows: 0,
        }
    }
}

impl OpIterator for Filter {
    fn open(&mut self) -> Result<(), MiniRelError> {
        check_unopened(self.state, "filter");
        self.child.open()?;
        self.state = OpState::Open;
        self.rows = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, MiniRelError> {
        check_open(self.state, "filter");
        while let Some(tuple) = self.child.next()? {
            if eval_predicates(&tuple, &self.predicates)? {
                self.rows += 1;
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }

    fn close(&mut self) -> Result<(), MiniRelError> {
        check_open(self.state, "filter");
        self.child.close()?;
        self.state = OpState::Closed;
        Ok(())
    }

    fn rewind(&mut self) -> Result<(), MiniRelError> {
        check_open(self.state, "filter");
        self.child.rewind()?;
        self.rows = 0;
        Ok(())
    }

    fn rows_returned(&self) -> u64 {
        self.rows
    }

    fn collect_cardinalities(&self, out: &mut Vec<(String, u64)>) {
        out.push((String::from("Selection"), self.rows));
        self.child.collect_cardinalities(out);
    }
}

#[cfg(test)]
mod test {
    use super::super::TupleIterator;
    use super::*;
    use common::testutil::*;

    #[test]
    fn test_filter_keeps_matching_rows() {
        let tuples = vec![
            int_tuple("Alpha", &["a1"], &[1]),
            int_tuple("Alpha", &["a1"], &[2]),
            int_tuple("Alpha", &["a1"], &[1]),
        ];
        let child = Box::new(TupleIterator::new(tuples));
        let mut filter = Filter::new(vec![pred_eq_int("Alpha.a1", 1)], child);
        filter.open().unwrap();
        let mut seen = 0;
        while let Some(t) = filter.next().unwrap() {
            assert_eq!(t.values()[0].unwrap_int_field(), 1);
            seen += 1;
        }
        assert_eq!(seen, 2);
        assert_eq!(filter.rows_returned(), 2);
        filter.close().unwrap();
    }

    #[test]
    fn test_filter_resolution_miss_drops_rows_only() {
        // predicate field matches nothing: rows drop, query survives
        let tuples = vec![int_tuple("Alpha", &["a1"], &[1])];
        let child = Box::new(TupleIterator::new(tuples));
        let mut filter = Filter::new(vec![pred_eq_int("missing", 1)], child);
        filter.open().unwrap();
        assert!(filter.next().unwrap().is_none());
        assert_eq!(filter.rows_returned(), 0);
        filter.close().unwrap();
    }
}
