use super::{check_open, check_unopened, OpIterator, OpState};
use common::{MiniRelError, Tuple};

/// Iterator over an in-memory tuple list. Handy as a plan leaf in tests.
pub struct TupleIterator {
    tuples: Vec<Tuple>,
    index: usize,
    state: OpState,
    rows: u64,
}

impl TupleIterator {
    /// Creates an iterator over the given tuples.
    ///
    /// # Arguments
    ///
    /// * `tuples` - Tuples to yield, in order.
    pub fn new(tuples: Vec<Tuple>) -> Self {
        Self {
            tuples,
            index: 0,
            state: OpState::Unopened,
            rows: 0,
        }
    }
}

impl OpIterator for TupleIterator {
    fn open(&mut self) -> Result<(), MiniRelError> {
        check_unopened(self.state, "tuple iterator");
        self.state = OpState::Open;
        self.index = 0;
        self.rows = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, MiniRelError> {
        check_open(self.state, "tuple iterator");
        match self.tuples.get(self.index) {
            Some(tuple) => {
                self.index += 1;
                self.rows += 1;
                Ok(Some(tuple.clone()))
            }
            None => Ok(None),
        }
    }

    fn close(&mut self) -> Result<(), MiniRelError> {
        check_open(self.state, "tuple iterator");
        self.state = OpState::Closed;
        Ok(())
    }

    fn rewind(&mut self) -> Result<(), MiniRelError> {
        check_open(self.state, "tuple iterator");
        self.index = 0;
        self.rows = 0;
        Ok(())
    }

    fn rows_returned(&self) -> u64 {
        self.rows
    }

    fn collect_cardinalities(&self, out: &mut Vec<(String, u64)>) {
        out.push((String::from("TupleIterator"), self.rows));
    }
}
