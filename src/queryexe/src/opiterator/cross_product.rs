use super::{check_open, check_unopened, OpIterator, OpState};
use common::{MiniRelError, Tuple};

/// Cartesian product: the unfiltered merge of every left/right tuple pair.
///
/// The left child drives; the right child is fully re-iterated (via rewind)
/// for every left tuple. Open recurses into both children; close follows the
/// driving chain only, so the right child's resources release on drop.
pub struct CrossProduct {
    left: Box<dyn OpIterator>,
    right: Box<dyn OpIterator>,
    current_left: Option<Tuple>,
    state: OpState,
    rows: u64,
}

impl CrossProduct {
    /// Creates a product of two child iterators.
    pub fn new(left: Box<dyn OpIterator>, right: Box<dyn OpIterator>) -> Self {
        Self {
            left,
            right,
            current_left: None,
            state: OpState::Unopened,
            rows: 0,
        }
    }
}

impl OpIterator for CrossProduct {
    fn open(&mut self) -> Result<(), MiniRelError> {
        check_unopened(self.state, "cross product");
        self.left.open()?;
        self.right.open()?;
        self.state = OpState::Open;
        self.current_left = None;
        self.rows = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, MiniRelError> {
        check_open(self.state, "cross product");
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
                    self.rows += 1;
                    return Ok(Some(merged));
                }
                None => self.current_left = None,
            }
        }
    }

    fn close(&mut self) -> Result<(), MiniRelError> {
        check_open(self.state, "cross product");
        self.left.close()?;
        self.state = OpState::Closed;
        Ok(())
    }

    fn rewind(&mut self) -> Result<(), MiniRelError> {
        check_open(self.state, "cross product");
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
        out.push((String::from("CartesianProduct"), self.rows));
        self.left.collect_cardinalities(out);
        self.right.collect_cardinalities(out);
    }
}
