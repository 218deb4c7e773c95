use super::{check_open, check_unopened, OpIterator, OpState};
use common::logical_plan::FieldIdentifier;
use common::{MiniRelError, Tuple};

/// Projection operator. An empty field list keeps every attribute.
pub struct ProjectIterator {
    fields: Vec<FieldIdentifier>,
    child: Box<dyn OpIterator>,
    state: OpState,
    rows: u64,
}

impl ProjectIterator {
    /// Creates a projection over a child iterator.
    ///
    /// # Arguments
    ///
    /// * `fields` - Fields to keep; empty keeps all.
    /// * `child` - Iterator to project.
    pub fn new(fields: Vec<FieldIdentifier>, child: Box<dyn OpIterator>) -> Self {
        Self {
            fields,
            child,
            state: OpState::Unopened,
            rows: 0,
        }
    }

    fn project(&self, tuple: Tuple) -> Tuple {
        if self.fields.is_empty() {
            return tuple;
        }
        let mut out = Tuple::empty();
        for (col, val) in tuple.columns().iter().zip(tuple.values().iter()) {
            if self.fields.iter().any(|f| f == col) {
                out.push(col.clone(), val.clone());
            }
        }
        out
    }
}

impl OpIterator for ProjectIterator {
    fn open(&mut self) -> Result<(), MiniRelError> {
        check_unopened(self.state, "projection");
        self.child.open()?;
        self.state = OpState::Open;
        self.rows = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, MiniRelError> {
        check_open(self.state, "projection");
        match self.child.next()? {
            Some(tuple) => {
                self.rows += 1;
                Ok(Some(self.project(tuple)))
            }
            None => Ok(None),
        }
    }

    fn close(&mut self) -> Result<(), MiniRelError> {
        check_open(self.state, "projection");
        self.child.close()?;
        self.state = OpState::Closed;
        Ok(())
    }

    fn rewind(&mut self) -> Result<(), MiniRelError> {
        check_open(self.state, "projection");
        self.child.rewind()?;
        self.rows = 0;
        Ok(())
    }

    fn rows_returned(&self) -> u64 {
        self.rows
    }

    fn collect_cardinalities(&self, out: &mut Vec<(String, u64)>) {
        out.push((String::from("Projection"), self.rows));
        self.child.collect_cardinalities(out);
    }
}

#[cfg(test)]
mod test {
    use super::super::TupleIterator;
    use super::*;
    use common::testutil::*;

    #[test]
    fn test_projects_requested_fields() {
        let tuples = vec![int_tuple("Alpha", &["a1", "a2", "a3"], &[1, 2, 3])];
        let child = Box::new(TupleIterator::new(tuples));
        // unqualified request wildcard-matches the qualified columns
        let fields = vec![
            FieldIdentifier::unqualified("a1"),
            FieldIdentifier::parse("Alpha.a3"),
        ];
        let mut project = ProjectIterator::new(fields, child);
        project.open().unwrap();
        let t = project.next().unwrap().unwrap();
        assert_eq!(t.size(), 2);
        assert_eq!(t.columns()[0], FieldIdentifier::new("Alpha", "a1"));
        assert_eq!(t.columns()[1], FieldIdentifier::new("Alpha", "a3"));
        project.close().unwrap();
    }

    #[test]
    fn test_empty_field_list_keeps_all() {
        let tuples = vec![int_tuple("Alpha", &["a1", "a2"], &[1, 2])];
        let child = Box::new(TupleIterator::new(tuples));
        let mut project = ProjectIterator::new(vec![], child);
        project.open().unwrap();
        let t = project.next().unwrap().unwrap();
        assert_eq!(t.size(), 2);
        project.close().unwrap();
    }
}
