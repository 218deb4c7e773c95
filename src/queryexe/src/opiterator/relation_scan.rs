use super::{check_open, check_unopened, OpIterator, OpState};
use common::{MiniRelError, Tuple};
use filestore::{RelationFile, TupleReader};

/// Sequential scan over one stored relation. The read stream is acquired on
/// open and released on close; rewinding acquires a fresh stream.
pub struct RelationScan {
    file: RelationFile,
    reader: Option<TupleReader>,
    state: OpState,
    rows: u64,
}

impl RelationScan {
    /// Creates a scan over the given relation file.
    ///
    /// # Arguments
    ///
    /// * `file` - Relation file handle, schema included.
    pub fn new(file: RelationFile) -> Self {
        Self {
            file,
            reader: None,
            state: OpState::Unopened,
            rows: 0,
        }
    }
}

impl OpIterator for RelationScan {
    fn open(&mut self) -> Result<(), MiniRelError> {
        check_unopened(self.state, "relation scan");
        debug!("opening scan of {}", self.file.name());
        self.reader = Some(self.file.open()?);
        self.state = OpState::Open;
        self.rows = 0;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, MiniRelError> {
        check_open(self.state, "relation scan");
        match self.reader.as_mut().unwrap().next_tuple()? {
            Some(tuple) => {
                self.rows += 1;
                Ok(Some(tuple))
            }
            None => Ok(None),
        }
    }

    fn close(&mut self) -> Result<(), MiniRelError> {
        check_open(self.state, "relation scan");
        self.reader = None;
        self.state = OpState::Closed;
        Ok(())
    }

    fn rewind(&mut self) -> Result<(), MiniRelError> {
        check_open(self.state, "relation scan");
        self.reader = Some(self.file.open()?);
        self.rows = 0;
        Ok(())
    }

    fn rows_returned(&self) -> u64 {
        self.rows
    }

    fn collect_cardinalities(&self, out: &mut Vec<(String, u64)>) {
        out.push((format!("RelationScan({})", self.file.name()), self.rows));
    }
}
