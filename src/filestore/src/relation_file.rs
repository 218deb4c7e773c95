use common::logical_plan::FieldIdentifier;
use common::{DataType, Field, MiniRelError, TableSchema, Tuple};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::PathBuf;

/// Field delimiter used by relation files.
pub const FIELD_DELIMITER: u8 = b'#';

/// Handle to one stored relation: a flat file of delimiter-separated records
/// in schema order, one record per line, no header and no escaping.
#[derive(Debug, Clone)]
pub struct RelationFile {
    name: String,
    path: PathBuf,
    schema: TableSchema,
}

impl RelationFile {
    /// Creates a handle for a relation file.
    ///
    /// # Arguments
    ///
    /// * `name` - Relation name; qualifies every scanned column.
    /// * `path` - Location of the record file.
    /// * `schema` - Ordered attributes used to type the record fields.
    pub fn new(name: &str, path: PathBuf, schema: TableSchema) -> Self {
        Self {
            name: name.to_string(),
            path,
            schema,
        }
    }

    /// Returns the relation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the relation schema.
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Acquires a fresh read stream over the relation's records.
    pub fn open(&self) -> Result<TupleReader, MiniRelError> {
        debug!("filestore opening relation file {:?}", self.path);
        let file = File::open(&self.path)?;
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(FIELD_DELIMITER)
            .from_reader(file);
        Ok(TupleReader {
            relation: self.name.clone(),
            schema: self.schema.clone(),
            reader,
        })
    }
}

/// Read stream over one relation file, yielding typed tuples.
pub struct TupleReader {
    relation: String,
    schema: TableSchema,
    reader: csv::Reader<File>,
}

impl TupleReader {
    /// Reads the next record as a typed tuple, or None at end of file.
    pub fn next_tuple(&mut self) -> Result<Option<Tuple>, MiniRelError> {
        let mut record = csv::StringRecord::new();
        let has_record = self
            .reader
            .read_record(&mut record)
            .map_err(|e| MiniRelError::IOError(format!("relation {}: {}", self.relation, e)))?;
        if !has_record {
            return Ok(None);
        }
        if record.len() != self.schema.size() {
            return Err(MiniRelError::IOError(format!(
                "relation {}: record has {} fields, schema has {}",
                self.relation,
                record.len(),
                self.schema.size()
            )));
        }
        let mut tuple = Tuple::empty();
        for (attr, raw) in self.schema.attributes().zip(record.iter()) {
            let value = match attr.dtype() {
                DataType::Int => {
                    let parsed = raw.trim().parse::<i32>().map_err(|_| {
                        MiniRelError::IOError(format!(
                            "relation {}: bad int value '{}' for {}",
                            self.relation,
                            raw,
                            attr.name()
                        ))
                    })?;
                    Field::IntField(parsed)
                }
                DataType::String => Field::StringField(raw.to_string()),
            };
            tuple.push(FieldIdentifier::new(&self.relation, attr.name()), value);
        }
        Ok(Some(tuple))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::setup_data_dir;
    use crate::FileCatalog;

    #[test]
    fn test_read_typed_tuples() {
        let dir = setup_data_dir(
            &["Alpha(a1:INT,a2:STR)"],
            &[("Alpha", &["3#x", "4#y"])],
        );
        let catalog = FileCatalog::load(&dir).unwrap();
        let mut reader = catalog.relation_file("Alpha").unwrap().open().unwrap();
        let first = reader.next_tuple().unwrap().unwrap();
        assert_eq!(
            first.get(&FieldIdentifier::new("Alpha", "a1")),
            Some(&Field::IntField(3))
        );
        assert_eq!(
            first.get(&FieldIdentifier::new("Alpha", "a2")),
            Some(&Field::StringField(String::from("x")))
        );
        let second = reader.next_tuple().unwrap().unwrap();
        assert_eq!(second.values()[0], Field::IntField(4));
        assert!(reader.next_tuple().unwrap().is_none());
    }

    #[test]
    fn test_bad_int_value() {
        let dir = setup_data_dir(&["Alpha(a1:INT)"], &[("Alpha", &["zap"])]);
        let catalog = FileCatalog::load(&dir).unwrap();
        let mut reader = catalog.relation_file("Alpha").unwrap().open().unwrap();
        assert!(reader.next_tuple().is_err());
    }

    #[test]
    fn test_missing_relation_file() {
        let dir = setup_data_dir(&["Alpha(a1:INT)"], &[]);
        let catalog = FileCatalog::load(&dir).unwrap();
        assert!(catalog.relation_file("Alpha").unwrap().open().is_err());
    }
}
