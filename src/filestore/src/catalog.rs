use crate::relation_file::RelationFile;
use common::statistics::{RelationStatistics, Statistics};
use common::{Attribute, DataType, Field, MiniRelError, TableSchema};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Name of the schema file inside a data directory.
pub const SCHEMA_FILE: &str = "Schema";

/// Catalog over a data directory: relation schemas parsed from the `Schema`
/// file, one relation record file per catalogued name.
pub struct FileCatalog {
    base_dir: PathBuf,
    schemas: HashMap<String, TableSchema>,
}

impl FileCatalog {
    /// Loads the catalog from a data directory.
    ///
    /// The `Schema` file holds one relation per line in the form
    /// `Name(attr:INT,attr2:STR)`; blank lines are skipped.
    ///
    /// # Arguments
    ///
    /// * `base_dir` - Directory holding the schema and relation files.
    pub fn load(base_dir: &Path) -> Result<Self, MiniRelError> {
        let path = base_dir.join(SCHEMA_FILE);
        let file = File::open(&path)?;
        let mut schemas = HashMap::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let (name, schema) = Self::parse_schema_line(trimmed)?;
            schemas.insert(name, schema);
        }
        info!(
            "filestore loaded {} relation schemas from {:?}",
            schemas.len(),
            path
        );
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            schemas,
        })
    }

    /// Parses one `Name(attr:INT,attr2:STR)` schema line.
    fn parse_schema_line(line: &str) -> Result<(String, TableSchema), MiniRelError> {
        let err = || MiniRelError::ValidationError(format!("Can't parse schema line '{}'", line));
        let open = line.find('(').ok_or_else(|| err())?;
        if !line.ends_with(')') {
            return Err(err());
        }
        let name = line[..open].trim();
        if name.is_empty() {
            return Err(err());
        }
        let body = &line[open + 1..line.len() - 1];
        let mut attrs = Vec::new();
        for part in body.split(',') {
            let mut pieces = part.splitn(2, ':');
            let attr_name = match pieces.next().map(str::trim) {
                Some(s) if !s.is_empty() => s,
                _ => return Err(err()),
            };
            let dtype = match pieces.next().map(str::trim) {
                Some("INT") => DataType::Int,
                Some("STR") => DataType::String,
                _ => return Err(err()),
            };
            attrs.push(Attribute::new(attr_name.to_string(), dtype));
        }
        Ok((name.to_string(), TableSchema::new(attrs)))
    }

    /// Checks if the relation is catalogued.
    ///
    /// # Arguments
    ///
    /// * `name` - Relation name to check.
    pub fn is_valid_table(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Checks if the column is valid for the given relation.
    ///
    /// # Arguments
    ///
    /// * `name` - Relation to look for the column in.
    /// * `column` - Column name to look for.
    pub fn is_valid_column(&self, name: &str, column: &str) -> bool {
        match self.schemas.get(name) {
            Some(schema) => schema.contains(column),
            None => false,
        }
    }

    /// Gets the schema of a relation.
    ///
    /// # Arguments
    ///
    /// * `name` - Relation to get the schema for.
    pub fn get_table_schema(&self, name: &str) -> Result<TableSchema, MiniRelError> {
        match self.schemas.get(name) {
            Some(schema) => Ok(schema.clone()),
            None => Err(MiniRelError::MiniRelError(String::from("Table not found"))),
        }
    }

    /// Names of the catalogued relations.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(|s| s.as_str())
    }

    /// Handle to the record file of a catalogued relation.
    ///
    /// # Arguments
    ///
    /// * `name` - Relation to get the file handle for.
    pub fn relation_file(&self, name: &str) -> Result<RelationFile, MiniRelError> {
        let schema = self.get_table_schema(name)?;
        Ok(RelationFile::new(name, self.base_dir.join(name), schema))
    }

    /// Computes statistics with a full scan per relation: total rows plus
    /// per-attribute distinct counts.
    pub fn compute_statistics(&self) -> Result<Statistics, MiniRelError> {
        let mut stats = Statistics::new();
        for (name, schema) in self.schemas.iter() {
            let mut total = 0u64;
            let mut distinct: Vec<HashSet<Field>> = vec![HashSet::new(); schema.size()];
            let mut reader = self.relation_file(name)?.open()?;
            while let Some(tuple) = reader.next_tuple()? {
                total += 1;
                for (i, value) in tuple.values().iter().enumerate() {
                    distinct[i].insert(value.clone());
                }
            }
            let mut relation_stats = RelationStatistics::new(total);
            for (i, attr) in schema.attributes().enumerate() {
                relation_stats.set_distinct(attr.name(), distinct[i].len() as u64);
            }
            info!("filestore statistics for {}: {} rows", name, total);
            stats.insert(name, relation_stats);
        }
        Ok(stats)
    }
}
