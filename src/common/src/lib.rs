#[macro_use]
extern crate serde;
extern crate log;

use sqlparser::ast;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::io;
pub mod logical_plan;
pub mod plan_tree;
pub mod statistics;
pub mod testutil;
pub use logical_plan::{FieldIdentifier, PredExpr, PredicateNode, PredicateOp};

/// Custom error type.
#[derive(Debug, Clone, PartialEq)]
pub enum MiniRelError {
    /// IO Errors.
    IOError(String),
    /// Custom errors.
    MiniRelError(String),
    /// Validation errors.
    ValidationError(String),
    /// Execution errors.
    ExecutionError(String),
    /// Optimization errors.
    OptimizationError(String),
}

impl fmt::Display for MiniRelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                MiniRelError::ValidationError(s) => format!("Validation Error: {}", s),
                MiniRelError::ExecutionError(s) => format!("Execution Error: {}", s),
                MiniRelError::OptimizationError(s) => format!("Optimization Error: {}", s),
                MiniRelError::MiniRelError(s) => format!("MiniRel Error: {}", s),
                MiniRelError::IOError(s) => s.to_string(),
            }
        )
    }
}

// Implement std::convert::From for MiniRelError; from io::Error
impl From<io::Error> for MiniRelError {
    fn from(error: io::Error) -> Self {
        MiniRelError::IOError(error.to_string())
    }
}

impl Error for MiniRelError {}

/// Return type for a query result.
///
/// Carries the result tuples in output order plus the pre-order sequence of
/// per-operator observed cardinalities recorded during execution.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    tuples: Vec<Tuple>,
    cardinalities: Vec<(String, u64)>,
}

impl QueryResult {
    /// Return a result with the given tuples and cost trace.
    ///
    /// # Arguments
    ///
    /// * `tuples` - Result tuples in output order.
    /// * `cardinalities` - Per-operator observed row counts, pre-order.
    pub fn new(tuples: Vec<Tuple>, cardinalities: Vec<(String, u64)>) -> Self {
        Self {
            tuples,
            cardinalities,
        }
    }

    /// Get the result tuples.
    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    /// Get the cost trace.
    pub fn cardinalities(&self) -> &[(String, u64)] {
        &self.cardinalities
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = match self.tuples.first() {
            Some(t) => t,
            None => return Ok(()),
        };
        let width = first
            .columns()
            .iter()
            .map(|c| c.to_string().len())
            .max()
            .unwrap_or(10)
            + 2;
        let mut res = String::new();
        for col in first.columns() {
            let s = format!("{:width$}", col.to_string(), width = width);
            res += &s;
        }
        res += "\n";
        for t in &self.tuples {
            for v in t.values() {
                let s = format!("{:width$}", v.to_string(), width = width);
                res += &s;
            }
            res += "\n";
        }
        write!(f, "{}", res)
    }
}

/// Handle schemas.
#[derive(PartialEq, Clone, Debug)]
pub struct TableSchema {
    /// Attributes of the schema.
    attributes: Vec<Attribute>,
    /// Mapping from attribute name to order in the schema.
    name_map: HashMap<String, usize>,
}

impl TableSchema {
    /// Create a new schema.
    ///
    /// # Arguments
    ///
    /// * `attributes` - Attributes of the schema in the order that they are in the schema.
    pub fn new(attributes: Vec<Attribute>) -> Self {
        let mut name_map = HashMap::new();
        for (i, attr) in attributes.iter().enumerate() {
            name_map.insert(attr.name().to_string(), i);
        }
        Self {
            attributes,
            name_map,
        }
    }

    /// Create a new schema with the given names and dtypes.
    ///
    /// # Arguments
    ///
    /// * `names` - Names of the new schema.
    /// * `dtypes` - Dtypes of the new schema.
    pub fn from_vecs(names: Vec<&str>, dtypes: Vec<DataType>) -> Self {
        let mut attrs = Vec::new();
        for (name, dtype) in names.iter().zip(dtypes.iter()) {
            attrs.push(Attribute::new(name.to_string(), dtype.clone()));
        }
        TableSchema::new(attrs)
    }

    /// Get the attribute from the given index.
    ///
    /// # Arguments
    ///
    /// * `i` - Index of the attribute to look for.
    pub fn get_attribute(&self, i: usize) -> Option<&Attribute> {
        self.attributes.get(i)
    }

    /// Get the index of the attribute.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the attribute to get the index for.
    pub fn get_field_index(&self, name: &str) -> Option<&usize> {
        self.name_map.get(name)
    }

    /// Check if the attribute name is in the schema.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the attribute to look for.
    pub fn contains(&self, name: &str) -> bool {
        self.name_map.contains_key(name)
    }

    /// Get an iterator of the attributes.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// Returns the length of the schema.
    pub fn size(&self) -> usize {
        self.attributes.len()
    }
}

/// Handle attributes. Pairs the name with the dtype.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,
    /// Attribute dtype.
    pub dtype: DataType,
}

impl Attribute {
    /// Create a new attribute with the given name and dtype.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the attribute.
    /// * `dtype` - Dtype of the attribute.
    pub fn new(name: String, dtype: DataType) -> Self {
        Self { name, dtype }
    }

    /// Returns the name of the attribute.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the dtype of the attribute.
    pub fn dtype(&self) -> &DataType {
        &self.dtype
    }
}

/// Enumerate the supported dtypes.
#[derive(PartialEq, Serialize, Deserialize, Clone, Debug)]
pub enum DataType {
    Int,
    String,
}

/// For each of the dtypes, make sure that there is a corresponding field type.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, PartialOrd, Ord, Clone, Hash)]
pub enum Field {
    IntField(i32),
    StringField(String),
}

impl Field {
    /// Unwraps integer fields.
    pub fn unwrap_int_field(&self) -> i32 {
        match self {
            Field::IntField(i) => *i,
            _ => panic!("Expected i32"),
        }
    }

    /// Unwraps string fields.
    pub fn unwrap_string_field(&self) -> &str {
        match self {
            Field::StringField(s) => &s,
            _ => panic!("Expected String"),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::IntField(x) => write!(f, "{}", x),
            Field::StringField(x) => write!(f, "{}", x),
        }
    }
}

/// Tuple type.
///
/// An ordered mapping from attribute references to scalar values. Lookups are
/// linear: FieldIdentifier equality is only PartialEq (wildcard matching is
/// not transitive), so positions cannot be hashed.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    /// Attribute reference per value, in output order.
    columns: Vec<FieldIdentifier>,
    /// Tuple data.
    values: Vec<Field>,
}

impl Tuple {
    /// Create a new tuple with the given columns and data.
    ///
    /// # Arguments
    ///
    /// * `columns` - Attribute reference per value.
    /// * `values` - Field values of the tuple.
    ///
    /// # Panics
    ///
    /// Panics if the column and value counts differ.
    pub fn new(columns: Vec<FieldIdentifier>, values: Vec<Field>) -> Self {
        assert_eq!(
            columns.len(),
            values.len(),
            "tuple columns and values must pair up"
        );
        Self { columns, values }
    }

    /// Create an empty tuple.
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Append a column/value pair.
    ///
    /// # Arguments
    ///
    /// * `column` - Attribute reference of the value.
    /// * `value` - Value to add.
    pub fn push(&mut self, column: FieldIdentifier, value: Field) {
        self.columns.push(column);
        self.values.push(value);
    }

    /// Look up the value for a field.
    ///
    /// First pass matches by FieldIdentifier equality; on miss, a second pass
    /// matches by bare column name ignoring namespaces (needed when namespace
    /// information was lost upstream).
    ///
    /// # Arguments
    ///
    /// * `field` - Field to look for.
    pub fn get(&self, field: &FieldIdentifier) -> Option<&Field> {
        if let Some(i) = self.columns.iter().position(|c| c == field) {
            return self.values.get(i);
        }
        self.columns
            .iter()
            .position(|c| c.column() == field.column())
            .and_then(|i| self.values.get(i))
    }

    /// Returns the columns of the tuple.
    pub fn columns(&self) -> &[FieldIdentifier] {
        &self.columns
    }

    /// Returns the field values of the tuple.
    pub fn values(&self) -> &[Field] {
        &self.values
    }

    /// Return the length of the tuple.
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Append another tuple to self.
    ///
    /// On a key collision the other tuple's value wins in place.
    ///
    /// # Arguments
    ///
    /// * `other` - Other tuple to append.
    pub fn merge(&self, other: &Self) -> Self {
        let mut columns = self.columns.clone();
        let mut values = self.values.clone();
        for (col, val) in other.columns.iter().zip(other.values.iter()) {
            match columns.iter().position(|c| c == col) {
                Some(i) => values[i] = val.clone(),
                None => {
                    columns.push(col.clone());
                    values.push(val.clone());
                }
            }
        }
        Self { columns, values }
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut res = String::new();
        for value in &self.values {
            res.push_str(&value.to_string());
            res.push('\t');
        }
        write!(f, "{}", res)
    }
}

/// Retrieve the name from the command parser object.
///
/// # Argument
///
/// * `name` - Name object from the command parser.
pub fn get_name(name: &ast::ObjectName) -> Result<String, MiniRelError> {
    if name.0.len() > 1 {
        Err(MiniRelError::ValidationError(String::from(
            "Error no . names supported",
        )))
    } else {
        Ok(name.0[0].clone())
    }
}
