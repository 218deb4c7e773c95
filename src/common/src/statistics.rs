use crate::MiniRelError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Per-relation statistics used by the cost-based optimizer passes.
///
/// Read-only input: every derived estimate copies out of this structure and
/// never aliases it.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Statistics {
    relations: HashMap<String, RelationStatistics>,
}

impl Statistics {
    /// Creates an empty statistics map.
    pub fn new() -> Self {
        Self {
            relations: HashMap::new(),
        }
    }

    /// Registers statistics for a relation.
    ///
    /// # Arguments
    ///
    /// * `name` - Relation name.
    /// * `stats` - Row and distinct-value counts for the relation.
    pub fn insert(&mut self, name: &str, stats: RelationStatistics) {
        self.relations.insert(name.to_string(), stats);
    }

    /// Gets the statistics of a relation.
    ///
    /// # Arguments
    ///
    /// * `name` - Relation name to look up.
    pub fn get(&self, name: &str) -> Option<&RelationStatistics> {
        self.relations.get(name)
    }

    /// Checks if statistics for the relation are present.
    pub fn contains(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    /// Serializes the statistics as json.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("statistics serialize")
    }

    /// De-serializes statistics from json produced by to_json.
    pub fn from_json(json: &str) -> Result<Self, MiniRelError> {
        serde_json::from_str(json)
            .map_err(|_| MiniRelError::MiniRelError(String::from("Malformatted statistics json")))
    }
}

/// Statistics of a single relation: total rows plus the number of distinct
/// values per attribute.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RelationStatistics {
    total_rows: u64,
    distinct_values: HashMap<String, u64>,
}

impl RelationStatistics {
    /// Creates statistics for a relation with the given row count.
    ///
    /// # Arguments
    ///
    /// * `total_rows` - Number of rows in the relation.
    pub fn new(total_rows: u64) -> Self {
        Self {
            total_rows,
            distinct_values: HashMap::new(),
        }
    }

    /// Builder-style helper to record the distinct count of an attribute.
    pub fn with_attribute(mut self, attr: &str, distinct: u64) -> Self {
        self.distinct_values.insert(attr.to_string(), distinct);
        self
    }

    /// Records the distinct count of an attribute.
    ///
    /// # Arguments
    ///
    /// * `attr` - Attribute name.
    /// * `distinct` - Number of distinct values of the attribute.
    pub fn set_distinct(&mut self, attr: &str, distinct: u64) {
        self.distinct_values.insert(attr.to_string(), distinct);
    }

    /// Returns the relation's total row count.
    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    /// Returns the distinct count of an attribute, if recorded.
    pub fn distinct(&self, attr: &str) -> Option<u64> {
        self.distinct_values.get(attr).copied()
    }

    /// Iterates over (attribute, distinct count) pairs.
    pub fn distinct_values(&self) -> impl Iterator<Item = (&String, &u64)> {
        self.distinct_values.iter()
    }

    /// Names of the attributes this relation carries.
    pub fn attribute_names(&self) -> BTreeSet<&str> {
        self.distinct_values.keys().map(|s| s.as_str()).collect()
    }
}
