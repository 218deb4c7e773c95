use crate::Field;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Debug;

/// A LogicalOp represents a relational operation present in a logical query plan.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum LogicalOp {
    Relation(RelationNode),
    Projection(ProjectionNode),
    Selection(SelectionNode),
    CartesianProduct,
    ThetaJoin(ThetaJoinNode),
    NaturalJoin,
}

impl LogicalOp {
    /// Short operator name, used for traces and plan rendering.
    pub fn name(&self) -> &'static str {
        match self {
            LogicalOp::Relation(_) => "Relation",
            LogicalOp::Projection(_) => "Projection",
            LogicalOp::Selection(_) => "Selection",
            LogicalOp::CartesianProduct => "CartesianProduct",
            LogicalOp::ThetaJoin(_) => "ThetaJoin",
            LogicalOp::NaturalJoin => "NaturalJoin",
        }
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOp::Relation(r) => write!(f, "Relation:{}", r.name),
            LogicalOp::Projection(p) => {
                let fields: Vec<String> = p.fields.iter().map(|x| x.to_string()).collect();
                write!(f, "Projection: [{}]", fields.join(", "))
            }
            LogicalOp::Selection(s) => {
                let preds: Vec<String> = s.predicates.iter().map(|x| x.to_string()).collect();
                write!(f, "Selection: [{}]", preds.join(", "))
            }
            LogicalOp::CartesianProduct => write!(f, "CartesianProduct"),
            LogicalOp::ThetaJoin(t) => {
                let preds: Vec<String> = t.predicates.iter().map(|x| x.to_string()).collect();
                write!(f, "ThetaJoin: [{}]", preds.join(", "))
            }
            LogicalOp::NaturalJoin => write!(f, "NaturalJoin"),
        }
    }
}

/// Base relation leaf.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RelationNode {
    /// Name of the stored relation.
    pub name: String,
}

/// Projection node. An empty field list keeps all attributes.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProjectionNode {
    /// Fields to keep.
    pub fields: Vec<FieldIdentifier>,
}

/// Selection node. Predicates are an AND list.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SelectionNode {
    /// Predicates to filter by.
    pub predicates: Vec<PredicateNode>,
}

/// Theta join node carrying its join predicates.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ThetaJoinNode {
    /// Join predicates, tested against the merged tuple.
    pub predicates: Vec<PredicateNode>,
}

/// Predicate operators.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum PredicateOp {
    Equals,
    GreaterThan,
    LessThan,
    LessThanOrEq,
    GreaterThanOrEq,
    NotEq,
}

impl PredicateOp {
    /// Do predicate comparison.
    ///
    /// # Arguments
    ///
    /// * `left_field` - Left field of the predicate.
    /// * `right_field` - Right field of the predicate.
    pub fn compare<T: Ord>(&self, left_field: &T, right_field: &T) -> bool {
        match self {
            PredicateOp::Equals => left_field == right_field,
            PredicateOp::GreaterThan => left_field > right_field,
            PredicateOp::LessThan => left_field < right_field,
            PredicateOp::LessThanOrEq => left_field <= right_field,
            PredicateOp::GreaterThanOrEq => left_field >= right_field,
            PredicateOp::NotEq => left_field != right_field,
        }
    }
}

impl fmt::Display for PredicateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op_str = match self {
            PredicateOp::Equals => "=",
            PredicateOp::GreaterThan => ">",
            PredicateOp::LessThan => "<",
            PredicateOp::LessThanOrEq => "<=",
            PredicateOp::GreaterThanOrEq => ">=",
            PredicateOp::NotEq => "!=",
        };
        write!(f, "{}", op_str)
    }
}

/// Predicate expression.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum PredExpr {
    Literal(Field),
    Ident(FieldIdentifier),
}

impl PredExpr {
    /// Get the field identifier from the predicate expression.
    pub fn ident(&self) -> Option<&FieldIdentifier> {
        match self {
            PredExpr::Ident(i) => Some(i),
            _ => None,
        }
    }
}

impl fmt::Display for PredExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredExpr::Literal(v) => write!(f, "{}", v),
            PredExpr::Ident(i) => write!(f, "{}", i),
        }
    }
}

/// Predicate node.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PredicateNode {
    pub left: PredExpr,
    pub op: PredicateOp,
    pub right: PredExpr,
}

impl PredicateNode {
    /// Create a new predicate.
    pub fn new(left: PredExpr, op: PredicateOp, right: PredExpr) -> Self {
        Self { left, op, right }
    }

    /// Equality between two field references.
    pub fn is_field_equality(&self) -> bool {
        self.op == PredicateOp::Equals
            && self.left.ident().is_some()
            && self.right.ident().is_some()
    }

    /// Field identifiers referenced by either operand.
    pub fn idents(&self) -> Vec<&FieldIdentifier> {
        let mut out = Vec::new();
        if let Some(i) = self.left.ident() {
            out.push(i);
        }
        if let Some(i) = self.right.ident() {
            out.push(i);
        }
        out
    }
}

impl fmt::Display for PredicateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)
    }
}

/// Represents a field identifier: a column reference optionally qualified by
/// the relation (namespace) it belongs to.
///
/// Equality is deliberately loose: columns must match, and namespaces must
/// match only when both sides carry one. A namespace-less identifier thus
/// wildcard-matches any same-named field. That relation is not transitive
/// (`A.b == b` and `b == B.b` but `A.b != B.b`), so there is no Eq or Hash
/// impl and every FieldIdentifier-keyed lookup scans linearly.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FieldIdentifier {
    /// The name of the relation the column belongs to, when known.
    table: Option<String>,
    /// The name of the column being referenced.
    column: String,
}

impl FieldIdentifier {
    /// Create a new qualified field identifier.
    ///
    /// # Arguments
    ///
    /// * `table` - Table of the field.
    /// * `column` - Column.
    pub fn new(table: &str, column: &str) -> Self {
        Self {
            table: Some(table.to_string()),
            column: column.to_string(),
        }
    }

    /// Create a field identifier with no namespace.
    ///
    /// # Arguments
    ///
    /// * `column` - Column.
    pub fn unqualified(column: &str) -> Self {
        Self {
            table: None,
            column: column.to_string(),
        }
    }

    /// Parse a raw identifier, splitting namespace from column on the first `.`.
    ///
    /// # Arguments
    ///
    /// * `raw` - Identifier text, e.g. `Students.name` or `name`.
    pub fn parse(raw: &str) -> Self {
        match raw.find('.') {
            Some(i) => Self::new(&raw[..i], &raw[i + 1..]),
            None => Self::unqualified(raw),
        }
    }

    /// Returns the table, if qualified.
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Returns the column name.
    pub fn column(&self) -> &str {
        &self.column
    }
}

impl PartialEq for FieldIdentifier {
    fn eq(&self, other: &Self) -> bool {
        if self.column != other.column {
            return false;
        }
        match (&self.table, &other.table) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

impl fmt::Display for FieldIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(t) => write!(f, "{}.{}", t, self.column),
            None => write!(f, "{}", self.column),
        }
    }
}
