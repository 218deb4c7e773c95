use crate::logical_plan::{FieldIdentifier, PredExpr, PredicateNode, PredicateOp};
use crate::{Field, Tuple};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::env;
use std::path::PathBuf;

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Builds a tuple of integer values with columns qualified by a relation name.
///
/// # Arguments
///
/// * `relation` - Namespace for every column.
/// * `columns` - Column names, in order.
/// * `vals` - Values paired with the columns.
pub fn int_tuple(relation: &str, columns: &[&str], vals: &[i32]) -> Tuple {
    let cols = columns
        .iter()
        .map(|c| FieldIdentifier::new(relation, c))
        .collect();
    let fields = vals.iter().map(|v| Field::IntField(*v)).collect();
    Tuple::new(cols, fields)
}

/// Equality predicate between two field references, each parsed on the first `.`.
pub fn pred_eq_fields(left: &str, right: &str) -> PredicateNode {
    PredicateNode::new(
        PredExpr::Ident(FieldIdentifier::parse(left)),
        PredicateOp::Equals,
        PredExpr::Ident(FieldIdentifier::parse(right)),
    )
}

/// Equality predicate between a field reference and an integer literal.
pub fn pred_eq_int(field: &str, value: i32) -> PredicateNode {
    PredicateNode::new(
        PredExpr::Ident(FieldIdentifier::parse(field)),
        PredicateOp::Equals,
        PredExpr::Literal(Field::IntField(value)),
    )
}

/// Equality predicate between a field reference and a string literal.
pub fn pred_eq_str(field: &str, value: &str) -> PredicateNode {
    PredicateNode::new(
        PredExpr::Ident(FieldIdentifier::parse(field)),
        PredicateOp::Equals,
        PredExpr::Literal(Field::StringField(value.to_string())),
    )
}

pub fn gen_rand_string(n: usize) -> String {
    thread_rng()
        .sample_iter(Alphanumeric)
        .take(n)
        .map(char::from)
        .collect()
}

pub fn gen_random_dir() -> PathBuf {
    init();
    let mut dir = env::temp_dir();
    dir.push(String::from("minirel"));
    let rand_string = gen_rand_string(10);
    dir.push(rand_string);
    dir
}
