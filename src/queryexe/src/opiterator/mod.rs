pub use cross_product::CrossProduct;
pub use filter::Filter;
pub use nested_loop_join::NestedLoopJoin;
pub use project::ProjectIterator;
pub use relation_scan::RelationScan;
pub use tuple_iterator::TupleIterator;
mod cross_product;
mod filter;
mod nested_loop_join;
mod project;
mod relation_scan;
mod tuple_iterator;

use common::logical_plan::{PredExpr, PredicateNode};
use common::{Field, MiniRelError, Tuple};

/// Lifecycle of a physical operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpState {
    Unopened,
    Open,
    Closed,
}

/// Pull iterator over tuples; every physical plan node implements this.
///
/// State machine: Unopened -> Open -> Closed. Iterating or rewinding outside
/// Open, and re-opening, are precondition violations that panic rather than
/// surface as recoverable errors.
pub trait OpIterator {
    /// Opens the iterator and its children, top-down.
    fn open(&mut self) -> Result<(), MiniRelError>;

    /// Returns the next tuple or None when exhausted.
    ///
    /// # Panics
    ///
    /// Panics if the operator is not open.
    fn next(&mut self) -> Result<Option<Tuple>, MiniRelError>;

    /// Closes the iterator down the driving child chain.
    fn close(&mut self) -> Result<(), MiniRelError>;

    /// Restarts iteration from the first tuple, resetting the observed row
    /// count. Valid only while open.
    fn rewind(&mut self) -> Result<(), MiniRelError>;

    /// Rows produced in the current iteration bracket.
    fn rows_returned(&self) -> u64;

    /// Appends (operator label, observed rows) pre-order: self, then children.
    fn collect_cardinalities(&self, out: &mut Vec<(String, u64)>);
}

pub(crate) fn check_open(state: OpState, op: &str) {
    assert!(
        state == OpState::Open,
        "{} iterated while not open",
        op
    );
}

pub(crate) fn check_unopened(state: OpState, op: &str) {
    assert!(
        state == OpState::Unopened,
        "{} opened twice",
        op
    );
}

/// Evaluates an AND list against a tuple, short-circuiting on the first
/// predicate that fails.
pub(crate) fn eval_predicates(
    tuple: &Tuple,
    predicates: &[PredicateNode],
) -> Result<bool, MiniRelError> {
    for pred in predicates {
        if !eval_predicate(tuple, pred)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// A field operand that resolves nowhere, even by bare name, makes the
/// predicate false for this row only.
fn eval_predicate(tuple: &Tuple, pred: &PredicateNode) -> Result<bool, MiniRelError> {
    let left = match resolve(tuple, &pred.left) {
        Some(value) => value,
        None => return Ok(false),
    };
    let right = match resolve(tuple, &pred.right) {
        Some(value) => value,
        None => return Ok(false),
    };
    let right = coerce(&left, right)?;
    Ok(pred.op.compare(&left, &right))
}

fn resolve(tuple: &Tuple, expr: &PredExpr) -> Option<Field> {
    match expr {
        PredExpr::Literal(value) => Some(value.clone()),
        PredExpr::Ident(field) => tuple.get(field).cloned(),
    }
}

/// Coerces `operand` to the variant of `target` before comparison.
fn coerce(target: &Field, operand: Field) -> Result<Field, MiniRelError> {
    match (target, &operand) {
        (Field::IntField(_), Field::StringField(s)) => s
            .trim()
            .parse::<i32>()
            .map(Field::IntField)
            .map_err(|_| {
                MiniRelError::ExecutionError(format!("cannot coerce '{}' to an integer", s))
            }),
        (Field::StringField(_), Field::IntField(i)) => Ok(Field::StringField(i.to_string())),
        _ => Ok(operand),
    }
}
