pub use executor::Executor;
pub use translate_and_validate::TranslateAndValidate;
mod executor;
mod translate_and_validate;

// Query optimization sits in-between these two halves: TranslateAndValidate
// produces the logical plan, the caller folds it through an explicit ordered
// list of optimizer passes (optimizer::run_pass), and Executor translates
// and evaluates whatever comes out. The executor refuses raw NaturalJoin
// nodes, so any plan that went through cartesian-to-join conversion must also
// go through a join-order pass before execution.
