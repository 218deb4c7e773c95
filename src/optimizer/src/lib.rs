#[macro_use]
extern crate log;

pub mod enumeration;
pub mod estimate;
pub mod greedy;
pub mod join_conversion;
pub mod merge_selections;
pub mod natural_join;
pub mod passes;
pub mod pushdown;
pub use passes::{run_pass, OptimizerPass};
