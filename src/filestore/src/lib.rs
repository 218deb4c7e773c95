#[macro_use]
extern crate log;

pub mod catalog;
pub mod relation_file;
pub mod testutil;
pub use catalog::FileCatalog;
pub use relation_file::{RelationFile, TupleReader};
