//! Filesystem schema discovery

mod scanner;

pub use scanner::{SchemaScanner, SchemaSet};
