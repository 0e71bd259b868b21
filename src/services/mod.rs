pub mod evaluator;
pub mod exporter;
pub mod store;
pub mod validation;

pub use evaluator::*;
pub use exporter::*;
pub use store::*;
