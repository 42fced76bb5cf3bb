//! # ebb-select
//! Interchangeable input-selection strategies behind one contract.

pub mod error;
pub mod largest_first;
pub mod oracle;
pub mod random_improve;
pub mod selection;

pub use error::SelectionError;
pub use largest_first::LargestFirstSelector;
pub use oracle::{CostOracle, ImplicitValue, LinearCostOracle, TransactionPrototype};
pub use random_improve::RandomImproveSelector;
pub use selection::{InputSelector, SelectionRequest};
