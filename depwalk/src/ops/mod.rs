//! Entry points of all operations available in Depwalk.
//!
//! For datastructures describing the state, see [`crate::core`] module.

pub use list::*;
pub use serve::*;

mod list;
mod serve;
