pub use id::*;
pub use name::*;

mod id;
mod name;
