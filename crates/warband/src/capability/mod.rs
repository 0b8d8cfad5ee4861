mod table;
mod vector;

pub use table::*;
pub use vector::*;
