//! Data model for statistics records and the repository objects they reference.

mod field;
mod object;
mod record;

pub use field::*;
pub use object::*;
pub use record::*;
