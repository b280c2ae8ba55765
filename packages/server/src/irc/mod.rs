//! IRC protocol primitives.

pub mod line;
pub mod names;
pub mod numeric;

pub use numeric::Numeric;
