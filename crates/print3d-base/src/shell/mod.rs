//! Solidify an open sheet into a closed slab.

pub mod rim;
mod solidify;

pub use rim::{RimResult, generate_rim};
pub use solidify::{SolidifyStats, solidify};
