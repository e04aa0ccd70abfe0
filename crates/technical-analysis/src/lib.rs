pub mod engine;
pub mod indicators;
pub mod structure;

#[cfg(test)]
mod indicators_tests;

pub use engine::*;
pub use indicators::*;
pub use structure::*;
