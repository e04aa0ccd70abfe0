pub mod manager;
pub mod models;

pub use manager::{RiskEngine, RiskInputs};
pub use models::*;
