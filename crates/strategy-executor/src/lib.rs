//! Regime-conditioned trade signal generation.
//!
//! Trending markets are traded with trend-following entries, range-bound
//! markets with RSI mean reversion, and high-volatility markets not at all.

pub mod executor;
pub mod signal;

pub use executor::{StrategyExecutor, StrategySettings};
pub use signal::{FibonacciContext, StrategyOutcome, TechnicalContext, TradeSignal};
