pub mod drawdown;

pub use drawdown::*;
