pub mod agent;
pub mod schedule;

pub use agent::*;
pub use schedule::*;
