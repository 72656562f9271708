pub mod account;
pub mod deal;

pub use account::*;
pub use deal::*;
