pub mod classifier;
pub mod indicators;
pub mod logger;
pub mod symbols;

pub use classifier::*;
pub use indicators::*;
pub use logger::*;
pub use symbols::*;
