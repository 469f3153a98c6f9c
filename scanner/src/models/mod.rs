pub mod candidate;
pub mod filter;
pub mod outcome;
pub mod price_bar;

pub use candidate::*;
pub use filter::*;
pub use outcome::*;
pub use price_bar::*;
