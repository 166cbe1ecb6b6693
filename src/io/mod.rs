pub mod filter;
pub mod input;
pub mod output;

pub use filter::*;
pub use input::*;
pub use output::*;
