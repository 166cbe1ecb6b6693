pub mod cell_line;
pub mod document;
pub mod duration;
pub mod step;
pub mod submission;

pub use cell_line::*;
pub use document::*;
pub use duration::*;
pub use step::*;
pub use submission::*;
