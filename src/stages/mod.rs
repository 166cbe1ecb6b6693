pub mod stage0_remap;
pub mod stage1_prune;
pub mod stage2_steps;
pub mod stage3_duration;
pub mod stage4_attributes;
pub mod stage5_layout;

pub use stage0_remap::*;
pub use stage1_prune::*;
pub use stage2_steps::*;
pub use stage3_duration::*;
pub use stage4_attributes::*;
pub use stage5_layout::*;
