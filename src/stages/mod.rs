pub mod stage0_combine;
pub mod stage1_structure;
pub mod stage2_decide;
pub mod stage3_export;

pub use stage0_combine::*;
pub use stage1_structure::*;
pub use stage2_decide::*;
pub use stage3_export::*;
