pub mod flags;
pub mod inst;
pub mod reg;

pub use flags::{Flag, StatusUpdate};
pub use inst::Inst;
pub use reg::{Reg, SizeMode};
