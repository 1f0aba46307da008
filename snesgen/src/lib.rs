mod builder;
mod context;
mod debug;
mod error;
mod link;
mod lower;
mod registry;
mod reloc;
mod source;
mod symbol;

pub use builder::{Builder, InstMeta, JumpTarget, Label, RegHandle};
pub use context::Context;
pub use debug::{coverage, rom_crc, write_coverage, write_labels, CdlFlag};
pub use error::{BuildError, Error, LinkError};
pub use link::apply_relocations;
pub use link::mapper::{MapMode, Mapper};
pub use registry::{DataEntry, FuncId, Registry, ResolvedFunc};
pub use reloc::{BranchKind, BranchReloc, Reloc, RelocKind};
pub use symbol::{CallConv, DataBlob, DataSym, FuncSym, GenFn, Symbol};
