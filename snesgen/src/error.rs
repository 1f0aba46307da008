use arch::reg::{Reg, SizeMode};
use thiserror::Error;

use crate::link::mapper::MapMode;

// Main error type for the generator
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// Generation-time errors, raised while a builder is live
#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("Circular dependency: calling convention of {0} is not resolved yet")]
    CircularDependency(String),

    #[error("Return size mismatch: a={0}, xy={1} after an earlier return with a={2}, xy={3}")]
    EndSizeMismatch(SizeMode, SizeMode, SizeMode, SizeMode),

    #[error("Undefined label: {0}")]
    UndefinedLabel(usize),

    #[error("Register size not set: {0}")]
    UnsizedRegister(Reg),

    #[error("Stale register handle: {0}")]
    StaleRegister(Reg),
}

// Layout / relocation / mapping errors
#[derive(Debug, Error, Clone)]
pub enum LinkError {
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Mapping mode not implemented: {0}")]
    UnimplementedMapping(MapMode),

    #[error("Address not mapped: 0x{0:06X}")]
    UnmappedAddress(u32),

    #[error("ROM overflow: need {0} bytes, have {1}")]
    RomOverflow(usize, usize),
}
