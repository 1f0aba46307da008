use std::panic::Location;
use std::rc::Rc;

use crate::error::Error;
use crate::link;
use crate::link::mapper::{MapMode, Mapper};
use crate::registry::{FuncId, Registry};
use crate::symbol::{DataBlob, DataSym, FuncSym};

/// One ROM build: a registry plus the cartridge mapping. Register the
/// entry points, then `finish` against the caller's ROM buffer.
pub struct Context {
    pub registry: Registry,
    mapper: Mapper,
}

impl Context {
    pub fn new(mode: MapMode) -> Self {
        Context {
            registry: Registry::new(),
            mapper: Mapper::new(mode),
        }
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    /// Register an entry point, generating it and everything it calls.
    #[track_caller]
    pub fn register(&mut self, sym: FuncSym) -> Result<FuncId, Error> {
        self.registry.ensure_at(sym, Location::caller())
    }

    pub fn register_data(&mut self, blob: Rc<DataBlob>) -> DataSym {
        self.registry.register_data(blob)
    }

    /// Lay out everything registered so far, write it into `rom`, and
    /// apply all relocations.
    pub fn finish(&mut self, rom: &mut [u8]) -> Result<(), Error> {
        self.registry.layout(rom.len())?;
        self.registry.write(rom);
        link::apply_relocations(&self.registry, &self.mapper, rom)
    }
}
