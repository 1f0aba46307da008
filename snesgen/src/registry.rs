use std::panic::Location;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::builder::{Builder, InstMeta};
use crate::error::{BuildError, Error, LinkError};
use crate::link::mapper::Mapper;
use crate::source::SourceCache;
use crate::symbol::{CallConv, DataBlob, DataSym, FuncSym, Symbol};

/// Stable handle to a registered function slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuncId(pub(crate) usize);

/// A fully generated function: code bytes, per-instruction metadata, the
/// inferred convention, and (after layout) a ROM offset.
#[derive(Debug)]
pub struct ResolvedFunc {
    pub code: Vec<u8>,
    pub meta: Vec<InstMeta>,
    pub conv: CallConv,
    pub name: Option<&'static str>,
    pub loc: Option<&'static Location<'static>>,
    pub offset: Option<u32>,
}

#[derive(Debug)]
enum SlotState {
    /// Placeholder while the generator runs; observable through recursive
    /// registration.
    Building,
    Done(ResolvedFunc),
}

#[derive(Debug)]
struct FuncSlot {
    sym: FuncSym,
    state: SlotState,
}

#[derive(Debug)]
pub struct DataEntry {
    pub blob: Rc<DataBlob>,
    pub offset: Option<u32>,
}

/// Deduplicating registry of everything that ends up in ROM. Both maps
/// preserve insertion order, which is also the layout order.
#[derive(Debug, Default)]
pub struct Registry {
    funcs: IndexMap<usize, FuncSlot>,
    data: IndexMap<usize, DataEntry>,
    pub(crate) sources: SourceCache,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Register `sym`, generating it through its callback if it is new.
    /// Registering the same symbol again returns the existing handle
    /// without running the generator a second time.
    #[track_caller]
    pub fn register_function(&mut self, sym: FuncSym) -> Result<FuncId, Error> {
        self.ensure_at(sym, Location::caller())
    }

    pub(crate) fn ensure_at(
        &mut self,
        sym: FuncSym,
        site: &'static Location<'static>,
    ) -> Result<FuncId, Error> {
        if let Some(index) = self.funcs.get_index_of(&sym.key()) {
            return Ok(FuncId(index));
        }
        let (index, _) = self.funcs.insert_full(
            sym.key(),
            FuncSlot {
                sym,
                state: SlotState::Building,
            },
        );
        let resolved = Builder::generate(self, sym, site)?;
        if let Some((_, slot)) = self.funcs.get_index_mut(index) {
            slot.state = SlotState::Done(resolved);
        }
        Ok(FuncId(index))
    }

    /// Insert-or-return for data blobs; no generator involved.
    pub fn register_data(&mut self, blob: Rc<DataBlob>) -> DataSym {
        let sym = DataSym(blob.clone());
        self.data
            .entry(sym.key())
            .or_insert(DataEntry { blob, offset: None });
        sym
    }

    /// Dispatch on the symbol variant; address symbols need no action.
    #[track_caller]
    pub fn register_symbol(&mut self, sym: &Symbol) -> Result<(), Error> {
        match sym {
            Symbol::Addr(_) => Ok(()),
            Symbol::Func(func) => self.ensure_at(*func, Location::caller()).map(|_| ()),
            Symbol::Data(data) => {
                self.register_data(data.0.clone());
                Ok(())
            }
        }
    }

    /// Calling convention of `id`. Observing a slot that is still under
    /// construction is the circular-dependency diagnosis.
    pub fn convention(&self, id: FuncId) -> Result<&CallConv, Error> {
        let Some((_, slot)) = self.funcs.get_index(id.0) else {
            return Err(LinkError::SymbolNotFound(format!("function #{}", id.0)).into());
        };
        match &slot.state {
            SlotState::Done(func) => Ok(&func.conv),
            SlotState::Building => {
                Err(BuildError::CircularDependency(slot.sym.label()).into())
            }
        }
    }

    pub fn func(&self, id: FuncId) -> Option<&ResolvedFunc> {
        match self.funcs.get_index(id.0)? {
            (_, slot) => match &slot.state {
                SlotState::Done(func) => Some(func),
                SlotState::Building => None,
            },
        }
    }

    pub fn lookup(&self, sym: &FuncSym) -> Option<&ResolvedFunc> {
        match &self.funcs.get(&sym.key())?.state {
            SlotState::Done(func) => Some(func),
            SlotState::Building => None,
        }
    }

    pub fn lookup_data(&self, sym: &DataSym) -> Option<&DataEntry> {
        self.data.get(&sym.key())
    }

    /// Generated functions in registration order.
    pub fn functions(&self) -> impl Iterator<Item = &ResolvedFunc> {
        self.funcs.values().filter_map(|slot| match &slot.state {
            SlotState::Done(func) => Some(func),
            SlotState::Building => None,
        })
    }

    /// Data entries in registration order.
    pub fn data_entries(&self) -> impl Iterator<Item = &DataEntry> {
        self.data.values()
    }

    /// Assign ROM offsets linearly in registration order: functions first,
    /// then data.
    pub fn layout(&mut self, rom_len: usize) -> Result<(), Error> {
        let mut cursor = 0usize;
        for slot in self.funcs.values_mut() {
            if let SlotState::Done(func) = &mut slot.state {
                func.offset = Some(cursor as u32);
                cursor += func.code.len();
            }
        }
        for entry in self.data.values_mut() {
            entry.offset = Some(cursor as u32);
            cursor += entry.blob.bytes.len();
        }
        if cursor > rom_len {
            return Err(LinkError::RomOverflow(cursor, rom_len).into());
        }
        Ok(())
    }

    /// Copy every laid-out function and blob into the ROM buffer.
    pub fn write(&self, rom: &mut [u8]) {
        for func in self.functions() {
            if let Some(offset) = func.offset {
                let offset = offset as usize;
                rom[offset..offset + func.code.len()].copy_from_slice(&func.code);
            }
        }
        for entry in self.data_entries() {
            if let Some(offset) = entry.offset {
                let offset = offset as usize;
                rom[offset..offset + entry.blob.bytes.len()]
                    .copy_from_slice(&entry.blob.bytes);
            }
        }
    }

    /// CPU address of a symbol after layout.
    pub fn addr_of(&self, sym: &Symbol, mapper: &Mapper) -> Result<u32, Error> {
        match sym {
            Symbol::Addr(addr) => Ok(*addr),
            Symbol::Func(func) => {
                let offset = self
                    .lookup(func)
                    .and_then(|f| f.offset)
                    .ok_or_else(|| LinkError::SymbolNotFound(func.label()))?;
                mapper.cpu_addr(offset)
            }
            Symbol::Data(data) => {
                let offset = self
                    .lookup_data(data)
                    .and_then(|d| d.offset)
                    .ok_or_else(|| LinkError::SymbolNotFound(data.0.name.clone()))?;
                mapper.cpu_addr(offset)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use arch::inst::Inst;

    use super::*;
    use crate::error::BuildError;
    use crate::link::mapper::MapMode;

    static RUNS: AtomicUsize = AtomicUsize::new(0);

    fn counted(b: &mut crate::builder::Builder) -> Result<(), Error> {
        RUNS.fetch_add(1, Ordering::SeqCst);
        b.emit(Inst::Rts)
    }

    #[test]
    fn registration_is_idempotent() {
        let mut registry = Registry::new();
        let first = registry.register_function(FuncSym::new(counted)).unwrap();
        let second = registry.register_function(FuncSym::new(counted)).unwrap();
        assert_eq!(first, second);
        assert_eq!(RUNS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn layout_follows_registration_order() {
        fn first(b: &mut crate::builder::Builder) -> Result<(), Error> {
            b.emit(Inst::Nop)?;
            b.emit(Inst::Nop)?;
            b.emit(Inst::Rts)
        }
        fn second(b: &mut crate::builder::Builder) -> Result<(), Error> {
            b.emit(Inst::Rts)
        }
        let mut registry = Registry::new();
        registry.register_function(FuncSym::new(first)).unwrap();
        registry.register_function(FuncSym::new(second)).unwrap();
        let data = registry.register_data(DataBlob::new("table", vec![1, 2, 3]));
        registry.layout(0x8000).unwrap();
        let offsets: Vec<u32> = registry.functions().map(|f| f.offset.unwrap()).collect();
        assert_eq!(offsets, [0, 3]);
        assert_eq!(registry.lookup_data(&data).unwrap().offset, Some(4));
    }

    #[test]
    fn layout_rejects_an_overfull_rom() {
        fn wide(b: &mut crate::builder::Builder) -> Result<(), Error> {
            for _ in 0..32 {
                b.emit(Inst::Nop)?;
            }
            Ok(())
        }
        let mut registry = Registry::new();
        registry.register_function(FuncSym::new(wide)).unwrap();
        assert!(matches!(
            registry.layout(16),
            Err(Error::Link(LinkError::RomOverflow(32, 16)))
        ));
    }

    #[test]
    fn data_registration_deduplicates_by_identity() {
        let mut registry = Registry::new();
        let blob = DataBlob::new("tiles", vec![0xAA; 8]);
        let one = registry.register_data(blob.clone());
        let two = registry.register_data(blob);
        assert_eq!(one, two);
        assert_eq!(registry.data_entries().count(), 1);
        // same content, different identity
        registry.register_data(DataBlob::new("tiles", vec![0xAA; 8]));
        assert_eq!(registry.data_entries().count(), 2);
    }

    #[test]
    fn address_symbols_register_as_a_noop() {
        let mut registry = Registry::new();
        registry.register_symbol(&Symbol::Addr(0x002100)).unwrap();
        assert_eq!(registry.functions().count(), 0);
    }

    #[test]
    fn addr_of_an_unregistered_function_fails() {
        fn ghost(b: &mut crate::builder::Builder) -> Result<(), Error> {
            b.emit(Inst::Rts)
        }
        let registry = Registry::new();
        let mapper = Mapper::new(MapMode::LoRom);
        let err = registry
            .addr_of(&Symbol::Func(FuncSym::new(ghost)), &mapper)
            .unwrap_err();
        assert!(matches!(err, Error::Link(LinkError::SymbolNotFound(_))));
    }

    #[test]
    fn convention_of_a_building_slot_is_a_circular_dependency() {
        fn probe(b: &mut crate::builder::Builder) -> Result<(), Error> {
            // own slot is still under construction here
            let err = b.registry().convention(FuncId(0)).unwrap_err();
            assert!(matches!(
                err,
                Error::Build(BuildError::CircularDependency(_))
            ));
            b.emit(Inst::Rts)
        }
        let mut registry = Registry::new();
        registry.register_function(FuncSym::new(probe)).unwrap();
    }
}
