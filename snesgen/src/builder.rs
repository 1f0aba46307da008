use std::panic::Location;

use arch::flags::{Flag, StatusUpdate};
use arch::inst::Inst;
use arch::reg::{Reg, SizeMode};
use indexmap::IndexSet;

use crate::error::{BuildError, Error};
use crate::lower;
use crate::registry::{Registry, ResolvedFunc};
use crate::reloc::{BranchKind, BranchReloc, Reloc, RelocKind};
use crate::source::CommentTracker;
use crate::symbol::{CallConv, FuncSym, Symbol};

/// Index into the builder's label pool. A label resolves to an
/// *instruction index*, not a byte offset; byte offsets only exist after
/// lowering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(pub(crate) usize);

impl Label {
    pub(crate) fn index(self) -> usize {
        self.0
    }

    /// Define this label at the next emission index of `builder`.
    pub fn define(self, builder: &mut Builder<'_>) {
        builder.define_label(self);
    }
}

/// Opaque handle to a register as it was when the handle was produced.
/// Any clobber, pull, or size change of the register advances its
/// generation and makes older handles stale.
#[derive(Debug, Clone, Copy)]
pub struct RegHandle {
    pub reg: Reg,
    pub size: SizeMode,
    generation: u32,
}

/// Everything recorded per emitted instruction. `offset` is assigned
/// during finalization and is the ground truth afterwards.
#[derive(Debug, Clone)]
pub struct InstMeta {
    pub inst: Inst,
    pub offset: u16,
    pub reloc: Option<Reloc>,
    pub branch: Option<BranchReloc>,
    pub a_size: SizeMode,
    pub xy_size: SizeMode,
    pub comments: Vec<String>,
}

/// Target of `jump_long`: a local label (lowered short or long) or a
/// symbol (always the long absolute form).
#[derive(Debug, Clone)]
pub enum JumpTarget {
    Label(Label),
    Sym(Symbol),
}

impl From<Label> for JumpTarget {
    fn from(label: Label) -> Self {
        JumpTarget::Label(label)
    }
}

impl From<Symbol> for JumpTarget {
    fn from(sym: Symbol) -> Self {
        JumpTarget::Sym(sym)
    }
}

impl From<FuncSym> for JumpTarget {
    fn from(sym: FuncSym) -> Self {
        JumpTarget::Sym(Symbol::Func(sym))
    }
}

/// Generation state for exactly one function. Handed to the generator
/// callback; must not be retained past the callback's return.
pub struct Builder<'r> {
    registry: &'r mut Registry,
    sym: FuncSym,
    loc: Option<&'static Location<'static>>,
    meta: Vec<InstMeta>,
    labels: Vec<Option<usize>>,
    a_size: SizeMode,
    xy_size: SizeMode,
    start_a: SizeMode,
    start_xy: SizeMode,
    end_sizes: Option<(SizeMode, SizeMode)>,
    inputs: IndexSet<Reg>,
    outputs: IndexSet<Reg>,
    clobbers: IndexSet<Reg>,
    generations: [u32; 3],
    comments: CommentTracker,
}

fn load_imm(reg: Reg, value: u16) -> Inst {
    match reg {
        Reg::A => Inst::LdaImm(value),
        Reg::X => Inst::LdxImm(value),
        Reg::Y => Inst::LdyImm(value),
    }
}

fn store_abs(reg: Reg) -> Inst {
    match reg {
        Reg::A => Inst::StaAbs(0),
        Reg::X => Inst::StxAbs(0),
        Reg::Y => Inst::StyAbs(0),
    }
}

fn size_flag(reg: Reg) -> u8 {
    match reg {
        Reg::A => Flag::MemorySize.into(),
        Reg::X | Reg::Y => Flag::IndexSize.into(),
    }
}

/// Single-byte view of a wider relocation, used for byte-wise stores.
fn low_half(reloc: &Reloc) -> Reloc {
    match reloc.kind {
        RelocKind::Imm8 | RelocKind::Imm16 => Reloc::imm8(reloc.offset as u8),
        RelocKind::Addr16 | RelocKind::Addr24 => {
            Reloc::with_offset(RelocKind::AddrLow, reloc.target.clone(), reloc.offset)
        }
        _ => reloc.clone(),
    }
}

fn high_half(reloc: &Reloc) -> Reloc {
    match reloc.kind {
        RelocKind::Imm16 => Reloc::imm8((reloc.offset >> 8) as u8),
        RelocKind::Addr16 | RelocKind::Addr24 => {
            Reloc::with_offset(RelocKind::AddrHigh, reloc.target.clone(), reloc.offset)
        }
        _ => Reloc::imm8(0),
    }
}

impl<'r> Builder<'r> {
    pub(crate) fn generate(
        registry: &'r mut Registry,
        sym: FuncSym,
        site: &'static Location<'static>,
    ) -> Result<ResolvedFunc, Error> {
        let mut builder = Builder {
            registry,
            sym,
            loc: Some(site),
            meta: Vec::new(),
            labels: Vec::new(),
            a_size: SizeMode::Unset,
            xy_size: SizeMode::Unset,
            start_a: SizeMode::Unset,
            start_xy: SizeMode::Unset,
            end_sizes: None,
            inputs: IndexSet::new(),
            outputs: IndexSet::new(),
            clobbers: IndexSet::new(),
            generations: [0; 3],
            comments: CommentTracker::default(),
        };
        (sym.gen)(&mut builder)?;
        builder.build()
    }

    /// Lower branches, assign byte offsets, and serialize the code.
    fn build(mut self) -> Result<ResolvedFunc, Error> {
        lower::lower_branches(&mut self.meta, &self.labels, Symbol::Func(self.sym))?;
        let mut code = Vec::new();
        for entry in &mut self.meta {
            entry.offset = code.len() as u16;
            entry.inst.encode(entry.a_size, entry.xy_size, &mut code);
        }
        let (end_a, end_xy) = self.end_sizes.unwrap_or((SizeMode::Unset, SizeMode::Unset));
        Ok(ResolvedFunc {
            code,
            meta: self.meta,
            conv: CallConv {
                start_a: self.start_a,
                start_xy: self.start_xy,
                end_a,
                end_xy,
                inputs: self.inputs,
                outputs: self.outputs,
                clobbers: self.clobbers,
            },
            name: self.sym.name,
            loc: self.loc,
            offset: None,
        })
    }

    /// Read-only view of the registry this builder generates into.
    pub fn registry(&self) -> &Registry {
        self.registry
    }

    pub fn a_size(&self) -> SizeMode {
        self.a_size
    }

    pub fn xy_size(&self) -> SizeMode {
        self.xy_size
    }

    fn mode_of(&self, reg: Reg) -> SizeMode {
        match reg {
            Reg::A => self.a_size,
            Reg::X | Reg::Y => self.xy_size,
        }
    }

    /// A handle to `reg` as it is right now.
    pub fn reg(&self, reg: Reg) -> RegHandle {
        RegHandle {
            reg,
            size: self.mode_of(reg),
            generation: self.generations[reg as usize],
        }
    }

    fn bump(&mut self, reg: Reg) {
        self.generations[reg as usize] += 1;
    }

    fn clobber(&mut self, reg: Reg) {
        self.bump(reg);
        self.clobbers.insert(reg);
    }

    fn check_handle(&self, handle: RegHandle) -> Result<(), Error> {
        if self.generations[handle.reg as usize] != handle.generation {
            return Err(BuildError::StaleRegister(handle.reg).into());
        }
        Ok(())
    }

    /// Declare a register as carrying an argument into this function.
    pub fn reg_input(&mut self, reg: Reg) {
        self.inputs.insert(reg);
    }

    /// Declare a register as carrying a result out of this function.
    pub fn reg_output(&mut self, reg: Reg) {
        self.outputs.insert(reg);
    }

    fn note_return(&mut self) -> Result<(), Error> {
        let current = (self.a_size, self.xy_size);
        match self.end_sizes {
            None => {
                self.end_sizes = Some(current);
                Ok(())
            }
            Some(prev) if prev == current => Ok(()),
            Some(prev) => {
                Err(BuildError::EndSizeMismatch(current.0, current.1, prev.0, prev.1).into())
            }
        }
    }

    fn append_at(
        &mut self,
        inst: Inst,
        reloc: Option<Reloc>,
        branch: Option<BranchReloc>,
        site: &'static Location<'static>,
    ) -> Result<(), Error> {
        if let Some(reg) = inst.size_reg() {
            if !self.mode_of(reg).is_set() {
                return Err(BuildError::UnsizedRegister(reg).into());
            }
        }
        if let Some(r) = &reloc {
            match &r.target {
                Symbol::Func(target) => {
                    self.registry.ensure_at(*target, site)?;
                }
                Symbol::Data(target) => {
                    self.registry.register_data(target.0.clone());
                }
                Symbol::Addr(_) => {}
            }
        }
        if let Some(reg) = inst.writes_reg() {
            self.clobber(reg);
        }
        if inst.is_return() {
            self.note_return()?;
        }
        let comments = self.comments.collect(site, &mut self.registry.sources);
        self.meta.push(InstMeta {
            inst,
            offset: 0,
            reloc,
            branch,
            a_size: self.a_size,
            xy_size: self.xy_size,
            comments,
        });
        Ok(())
    }

    /// Append `inst` with the current register modes and no relocation.
    #[track_caller]
    pub fn emit(&mut self, inst: Inst) -> Result<(), Error> {
        self.append_at(inst, None, None, Location::caller())
    }

    /// Append `inst` with a relocation; its operand bytes stay zero until
    /// the applier patches them.
    #[track_caller]
    pub fn emit_reloc(&mut self, inst: Inst, reloc: Reloc) -> Result<(), Error> {
        self.append_at(inst, Some(reloc), None, Location::caller())
    }

    // ---- labels ----------------------------------------------------------

    pub fn create_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Point `label` at the instruction that will be emitted next.
    pub fn define_label(&mut self, label: Label) {
        self.labels[label.0] = Some(self.meta.len());
    }

    // ---- register modes --------------------------------------------------

    fn set_a_at(
        &mut self,
        size: SizeMode,
        site: &'static Location<'static>,
    ) -> Result<RegHandle, Error> {
        if self.a_size != size {
            if self.a_size.is_set() {
                let inst = match size {
                    SizeMode::S8 => Inst::Sep(Flag::MemorySize.into()),
                    _ => Inst::Rep(Flag::MemorySize.into()),
                };
                self.append_at(inst, None, None, site)?;
            } else if !self.start_a.is_set() {
                self.start_a = size;
            }
            self.a_size = size;
            self.bump(Reg::A);
        }
        Ok(self.reg(Reg::A))
    }

    fn set_xy_at(
        &mut self,
        size: SizeMode,
        site: &'static Location<'static>,
    ) -> Result<(), Error> {
        if self.xy_size != size {
            if self.xy_size.is_set() {
                let inst = match size {
                    SizeMode::S8 => Inst::Sep(Flag::IndexSize.into()),
                    _ => Inst::Rep(Flag::IndexSize.into()),
                };
                self.append_at(inst, None, None, site)?;
            } else if !self.start_xy.is_set() {
                self.start_xy = size;
            }
            self.xy_size = size;
            self.bump(Reg::X);
            self.bump(Reg::Y);
        }
        Ok(())
    }

    #[track_caller]
    pub fn reg_a8(&mut self) -> Result<RegHandle, Error> {
        self.set_a_at(SizeMode::S8, Location::caller())
    }

    #[track_caller]
    pub fn reg_a16(&mut self) -> Result<RegHandle, Error> {
        self.set_a_at(SizeMode::S16, Location::caller())
    }

    #[track_caller]
    pub fn reg_x8(&mut self) -> Result<RegHandle, Error> {
        self.set_xy_at(SizeMode::S8, Location::caller())?;
        Ok(self.reg(Reg::X))
    }

    #[track_caller]
    pub fn reg_x16(&mut self) -> Result<RegHandle, Error> {
        self.set_xy_at(SizeMode::S16, Location::caller())?;
        Ok(self.reg(Reg::X))
    }

    #[track_caller]
    pub fn reg_y8(&mut self) -> Result<RegHandle, Error> {
        self.set_xy_at(SizeMode::S8, Location::caller())?;
        Ok(self.reg(Reg::Y))
    }

    #[track_caller]
    pub fn reg_y16(&mut self) -> Result<RegHandle, Error> {
        self.set_xy_at(SizeMode::S16, Location::caller())?;
        Ok(self.reg(Reg::Y))
    }

    #[track_caller]
    pub fn reg_xy8(&mut self) -> Result<(RegHandle, RegHandle), Error> {
        self.set_xy_at(SizeMode::S8, Location::caller())?;
        Ok((self.reg(Reg::X), self.reg(Reg::Y)))
    }

    #[track_caller]
    pub fn reg_xy16(&mut self) -> Result<(RegHandle, RegHandle), Error> {
        self.set_xy_at(SizeMode::S16, Location::caller())?;
        Ok((self.reg(Reg::X), self.reg(Reg::Y)))
    }

    // ---- status register -------------------------------------------------

    fn change_status_at(
        &mut self,
        update: StatusUpdate,
        site: &'static Location<'static>,
    ) -> Result<(), Error> {
        let (mut set, mut clear) = update.masks();
        let m: u8 = Flag::MemorySize.into();
        let x: u8 = Flag::IndexSize.into();
        // a mode bit that would not change the current size is dropped
        if set & m != 0 && self.a_size == SizeMode::S8 {
            set &= !m;
        }
        if clear & m != 0 && self.a_size == SizeMode::S16 {
            clear &= !m;
        }
        if set & x != 0 && self.xy_size == SizeMode::S8 {
            set &= !x;
        }
        if clear & x != 0 && self.xy_size == SizeMode::S16 {
            clear &= !x;
        }
        if set != 0 {
            self.append_at(Inst::Sep(set), None, None, site)?;
        }
        if clear != 0 {
            self.append_at(Inst::Rep(clear), None, None, site)?;
        }
        if set & m != 0 {
            self.a_size = SizeMode::S8;
            self.bump(Reg::A);
        }
        if clear & m != 0 {
            self.a_size = SizeMode::S16;
            self.bump(Reg::A);
        }
        if set & x != 0 || clear & x != 0 {
            self.xy_size = if set & x != 0 {
                SizeMode::S8
            } else {
                SizeMode::S16
            };
            self.bump(Reg::X);
            self.bump(Reg::Y);
        }
        Ok(())
    }

    /// Apply a partial status-register update with at most one `sep` and
    /// one `rep`.
    #[track_caller]
    pub fn change_status_flags(&mut self, update: StatusUpdate) -> Result<(), Error> {
        self.change_status_at(update, Location::caller())
    }

    // ---- calls -----------------------------------------------------------

    fn call_with_convention_at(
        &mut self,
        target: Symbol,
        conv: &CallConv,
        site: &'static Location<'static>,
    ) -> Result<(), Error> {
        let mut update = StatusUpdate::default();
        if conv.start_a.is_set() {
            if !self.a_size.is_set() {
                // first constraint in this function: inherit the callee's
                // entry mode outward instead of emitting a flag change
                if !self.start_a.is_set() {
                    self.start_a = conv.start_a;
                }
                self.a_size = conv.start_a;
            } else if self.a_size != conv.start_a {
                update.memory_8bit = Some(conv.start_a == SizeMode::S8);
            }
        }
        if conv.start_xy.is_set() {
            if !self.xy_size.is_set() {
                if !self.start_xy.is_set() {
                    self.start_xy = conv.start_xy;
                }
                self.xy_size = conv.start_xy;
            } else if self.xy_size != conv.start_xy {
                update.index_8bit = Some(conv.start_xy == SizeMode::S8);
            }
        }
        if !update.is_empty() {
            self.change_status_at(update, site)?;
        }
        if conv.end_a.is_set() && conv.end_a != self.a_size {
            self.a_size = conv.end_a;
            self.bump(Reg::A);
        }
        if conv.end_xy.is_set() && conv.end_xy != self.xy_size {
            self.xy_size = conv.end_xy;
            self.bump(Reg::X);
            self.bump(Reg::Y);
        }
        for &reg in &conv.clobbers {
            self.clobber(reg);
        }
        self.append_at(
            Inst::Jsr(0),
            Some(Reloc::to(RelocKind::Addr16, target)),
            None,
            site,
        )
    }

    /// Call `target`, registering (and generating) it first if needed, and
    /// track its calling convention against this function's state.
    #[track_caller]
    pub fn call(&mut self, target: FuncSym) -> Result<(), Error> {
        let site = Location::caller();
        let id = self.registry.ensure_at(target, site)?;
        let conv = self.registry.convention(id)?.clone();
        self.call_with_convention_at(Symbol::Func(target), &conv, site)
    }

    /// Like `call`, but with a caller-supplied convention. This is the
    /// escape hatch for mutually recursive functions.
    #[track_caller]
    pub fn call_with_convention(&mut self, target: Symbol, conv: &CallConv) -> Result<(), Error> {
        self.call_with_convention_at(target, conv, Location::caller())
    }

    /// Bare `jsr` without any convention tracking.
    #[track_caller]
    pub fn jump_subroutine(&mut self, target: Symbol) -> Result<(), Error> {
        self.append_at(
            Inst::Jsr(0),
            Some(Reloc::to(RelocKind::Addr16, target)),
            None,
            Location::caller(),
        )
    }

    // ---- branches --------------------------------------------------------

    /// Unconditional transfer to a local label; the lowering pass decides
    /// between `bra` and `jmp`.
    #[track_caller]
    pub fn branch_always(&mut self, label: Label) -> Result<(), Error> {
        self.append_at(
            Inst::Bra(0),
            None,
            Some(BranchReloc {
                kind: BranchKind::Always,
                target: label,
            }),
            Location::caller(),
        )
    }

    /// Long jump to a label (lowered to `jml` against this function) or
    /// directly to a symbol.
    #[track_caller]
    pub fn jump_long(&mut self, target: impl Into<JumpTarget>) -> Result<(), Error> {
        let site = Location::caller();
        match target.into() {
            JumpTarget::Label(label) => self.append_at(
                Inst::Jml(0),
                None,
                Some(BranchReloc {
                    kind: BranchKind::JumpLong,
                    target: label,
                }),
                site,
            ),
            JumpTarget::Sym(sym) => self.append_at(
                Inst::Jml(0),
                Some(Reloc::to(RelocKind::Addr24, sym)),
                None,
                site,
            ),
        }
    }

    // ---- stack -----------------------------------------------------------

    #[track_caller]
    pub fn push_reg(&mut self, handle: RegHandle) -> Result<(), Error> {
        self.check_handle(handle)?;
        let inst = match handle.reg {
            Reg::A => Inst::Pha,
            Reg::X => Inst::Phx,
            Reg::Y => Inst::Phy,
        };
        self.append_at(inst, None, None, Location::caller())
    }

    /// Pull `reg` from the stack; the previous handle for it goes stale.
    #[track_caller]
    pub fn pull_reg(&mut self, reg: Reg) -> Result<RegHandle, Error> {
        let inst = match reg {
            Reg::A => Inst::Pla,
            Reg::X => Inst::Plx,
            Reg::Y => Inst::Ply,
        };
        self.append_at(inst, None, None, Location::caller())?;
        Ok(self.reg(reg))
    }

    #[track_caller]
    pub fn push_status(&mut self) -> Result<(), Error> {
        self.append_at(Inst::Php, None, None, Location::caller())
    }

    #[track_caller]
    pub fn pull_status(&mut self) -> Result<(), Error> {
        self.append_at(Inst::Plp, None, None, Location::caller())
    }

    /// Push the 16-bit address of `target` (`pea`).
    #[track_caller]
    pub fn push_addr(&mut self, target: Symbol) -> Result<(), Error> {
        self.append_at(
            Inst::Pea(0),
            Some(Reloc::to(RelocKind::Addr16, target)),
            None,
            Location::caller(),
        )
    }

    // ---- composite stores ------------------------------------------------

    fn store_zero_at(
        &mut self,
        size: SizeMode,
        target: Symbol,
        site: &'static Location<'static>,
    ) -> Result<(), Error> {
        self.append_at(
            Inst::StzAbs(0),
            Some(Reloc::to(RelocKind::Addr16, target.clone())),
            None,
            site,
        )?;
        if size == SizeMode::S16 {
            self.append_at(
                Inst::StzAbs(0),
                Some(Reloc::with_offset(RelocKind::Addr16, target, 1)),
                None,
                site,
            )?;
        }
        Ok(())
    }

    /// Zero `target` with one `stz` (8-bit) or two byte-wise `stz` (16-bit);
    /// never touches a register or the status flags.
    #[track_caller]
    pub fn store_zero(&mut self, size: SizeMode, target: Symbol) -> Result<(), Error> {
        self.store_zero_at(size, target, Location::caller())
    }

    fn store_value_at(
        &mut self,
        size: SizeMode,
        handle: RegHandle,
        target: Symbol,
        value: u16,
        site: &'static Location<'static>,
    ) -> Result<(), Error> {
        self.check_handle(handle)?;
        if value == 0 {
            return self.store_zero_at(size, target, site);
        }
        let reg = handle.reg;
        let mode = self.mode_of(reg);
        match (size, mode) {
            (SizeMode::S8, SizeMode::S8) | (SizeMode::S16, SizeMode::S16) => {
                self.append_at(load_imm(reg, value), None, None, site)?;
                self.append_at(
                    store_abs(reg),
                    Some(Reloc::to(RelocKind::Addr16, target)),
                    None,
                    site,
                )?;
            }
            (SizeMode::S8, SizeMode::S16) => {
                // flip to 8-bit around the store, then restore
                let mask = size_flag(reg);
                self.append_at(Inst::Sep(mask), None, None, site)?;
                self.set_mode_raw(reg, SizeMode::S8);
                self.append_at(load_imm(reg, value), None, None, site)?;
                self.append_at(
                    store_abs(reg),
                    Some(Reloc::to(RelocKind::Addr16, target)),
                    None,
                    site,
                )?;
                self.append_at(Inst::Rep(mask), None, None, site)?;
                self.set_mode_raw(reg, SizeMode::S16);
            }
            (SizeMode::S16, SizeMode::S8) => {
                self.append_at(load_imm(reg, value & 0xFF), None, None, site)?;
                self.append_at(
                    store_abs(reg),
                    Some(Reloc::to(RelocKind::Addr16, target.clone())),
                    None,
                    site,
                )?;
                self.append_at(load_imm(reg, value >> 8), None, None, site)?;
                self.append_at(
                    store_abs(reg),
                    Some(Reloc::with_offset(RelocKind::Addr16, target, 1)),
                    None,
                    site,
                )?;
            }
            (SizeMode::Unset, _) | (_, SizeMode::Unset) => {
                return Err(BuildError::UnsizedRegister(reg).into())
            }
        }
        Ok(())
    }

    /// Store an immediate through `handle`'s register. The register is
    /// clobbered unless the value is zero.
    #[track_caller]
    pub fn store_value(
        &mut self,
        size: SizeMode,
        handle: RegHandle,
        target: Symbol,
        value: u16,
    ) -> Result<(), Error> {
        self.store_value_at(size, handle, target, value, Location::caller())
    }

    fn store_reloc_at(
        &mut self,
        size: SizeMode,
        handle: RegHandle,
        target: Symbol,
        value: Reloc,
        site: &'static Location<'static>,
    ) -> Result<(), Error> {
        self.check_handle(handle)?;
        if value.is_imm() && value.offset == 0 {
            return self.store_zero_at(size, target, site);
        }
        let reg = handle.reg;
        let mode = self.mode_of(reg);
        match (size, mode) {
            (SizeMode::S8, SizeMode::S8) => {
                self.append_at(load_imm(reg, 0), Some(low_half(&value)), None, site)?;
                self.append_at(
                    store_abs(reg),
                    Some(Reloc::to(RelocKind::Addr16, target)),
                    None,
                    site,
                )?;
            }
            (SizeMode::S16, SizeMode::S16) => {
                self.append_at(load_imm(reg, 0), Some(value), None, site)?;
                self.append_at(
                    store_abs(reg),
                    Some(Reloc::to(RelocKind::Addr16, target)),
                    None,
                    site,
                )?;
            }
            (SizeMode::S8, SizeMode::S16) => {
                let mask = size_flag(reg);
                self.append_at(Inst::Sep(mask), None, None, site)?;
                self.set_mode_raw(reg, SizeMode::S8);
                self.append_at(load_imm(reg, 0), Some(low_half(&value)), None, site)?;
                self.append_at(
                    store_abs(reg),
                    Some(Reloc::to(RelocKind::Addr16, target)),
                    None,
                    site,
                )?;
                self.append_at(Inst::Rep(mask), None, None, site)?;
                self.set_mode_raw(reg, SizeMode::S16);
            }
            (SizeMode::S16, SizeMode::S8) => {
                self.append_at(load_imm(reg, 0), Some(low_half(&value)), None, site)?;
                self.append_at(
                    store_abs(reg),
                    Some(Reloc::to(RelocKind::Addr16, target.clone())),
                    None,
                    site,
                )?;
                self.append_at(load_imm(reg, 0), Some(high_half(&value)), None, site)?;
                self.append_at(
                    store_abs(reg),
                    Some(Reloc::with_offset(RelocKind::Addr16, target, 1)),
                    None,
                    site,
                )?;
            }
            (SizeMode::Unset, _) | (_, SizeMode::Unset) => {
                return Err(BuildError::UnsizedRegister(reg).into())
            }
        }
        Ok(())
    }

    /// Store a relocated value through `handle`'s register. An immediate
    /// relocation of zero collapses to the zero-store sequence.
    #[track_caller]
    pub fn store_reloc(
        &mut self,
        size: SizeMode,
        handle: RegHandle,
        target: Symbol,
        value: Reloc,
    ) -> Result<(), Error> {
        self.store_reloc_at(size, handle, target, value, Location::caller())
    }

    fn set_mode_raw(&mut self, reg: Reg, size: SizeMode) {
        match reg {
            Reg::A => {
                self.a_size = size;
                self.bump(Reg::A);
            }
            Reg::X | Reg::Y => {
                self.xy_size = size;
                self.bump(Reg::X);
                self.bump(Reg::Y);
            }
        }
    }
}
