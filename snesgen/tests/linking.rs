use arch::inst::Inst;
use snesgen::{
    coverage, write_labels, Builder, CdlFlag, Context, DataBlob, DataSym, Error, FuncSym,
    MapMode, Reloc, RelocKind, Symbol,
};

#[test]
fn jsr_operand_is_patched_with_the_callee_address() {
    fn main_fn(b: &mut Builder) -> Result<(), Error> {
        b.call(FuncSym::named(leaf, "leaf"))?;
        b.emit(Inst::Rts)
    }
    fn leaf(b: &mut Builder) -> Result<(), Error> {
        b.emit(Inst::Rts)
    }
    let mut ctx = Context::new(MapMode::LoRom);
    ctx.register(FuncSym::named(main_fn, "main")).unwrap();
    let mut rom = vec![0u8; 0x8000];
    ctx.finish(&mut rom).unwrap();
    // main: jsr leaf; rts / leaf: rts -- leaf lands at offset 4
    assert_eq!(&rom[..5], [0x20, 0x04, 0x80, 0x60, 0x60]);
}

#[test]
fn jump_long_to_a_symbol_uses_the_full_address() {
    fn main_fn(b: &mut Builder) -> Result<(), Error> {
        b.emit(Inst::Nop)?;
        b.jump_long(FuncSym::named(far, "far"))
    }
    fn far(b: &mut Builder) -> Result<(), Error> {
        b.emit(Inst::Rtl)
    }
    let mut ctx = Context::new(MapMode::LoRom);
    ctx.register(FuncSym::new(main_fn)).unwrap();
    let mut rom = vec![0u8; 0x8000];
    ctx.finish(&mut rom).unwrap();
    // nop; jml far -- far lands at offset 5 = cpu 0x808005
    assert_eq!(&rom[..6], [0xEA, 0x5C, 0x05, 0x80, 0x80, 0x6B]);
}

#[test]
fn jump_long_to_a_local_label_relocates_against_the_function() {
    fn entry(b: &mut Builder) -> Result<(), Error> {
        let l = b.create_label();
        b.define_label(l);
        b.emit(Inst::Nop)?;
        b.jump_long(l)
    }
    let mut ctx = Context::new(MapMode::LoRom);
    ctx.register(FuncSym::new(entry)).unwrap();
    let mut rom = vec![0u8; 0x8000];
    ctx.finish(&mut rom).unwrap();
    assert_eq!(&rom[..5], [0xEA, 0x5C, 0x00, 0x80, 0x80]);
}

#[test]
fn rel8_is_relative_to_the_instruction_address() {
    fn entry(b: &mut Builder) -> Result<(), Error> {
        b.emit(Inst::Nop)?;
        b.emit_reloc(Inst::Beq(0), Reloc::to(RelocKind::Rel8, Symbol::Addr(0x808000)))?;
        b.emit(Inst::Rts)
    }
    let mut ctx = Context::new(MapMode::LoRom);
    ctx.register(FuncSym::new(entry)).unwrap();
    let mut rom = vec![0u8; 0x8000];
    ctx.finish(&mut rom).unwrap();
    // beq sits at cpu 0x808001, the target one byte before it
    assert_eq!(&rom[..4], [0xEA, 0xF0, 0xFF, 0x60]);
}

#[test]
fn data_is_placed_after_code_and_byte_relocs_pick_it_apart() {
    thread_local! {
        static TILES: std::rc::Rc<DataBlob> =
            DataBlob::new("tiles", vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }
    fn tiles() -> Symbol {
        TILES.with(|blob| Symbol::Data(DataSym(blob.clone())))
    }
    fn entry(b: &mut Builder) -> Result<(), Error> {
        b.reg_a8()?;
        b.emit_reloc(Inst::LdaImm(0), Reloc::to(RelocKind::AddrBank, tiles()))?;
        b.emit_reloc(Inst::LdaImm(0), Reloc::to(RelocKind::AddrHigh, tiles()))?;
        b.emit_reloc(Inst::LdaImm(0), Reloc::to(RelocKind::AddrLow, tiles()))?;
        b.emit(Inst::Rts)
    }
    let mut ctx = Context::new(MapMode::LoRom);
    ctx.register(FuncSym::new(entry)).unwrap();
    let mut rom = vec![0u8; 0x8000];
    ctx.finish(&mut rom).unwrap();
    // code is 7 bytes, so the blob sits at offset 7 = cpu 0x808007
    assert_eq!(&rom[7..11], [0xDE, 0xAD, 0xBE, 0xEF]);
    assert_eq!(rom[1], 0x80);
    assert_eq!(rom[3], 0x80);
    assert_eq!(rom[5], 0x07);
}

#[test]
fn label_file_names_the_function_at_its_entry() {
    fn named(b: &mut Builder) -> Result<(), Error> {
        b.emit(Inst::Nop)?;
        b.emit(Inst::Rts)
    }
    fn anon(b: &mut Builder) -> Result<(), Error> {
        b.emit(Inst::Rts)
    }
    let mut ctx = Context::new(MapMode::LoRom);
    ctx.register(FuncSym::new(anon)).unwrap();
    ctx.register(FuncSym::named(named, "spin_forever")).unwrap();
    let mut rom = vec![0u8; 0x8000];
    ctx.finish(&mut rom).unwrap();
    let mut out = Vec::new();
    write_labels(&mut out, &ctx.registry).unwrap();
    let text = String::from_utf8(out).unwrap();
    // the anonymous function contributes nothing; the named one lands at 1
    assert_eq!(text, "SnesPrgRom:1:spin_forever\n");
}

#[test]
fn coverage_marks_code_data_modes_and_call_targets() {
    fn main_fn(b: &mut Builder) -> Result<(), Error> {
        b.reg_a8()?;
        b.reg_xy16()?;
        b.emit(Inst::LdaImm(1))?;
        b.emit(Inst::LdxImm(0x100))?;
        b.call(FuncSym::named(leaf, "leaf"))?;
        b.emit(Inst::Rts)
    }
    fn leaf(b: &mut Builder) -> Result<(), Error> {
        b.emit(Inst::Rts)
    }
    thread_local! {
        static BLOB: std::rc::Rc<DataBlob> = DataBlob::new("blob", vec![0; 3]);
    }
    let mut ctx = Context::new(MapMode::LoRom);
    ctx.register(FuncSym::new(main_fn)).unwrap();
    BLOB.with(|blob| ctx.register_data(blob.clone()));
    let mut rom = vec![0u8; 0x8000];
    ctx.finish(&mut rom).unwrap();
    let flags = coverage(&ctx.registry, rom.len());

    let code: u8 = CdlFlag::Code.into();
    let mem8: u8 = CdlFlag::Memory8.into();
    let sub: u8 = CdlFlag::SubEntryPoint.into();
    let data: u8 = CdlFlag::Data.into();
    // main: lda #1 (2 bytes, 8-bit A), ldx #$100 (3 bytes, 16-bit X),
    // jsr (3 bytes), rts; leaf: rts at offset 9
    assert_eq!(flags[0], code | mem8);
    assert_eq!(flags[1], code | mem8);
    assert_eq!(flags[2], code);
    assert_eq!(flags[5], code);
    assert_eq!(flags[9], code | sub);
    // the data blob follows the two functions
    assert_eq!(flags[10], data);
    assert_eq!(flags[12], data);
    assert_eq!(flags[13], 0);
}
