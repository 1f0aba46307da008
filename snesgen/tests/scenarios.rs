use arch::inst::Inst;
use arch::reg::SizeMode;
use snesgen::{
    write_coverage, Builder, Context, Error, FuncSym, MapMode, Mapper, RelocKind, Symbol,
};

fn build(entry: FuncSym) -> Vec<u8> {
    let mut ctx = Context::new(MapMode::LoRom);
    ctx.register(entry).unwrap();
    let mut rom = vec![0u8; 0x20000];
    ctx.finish(&mut rom).unwrap();
    rom
}

#[test]
fn tiny_loop() {
    fn entry(b: &mut Builder) -> Result<(), Error> {
        let l = b.create_label();
        b.define_label(l);
        b.emit(Inst::Nop)?;
        b.branch_always(l)
    }
    let rom = build(FuncSym::new(entry));
    assert_eq!(&rom[..3], [0xEA, 0x80, 0xFE]);
}

#[test]
fn long_branch_falls_back_to_jmp() {
    fn entry(b: &mut Builder) -> Result<(), Error> {
        let l = b.create_label();
        b.define_label(l);
        for _ in 0..200 {
            b.emit(Inst::Nop)?;
        }
        b.branch_always(l)
    }
    let rom = build(FuncSym::new(entry));
    assert_eq!(&rom[200..203], [0x4C, 0x00, 0x80]);
}

#[test]
fn call_convention_propagates_outward() {
    fn f(b: &mut Builder) -> Result<(), Error> {
        b.call(FuncSym::named(g, "g"))?;
        b.emit(Inst::Rts)
    }
    fn g(b: &mut Builder) -> Result<(), Error> {
        b.reg_a8()?;
        b.emit(Inst::Rts)
    }
    let mut ctx = Context::new(MapMode::LoRom);
    ctx.register(FuncSym::named(f, "f")).unwrap();
    let f_func = ctx.registry.lookup(&FuncSym::new(f)).unwrap();
    let g_func = ctx.registry.lookup(&FuncSym::new(g)).unwrap();
    assert_eq!(g_func.conv.start_a, SizeMode::S8);
    assert_eq!(f_func.conv.start_a, SizeMode::S8);
    // no sep/rep was emitted in f for the inherited mode
    assert!(f_func
        .meta
        .iter()
        .all(|m| !matches!(m.inst, Inst::Sep(_) | Inst::Rep(_))));
}

#[test]
fn store_zero_16bit_with_8bit_accumulator() {
    const ADDR: Symbol = Symbol::Addr(0x002140);

    fn entry(b: &mut Builder) -> Result<(), Error> {
        let a = b.reg_a8()?;
        b.store_value(SizeMode::S16, a, ADDR, 0)?;
        b.emit(Inst::Rts)
    }
    let mut ctx = Context::new(MapMode::LoRom);
    ctx.register(FuncSym::new(entry)).unwrap();
    let func = ctx.registry.lookup(&FuncSym::new(entry)).unwrap();
    let stores: Vec<_> = func
        .meta
        .iter()
        .filter(|m| matches!(m.inst, Inst::StzAbs(_)))
        .collect();
    assert_eq!(stores.len(), 2);
    for (i, store) in stores.iter().enumerate() {
        let reloc = store.reloc.as_ref().unwrap();
        assert_eq!(reloc.kind, RelocKind::Addr16);
        assert_eq!(reloc.target, ADDR);
        assert_eq!(reloc.offset, i as u16);
    }
    assert!(func
        .meta
        .iter()
        .all(|m| !matches!(m.inst, Inst::Sep(_) | Inst::Rep(_))));
}

#[test]
fn mirror_enumeration_of_an_io_register() {
    let mapper = Mapper::new(MapMode::LoRom);
    let mut mirrors = Vec::new();
    mapper.mirrors(0x002100, &mut mirrors).unwrap();
    let expected: Vec<u32> = (0x01..=0x3Fu32)
        .chain(0x80..=0xBF)
        .map(|bank| (bank << 16) | 0x2100)
        .collect();
    assert_eq!(mirrors, expected);
    assert!(!mirrors.contains(&0x002100));
}

#[test]
fn coverage_crc_of_an_all_zero_rom() {
    let rom = vec![0u8; 0x20000];
    let flags = vec![0u8; rom.len()];
    let mut out = Vec::new();
    write_coverage(&mut out, &rom, &flags).unwrap();
    assert_eq!(&out[..5], b"CDLv2");
    assert_eq!(&out[5..9], &0u32.to_le_bytes());
    assert_eq!(out.len(), 9 + rom.len());
}
