use std::fs::File;
use std::io::BufWriter;
use std::rc::Rc;

use arch::inst::Inst;
use arch::reg::{Reg, SizeMode};
use clap::Parser;
use color_print::cprintln;
use snesgen::{
    coverage, write_coverage, write_labels, Builder, Context, DataBlob, DataSym, Error,
    FuncSym, MapMode, Reloc, RelocKind, Symbol,
};

#[derive(Debug, clap::Parser)]
#[clap(author, version, about)]
struct Args {
    /// Output ROM image
    #[clap(short, long, default_value = "demo.sfc")]
    output: String,

    /// Debugger label file
    #[clap(long, default_value = "demo.labels.txt")]
    labels: String,

    /// Coverage (CDL) file
    #[clap(long, default_value = "demo.cdl")]
    coverage: String,

    /// Cartridge mapping mode
    #[clap(short, long, default_value = "lorom")]
    map: MapMode,

    /// ROM size in KiB
    #[clap(long, default_value_t = 128)]
    size_kib: usize,

    /// Enable verbose output
    #[clap(short, long)]
    verbose: bool,
}

// PPU and CPU I/O registers touched by the demo program
const INIDISP: Symbol = Symbol::Addr(0x002100);
const BGMODE: Symbol = Symbol::Addr(0x002105);
const CGADD: Symbol = Symbol::Addr(0x002121);
const VMADD: Symbol = Symbol::Addr(0x002116);
const NMITIMEN: Symbol = Symbol::Addr(0x004200);

thread_local! {
    static PALETTE: Rc<DataBlob> =
        DataBlob::new("palette", vec![0x00, 0x00, 0xFF, 0x7F, 0x1F, 0x00, 0xE0, 0x03]);
}

fn palette_sym() -> Symbol {
    PALETTE.with(|blob| Symbol::Data(DataSym(blob.clone())))
}

fn clear_ppu(b: &mut Builder) -> Result<(), Error> {
    let _a = b.reg_a8()?;
    // background mode and color address start from a known state
    b.store_zero(SizeMode::S8, BGMODE)?;
    b.store_zero(SizeMode::S8, CGADD)?;
    b.store_zero(SizeMode::S16, VMADD)?;
    b.emit(Inst::Rts)
}

fn reset(b: &mut Builder) -> Result<(), Error> {
    let a = b.reg_a8()?;
    b.reg_xy16()?;
    // force blank while the hardware comes up
    b.store_value(SizeMode::S8, a, INIDISP, 0x8F)?;
    b.store_zero(SizeMode::S8, NMITIMEN)?;
    b.call(FuncSym::named(clear_ppu, "clear_ppu"))?;
    // point the VRAM port at the palette image in ROM
    let a = b.reg(Reg::A);
    b.store_reloc(
        SizeMode::S16,
        a,
        VMADD,
        Reloc::to(RelocKind::Addr16, palette_sym()),
    )?;
    // screen on, full brightness
    let a = b.reg(Reg::A);
    b.store_value(SizeMode::S8, a, INIDISP, 0x0F)?;
    let idle = b.create_label();
    b.define_label(idle);
    b.emit(Inst::Nop)?;
    b.branch_always(idle)
}

fn main() {
    let args = Args::parse();
    let mut ctx = Context::new(args.map);

    // Phase 1: generate every function reachable from the entry point
    if let Err(e) = ctx.register(FuncSym::named(reset, "reset")) {
        eprintln!("Generation error: {e}");
        std::process::exit(1);
    }

    // Phase 2: layout, placement, relocation
    let mut rom = vec![0u8; args.size_kib * 1024];
    if let Err(e) = ctx.finish(&mut rom) {
        eprintln!("Link error: {e}");
        std::process::exit(1);
    }

    if args.verbose {
        println!("=== Layout ===");
        for func in ctx.registry.functions() {
            let offset = func.offset.unwrap_or(0);
            let addr = ctx.mapper().cpu_addr(offset).unwrap_or(0);
            cprintln!(
                "  <y>0x{:06X}</> <g>{:<12}</> {} bytes",
                addr,
                func.name.unwrap_or("?"),
                func.code.len()
            );
            for entry in &func.meta {
                cprintln!("    <y>{:04x}</>: <b>{}</>", entry.offset, entry.inst);
            }
        }
        for data in ctx.registry.data_entries() {
            let offset = data.offset.unwrap_or(0);
            let addr = ctx.mapper().cpu_addr(offset).unwrap_or(0);
            cprintln!(
                "  <y>0x{:06X}</> <g>{:<12}</> {} bytes (data)",
                addr,
                data.blob.name,
                data.blob.bytes.len()
            );
        }
        println!();
    }

    // Phase 3: ROM image and the debugger companion files
    let flags = coverage(&ctx.registry, rom.len());
    if let Err(e) = std::fs::write(&args.output, &rom) {
        eprintln!("Failed to write {}: {e}", args.output);
        std::process::exit(1);
    }
    let result = File::create(&args.labels)
        .map(BufWriter::new)
        .and_then(|mut w| write_labels(&mut w, &ctx.registry));
    if let Err(e) = result {
        eprintln!("Failed to write {}: {e}", args.labels);
        std::process::exit(1);
    }
    let result = File::create(&args.coverage)
        .map(BufWriter::new)
        .and_then(|mut w| write_coverage(&mut w, &rom, &flags));
    if let Err(e) = result {
        eprintln!("Failed to write {}: {e}", args.coverage);
        std::process::exit(1);
    }

    println!(
        "Wrote {} ({} KiB), {}, {}",
        args.output, args.size_kib, args.labels, args.coverage
    );
}
