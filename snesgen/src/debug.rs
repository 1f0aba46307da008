use std::io::{self, Write};

use num_enum::IntoPrimitive;
use once_cell::sync::Lazy;

use crate::registry::Registry;
use crate::symbol::Symbol;

/// Per-byte coverage flags of the CDL file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[repr(u8)]
pub enum CdlFlag {
    Code = 0x01,
    Data = 0x02,
    JumpTarget = 0x04,
    SubEntryPoint = 0x08,
    Index8 = 0x10,
    Memory8 = 0x20,
    Gsu = 0x40,
    Cx4 = 0x80,
}

// The debugger's CRC variant: shift-right with this constant, zero init,
// no reflection, no final xor. Not standard CRC-32.
const CRC_POLY: u32 = 0x77073096;

static CRC_TABLE: Lazy<[u32; 256]> = Lazy::new(|| {
    let mut table = [0u32; 256];
    for (i, slot) in table.iter_mut().enumerate() {
        let mut crc = i as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ CRC_POLY
            } else {
                crc >> 1
            };
        }
        *slot = crc;
    }
    table
});

pub fn rom_crc(rom: &[u8]) -> u32 {
    rom.iter().fold(0u32, |crc, &byte| {
        (crc >> 8) ^ CRC_TABLE[((crc ^ byte as u32) & 0xFF) as usize]
    })
}

fn mark(flags: &mut [u8], start: u32, len: usize, flag: CdlFlag) {
    let start = start as usize;
    let end = (start + len).min(flags.len());
    let start = start.min(flags.len());
    for byte in &mut flags[start..end] {
        *byte |= u8::from(flag);
    }
}

/// One coverage-flag byte per ROM byte, derived from the laid-out registry.
pub fn coverage(registry: &Registry, rom_len: usize) -> Vec<u8> {
    let mut flags = vec![0u8; rom_len];
    for func in registry.functions() {
        let Some(base) = func.offset else { continue };
        for entry in &func.meta {
            let size = entry.inst.size(entry.a_size, entry.xy_size) as usize;
            let at = base + entry.offset as u32;
            mark(&mut flags, at, size, CdlFlag::Code);
            if entry.inst.acc_mem_op() && entry.a_size == arch::SizeMode::S8 {
                mark(&mut flags, at, size, CdlFlag::Memory8);
            }
            if entry.inst.index_mem_op() && entry.xy_size == arch::SizeMode::S8 {
                mark(&mut flags, at, size, CdlFlag::Index8);
            }
        }
    }
    for entry in registry.data_entries() {
        let Some(base) = entry.offset else { continue };
        mark(&mut flags, base, entry.blob.bytes.len(), CdlFlag::Data);
    }
    // control-transfer targets: the first instruction at or past the
    // relocation's target offset
    for func in registry.functions() {
        for entry in &func.meta {
            let Some(reloc) = &entry.reloc else { continue };
            let Symbol::Func(target_sym) = &reloc.target else { continue };
            let Some(target) = registry.lookup(target_sym) else { continue };
            let Some(target_base) = target.offset else { continue };
            let Some(hit) = target.meta.iter().find(|m| m.offset >= reloc.offset) else {
                continue;
            };
            let flag = if entry.inst.is_subroutine_call() {
                CdlFlag::SubEntryPoint
            } else {
                CdlFlag::JumpTarget
            };
            let size = hit.inst.size(hit.a_size, hit.xy_size) as usize;
            mark(&mut flags, target_base + hit.offset as u32, size, flag);
        }
    }
    flags
}

/// `CDLv2`, little-endian ROM CRC, then the raw flag bytes.
pub fn write_coverage<W: Write>(out: &mut W, rom: &[u8], flags: &[u8]) -> io::Result<()> {
    out.write_all(b"CDLv2")?;
    out.write_all(&rom_crc(rom).to_le_bytes())?;
    out.write_all(flags)
}

/// Debugger label file: one line per instruction carrying a label or
/// comments. Additional comments are joined with a literal `\n`.
pub fn write_labels<W: Write>(out: &mut W, registry: &Registry) -> io::Result<()> {
    for func in registry.functions() {
        let Some(name) = func.name else { continue };
        let Some(base) = func.offset else { continue };
        for entry in &func.meta {
            let label = if entry.offset == 0 { name } else { "" };
            if label.is_empty() && entry.comments.is_empty() {
                continue;
            }
            write!(out, "SnesPrgRom:{:x}:{}", base + entry.offset as u32, label)?;
            if !entry.comments.is_empty() {
                write!(out, ":{}", entry.comments.join("\\n"))?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}
