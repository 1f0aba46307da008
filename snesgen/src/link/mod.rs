pub mod mapper;

use crate::error::Error;
use crate::registry::Registry;
use crate::reloc::RelocKind;
use self::mapper::Mapper;

/// Patch the operand bytes of every deferred reference. Runs once, after
/// layout has assigned offsets and the code bytes are in the buffer; the
/// operand bytes start at `func.offset + instr.offset + 1`.
pub fn apply_relocations(
    registry: &Registry,
    mapper: &Mapper,
    rom: &mut [u8],
) -> Result<(), Error> {
    for func in registry.functions() {
        let Some(base) = func.offset else { continue };
        for entry in &func.meta {
            let Some(reloc) = &entry.reloc else { continue };
            let at = (base + entry.offset as u32 + 1) as usize;
            match reloc.kind {
                RelocKind::Imm8 => {
                    rom[at] = reloc.offset as u8;
                }
                RelocKind::Imm16 => {
                    rom[at..at + 2].copy_from_slice(&reloc.offset.to_le_bytes());
                }
                RelocKind::Rel8 => {
                    let target =
                        registry.addr_of(&reloc.target, mapper)? + reloc.offset as u32;
                    let current = mapper.cpu_addr(base + entry.offset as u32)?;
                    rom[at] = target.wrapping_sub(current) as u8;
                }
                RelocKind::Addr16 => {
                    let target =
                        registry.addr_of(&reloc.target, mapper)? + reloc.offset as u32;
                    rom[at..at + 2].copy_from_slice(&(target as u16).to_le_bytes());
                }
                RelocKind::Addr24 => {
                    let target =
                        registry.addr_of(&reloc.target, mapper)? + reloc.offset as u32;
                    rom[at..at + 3].copy_from_slice(&target.to_le_bytes()[..3]);
                }
                RelocKind::AddrLow | RelocKind::AddrHigh | RelocKind::AddrBank => {
                    let target =
                        registry.addr_of(&reloc.target, mapper)? + reloc.offset as u32;
                    let shift = match reloc.kind {
                        RelocKind::AddrHigh => 8,
                        RelocKind::AddrBank => 16,
                        _ => 0,
                    };
                    rom[at] = (target >> shift) as u8;
                }
            }
        }
    }
    Ok(())
}
