use itertools::chain;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{Error, LinkError};

/// Cartridge memory layout. Only the 32KB-bank layout is implemented;
/// selecting another one fails at the first mapping operation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum MapMode {
    LoRom,
    HiRom,
}

#[derive(Debug, Clone, Copy)]
pub struct Mapper {
    mode: MapMode,
}

impl Mapper {
    pub fn new(mode: MapMode) -> Self {
        Mapper { mode }
    }

    pub fn mode(&self) -> MapMode {
        self.mode
    }

    /// CPU address of a ROM file offset.
    pub fn cpu_addr(&self, offset: u32) -> Result<u32, Error> {
        match self.mode {
            MapMode::LoRom => {
                Ok(((offset / 0x8000 + 0x80) << 16) | (offset % 0x8000 + 0x8000))
            }
            mode => Err(LinkError::UnimplementedMapping(mode).into()),
        }
    }

    /// ROM file offset of a CPU address; the natural restriction of the
    /// forward map (banks 0x80 and up, upper bank half).
    pub fn rom_offset(&self, addr: u32) -> Result<u32, Error> {
        match self.mode {
            MapMode::LoRom => {
                let bank = addr >> 16;
                let low = addr & 0xFFFF;
                if bank >= 0x80 && low >= 0x8000 {
                    Ok((bank - 0x80) * 0x8000 + (low - 0x8000))
                } else {
                    Err(LinkError::UnmappedAddress(addr).into())
                }
            }
            mode => Err(LinkError::UnimplementedMapping(mode).into()),
        }
    }

    /// Fill `out` with every CPU address aliasing the same byte as `addr`,
    /// excluding `addr` itself.
    pub fn mirrors(&self, addr: u32, out: &mut Vec<u32>) -> Result<(), Error> {
        if self.mode != MapMode::LoRom {
            return Err(LinkError::UnimplementedMapping(self.mode).into());
        }
        let bank = addr >> 16;
        let low = addr & 0xFFFF;
        let banded = bank <= 0x3F || (0x80..=0xBF).contains(&bank);
        if low < 0x2000 && (banded || bank == 0x7E) {
            // low RAM: mirrored across the band and pinned to bank 0x7E
            for b in chain(0x00..=0x3Fu32, 0x80..=0xBFu32) {
                let alias = (b << 16) | low;
                if alias != addr {
                    out.push(alias);
                }
            }
            let pinned = 0x7E0000 | low;
            if pinned != addr {
                out.push(pinned);
            }
        } else if (0x2000..0x6000).contains(&low) && banded {
            // I/O registers: visible in every bank of the band
            for b in chain(0x00..=0x3Fu32, 0x80..=0xBFu32) {
                let alias = (b << 16) | low;
                if alias != addr {
                    out.push(alias);
                }
            }
        } else if low >= 0x8000 && bank != 0x7E && bank != 0x7F {
            // ROM half of a bank aliases its counterpart half of the map
            let alias = addr ^ 0x80_0000;
            let alias_bank = alias >> 16;
            if alias_bank != 0x7E && alias_bank != 0x7F {
                out.push(alias);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lorom_maps_offset_zero_to_bank_80() {
        let mapper = Mapper::new(MapMode::LoRom);
        assert_eq!(mapper.cpu_addr(0).unwrap(), 0x808000);
        assert_eq!(mapper.cpu_addr(0x7FFF).unwrap(), 0x80FFFF);
        assert_eq!(mapper.cpu_addr(0x8000).unwrap(), 0x818000);
        assert_eq!(mapper.cpu_addr(0x1_FFFF).unwrap(), 0x83FFFF);
    }

    #[test]
    fn round_trip_over_the_whole_file() {
        let mapper = Mapper::new(MapMode::LoRom);
        for offset in (0..0x20000u32).step_by(0x777) {
            let addr = mapper.cpu_addr(offset).unwrap();
            assert_eq!(mapper.rom_offset(addr).unwrap(), offset);
        }
    }

    #[test]
    fn unmapped_addresses_are_rejected() {
        let mapper = Mapper::new(MapMode::LoRom);
        assert!(mapper.rom_offset(0x002100).is_err());
        assert!(mapper.rom_offset(0x807FFF).is_err());
        assert!(mapper.rom_offset(0x7E8000).is_err());
    }

    #[test]
    fn hirom_is_not_implemented() {
        let mapper = Mapper::new(MapMode::HiRom);
        assert!(matches!(
            mapper.cpu_addr(0),
            Err(Error::Link(LinkError::UnimplementedMapping(MapMode::HiRom)))
        ));
        assert!(mapper.rom_offset(0x808000).is_err());
        assert!(mapper.mirrors(0x002100, &mut Vec::new()).is_err());
    }

    #[test]
    fn io_register_mirrors_span_the_band() {
        let mapper = Mapper::new(MapMode::LoRom);
        let mut out = Vec::new();
        mapper.mirrors(0x002100, &mut out).unwrap();
        let expected: Vec<u32> = (0x01..=0x3Fu32)
            .chain(0x80..=0xBF)
            .map(|b| (b << 16) | 0x2100)
            .collect();
        assert_eq!(out, expected);
        assert!(!out.contains(&0x002100));
    }

    #[test]
    fn low_ram_mirrors_include_bank_7e() {
        let mapper = Mapper::new(MapMode::LoRom);
        let mut out = Vec::new();
        mapper.mirrors(0x801000, &mut out).unwrap();
        assert_eq!(out.len(), 128);
        assert!(out.contains(&0x001000));
        assert!(out.contains(&0x7E1000));
        assert!(!out.contains(&0x801000));
    }

    #[test]
    fn rom_bytes_alias_the_other_half_of_the_map() {
        let mapper = Mapper::new(MapMode::LoRom);
        let mut out = Vec::new();
        mapper.mirrors(0x808000, &mut out).unwrap();
        assert_eq!(out, vec![0x008000]);
        out.clear();
        mapper.mirrors(0x008000, &mut out).unwrap();
        assert_eq!(out, vec![0x808000]);
        out.clear();
        // the counterpart of bank 0xFE is WRAM, which carries no ROM
        mapper.mirrors(0xFE8000, &mut out).unwrap();
        assert!(out.is_empty());
    }
}
