use num_enum::IntoPrimitive;

use crate::reg::SizeMode;

/// Bits of the processor status register, as targeted by `sep`/`rep`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[repr(u8)]
pub enum Flag {
    Carry = 0x01,
    Zero = 0x02,
    IrqDisable = 0x04,
    Decimal = 0x08,
    IndexSize = 0x10,
    MemorySize = 0x20,
    Overflow = 0x40,
    Negative = 0x80,
}

/// Partial update of the status register. Each field is tri-valued:
/// `None` leaves the flag alone, `Some(true)` sets it, `Some(false)`
/// clears it. For the two size bits, "set" selects the 8-bit width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusUpdate {
    pub carry: Option<bool>,
    pub zero: Option<bool>,
    pub irq_disable: Option<bool>,
    pub decimal: Option<bool>,
    pub index_8bit: Option<bool>,
    pub memory_8bit: Option<bool>,
    pub overflow: Option<bool>,
    pub negative: Option<bool>,
}

impl StatusUpdate {
    pub fn a_size(size: SizeMode) -> Self {
        StatusUpdate {
            memory_8bit: Some(size == SizeMode::S8),
            ..Default::default()
        }
    }

    pub fn xy_size(size: SizeMode) -> Self {
        StatusUpdate {
            index_8bit: Some(size == SizeMode::S8),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == StatusUpdate::default()
    }

    /// Reduce the update to a `sep` mask and a `rep` mask.
    pub fn masks(&self) -> (u8, u8) {
        let fields = [
            (Flag::Carry, self.carry),
            (Flag::Zero, self.zero),
            (Flag::IrqDisable, self.irq_disable),
            (Flag::Decimal, self.decimal),
            (Flag::IndexSize, self.index_8bit),
            (Flag::MemorySize, self.memory_8bit),
            (Flag::Overflow, self.overflow),
            (Flag::Negative, self.negative),
        ];
        let mut set = 0u8;
        let mut clear = 0u8;
        for (flag, value) in fields {
            match value {
                Some(true) => set |= u8::from(flag),
                Some(false) => clear |= u8::from(flag),
                None => {}
            }
        }
        (set, clear)
    }
}
