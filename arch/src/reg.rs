use num_enum::{FromPrimitive, IntoPrimitive};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Default,
    FromPrimitive,
    IntoPrimitive,
    EnumString,
    Display,
)]
#[repr(u8)]
#[strum(serialize_all = "lowercase")]
pub enum Reg {
    #[default]
    A,
    X,
    Y,
}

impl Reg {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_ascii_lowercase().parse::<Self>() {
            Ok(r) => Ok(r),
            Err(_) => Err(format!("Unknown reg name: {s}")),
        }
    }
}

/// Operand width selected by the status register. `Unset` means the width
/// has not been constrained yet in the current function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display)]
pub enum SizeMode {
    #[default]
    #[strum(serialize = "unset")]
    Unset,
    #[strum(serialize = "8bit")]
    S8,
    #[strum(serialize = "16bit")]
    S16,
}

impl SizeMode {
    pub fn is_set(self) -> bool {
        self != SizeMode::Unset
    }

    /// Width of an immediate operand under this mode, in bytes.
    pub fn bytes(self) -> u16 {
        match self {
            SizeMode::S8 => 1,
            SizeMode::S16 => 2,
            SizeMode::Unset => panic!("operand width is not set"),
        }
    }
}

#[test]
fn test() {
    println!("{}", Reg::A);
    println!("{:?}", Reg::parse("x"));
    println!("{:?}", Reg::parse("Y"));
    assert!(Reg::parse("pc").is_err());
    assert_eq!(SizeMode::S8.bytes(), 1);
    assert_eq!(SizeMode::S16.bytes(), 2);
}
