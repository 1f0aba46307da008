use std::fmt;
use std::rc::Rc;

use arch::reg::{Reg, SizeMode};
use indexmap::IndexSet;

use crate::builder::Builder;
use crate::error::Error;

/// Generator callback bound to a function symbol. The callback pointer is
/// the symbol's identity.
pub type GenFn = fn(&mut Builder) -> Result<(), Error>;

#[derive(Debug, Clone, Copy)]
pub struct FuncSym {
    pub gen: GenFn,
    pub name: Option<&'static str>,
}

impl FuncSym {
    pub fn new(gen: GenFn) -> Self {
        FuncSym { gen, name: None }
    }

    pub fn named(gen: GenFn, name: &'static str) -> Self {
        FuncSym {
            gen,
            name: Some(name),
        }
    }

    pub(crate) fn key(&self) -> usize {
        self.gen as usize
    }

    pub fn label(&self) -> String {
        match self.name {
            Some(name) => name.to_string(),
            None => format!("fn@{:#x}", self.key()),
        }
    }
}

impl PartialEq for FuncSym {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for FuncSym {}

/// A named byte blob destined for ROM. Identity of the owning `Rc` is the
/// identity of the data symbol.
#[derive(Debug, Clone)]
pub struct DataBlob {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl DataBlob {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Rc<Self> {
        Rc::new(DataBlob {
            name: name.into(),
            bytes,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DataSym(pub Rc<DataBlob>);

impl DataSym {
    pub(crate) fn key(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for DataSym {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for DataSym {}

/// Anything an operand can refer to. Address symbols live at a fixed CPU
/// address and occupy no ROM; function and data symbols get ROM offsets
/// assigned at layout time.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Addr(u32),
    Func(FuncSym),
    Data(DataSym),
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Addr(addr) => write!(f, "${addr:06x}"),
            Symbol::Func(func) => write!(f, "{}", func.label()),
            Symbol::Data(data) => write!(f, "{}", data.0.name),
        }
    }
}

/// Register sizes at entry and exit plus the ordered input/output/clobber
/// sets, inferred while the function generates.
#[derive(Debug, Clone, Default)]
pub struct CallConv {
    pub start_a: SizeMode,
    pub start_xy: SizeMode,
    pub end_a: SizeMode,
    pub end_xy: SizeMode,
    pub inputs: IndexSet<Reg>,
    pub outputs: IndexSet<Reg>,
    pub clobbers: IndexSet<Reg>,
}
