pub mod code;
pub mod decoder;
pub mod encoder;
pub mod frequency;
pub mod tree;

pub use code::{Code, CodeTable, MAX_CODE_LENGTH};
pub use decoder::{CodingError, HuffmanDecoder};
pub use encoder::HuffmanEncoder;
pub use frequency::FrequencyTable;
pub use tree::{HuffmanTree, TreeBuildError};

pub type Symbol = u8;

pub const ALPHABET_SIZE: usize = Symbol::MAX as usize + 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SymbolFrequency {
    pub symbol: Symbol,
    pub frequency: u64,
}

impl From<(Symbol, u64)> for SymbolFrequency {
    fn from(value: (Symbol, u64)) -> Self {
        Self {
            symbol: value.0,
            frequency: value.1,
        }
    }
}
