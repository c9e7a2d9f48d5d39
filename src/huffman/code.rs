use std::collections::HashMap;
use std::fmt::{self, Display};
use std::str::FromStr;

use log::warn;

use super::tree::{HuffmanTree, NodeKind};
use super::{FrequencyTable, Symbol, ALPHABET_SIZE};

/// Longest code word that is assigned; deeper leaves get truncated codes.
pub const MAX_CODE_LENGTH: usize = 255;

/// A code word, bits packed MSB first. Unused bits of the last byte are zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Code {
    bits: Vec<u8>,
    length: usize,
}

impl Code {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bit: bool) {
        if self.length % 8 == 0 {
            self.bits.push(0);
        }
        if bit {
            self.bits[self.length / 8] |= 0b1000_0000 >> (self.length % 8);
        }
        self.length += 1;
    }

    pub fn with(&self, bit: bool) -> Self {
        let mut code = self.clone();
        code.push(bit);
        code
    }

    pub fn clear(&mut self) {
        self.bits.clear();
        self.length = 0;
    }

    pub fn bit(&self, index: usize) -> bool {
        self.bits[index / 8] & (0b1000_0000 >> (index % 8)) != 0
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bits
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for index in 0..self.length {
            f.write_str(if self.bit(index) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidCodeCharacter(pub char);

impl FromStr for Code {
    type Err = InvalidCodeCharacter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut code = Code::new();
        for c in s.chars() {
            match c {
                '0' => code.push(false),
                '1' => code.push(true),
                other => return Err(InvalidCodeCharacter(other)),
            }
        }
        Ok(code)
    }
}

/// Mapping from symbol to code word.
#[derive(Clone, Debug)]
pub struct CodeTable {
    codes: Vec<Option<Code>>,
}

impl CodeTable {
    pub fn new() -> Self {
        Self {
            codes: vec![None; ALPHABET_SIZE],
        }
    }

    /// Walks the tree depth first with an explicit stack; left edges are 0,
    /// right edges are 1.
    ///
    /// A tree consisting of a single leaf yields the one bit code `0` for
    /// that symbol, an empty code could not be told apart from no input.
    pub fn from_tree(tree: &HuffmanTree) -> Self {
        let mut table = Self::new();
        let root = tree.node(tree.root_index());
        if let NodeKind::Leaf { symbol } = root.kind {
            table.insert(symbol, Code::new().with(false));
            return table;
        }

        let mut truncated = 0;
        let mut stack = vec![(tree.root_index(), Code::new())];
        while let Some((index, prefix)) = stack.pop() {
            match tree.node(index).kind {
                NodeKind::Leaf { symbol } => table.insert(symbol, prefix),
                NodeKind::Inner { left, right } => {
                    if prefix.len() >= MAX_CODE_LENGTH {
                        truncated += 1;
                        continue;
                    }
                    stack.push((right, prefix.with(true)));
                    stack.push((left, prefix.with(false)));
                }
            }
        }
        if truncated > 0 {
            warn!(
                "{} subtrees exceed the maximum code length of {} bits and were dropped",
                truncated, MAX_CODE_LENGTH
            );
        }
        table
    }

    pub fn insert(&mut self, symbol: Symbol, code: Code) {
        self.codes[symbol as usize] = Some(code);
    }

    pub fn get(&self, symbol: Symbol) -> Option<&Code> {
        self.codes[symbol as usize].as_ref()
    }

    /// Present symbols and their codes in ascending symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &Code)> + '_ {
        self.codes
            .iter()
            .enumerate()
            .filter_map(|(symbol, code)| code.as_ref().map(|code| (symbol as Symbol, code)))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.iter().all(Option::is_none)
    }

    pub fn max_code_length(&self) -> usize {
        self.iter().map(|(_, code)| code.len()).max().unwrap_or(0)
    }

    /// Exact-match lookup from code word back to symbol.
    pub fn reverse(&self) -> HashMap<Code, Symbol> {
        self.iter()
            .map(|(symbol, code)| (code.clone(), symbol))
            .collect()
    }

    /// Expected code length in bits per symbol for the given frequencies.
    pub fn average_code_length(&self, frequencies: &FrequencyTable) -> f64 {
        let total = frequencies.total();
        if total == 0 {
            return 0.0;
        }
        let bits: u64 = frequencies
            .present()
            .map(|sf| sf.frequency * self.get(sf.symbol).map_or(0, Code::len) as u64)
            .sum();
        bits as f64 / total as f64
    }
}

impl Default for CodeTable {
    fn default() -> Self {
        Self::new()
    }
}
