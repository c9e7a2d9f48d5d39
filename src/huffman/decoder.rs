use std::collections::HashMap;
use std::fmt::Display;
use std::io::{self, Read, Write};

use log::trace;

use super::{Code, CodeTable, Symbol};
use crate::binary_stream::BitReader;

#[derive(Debug)]
pub enum CodingError {
    /// bits since the last symbol exceed the longest known code word
    NoMatchingCode { bit_offset: u64 },
    /// the stream ended in the middle of a code word
    IncompleteCode { bit_offset: u64 },
    Read(io::Error),
    Write(io::Error),
}

impl Display for CodingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoMatchingCode { bit_offset } => write!(
                f,
                "No code word matches the bits ending at bit offset {}",
                bit_offset
            ),
            Self::IncompleteCode { bit_offset } => write!(
                f,
                "Bit stream ends inside a code word at bit offset {}",
                bit_offset
            ),
            Self::Read(error) => write!(f, "Unable to read packed data: {}", error),
            Self::Write(error) => write!(f, "Unable to write decoded data: {}", error),
        }
    }
}

impl std::error::Error for CodingError {}

/// Decodes a bit stream by exact-match lookup of the bits read since the
/// last emitted symbol.
pub struct HuffmanDecoder {
    reverse_table: HashMap<Code, Symbol>,
    max_code_length: usize,
}

impl HuffmanDecoder {
    pub fn new(code_table: &CodeTable) -> Self {
        HuffmanDecoder {
            reverse_table: code_table.reverse(),
            max_code_length: code_table.max_code_length(),
        }
    }

    /// Writes every decoded symbol to `out`, returns the number of symbols.
    pub fn decode<R: Read, W: Write>(
        &self,
        bits: &mut BitReader<R>,
        out: &mut W,
    ) -> Result<u64, CodingError> {
        let mut candidate = Code::new();
        let mut symbols = 0;
        while let Some(bit) = bits.read_bit().map_err(CodingError::Read)? {
            candidate.push(bit);
            if let Some(&symbol) = self.reverse_table.get(&candidate) {
                out.write_all(&[symbol]).map_err(CodingError::Write)?;
                symbols += 1;
                candidate.clear();
            } else if candidate.len() >= self.max_code_length {
                return Err(CodingError::NoMatchingCode {
                    bit_offset: bits.bits_read(),
                });
            }
        }
        if !candidate.is_empty() {
            return Err(CodingError::IncompleteCode {
                bit_offset: bits.bits_read(),
            });
        }
        trace!("Decoded {} symbols from {} bits", symbols, bits.bits_read());
        Ok(symbols)
    }
}

#[cfg(test)]
mod test {
    use super::{CodingError, HuffmanDecoder};
    use crate::binary_stream::BitReader;
    use crate::huffman::{Code, CodeTable};

    fn code_table(entries: &[(u8, &str)]) -> CodeTable {
        let mut table = CodeTable::new();
        for &(symbol, code) in entries {
            table.insert(symbol, code.parse::<Code>().unwrap());
        }
        table
    }

    fn abcd_table() -> CodeTable {
        code_table(&[(b'a', "0"), (b'b', "10"), (b'c', "110"), (b'd', "111")])
    }

    #[test]
    fn test_decode_packed_bytes() {
        let decoder = HuffmanDecoder::new(&abcd_table());
        let packed: &[u8] = &[0b0000_1010, 0b1011_0110, 0b1110_0000];
        let mut bits = BitReader::new(packed, 3, 5);
        let mut output = Vec::new();
        let symbols = decoder.decode(&mut bits, &mut output).unwrap();
        assert_eq!(symbols, 10);
        assert_eq!(output, b"aaaabbbccd");
    }

    #[test]
    fn test_padding_bits_are_not_decoded() {
        let decoder = HuffmanDecoder::new(&abcd_table());
        // "d" followed by five zero bits that would decode as "aaaaa"
        let packed: &[u8] = &[0b1110_0000];
        let mut bits = BitReader::new(packed, 1, 5);
        let mut output = Vec::new();
        decoder.decode(&mut bits, &mut output).unwrap();
        assert_eq!(output, b"d");
    }

    #[test]
    fn test_unmatched_bits_are_corrupt() {
        // "11" never completes because "111" is absent
        let decoder = HuffmanDecoder::new(&code_table(&[(b'a', "0"), (b'b', "10"), (b'c', "110")]));
        let packed: &[u8] = &[0b1110_0000];
        let mut bits = BitReader::new(packed, 1, 0);
        let mut output = Vec::new();
        let result = decoder.decode(&mut bits, &mut output);
        assert!(matches!(
            result,
            Err(CodingError::NoMatchingCode { bit_offset: 3 })
        ));
    }

    #[test]
    fn test_stream_ending_inside_code_is_corrupt() {
        let decoder = HuffmanDecoder::new(&abcd_table());
        let packed: &[u8] = &[0b0110_0000];
        let mut bits = BitReader::new(packed, 1, 5);
        let mut output = Vec::new();
        let result = decoder.decode(&mut bits, &mut output);
        assert!(matches!(
            result,
            Err(CodingError::IncompleteCode { bit_offset: 3 })
        ));
        assert_eq!(output, b"a");
    }
}
