use std::io::{self, Write};

use super::{CodeTable, Symbol};
use crate::binary_stream::BitWriter;

/// Translates symbols written to it into their code words on a [`BitWriter`].
pub struct HuffmanEncoder<'a, 'w, T: Write> {
    writer: &'a mut BitWriter<'w, T>,
    code_table: &'a CodeTable,
    symbols_written: u64,
}

impl<'a, 'w, T: Write> HuffmanEncoder<'a, 'w, T> {
    pub fn new(writer: &'a mut BitWriter<'w, T>, code_table: &'a CodeTable) -> Self {
        Self::validate_code_table(code_table);
        HuffmanEncoder {
            writer,
            code_table,
            symbols_written: 0,
        }
    }

    pub fn symbols_written(&self) -> u64 {
        self.symbols_written
    }

    /// Pads the last partial byte with zeros and returns the padding bit count.
    pub fn finish(self) -> io::Result<u8> {
        self.writer.finish()
    }

    fn encode_symbol(&mut self, symbol: Symbol) -> io::Result<()> {
        let code = self.code_table.get(symbol).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("symbol {:#04X} has no code word", symbol),
            )
        })?;
        self.writer.write_bits(code.bytes(), code.len())
    }

    fn validate_code_table(code_table: &CodeTable) {
        if code_table.is_empty() {
            panic!("the code table must contain at least one symbol");
        }
        if code_table.iter().any(|(_, code)| code.is_empty()) {
            panic!("code words must not be empty");
        }
    }
}

impl<T: Write> Write for HuffmanEncoder<'_, '_, T> {
    fn write(&mut self, buf: &[Symbol]) -> io::Result<usize> {
        for &symbol in buf {
            self.encode_symbol(symbol)?;
            self.symbols_written += 1;
        }
        Ok(buf.len())
    }

    /// Only complete bytes reach the underlying writer, see [`HuffmanEncoder::finish`].
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
