use std::io::{self, Read, Write};

/// State for writing individual bits to a Writer
pub struct BitWriter<'a, T: Write> {
    /// the underlying output stream
    writer: &'a mut T,
    /// buffer of individual bits not yet written
    buffer: u8,
    /// how many bits are waiting to be written
    buffer_space_used: u8,
    /// number of complete bytes handed to the writer
    bytes_written: u64,
}

impl<'a, T: Write> BitWriter<'a, T> {
    pub fn new(writer: &'a mut T) -> BitWriter<'a, T> {
        BitWriter {
            writer,
            buffer: 0,
            buffer_space_used: 0,
            bytes_written: 0,
        }
    }

    /// write a non-byte-aligned number of bits
    ///
    /// buf: a byte array containing a contiguous block, MSB first
    /// count: how many bits of buf to write
    ///
    /// Full bytes are passed on to the underlying writer as soon as
    /// they are complete; use finish to write a trailing partial byte.
    pub fn write_bits(&mut self, buf: &[u8], count: usize) -> io::Result<()> {
        let mut remaining_bits_offset = 0;
        if self.buffer_space_used == 0 {
            let quick_byte_count = count / 8;
            self.writer.write_all(&buf[0..quick_byte_count])?;
            self.bytes_written += quick_byte_count as u64;
            remaining_bits_offset = quick_byte_count * 8;
        }
        for bit_index in remaining_bits_offset..count {
            let bit = buf[bit_index / 8] & (0b1000_0000 >> (bit_index % 8)) != 0;
            self.write_bit(bit)?;
        }
        Ok(())
    }

    pub fn write_bit(&mut self, bit: bool) -> io::Result<()> {
        if bit {
            self.buffer |= 0b1000_0000 >> self.buffer_space_used;
        }
        self.buffer_space_used += 1;
        if self.buffer_space_used == 8 {
            self.writer.write_all(&[self.buffer])?;
            self.bytes_written += 1;
            self.buffer_space_used = 0;
            self.buffer = 0; // depended upon in finish()
        }
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Writes a pending partial byte right-padded with zero bits.
    ///
    /// Returns the number of padding bits, 0 when the stream ended on a
    /// byte boundary.
    pub fn finish(&mut self) -> io::Result<u8> {
        if self.buffer_space_used == 0 {
            return Ok(0);
        }
        let padding = 8 - self.buffer_space_used;
        self.writer.write_all(&[self.buffer])?;
        self.bytes_written += 1;
        self.buffer = 0;
        self.buffer_space_used = 0;
        Ok(padding)
    }
}

/// Reads a fixed number of packed bytes bit by bit, MSB first.
///
/// The final byte only contributes `8 - padding` bits.
pub struct BitReader<R: Read> {
    reader: R,
    remaining_bytes: u64,
    padding: u8,
    current: u8,
    bits_left_in_current: u8,
    bits_read: u64,
}

impl<R: Read> BitReader<R> {
    pub fn new(reader: R, byte_count: u64, padding: u8) -> BitReader<R> {
        BitReader {
            reader,
            remaining_bytes: byte_count,
            padding,
            current: 0,
            bits_left_in_current: 0,
            bits_read: 0,
        }
    }

    pub fn bits_read(&self) -> u64 {
        self.bits_read
    }

    pub fn read_bit(&mut self) -> io::Result<Option<bool>> {
        if self.bits_left_in_current == 0 && !self.load_next_byte()? {
            return Ok(None);
        }
        let bit = self.current & 0b1000_0000 != 0;
        self.current <<= 1;
        self.bits_left_in_current -= 1;
        self.bits_read += 1;
        Ok(Some(bit))
    }

    fn load_next_byte(&mut self) -> io::Result<bool> {
        if self.remaining_bytes == 0 {
            return Ok(false);
        }
        let mut buffer = [0; 1];
        self.reader.read_exact(&mut buffer)?;
        self.remaining_bytes -= 1;
        self.current = buffer[0];
        self.bits_left_in_current = if self.remaining_bytes == 0 {
            8 - self.padding
        } else {
            8
        };
        Ok(self.bits_left_in_current > 0)
    }
}

impl<R: Read> Iterator for BitReader<R> {
    type Item = io::Result<bool>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_bit().transpose()
    }
}

#[cfg(test)]
mod test {
    use super::{BitReader, BitWriter};

    #[test]
    fn byte_mode_test() {
        let mut my_output: Vec<u8> = vec![];
        let mut writer = BitWriter::new(&mut my_output);
        let input: &[u8] = &[72, 65, 76, 76, 79];
        writer.write_bits(input, 40).expect("should not fail");
        let padding = writer.finish().expect("finishing should not fail");
        assert_eq!(padding, 0);
        assert_eq!(my_output, input);
    }

    #[test]
    fn bit_mode_test() {
        let mut my_output: Vec<u8> = vec![];
        let mut writer = BitWriter::new(&mut my_output);
        // 0b11000011 0b1111(0000)
        writer.write_bits(&[0xFF], 2).expect("ERR");
        writer.write_bits(&[0x00], 4).expect("ERR");
        writer.write_bits(&[0xFF], 2).expect("ERR");
        writer.write_bits(&[0xFF], 4).expect("ERR");
        assert_eq!(writer.bytes_written(), 1);
        let padding = writer.finish().expect("ERR");
        assert_eq!(padding, 4);
        assert_eq!(my_output, vec![0b1100_0011, 0b1111_0000]);
    }

    #[test]
    fn mixed_mode_test() {
        let mut my_output: Vec<u8> = vec![];
        let mut writer = BitWriter::new(&mut my_output);
        // 0b111
        writer.write_bits(&[0xFF], 3).expect("ERR");
        // 0b11100000 00100000 01010000 100
        writer.write_bits(&[1, 2, 4 | 128], 24).expect("ERR");
        let padding = writer.finish().expect("ERR");
        assert_eq!(padding, 5);
        assert_eq!(my_output, vec![224, 32, 80, 128]);
    }

    #[test]
    fn reader_skips_padding_of_last_byte() {
        let input: &[u8] = &[0b1010_1010, 0b1100_0000];
        let reader = BitReader::new(input, 2, 6);
        let bits: Vec<bool> = reader.map(|bit| bit.expect("ERR")).collect();
        assert_eq!(
            bits,
            vec![true, false, true, false, true, false, true, false, true, true]
        );
    }

    #[test]
    fn reader_stops_after_byte_count() {
        let input: &[u8] = &[0xFF, 0xFF, 0xFF];
        let mut reader = BitReader::new(input, 1, 0);
        for _ in 0..8 {
            assert_eq!(reader.read_bit().expect("ERR"), Some(true));
        }
        assert_eq!(reader.read_bit().expect("ERR"), None);
        assert_eq!(reader.bits_read(), 8);
    }

    #[test]
    fn reader_reports_truncated_input() {
        let input: &[u8] = &[0xFF];
        let mut reader = BitReader::new(input, 2, 0);
        for _ in 0..8 {
            reader.read_bit().expect("ERR");
        }
        assert!(reader.read_bit().is_err());
    }
}
