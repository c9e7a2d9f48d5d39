use std::io::{self, Read};

use super::{Symbol, SymbolFrequency, ALPHABET_SIZE};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Occurrence count of every byte value in a source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: [u64; ALPHABET_SIZE],
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self {
            counts: [0; ALPHABET_SIZE],
        }
    }

    pub fn from_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut table = Self::new();
        let mut buffer = [0; READ_CHUNK_SIZE];
        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            table.count(&buffer[..read]);
        }
        Ok(table)
    }

    pub fn count(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.counts[byte as usize] += 1;
        }
    }

    pub fn set(&mut self, symbol: Symbol, frequency: u64) {
        self.counts[symbol as usize] = frequency;
    }

    pub fn get(&self, symbol: Symbol) -> u64 {
        self.counts[symbol as usize]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&count| count == 0)
    }

    pub fn distinct_symbols(&self) -> usize {
        self.counts.iter().filter(|&&count| count > 0).count()
    }

    /// Symbols with nonzero frequency in ascending symbol order.
    pub fn present(&self) -> impl Iterator<Item = SymbolFrequency> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, frequency)| **frequency > 0)
            .map(|(symbol, &frequency)| SymbolFrequency {
                symbol: symbol as Symbol,
                frequency,
            })
    }

    /// Shannon entropy in bits per symbol.
    pub fn entropy(&self) -> f64 {
        let total = self.total() as f64;
        if total == 0.0 {
            return 0.0;
        }
        self.present()
            .map(|sf| {
                let p = sf.frequency as f64 / total;
                -p * p.log2()
            })
            .sum()
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<SymbolFrequency> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = SymbolFrequency>>(iter: I) -> Self {
        let mut table = Self::new();
        for sf in iter {
            table.set(sf.symbol, sf.frequency);
        }
        table
    }
}
