//! Layout of a compressed file:
//!
//! ```text
//! DICTIONARY:
//! <symbol>: <frequency> - <code>
//! DATA:
//! <packed bytes>
//! PADDING: <n>
//! ```

use std::collections::HashSet;
use std::fmt::Display;
use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};

use log::{debug, trace};

use crate::error::Error;
use crate::huffman::{Code, CodeTable, FrequencyTable, Symbol, MAX_CODE_LENGTH};

pub const DICTIONARY_HEADING: &str = "DICTIONARY:";
pub const DATA_SENTINEL: &str = "DATA:";
pub const PADDING_KEYWORD: &str = "PADDING:";

const SPACE_TOKEN: &str = "SPACE";
const NEWLINE_TOKEN: &str = "ENTER";
const TAB_TOKEN: &str = "TAB";

// long enough for "\nPADDING: 255\r\n"
const TRAILER_SEARCH_LENGTH: u64 = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderParseError {
    MissingDictionaryHeading,
    MissingDataSentinel,
    MissingPaddingRecord,
    EmptyDictionary,
    MalformedRecord(String),
    UnknownSymbol(String),
    InvalidFrequency(String),
    InvalidCode(String),
    DuplicateSymbol(Symbol),
    DuplicateCode(String),
    InvalidPadding(String),
}

impl Display for HeaderParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDictionaryHeading => {
                write!(f, "Expected '{}' as first line", DICTIONARY_HEADING)
            }
            Self::MissingDataSentinel => write!(f, "Data sentinel '{}' not found", DATA_SENTINEL),
            Self::MissingPaddingRecord => {
                write!(f, "Padding record '{}' not found", PADDING_KEYWORD)
            }
            Self::EmptyDictionary => write!(f, "Dictionary does not contain any symbol"),
            Self::MalformedRecord(line) => write!(f, "Malformed dictionary record '{}'", line),
            Self::UnknownSymbol(token) => write!(f, "Unknown symbol representation '{}'", token),
            Self::InvalidFrequency(value) => write!(f, "Invalid frequency '{}'", value),
            Self::InvalidCode(code) => write!(f, "Invalid code word '{}'", code),
            Self::DuplicateSymbol(symbol) => {
                write!(f, "Symbol '{}' defined twice", symbol_representation(*symbol))
            }
            Self::DuplicateCode(code) => write!(f, "Code word '{}' assigned twice", code),
            Self::InvalidPadding(value) => write!(f, "Invalid padding bit count '{}'", value),
        }
    }
}

/// Human readable form of a symbol used in the dictionary.
pub fn symbol_representation(symbol: Symbol) -> String {
    match symbol {
        b' ' => SPACE_TOKEN.to_owned(),
        b'\n' => NEWLINE_TOKEN.to_owned(),
        b'\t' => TAB_TOKEN.to_owned(),
        0x21..=0x7E => (symbol as char).to_string(),
        _ => format!("\\x{:02X}", symbol),
    }
}

/// Inverse of [`symbol_representation`].
pub fn parse_symbol_representation(representation: &str) -> Option<Symbol> {
    match representation {
        SPACE_TOKEN => Some(b' '),
        NEWLINE_TOKEN => Some(b'\n'),
        TAB_TOKEN => Some(b'\t'),
        _ => match representation.as_bytes() {
            &[byte @ 0x21..=0x7E] => Some(byte),
            &[b'\\', b'x', high, low] => parse_hex_escape(high, low),
            _ => None,
        },
    }
}

fn parse_hex_escape(high: u8, low: u8) -> Option<Symbol> {
    fn nibble(digit: u8) -> Option<u8> {
        match digit {
            b'0'..=b'9' => Some(digit - b'0'),
            b'A'..=b'F' => Some(digit - b'A' + 10),
            _ => None,
        }
    }
    let symbol = nibble(high)? << 4 | nibble(low)?;
    // printable bytes and the named ones are never escaped
    if symbol_representation(symbol).len() == 4 {
        Some(symbol)
    } else {
        None
    }
}

pub fn write_dictionary<W: Write>(
    writer: &mut W,
    frequencies: &FrequencyTable,
    code_table: &CodeTable,
) -> io::Result<()> {
    writeln!(writer, "{}", DICTIONARY_HEADING)?;
    for sf in frequencies.present() {
        let code = code_table.get(sf.symbol).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("symbol {:#04X} has no code word", sf.symbol),
            )
        })?;
        writeln!(
            writer,
            "{}: {} - {}",
            symbol_representation(sf.symbol),
            sf.frequency,
            code
        )?;
    }
    writeln!(writer, "{}", DATA_SENTINEL)
}

pub fn write_padding_record<W: Write>(writer: &mut W, padding: u8) -> io::Result<()> {
    write!(writer, "\n{} {}\n", PADDING_KEYWORD, padding)
}

/// Parsed dictionary section of a container.
pub struct Dictionary {
    pub frequencies: FrequencyTable,
    pub code_table: CodeTable,
    /// offset of the first packed byte, right after the data sentinel
    pub data_offset: u64,
}

struct LineReader<'a, R: BufRead> {
    reader: &'a mut R,
    buffer: Vec<u8>,
    offset: u64,
    line_number: usize,
}

impl<'a, R: BufRead> LineReader<'a, R> {
    fn new(reader: &'a mut R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            offset: 0,
            line_number: 0,
        }
    }

    fn next_line(&mut self) -> crate::Result<Option<String>> {
        self.buffer.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.buffer)
            .map_err(Error::FailedToReadContainer)?;
        if read == 0 {
            return Ok(None);
        }
        self.offset += read as u64;
        self.line_number += 1;
        let line = trim_line_ending(&self.buffer);
        match std::str::from_utf8(line) {
            Ok(line) => Ok(Some(line.to_owned())),
            Err(_) => Err(self.error(HeaderParseError::MalformedRecord(
                String::from_utf8_lossy(line).into_owned(),
            ))),
        }
    }

    fn error(&self, reason: HeaderParseError) -> Error {
        Error::HeaderParse {
            line: self.line_number,
            reason,
        }
    }
}

/// Parses the header up to and including the data sentinel.
pub fn read_dictionary<R: BufRead>(reader: &mut R) -> crate::Result<Dictionary> {
    let mut frequencies = FrequencyTable::new();
    let mut code_table = CodeTable::new();
    let mut seen_codes = HashSet::new();
    let mut lines = LineReader::new(reader);

    match lines.next_line()? {
        Some(line) if line == DICTIONARY_HEADING => (),
        _ => {
            return Err(Error::HeaderParse {
                line: 1,
                reason: HeaderParseError::MissingDictionaryHeading,
            })
        }
    }

    loop {
        let line = lines
            .next_line()?
            .ok_or_else(|| lines.error(HeaderParseError::MissingDataSentinel))?;
        if line == DATA_SENTINEL {
            break;
        }
        let (symbol, frequency, code) = parse_record(&line).map_err(|reason| lines.error(reason))?;
        if code_table.get(symbol).is_some() {
            return Err(lines.error(HeaderParseError::DuplicateSymbol(symbol)));
        }
        if !seen_codes.insert(code.clone()) {
            return Err(lines.error(HeaderParseError::DuplicateCode(code.to_string())));
        }
        trace!(
            "Dictionary entry {}: frequency {}, code {}",
            symbol_representation(symbol),
            frequency,
            code
        );
        frequencies.set(symbol, frequency);
        code_table.insert(symbol, code);
    }

    if code_table.is_empty() {
        return Err(lines.error(HeaderParseError::EmptyDictionary));
    }
    debug!(
        "Parsed dictionary with {} symbols, data starts at offset {}",
        code_table.len(),
        lines.offset
    );
    Ok(Dictionary {
        frequencies,
        code_table,
        data_offset: lines.offset,
    })
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn parse_record(line: &str) -> Result<(Symbol, u64, Code), HeaderParseError> {
    let malformed = || HeaderParseError::MalformedRecord(line.to_owned());
    let (head, code) = line.rsplit_once(" - ").ok_or_else(malformed)?;
    let (representation, frequency) = head.rsplit_once(": ").ok_or_else(malformed)?;

    let symbol = parse_symbol_representation(representation)
        .ok_or_else(|| HeaderParseError::UnknownSymbol(representation.to_owned()))?;
    let frequency = frequency
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|&frequency| frequency > 0)
        .ok_or_else(|| HeaderParseError::InvalidFrequency(frequency.to_owned()))?;
    let code_text = code.trim();
    let code = code_text
        .parse::<Code>()
        .ok()
        .filter(|code| !code.is_empty() && code.len() <= MAX_CODE_LENGTH)
        .ok_or_else(|| HeaderParseError::InvalidCode(code_text.to_owned()))?;
    Ok((symbol, frequency, code))
}

/// Position and padding of the packed data region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRegion {
    pub offset: u64,
    pub length: u64,
    pub padding: u8,
}

/// Finds the padding record terminating the file and derives the exact
/// length of the packed data that precedes it.
///
/// The record is searched from the end of the file, packed bytes may contain
/// anything including the record keyword.
pub fn locate_data_region<R: Read + Seek>(reader: &mut R, data_offset: u64) -> crate::Result<DataRegion> {
    let missing = || Error::HeaderParse {
        line: 0,
        reason: HeaderParseError::MissingPaddingRecord,
    };
    let end = reader
        .seek(SeekFrom::End(0))
        .map_err(Error::FailedToReadContainer)?;
    if end <= data_offset {
        return Err(missing());
    }
    let tail_start = end - (end - data_offset).min(TRAILER_SEARCH_LENGTH);
    reader
        .seek(SeekFrom::Start(tail_start))
        .map_err(Error::FailedToReadContainer)?;
    let mut tail = Vec::new();
    reader
        .read_to_end(&mut tail)
        .map_err(Error::FailedToReadContainer)?;

    let mut marker = vec![b'\n'];
    marker.extend_from_slice(PADDING_KEYWORD.as_bytes());
    let position = tail
        .windows(marker.len())
        .rposition(|window| window == marker.as_slice())
        .ok_or_else(missing)?;

    let record = trim_line_ending(&tail[position + 1..]);
    let value = std::str::from_utf8(&record[PADDING_KEYWORD.len()..])
        .map(str::trim)
        .unwrap_or_default();
    let invalid = || Error::HeaderParse {
        line: 0,
        reason: HeaderParseError::InvalidPadding(value.to_owned()),
    };
    let padding = value
        .parse::<u8>()
        .ok()
        .filter(|&padding| padding < 8)
        .ok_or_else(invalid)?;

    let length = tail_start + position as u64 - data_offset;
    if length == 0 && padding != 0 {
        return Err(invalid());
    }
    debug!(
        "Packed data: {} bytes at offset {}, {} padding bits",
        length, data_offset, padding
    );
    Ok(DataRegion {
        offset: data_offset,
        length,
        padding,
    })
}

#[cfg(test)]
mod test {
    use std::io::{BufRead, Cursor};

    use super::{
        locate_data_region, parse_symbol_representation, read_dictionary,
        symbol_representation, write_dictionary, write_padding_record, DataRegion,
        HeaderParseError,
    };
    use crate::error::Error;
    use crate::huffman::{CodeTable, FrequencyTable, HuffmanTree};

    #[test]
    fn test_named_symbol_representations() {
        assert_eq!(symbol_representation(b' '), "SPACE");
        assert_eq!(symbol_representation(b'\n'), "ENTER");
        assert_eq!(symbol_representation(b'\t'), "TAB");
        assert_eq!(symbol_representation(b'a'), "a");
        assert_eq!(symbol_representation(b'~'), "~");
        assert_eq!(symbol_representation(0), "\\x00");
        assert_eq!(symbol_representation(b'\r'), "\\x0D");
        assert_eq!(symbol_representation(0x7F), "\\x7F");
        assert_eq!(symbol_representation(0xFF), "\\xFF");
    }

    #[test]
    fn test_symbol_representation_is_invertible() {
        for symbol in 0..=255u8 {
            let representation = symbol_representation(symbol);
            assert_eq!(
                parse_symbol_representation(&representation),
                Some(symbol),
                "Representation '{}' does not parse back",
                representation
            );
        }
    }

    #[test]
    fn test_non_canonical_representations_are_rejected() {
        assert_eq!(parse_symbol_representation("\\x41"), None);
        assert_eq!(parse_symbol_representation("\\x20"), None);
        assert_eq!(parse_symbol_representation("\\xff"), None);
        assert_eq!(parse_symbol_representation("ab"), None);
        assert_eq!(parse_symbol_representation(""), None);
        assert_eq!(parse_symbol_representation(" "), None);
    }

    fn header_for(data: &[u8]) -> Vec<u8> {
        let frequencies = FrequencyTable::from_reader(data).unwrap();
        let tree = HuffmanTree::new(&frequencies).unwrap();
        let code_table = CodeTable::from_tree(&tree);
        let mut header = Vec::new();
        write_dictionary(&mut header, &frequencies, &code_table).unwrap();
        header
    }

    #[test]
    fn test_write_dictionary_layout() {
        let header = String::from_utf8(header_for(b"aab")).unwrap();
        let lines: Vec<&str> = header.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "DICTIONARY:");
        assert!(lines[1].starts_with("a: 2 - "));
        assert!(lines[2].starts_with("b: 1 - "));
        assert_eq!(lines[3], "DATA:");
    }

    #[test]
    fn test_read_dictionary_of_tricky_symbols() {
        let data = b"::--  \n\n\t\\x\x00\xFF";
        let header = header_for(data);
        let mut reader = Cursor::new(header.clone());
        let dictionary = read_dictionary(&mut reader).unwrap();
        assert_eq!(dictionary.data_offset, header.len() as u64);
        let expected = FrequencyTable::from_reader(&data[..]).unwrap();
        assert_eq!(dictionary.frequencies, expected);
        assert_eq!(dictionary.code_table.len(), expected.distinct_symbols());
    }

    #[test]
    fn test_read_dictionary_stops_at_sentinel() {
        let mut input = header_for(b"abc");
        input.extend_from_slice(b"\x00\x01DATA:\n");
        let mut reader = Cursor::new(input);
        let dictionary = read_dictionary(&mut reader).unwrap();
        let mut rest = Vec::new();
        reader.read_until(0xFF, &mut rest).unwrap();
        assert_eq!(rest, b"\x00\x01DATA:\n");
        assert_eq!(dictionary.code_table.len(), 3);
    }

    fn parse_error(input: &str) -> (usize, HeaderParseError) {
        match read_dictionary(&mut Cursor::new(input.as_bytes())) {
            Err(Error::HeaderParse { line, reason }) => (line, reason),
            Err(other) => panic!("unexpected error {}", other),
            Ok(_) => panic!("header '{}' should not parse", input),
        }
    }

    #[test]
    fn test_header_errors() {
        assert_eq!(
            parse_error("a: 1 - 0\nDATA:\n"),
            (1, HeaderParseError::MissingDictionaryHeading)
        );
        assert_eq!(
            parse_error("DICTIONARY:\na: 1 - 0\n"),
            (2, HeaderParseError::MissingDataSentinel)
        );
        assert_eq!(
            parse_error("DICTIONARY:\nDATA:\n"),
            (2, HeaderParseError::EmptyDictionary)
        );
        assert_eq!(
            parse_error("DICTIONARY:\na 1 0\nDATA:\n"),
            (2, HeaderParseError::MalformedRecord("a 1 0".to_owned()))
        );
        assert_eq!(
            parse_error("DICTIONARY:\nab: 1 - 0\nDATA:\n"),
            (2, HeaderParseError::UnknownSymbol("ab".to_owned()))
        );
        assert_eq!(
            parse_error("DICTIONARY:\na: x - 0\nDATA:\n"),
            (2, HeaderParseError::InvalidFrequency("x".to_owned()))
        );
        assert_eq!(
            parse_error("DICTIONARY:\na: 1 - 012\nDATA:\n"),
            (2, HeaderParseError::InvalidCode("012".to_owned()))
        );
        assert_eq!(
            parse_error("DICTIONARY:\na: 1 - 0\na: 1 - 1\nDATA:\n"),
            (3, HeaderParseError::DuplicateSymbol(b'a'))
        );
        assert_eq!(
            parse_error("DICTIONARY:\na: 1 - 0\nb: 1 - 0\nDATA:\n"),
            (3, HeaderParseError::DuplicateCode("0".to_owned()))
        );
    }

    fn container_tail(packed: &[u8], padding: u8) -> (Vec<u8>, u64) {
        let mut input = b"DICTIONARY:\na: 1 - 0\nDATA:\n".to_vec();
        let data_offset = input.len() as u64;
        input.extend_from_slice(packed);
        write_padding_record(&mut input, padding).unwrap();
        (input, data_offset)
    }

    #[test]
    fn test_locate_data_region() {
        let (input, data_offset) = container_tail(&[0x00, 0x0A, 0xFF], 3);
        let region = locate_data_region(&mut Cursor::new(input), data_offset).unwrap();
        assert_eq!(
            region,
            DataRegion {
                offset: data_offset,
                length: 3,
                padding: 3
            }
        );
    }

    #[test]
    fn test_locate_data_region_ignores_keyword_inside_data() {
        let (input, data_offset) = container_tail(b"\nPADDING: 1\n\nPADDING: 2\n", 0);
        let region = locate_data_region(&mut Cursor::new(input), data_offset).unwrap();
        assert_eq!(region.length, 24);
        assert_eq!(region.padding, 0);
    }

    #[test]
    fn test_locate_data_region_without_record() {
        let input = b"DICTIONARY:\na: 1 - 0\nDATA:\n\x00\x00".to_vec();
        let result = locate_data_region(&mut Cursor::new(input), 27);
        assert!(matches!(
            result,
            Err(Error::HeaderParse {
                reason: HeaderParseError::MissingPaddingRecord,
                ..
            })
        ));
    }

    #[test]
    fn test_locate_data_region_with_invalid_padding() {
        let (input, data_offset) = container_tail(&[0x00], 8);
        let result = locate_data_region(&mut Cursor::new(input), data_offset);
        assert!(matches!(
            result,
            Err(Error::HeaderParse {
                reason: HeaderParseError::InvalidPadding(_),
                ..
            })
        ));
    }

    #[test]
    fn test_locate_empty_data_region() {
        let (input, data_offset) = container_tail(&[], 0);
        let region = locate_data_region(&mut Cursor::new(input), data_offset).unwrap();
        assert_eq!(region.length, 0);
        assert_eq!(region.padding, 0);
    }

    #[test]
    fn test_locate_empty_data_region_with_padding() {
        let (input, data_offset) = container_tail(&[], 3);
        let result = locate_data_region(&mut Cursor::new(input), data_offset);
        assert!(matches!(
            result,
            Err(Error::HeaderParse {
                line: 0,
                reason: HeaderParseError::InvalidPadding(_),
            })
        ));
    }
}
