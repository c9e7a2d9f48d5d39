use std::{
    fmt::Display,
    fs::{File, OpenOptions},
    io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use clap::{builder::PossibleValue, ValueEnum};
use log::{debug, info, warn};

use binary_stream::{BitReader, BitWriter};
pub use cli::CLIParser;
pub use error::Error;
use huffman::{CodeTable, CodingError, FrequencyTable, HuffmanDecoder, HuffmanEncoder, HuffmanTree};

pub mod binary_stream;
mod cli;
pub mod container;
mod error;
pub mod huffman;
mod logger;
pub mod priority_queue;

pub type Result<T> = std::result::Result<T, error::Error>;

const READ_CHUNK_SIZE: usize = 8 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Compress,
    Decompress,
}

impl ValueEnum for Mode {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Compress, Self::Decompress]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        match self {
            Self::Compress => Some(PossibleValue::new("compress").alias("c")),
            Self::Decompress => Some(PossibleValue::new("decompress").alias("d")),
        }
    }
}

pub struct Arguments {
    mode: Mode,
    input_file: PathBuf,
    output_file: PathBuf,
}

impl Arguments {
    pub fn new(mode: Mode, input_file: PathBuf, output_file: PathBuf) -> Self {
        Self {
            mode,
            input_file,
            output_file,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompressionSummary {
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub packed_bytes: u64,
    pub padding: u8,
    pub distinct_symbols: usize,
    pub entropy: f64,
    pub average_code_length: f64,
}

impl CompressionSummary {
    /// Space saved relative to the input, negative when the output grew.
    pub fn space_saving(&self) -> f64 {
        100.0 * (1.0 - self.output_bytes as f64 / self.input_bytes as f64)
    }
}

impl Display for CompressionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "input:           {} bytes", self.input_bytes)?;
        writeln!(f, "output:          {} bytes", self.output_bytes)?;
        writeln!(f, "distinct bytes:  {}", self.distinct_symbols)?;
        writeln!(f, "entropy:         {:.4} bits/symbol", self.entropy)?;
        writeln!(
            f,
            "average code:    {:.4} bits/symbol",
            self.average_code_length
        )?;
        write!(f, "space saving:    {:.2}%", self.space_saving())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecompressionSummary {
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub distinct_symbols: usize,
}

impl Display for DecompressionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "input:           {} bytes", self.input_bytes)?;
        writeln!(f, "output:          {} bytes", self.output_bytes)?;
        write!(f, "distinct bytes:  {}", self.distinct_symbols)
    }
}

pub enum Summary {
    Compression(CompressionSummary),
    Decompression(DecompressionSummary),
}

impl Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compression(summary) => write!(f, "{}", summary),
            Self::Decompression(summary) => write!(f, "{}", summary),
        }
    }
}

fn path_string(file_path: &Path) -> String {
    file_path.display().to_string()
}

fn open_input_file(file_path: &Path) -> Result<File> {
    File::open(file_path)
        .map_err(|e| Error::UnableToOpenInputFileForReading(path_string(file_path), e))
}

fn open_output_file(file_path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(file_path)
        .map_err(|e| Error::UnableToOpenOutputFileForWriting(path_string(file_path), e))
}

fn count_frequencies(file_path: &Path) -> Result<FrequencyTable> {
    let input_file = open_input_file(file_path)?;
    FrequencyTable::from_reader(BufReader::new(input_file)).map_err(Error::FailedToReadInput)
}

fn encode_file<W: Write>(file_path: &Path, encoder: &mut HuffmanEncoder<'_, '_, W>) -> Result<()> {
    let input = BufReader::new(open_input_file(file_path)?);
    encode_input(input, file_path, encoder)
}

fn encode_input<R: Read, W: Write>(
    mut input: R,
    file_path: &Path,
    encoder: &mut HuffmanEncoder<'_, '_, W>,
) -> Result<()> {
    let mut buffer = [0; READ_CHUNK_SIZE];
    loop {
        let read = match input.read(&mut buffer) {
            Ok(0) => return Ok(()),
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::FailedToReadInput(e)),
        };
        // a byte without code word was not there when frequencies were counted
        encoder.write_all(&buffer[..read]).map_err(|e| {
            if e.kind() == io::ErrorKind::InvalidInput {
                Error::InputChangedBetweenPasses(path_string(file_path), e)
            } else {
                Error::FailedToWriteOutput(e)
            }
        })?;
    }
}

/// Compresses `source` into a container at `destination`.
///
/// The source is read twice, once to count byte frequencies and once to
/// encode it. An empty source is refused before the destination is touched.
pub fn compress(source: &Path, destination: &Path) -> Result<CompressionSummary> {
    let frequencies = count_frequencies(source)?;
    if frequencies.is_empty() {
        return Err(Error::EmptyInput(path_string(source)));
    }
    let tree = HuffmanTree::new(&frequencies)?;
    let code_table = CodeTable::from_tree(&tree);
    debug!(
        "Code table with {} entries, longest code {} bits",
        code_table.len(),
        code_table.max_code_length()
    );
    logger::log_code_table(&frequencies, &code_table);

    let mut writer = BufWriter::new(open_output_file(destination)?);
    container::write_dictionary(&mut writer, &frequencies, &code_table)
        .map_err(Error::FailedToWriteOutput)?;

    let mut bit_writer = BitWriter::new(&mut writer);
    let mut encoder = HuffmanEncoder::new(&mut bit_writer, &code_table);
    encode_file(source, &mut encoder)?;
    let symbols = encoder.symbols_written();
    let padding = encoder.finish().map_err(Error::FailedToWriteOutput)?;
    let packed_bytes = bit_writer.bytes_written();
    if symbols != frequencies.total() {
        warn!(
            "Source changed between passes: counted {} bytes, encoded {}",
            frequencies.total(),
            symbols
        );
    }

    container::write_padding_record(&mut writer, padding).map_err(Error::FailedToWriteOutput)?;
    let output_file = writer
        .into_inner()
        .map_err(|e| Error::FailedToWriteOutput(e.into_error()))?;
    let output_bytes = output_file
        .metadata()
        .map_err(Error::FailedToWriteOutput)?
        .len();

    let summary = CompressionSummary {
        input_bytes: symbols,
        output_bytes,
        packed_bytes,
        padding,
        distinct_symbols: frequencies.distinct_symbols(),
        entropy: frequencies.entropy(),
        average_code_length: code_table.average_code_length(&frequencies),
    };
    info!(
        "Compressed '{}' ({} bytes) into '{}' ({} bytes, {} packed, {} padding bits)",
        path_string(source),
        summary.input_bytes,
        path_string(destination),
        summary.output_bytes,
        packed_bytes,
        padding
    );
    Ok(summary)
}

/// Restores the original bytes from a container written by [`compress`].
pub fn decompress(source: &Path, destination: &Path) -> Result<DecompressionSummary> {
    let input_file = open_input_file(source)?;
    let input_bytes = input_file
        .metadata()
        .map_err(Error::FailedToReadContainer)?
        .len();
    let mut reader = BufReader::new(input_file);
    let dictionary = container::read_dictionary(&mut reader)?;
    let region = container::locate_data_region(&mut reader, dictionary.data_offset)?;
    reader
        .seek(SeekFrom::Start(region.offset))
        .map_err(Error::FailedToReadContainer)?;

    let decoder = HuffmanDecoder::new(&dictionary.code_table);
    let mut bits = BitReader::new(&mut reader, region.length, region.padding);
    let mut writer = BufWriter::new(open_output_file(destination)?);
    let symbols = decoder
        .decode(&mut bits, &mut writer)
        .map_err(|e| match e {
            CodingError::Read(error) => Error::FailedToReadContainer(error),
            CodingError::Write(error) => Error::FailedToWriteOutput(error),
            CodingError::NoMatchingCode { bit_offset }
            | CodingError::IncompleteCode { bit_offset } => Error::CorruptStream {
                bit_offset,
                detail: e.to_string(),
            },
        })?;
    writer.flush().map_err(Error::FailedToWriteOutput)?;

    if symbols != dictionary.frequencies.total() {
        warn!(
            "Dictionary lists {} bytes but {} were decoded",
            dictionary.frequencies.total(),
            symbols
        );
    }
    info!(
        "Decompressed '{}' ({} bytes) into '{}' ({} bytes)",
        path_string(source),
        input_bytes,
        path_string(destination),
        symbols
    );
    Ok(DecompressionSummary {
        input_bytes,
        output_bytes: symbols,
        distinct_symbols: dictionary.code_table.len(),
    })
}

pub fn run(arguments: &Arguments) -> Result<Summary> {
    match arguments.mode {
        Mode::Compress => compress(&arguments.input_file, &arguments.output_file)
            .map(Summary::Compression),
        Mode::Decompress => decompress(&arguments.input_file, &arguments.output_file)
            .map(Summary::Decompression),
    }
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use super::{encode_input, Error};
    use crate::binary_stream::BitWriter;
    use crate::huffman::{CodeTable, FrequencyTable, HuffmanEncoder, HuffmanTree};

    fn code_table_for(data: &[u8]) -> CodeTable {
        let frequencies = FrequencyTable::from_reader(data).unwrap();
        CodeTable::from_tree(&HuffmanTree::new(&frequencies).unwrap())
    }

    #[test]
    fn test_encode_input_with_known_symbols() {
        let code_table = code_table_for(b"aaaabbbccd");
        let mut output = Vec::new();
        let mut writer = BitWriter::new(&mut output);
        let mut encoder = HuffmanEncoder::new(&mut writer, &code_table);
        encode_input(&b"dcba"[..], Path::new("source.txt"), &mut encoder).unwrap();
        assert_eq!(encoder.symbols_written(), 4);
    }

    #[test]
    fn test_byte_missing_from_first_pass_is_an_input_error() {
        let code_table = code_table_for(b"ab");
        let mut output = Vec::new();
        let mut writer = BitWriter::new(&mut output);
        let mut encoder = HuffmanEncoder::new(&mut writer, &code_table);
        let result = encode_input(&b"abz"[..], Path::new("source.txt"), &mut encoder);
        match result {
            Err(Error::InputChangedBetweenPasses(path, _)) => assert_eq!(path, "source.txt"),
            Err(error) => panic!("Unexpected error: {}", error),
            Ok(()) => panic!("Unknown byte not detected"),
        }
    }
}
