use std::fmt::Display;

use crate::container::HeaderParseError;
use crate::huffman::TreeBuildError;

#[derive(Debug)]
pub enum Error {
    UnableToOpenInputFileForReading(String, std::io::Error),
    UnableToOpenOutputFileForWriting(String, std::io::Error),
    FailedToReadInput(std::io::Error),
    FailedToReadContainer(std::io::Error),
    FailedToWriteOutput(std::io::Error),
    EmptyInput(String),
    InputChangedBetweenPasses(String, std::io::Error),
    TreeBuild(TreeBuildError),
    HeaderParse {
        line: usize,
        reason: HeaderParseError,
    },
    CorruptStream {
        bit_offset: u64,
        detail: String,
    },
}

impl Error {
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::UnableToOpenInputFileForReading(..)
                | Self::UnableToOpenOutputFileForWriting(..)
                | Self::FailedToReadInput(_)
                | Self::FailedToReadContainer(_)
                | Self::FailedToWriteOutput(_)
        )
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnableToOpenInputFileForReading(path, error) => {
                write!(
                    f,
                    "Unable to open input file '{}' for reading: {}",
                    path, error
                )
            }
            Self::UnableToOpenOutputFileForWriting(path, error) => {
                write!(
                    f,
                    "Unable to open output file '{}' for writing: {}",
                    path, error
                )
            }
            Self::FailedToReadInput(error) => write!(f, "Failed to read input: {}", error),
            Self::FailedToReadContainer(error) => {
                write!(f, "Failed to read compressed file: {}", error)
            }
            Self::FailedToWriteOutput(error) => write!(f, "Failed to write output: {}", error),
            Self::EmptyInput(path) => {
                write!(f, "Input file '{}' is empty, nothing to compress", path)
            }
            Self::InputChangedBetweenPasses(path, error) => {
                write!(
                    f,
                    "Input file '{}' changed while it was being compressed: {}",
                    path, error
                )
            }
            Self::TreeBuild(error) => write!(f, "Failed to build Huffman tree: {}", error),
            Self::HeaderParse { line, reason } => {
                if *line == 0 {
                    write!(f, "Invalid container: {}", reason)
                } else {
                    write!(f, "Invalid container header in line {}: {}", line, reason)
                }
            }
            Self::CorruptStream { bit_offset, detail } => {
                write!(
                    f,
                    "Corrupt data stream at bit offset {}: {}",
                    bit_offset, detail
                )
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::UnableToOpenInputFileForReading(_, error)
            | Self::UnableToOpenOutputFileForWriting(_, error)
            | Self::FailedToReadInput(error)
            | Self::FailedToReadContainer(error)
            | Self::FailedToWriteOutput(error)
            | Self::InputChangedBetweenPasses(_, error) => Some(error),
            Self::TreeBuild(error) => Some(error),
            _ => None,
        }
    }
}

impl From<TreeBuildError> for Error {
    fn from(value: TreeBuildError) -> Self {
        Self::TreeBuild(value)
    }
}
