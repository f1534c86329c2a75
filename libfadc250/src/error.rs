use std::path::PathBuf;
use thiserror::Error;

use super::word::WordKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WordKindError {
    #[error("Invalid FADC250 type tag {0} found; tags 5, 9-11 and 13 are reserved")]
    UnknownTag(u8),
}

/// Problems found while decoding a FADC250 word buffer.
///
/// Only the fatal variants (see [`DecodeError::is_fatal`]) are ever returned by the decoder.
/// The others are logged and decoding continues past the offending word.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("FADC250 buffer does not begin with a valid event header (found {0:#x?})")]
    MalformedHeader(Option<u32>),
    #[error("Unexpected FADC250 continuation word {word:#010x} at index {index}; skipping it")]
    UnexpectedContinuation { index: usize, word: u32 },
    #[error("Unknown FADC250 type tag {tag} in word {word:#010x} at index {index}; aborting event")]
    UnknownTypeTag { tag: u8, index: usize, word: u32 },
    #[error("Unsupported FADC250 data type {0:?} at index {1}; skipping its payload")]
    UnsupportedType(WordKind, usize),
    #[error("FADC250 event header {word:#010x} found at index {index}; only the first word may be a header")]
    MisplacedEventHeader { index: usize, word: u32 },
    #[error("FADC250 channel {channel} at index {index} is out of range for an event with {n_channels} channels; dropping its data")]
    ChannelOutOfRange {
        channel: usize,
        n_channels: usize,
        index: usize,
    },
}

impl DecodeError {
    /// Fatal errors abort the decode of the current event
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MalformedHeader(_) | Self::UnknownTypeTag { .. } | Self::MisplacedEventHeader { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum WordBufferError {
    #[error("Byte buffer of length {0} is not a whole number of 32-bit words")]
    Misaligned(usize),
    #[error("WordBuffer failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Config has an invalid value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed because worker {0} panicked")]
    WorkerPanicked(usize),
}
