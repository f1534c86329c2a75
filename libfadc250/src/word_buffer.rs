use byteorder::{ByteOrder, ReadBytesExt};
use std::io::Cursor;

use super::error::WordBufferError;

const WORD_SIZE: usize = 4;

/// Convert raw bytes into 32-bit digitizer words.
///
/// The byte order depends on where the data comes from: EVIO files are big endian, memory
/// dumps from the readout controller are usually little endian.
pub fn words_from_bytes<B: ByteOrder>(bytes: &[u8]) -> Result<Vec<u32>, WordBufferError> {
    if bytes.len() % WORD_SIZE != 0 {
        return Err(WordBufferError::Misaligned(bytes.len()));
    }

    let mut cursor = Cursor::new(bytes);
    let mut words = Vec::with_capacity(bytes.len() / WORD_SIZE);
    for _ in 0..(bytes.len() / WORD_SIZE) {
        words.push(cursor.read_u32::<B>()?);
    }
    Ok(words)
}
