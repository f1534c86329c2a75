use bitvec::prelude::*;
use std::fmt;

use super::constants::*;
use super::error::WordKindError;

/// The data type of a FADC250 word, given by the 4-bit tag of a type-defining word.
///
/// See the FADC250 user manual, "Data Format". Tags 5, 9-11 and 13 are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WordKind {
    BlockHeader = 0,
    BlockTrailer = 1,
    EventHeader = 2,
    TriggerTime = 3,
    WindowRawData = 4,
    PulseRawData = 6,
    PulseIntegral = 7,
    PulseTime = 8,
    Scaler = 12,
    InvalidData = 14,
    FillerWord = 15,
}

impl TryFrom<u8> for WordKind {
    type Error = WordKindError;
    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::BlockHeader),
            1 => Ok(Self::BlockTrailer),
            2 => Ok(Self::EventHeader),
            3 => Ok(Self::TriggerTime),
            4 => Ok(Self::WindowRawData),
            6 => Ok(Self::PulseRawData),
            7 => Ok(Self::PulseIntegral),
            8 => Ok(Self::PulseTime),
            12 => Ok(Self::Scaler),
            14 => Ok(Self::InvalidData),
            15 => Ok(Self::FillerWord),
            _ => Err(WordKindError::UnknownTag(tag)),
        }
    }
}

impl WordKind {
    pub fn tag(&self) -> u8 {
        *self as u8
    }
}

// Field accessors for a single digitizer word. Which ones are meaningful depends on the
// type of the block the word belongs to.

/// Does this word start a new block (bit 31)
pub fn is_type_defining(word: u32) -> bool {
    word & TYPE_DEFINING_BIT != 0
}

pub fn type_tag(word: u32) -> u8 {
    ((word >> TYPE_TAG_SHIFT) & TYPE_TAG_MASK) as u8
}

pub fn event_number(word: u32) -> u32 {
    word & EVENT_NUMBER_MASK
}

pub fn trigger_time(word: u32) -> u32 {
    word & TRIGGER_TIME_MASK
}

pub fn channel(word: u32) -> usize {
    ((word >> CHANNEL_SHIFT) & CHANNEL_MASK) as usize
}

pub fn window_word_count(word: u32) -> usize {
    (word & WINDOW_WORD_COUNT_MASK) as usize
}

pub fn pulse_slot(word: u32) -> usize {
    ((word >> PULSE_SLOT_SHIFT) & PULSE_SLOT_MASK) as usize
}

pub fn pulse_integral(word: u32) -> u32 {
    word & PULSE_INTEGRAL_MASK
}

pub fn pulse_time(word: u32) -> u32 {
    word & PULSE_TIME_MASK
}

/// Unpack the (up to) two samples of a window raw data continuation word.
///
/// Sample A lives in the high half-word and comes first. Either half is skipped when its
/// invalid bit is set.
pub fn unpack_samples(word: u32) -> [Option<u32>; 2] {
    let sample_a = if word & SAMPLE_A_INVALID_BIT == 0 {
        Some((word >> SAMPLE_A_SHIFT) & SAMPLE_MASK)
    } else {
        None
    };
    let sample_b = if word & SAMPLE_B_INVALID_BIT == 0 {
        Some(word & SAMPLE_MASK)
    } else {
        None
    };
    [sample_a, sample_b]
}

/// EventMode records which type tags were observed while decoding an event.
///
/// Bit `k` is set if and only if a word with type tag `k` was seen. Unknown tags are recorded
/// too, since the word carrying them was observed before the decode aborted.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct EventMode(BitArr!(for NUMBER_OF_TYPE_TAGS, in u16, Lsb0));

impl EventMode {
    pub fn from_bits(bits: u16) -> Self {
        Self(BitArray::new([bits]))
    }

    pub fn bits(&self) -> u16 {
        self.0.into_inner()[0]
    }

    pub fn insert_tag(&mut self, tag: u8) {
        self.0.set(tag as usize & TYPE_TAG_MASK as usize, true);
    }

    pub fn insert(&mut self, kind: WordKind) {
        self.insert_tag(kind.tag());
    }

    pub fn contains_tag(&self, tag: u8) -> bool {
        (tag as usize) < NUMBER_OF_TYPE_TAGS && self.0[tag as usize]
    }

    pub fn contains(&self, kind: WordKind) -> bool {
        self.contains_tag(kind.tag())
    }

    /// Iterate over the recognized kinds present in the mode
    pub fn kinds(&self) -> impl Iterator<Item = WordKind> + '_ {
        self.0
            .iter_ones()
            .filter_map(|tag| WordKind::try_from(tag as u8).ok())
    }

    pub fn is_empty(&self) -> bool {
        self.0.not_any()
    }

    pub fn clear(&mut self) {
        self.0.fill(false);
    }
}

impl From<WordKind> for EventMode {
    fn from(kind: WordKind) -> Self {
        let mut mode = Self::default();
        mode.insert(kind);
        mode
    }
}

impl fmt::Debug for EventMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventMode({:#06x}) ", self.bits())?;
        f.debug_set().entries(self.kinds()).finish()
    }
}
