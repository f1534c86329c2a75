use super::constants::*;
use super::error::DecodeError;
use super::event::{Event, Peak};
use super::word::*;

/// Hardware pulse values collected for one pulse slot while decoding
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct PulseAccumulator {
    integral: u32,
    time: u32,
}

type PulseSlots = [Option<PulseAccumulator>; MAX_PULSES];

/// An open window raw data block. A `None` channel means the samples are dropped.
#[derive(Debug)]
struct WindowBlock {
    channel: Option<usize>,
    remaining: usize,
}

/// Scratch state for a single pass over a word buffer. Never outlives the decode call.
#[derive(Debug)]
struct DecodeState {
    current_kind: Option<WordKind>,
    window: Option<WindowBlock>,
    pulses: Vec<PulseSlots>,
}

impl DecodeState {
    fn new(n_channels: usize) -> Self {
        Self {
            current_kind: None,
            window: None,
            pulses: vec![[None; MAX_PULSES]; n_channels],
        }
    }

    /// Handle the next word. Non-fatal problems are returned as errors too; the caller decides
    /// whether to keep going.
    fn process_word(
        &mut self,
        event: &mut Event,
        index: usize,
        word: u32,
    ) -> Result<(), DecodeError> {
        if is_type_defining(word) {
            let tag = type_tag(word);
            event.mode.insert_tag(tag);
            self.window = None;
            let kind = WordKind::try_from(tag)
                .map_err(|_| DecodeError::UnknownTypeTag { tag, index, word })?;
            self.current_kind = Some(kind);
            self.start_block(event, kind, index, word)
        } else {
            match self.current_kind {
                Some(kind) => self.continue_block(event, kind, index, word),
                None => Err(DecodeError::UnexpectedContinuation { index, word }),
            }
        }
    }

    fn start_block(
        &mut self,
        event: &mut Event,
        kind: WordKind,
        index: usize,
        word: u32,
    ) -> Result<(), DecodeError> {
        match kind {
            WordKind::EventHeader => Err(DecodeError::MisplacedEventHeader { index, word }),
            WordKind::TriggerTime => {
                event.trigger_times.push(trigger_time(word));
                Ok(())
            }
            WordKind::WindowRawData => {
                let ch = channel(word);
                let remaining = window_word_count(word);
                if let Some(data) = event.channels.get_mut(ch) {
                    data.raw.clear();
                    self.window = Some(WindowBlock {
                        channel: Some(ch),
                        remaining,
                    });
                    Ok(())
                } else {
                    // Still swallow the samples so they aren't reported as strays
                    self.window = Some(WindowBlock {
                        channel: None,
                        remaining,
                    });
                    Err(DecodeError::ChannelOutOfRange {
                        channel: ch,
                        n_channels: event.n_channels(),
                        index,
                    })
                }
            }
            WordKind::PulseIntegral | WordKind::PulseTime => self.record_pulse(kind, index, word),
            WordKind::PulseRawData | WordKind::Scaler => {
                Err(DecodeError::UnsupportedType(kind, index))
            }
            WordKind::BlockHeader
            | WordKind::BlockTrailer
            | WordKind::InvalidData
            | WordKind::FillerWord => Ok(()),
        }
    }

    fn continue_block(
        &mut self,
        event: &mut Event,
        kind: WordKind,
        index: usize,
        word: u32,
    ) -> Result<(), DecodeError> {
        match kind {
            WordKind::TriggerTime => {
                event.trigger_times.push(trigger_time(word));
                Ok(())
            }
            WordKind::WindowRawData => self.fill_window(event, index, word),
            WordKind::PulseIntegral | WordKind::PulseTime => self.record_pulse(kind, index, word),
            WordKind::EventHeader => Err(DecodeError::UnexpectedContinuation { index, word }),
            // Payload of unsupported or ignored blocks
            _ => Ok(()),
        }
    }

    fn fill_window(&mut self, event: &mut Event, index: usize, word: u32) -> Result<(), DecodeError> {
        match self.window.as_mut() {
            Some(block) if block.remaining > 0 => {
                block.remaining -= 1;
                if let Some(data) = block.channel.and_then(|ch| event.channels.get_mut(ch)) {
                    data.raw.extend(unpack_samples(word).into_iter().flatten());
                }
                Ok(())
            }
            _ => Err(DecodeError::UnexpectedContinuation { index, word }),
        }
    }

    fn record_pulse(&mut self, kind: WordKind, index: usize, word: u32) -> Result<(), DecodeError> {
        let n_channels = self.pulses.len();
        let ch = channel(word);
        let slots = self
            .pulses
            .get_mut(ch)
            .ok_or(DecodeError::ChannelOutOfRange {
                channel: ch,
                n_channels,
                index,
            })?;
        let pulse = slots[pulse_slot(word)].get_or_insert_with(PulseAccumulator::default);
        match kind {
            WordKind::PulseIntegral => pulse.integral = pulse_integral(word),
            WordKind::PulseTime => pulse.time = pulse_time(word),
            _ => (),
        }
        Ok(())
    }

    /// Turn every pulse slot that received data into a Peak on its channel
    fn flush_pulses(self, event: &mut Event, clock_mhz: f64) {
        for (data, slots) in event.channels.iter_mut().zip(self.pulses) {
            data.peaks
                .extend(slots.into_iter().flatten().map(|pulse| Peak {
                    integral: pulse.integral as f64,
                    time: pulse.time as f64 * PULSE_TIME_NS_MHZ / clock_mhz,
                    ..Default::default()
                }));
        }
    }
}

/// Decoder turns a buffer of FADC250 words into an Event.
///
/// The decoder keeps no state between calls; the only setting is the digitizer clock used to
/// convert hardware pulse times to ns. Reference: the JLab FADC250 user manual, "Data Format".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decoder {
    clock_mhz: f64,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(DEFAULT_CLOCK_MHZ)
    }
}

impl Decoder {
    /// Create a new Decoder for a digitizer running at `clock_mhz`
    pub fn new(clock_mhz: f64) -> Self {
        Self { clock_mhz }
    }

    pub fn clock_mhz(&self) -> f64 {
        self.clock_mhz
    }

    pub fn set_clock_mhz(&mut self, clock_mhz: f64) {
        self.clock_mhz = clock_mhz;
    }

    /// Decode a buffer into a new Event with `n_channels` channels.
    ///
    /// A fatal error drops the partially decoded event.
    pub fn decode(&self, buffer: &[u32], n_channels: usize) -> Result<Event, DecodeError> {
        let mut event = Event::new(n_channels);
        self.decode_into(&mut event, buffer)?;
        Ok(event)
    }

    /// Decode the FADC payload of a readout bank, skipping the bank header words
    pub fn decode_bank(&self, buffer: &[u32], n_channels: usize) -> Result<Event, DecodeError> {
        match buffer.get(BANK_HEADER_WORDS..) {
            Some(payload) => self.decode(payload, n_channels),
            None => {
                spdlog::error!("FADC250 bank of {} words has no payload", buffer.len());
                Err(DecodeError::MalformedHeader(None))
            }
        }
    }

    /// Decode a buffer into an existing Event, reusing its channel storage.
    ///
    /// The event is cleared first. If the header is bad the event is left cleared. Any other
    /// fatal error stops the decode and leaves whatever was decoded so far in the event; that
    /// content should not be treated as valid. Non-fatal problems are logged and skipped.
    pub fn decode_into(&self, event: &mut Event, buffer: &[u32]) -> Result<(), DecodeError> {
        event.clear();

        let header = match buffer.first() {
            Some(&word) if is_type_defining(word) && type_tag(word) == WordKind::EventHeader.tag() => {
                word
            }
            first => {
                let e = DecodeError::MalformedHeader(first.copied());
                spdlog::error!("{e}");
                return Err(e);
            }
        };
        event.number = event_number(header);
        event.mode.insert(WordKind::EventHeader);

        let mut state = DecodeState::new(event.n_channels());
        for (index, &word) in buffer.iter().enumerate().skip(1) {
            if let Err(e) = state.process_word(event, index, word) {
                if e.is_fatal() {
                    spdlog::error!("{e}");
                    return Err(e);
                }
                spdlog::warn!("{e}");
            }
        }
        state.flush_pulses(event, self.clock_mhz);

        spdlog::trace!(
            "Decoded FADC250 event {} with mode {:?} from {} words",
            event.number,
            event.mode,
            buffer.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::build::*;
    use proptest::prelude::*;

    #[test]
    fn test_window_raw_data() {
        let buffer = [0x9100_0005, 0xA000_0002, 0x0064_0096, 0x00C8_1000];
        let event = Decoder::default()
            .decode(&buffer, DEFAULT_NUMBER_OF_CHANNELS)
            .unwrap();
        assert_eq!(event.number, 5);
        assert_eq!(event.channels[0].raw, vec![100, 150, 200, 4096]);
        assert!(event.channels[1..].iter().all(|ch| ch.is_empty()));
        assert_eq!(
            event.mode.bits(),
            (1 << WordKind::EventHeader.tag()) | (1 << WordKind::WindowRawData.tag())
        );
    }

    #[test]
    fn test_header_only() {
        let event = Decoder::default().decode(&[header(1234)], 16).unwrap();
        assert_eq!(event.number, 1234);
        assert_eq!(event.n_channels(), 16);
        assert!(!event.has_data());
        assert!(event.trigger_times.is_empty());
        assert_eq!(event.mode, EventMode::from(WordKind::EventHeader));
    }

    #[test]
    fn test_event_number_is_22_bits() {
        let word = TYPE_DEFINING_BIT | (2 << TYPE_TAG_SHIFT) | 0x07FF_FFFF;
        let event = Decoder::default().decode(&[word], 16).unwrap();
        assert_eq!(event.number, 0x3F_FFFF);
    }

    #[test]
    fn test_malformed_header() {
        let decoder = Decoder::default();
        let mut event = Event::new(16);
        event.channels[3].raw.push(10);
        event.number = 99;

        // header without the type-defining bit
        let result = decoder.decode_into(&mut event, &[0x1100_0005, 0xA000_0001, 0x0001_0001]);
        assert_eq!(result, Err(DecodeError::MalformedHeader(Some(0x1100_0005))));
        assert_eq!(event, Event::new(16));

        // type-defining but not an event header
        let result = decoder.decode(&[window_header(0, 1), sample_pair(1, 2)], 16);
        assert!(matches!(result, Err(DecodeError::MalformedHeader(Some(_)))));

        assert_eq!(decoder.decode(&[], 16), Err(DecodeError::MalformedHeader(None)));
    }

    #[test]
    fn test_trigger_times() {
        let buffer = [
            header(3),
            type_word(WordKind::TriggerTime, 0x12_3456),
            0x7F00_0001,
            type_word(WordKind::FillerWord, 0),
        ];
        let event = Decoder::default().decode(&buffer, 16).unwrap();
        assert_eq!(event.trigger_times, vec![0x12_3456, 0x00_0001]);
        assert!(event.mode.contains(WordKind::TriggerTime));
        assert!(event.mode.contains(WordKind::FillerWord));
    }

    #[test]
    fn test_sample_validity_bits() {
        let buffer = [
            header(1),
            window_header(2, 3),
            sample_pair(10, 11) | SAMPLE_A_INVALID_BIT,
            sample_pair(12, 13) | SAMPLE_B_INVALID_BIT,
            sample_pair(14, 15) | SAMPLE_A_INVALID_BIT | SAMPLE_B_INVALID_BIT,
        ];
        let event = Decoder::default().decode(&buffer, 16).unwrap();
        assert_eq!(event.channels[2].raw, vec![11, 12]);
    }

    #[test]
    fn test_window_ends_at_new_block() {
        let buffer = [
            header(1),
            window_header(0, 10),
            sample_pair(1, 2),
            window_header(1, 1),
            sample_pair(3, 4),
        ];
        let event = Decoder::default().decode(&buffer, 16).unwrap();
        assert_eq!(event.channels[0].raw, vec![1, 2]);
        assert_eq!(event.channels[1].raw, vec![3, 4]);
    }

    #[test]
    fn test_unexpected_continuation_is_skipped() {
        let buffer = [
            header(1),
            sample_pair(7, 7), // no block open yet
            window_header(4, 1),
            sample_pair(1, 2),
            sample_pair(3, 4), // beyond the declared word count
            type_word(WordKind::TriggerTime, 42),
        ];
        let event = Decoder::default().decode(&buffer, 16).unwrap();
        assert_eq!(event.channels[4].raw, vec![1, 2]);
        assert_eq!(event.trigger_times, vec![42]);
    }

    #[test]
    fn test_unknown_tag_aborts() {
        let decoder = Decoder::default();
        let unknown = TYPE_DEFINING_BIT | (5 << TYPE_TAG_SHIFT);
        let buffer = [
            header(8),
            type_word(WordKind::TriggerTime, 100),
            unknown,
            window_header(0, 1),
            sample_pair(1, 2),
        ];
        assert_eq!(
            decoder.decode(&buffer, 16),
            Err(DecodeError::UnknownTypeTag {
                tag: 5,
                index: 2,
                word: unknown
            })
        );

        // The partial event stays in caller-owned storage
        let mut event = Event::new(16);
        assert!(decoder.decode_into(&mut event, &buffer).is_err());
        assert_eq!(event.trigger_times, vec![100]);
        assert!(event.mode.contains_tag(5));
        assert!(event.channels[0].raw.is_empty());
    }

    #[test]
    fn test_misplaced_event_header() {
        let result = Decoder::default().decode(&[header(1), header(2)], 16);
        assert_eq!(
            result,
            Err(DecodeError::MisplacedEventHeader {
                index: 1,
                word: header(2)
            })
        );
    }

    #[test]
    fn test_unsupported_types_continue() {
        let buffer = [
            header(1),
            type_word(WordKind::PulseRawData, 0),
            0x0000_1234,
            type_word(WordKind::Scaler, 2),
            0x0000_0001,
            0x0000_0002,
            window_header(1, 1),
            sample_pair(5, 6),
        ];
        let event = Decoder::default().decode(&buffer, 16).unwrap();
        assert_eq!(event.channels[1].raw, vec![5, 6]);
        assert!(event.mode.contains(WordKind::PulseRawData));
        assert!(event.mode.contains(WordKind::Scaler));
        assert!(event.channels.iter().all(|ch| ch.peaks.is_empty()));
    }

    #[test]
    fn test_pulse_words() {
        let buffer = [
            header(1),
            pulse_word(WordKind::PulseIntegral, 3, 1, 1234),
            pulse_word(WordKind::PulseIntegral, 3, 0, 55) & !TYPE_DEFINING_BIT,
            pulse_word(WordKind::PulseTime, 3, 1, 640),
            pulse_word(WordKind::PulseTime, 9, 3, 64),
        ];
        let event = Decoder::new(250.0).decode(&buffer, 16).unwrap();

        let peaks = &event.channels[3].peaks;
        assert_eq!(peaks.len(), 2);
        // slot order
        assert_eq!(peaks[0].integral, 55.0);
        assert_eq!(peaks[0].time, 0.0);
        assert_eq!(peaks[1].integral, 1234.0);
        assert_eq!(peaks[1].time, 40.0);
        assert_eq!(peaks[1].height, 0.0);

        let peaks = &event.channels[9].peaks;
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].integral, 0.0);
        assert_eq!(peaks[0].time, 4.0);
    }

    #[test]
    fn test_channel_out_of_range() {
        let buffer = [
            header(1),
            window_header(7, 1),
            sample_pair(1, 2),
            pulse_word(WordKind::PulseIntegral, 6, 0, 10),
            window_header(1, 1),
            sample_pair(3, 4),
        ];
        let event = Decoder::default().decode(&buffer, 4).unwrap();
        assert_eq!(event.n_channels(), 4);
        assert_eq!(event.channels[1].raw, vec![3, 4]);
        assert!(event.channels.iter().all(|ch| ch.peaks.is_empty()));
    }

    #[test]
    fn test_decode_bank() {
        let decoder = Decoder::default();
        let buffer = [0x0000_0010, 0xDEAD_BEEF, header(77), window_header(0, 1), sample_pair(8, 9)];
        let event = decoder.decode_bank(&buffer, 16).unwrap();
        assert_eq!(event.number, 77);
        assert_eq!(event.channels[0].raw, vec![8, 9]);
        assert_eq!(decoder.decode_bank(&buffer[..1], 16), Err(DecodeError::MalformedHeader(None)));
    }

    #[test]
    fn test_decode_into_resets_previous_event() {
        let decoder = Decoder::default();
        let mut event = Event::new(16);
        let first = [header(1), window_header(0, 1), sample_pair(1, 2)];
        let second = [header(2), type_word(WordKind::TriggerTime, 5)];
        decoder.decode_into(&mut event, &first).unwrap();
        decoder.decode_into(&mut event, &second).unwrap();
        assert_eq!(event, decoder.decode(&second, 16).unwrap());
        assert!(event.channels[0].raw.is_empty());
    }

    const NON_FATAL_KINDS: [WordKind; 10] = [
        WordKind::BlockHeader,
        WordKind::BlockTrailer,
        WordKind::TriggerTime,
        WordKind::WindowRawData,
        WordKind::PulseRawData,
        WordKind::PulseIntegral,
        WordKind::PulseTime,
        WordKind::Scaler,
        WordKind::InvalidData,
        WordKind::FillerWord,
    ];

    proptest! {
        #[test]
        fn prop_window_yields_two_samples_per_word(
            samples in prop::collection::vec(0u32..8192, 0..600).prop_map(|mut s| {
                if s.len() % 2 == 1 { s.pop(); }
                s
            }),
            ch in 0usize..16,
        ) {
            let mut buffer = vec![header(1)];
            buffer.extend(window_block(ch, &samples));
            let event = Decoder::default().decode(&buffer, 16).unwrap();
            prop_assert_eq!(event.channels[ch].raw.len(), samples.len());
            prop_assert_eq!(&event.channels[ch].raw, &samples);
        }

        #[test]
        fn prop_mode_matches_observed_tags(
            number in 0u32..(1 << 22),
            picks in prop::collection::vec(0usize..NON_FATAL_KINDS.len(), 0..20),
        ) {
            let mut buffer = vec![header(number)];
            let mut expected: u16 = 1 << WordKind::EventHeader.tag();
            for pick in picks {
                let kind = NON_FATAL_KINDS[pick];
                buffer.push(type_word(kind, 0));
                expected |= 1 << kind.tag();
            }
            let event = Decoder::default().decode(&buffer, 16).unwrap();
            prop_assert_eq!(event.number, number);
            prop_assert_eq!(event.mode.bits(), expected);
        }

        #[test]
        fn prop_decode_is_deterministic(words in prop::collection::vec(any::<u32>(), 0..64)) {
            let mut buffer = vec![header(9)];
            buffer.extend(words);
            let decoder = Decoder::default();
            prop_assert_eq!(decoder.decode(&buffer, 16), decoder.decode(&buffer, 16));
        }
    }
}
