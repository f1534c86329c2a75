//! # libfadc250
//!
//! libfadc250 decodes the data of the JLab FADC250 flash ADC and analyzes the recorded
//! waveforms, written in Rust. It takes the 32-bit words read out from one module for one
//! trigger and produces an [`event::Event`]: the event number, the trigger times, and for each
//! channel the raw samples, the pedestal, and the list of peaks.
//!
//! ## Word Format
//!
//! Every FADC250 word is 32 bits. Bit 31 marks a *type-defining* word, which carries a 4-bit
//! type tag in bits 27-30. Words with bit 31 cleared are continuations of the most recent
//! type-defining word. An event buffer must begin with an event header:
//!
//! ```text
//! event header     1 | 0010 | ........ | event number (bits 0-21)
//! trigger time     1 | 0011 | ........ | time (bits 0-23)
//! window raw data  1 | 0100 | ch(23-26) | ...... | number of words (bits 0-11)
//!   continuation   0 | a invalid(29) | a (16-28) | b invalid (13) | b (0-12)
//! pulse integral   1 | 0111 | ch(23-26) | pulse (21-22) | integral (bits 0-18)
//! pulse time       1 | 1000 | ch(23-26) | pulse (21-22) | time (bits 0-15)
//! ```
//!
//! Other tags (block header/trailer, filler, data-not-valid, ...) are recognized and recorded
//! in the event mode but carry no data. Buffers embedded in a bank with a two word header can
//! be decoded with [`decoder::Decoder::decode_bank`]. Raw bytes are converted to words with
//! [`word_buffer::words_from_bytes`] in the byte order of the source.
//!
//! Decode problems with a single word are logged as warnings and the word is skipped. A bad
//! event header, an unknown type tag, or a second event header abort the event with a
//! [`error::DecodeError`].
//!
//! ## Waveform Analysis
//!
//! The [`analyzer::Analyzer`] assumes a constant pedestal. For each channel with samples it
//!
//! 1. smooths the samples with a triangular moving average of width `resolution`
//! 2. collects the local extrema of the smoothed spectrum as peak candidates
//! 3. finds the pedestal, preferring the lowest flat window of the spectrum and falling back
//!    to a clipped background estimate when the spectrum is never flat
//! 4. drops candidates that are below threshold or not significant against the pedestal,
//!    then integrates and re-locates the survivors on the raw samples
//!
//! Peak times are `position * 1000 / clock_mhz` ns. A peak whose raw sample reaches the
//! overflow value is flagged as overflowing.
//!
//! ## Configuration
//!
//! Batches of events are processed with [`process::process_events`], which divides the
//! events amongst `n_threads` workers. The configuration is read from YAML:
//!
//! ```yml
//! n_channels: 16
//! n_threads: 1
//! analyzer:
//!   resolution: 2
//!   threshold: 10.0
//!   pedestal_window: 5
//!   pedestal_flatness: 1.0
//!   overflow_value: 4096
//!   clock_mhz: 250.0
//! ```
//!
//! Any analyzer field may be left out to use its default.
//!
//! ## Logging
//!
//! The library logs through [spdlog](https://docs.rs/spdlog-rs); install a logger in the
//! application to see the decode warnings.
pub mod analyzer;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod error;
pub mod event;
pub mod process;
pub mod spectrum;
pub mod word;
pub mod word_buffer;
