use super::constants::DEFAULT_NUMBER_OF_CHANNELS;
use super::word::EventMode;

/// Estimated constant baseline of a channel, in raw ADC units
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pedestal {
    pub mean: f64,
    pub err: f64,
}

impl Pedestal {
    pub fn new(mean: f64, err: f64) -> Self {
        Self { mean, err }
    }
}

/// A pulse found in a channel.
///
/// `height` and `integral` are pedestal subtracted ADC units, `time` is in ns.
/// `position`, `left` and `right` are sample indices of the peak and its extent. Peaks built
/// from hardware pulse words only carry `integral` and `time`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Peak {
    pub height: f64,
    pub integral: f64,
    pub time: f64,
    pub position: usize,
    pub left: usize,
    pub right: usize,
    pub overflow: bool,
}

impl Peak {
    /// Is the sample index within the extent of the peak
    pub fn contains(&self, index: usize) -> bool {
        index >= self.left && index <= self.right
    }
}

/// Everything recorded for a single FADC250 channel in one event
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChannelData {
    pub pedestal: Pedestal,
    pub peaks: Vec<Peak>,
    pub raw: Vec<u32>,
}

impl ChannelData {
    pub fn from_samples(samples: &[u32]) -> Self {
        Self {
            raw: samples.to_vec(),
            ..Default::default()
        }
    }

    pub fn clear(&mut self) {
        self.pedestal = Pedestal::default();
        self.peaks.clear();
        self.raw.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty() && self.raw.is_empty()
    }

    /// Order the peaks by descending height. Not done by the analyzer itself, peaks are
    /// otherwise kept in the order they were found.
    pub fn sort_peaks_by_height(&mut self) {
        self.peaks.sort_by(|a, b| b.height.total_cmp(&a.height));
    }
}

/// A decoded FADC250 event.
///
/// The channel list has a fixed length set at construction; channel `i` is `channels[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub number: u32,
    pub mode: EventMode,
    pub trigger_times: Vec<u32>,
    pub channels: Vec<ChannelData>,
}

impl Default for Event {
    fn default() -> Self {
        Self::new(DEFAULT_NUMBER_OF_CHANNELS)
    }
}

impl Event {
    pub fn new(n_channels: usize) -> Self {
        Self {
            number: 0,
            mode: EventMode::default(),
            trigger_times: Vec::new(),
            channels: vec![ChannelData::default(); n_channels],
        }
    }

    /// Reset for the next decode. The number of channels is kept.
    pub fn clear(&mut self) {
        self.number = 0;
        self.mode.clear();
        self.trigger_times.clear();
        for channel in self.channels.iter_mut() {
            channel.clear();
        }
    }

    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, index: usize) -> Option<&ChannelData> {
        self.channels.get(index)
    }

    /// Does any channel hold samples or peaks
    pub fn has_data(&self) -> bool {
        self.channels.iter().any(|ch| !ch.is_empty())
    }
}
