use serde::{Deserialize, Serialize};

use super::constants::*;
use super::event::{ChannelData, Peak, Pedestal};
use super::spectrum::{clip_background, mean_err, smooth_spectrum, trimmed_pedestal};

/// Settings of the waveform analysis. Serializable so they can live in the YAML config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Smoothing half width plus one, in samples
    pub resolution: usize,
    /// Minimum peak height in ADC units
    pub threshold: f64,
    /// Minimum number of samples used for the pedestal
    pub pedestal_window: usize,
    /// Maximum standard deviation of a flat baseline segment
    pub pedestal_flatness: f64,
    /// ADC value at which the digitizer saturates
    pub overflow_value: u32,
    /// Sampling clock in MHz
    pub clock_mhz: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            threshold: DEFAULT_THRESHOLD,
            pedestal_window: DEFAULT_PEDESTAL_WINDOW,
            pedestal_flatness: DEFAULT_PEDESTAL_FLATNESS,
            overflow_value: DEFAULT_OVERFLOW_VALUE,
            clock_mhz: DEFAULT_CLOCK_MHZ,
        }
    }
}

/// Trend of a spectrum between two neighboring points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trend {
    Rising,
    Flat,
    Falling,
}

impl Trend {
    /// Trend going from `next` to `current`; differences below the tolerance are flat
    fn between(current: f64, next: f64) -> Self {
        if (current - next).abs() < TREND_TOLERANCE {
            Self::Flat
        } else if current > next {
            Self::Rising
        } else {
            Self::Falling
        }
    }

    fn sign(&self) -> i8 {
        match self {
            Self::Rising => 1,
            Self::Flat => 0,
            Self::Falling => -1,
        }
    }
}

/// Analyzer finds the pedestal and the peaks of a FADC250 waveform.
///
/// It assumes a constant pedestal and a spectrum that is not heavily convoluted: the samples
/// are smoothed, local extrema are collected as candidates, and every candidate that survives
/// the comparison against the pedestal is refined against the raw samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Replace every setting at once
    pub fn configure(&mut self, config: AnalyzerConfig) {
        self.config = config;
    }

    pub fn resolution(&self) -> usize {
        self.config.resolution
    }

    pub fn threshold(&self) -> f64 {
        self.config.threshold
    }

    pub fn pedestal_window(&self) -> usize {
        self.config.pedestal_window
    }

    pub fn pedestal_flatness(&self) -> f64 {
        self.config.pedestal_flatness
    }

    pub fn overflow_value(&self) -> u32 {
        self.config.overflow_value
    }

    pub fn clock_mhz(&self) -> f64 {
        self.config.clock_mhz
    }

    pub fn set_resolution(&mut self, resolution: usize) {
        self.config.resolution = resolution;
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.config.threshold = threshold;
    }

    pub fn set_pedestal_window(&mut self, pedestal_window: usize) {
        self.config.pedestal_window = pedestal_window;
    }

    pub fn set_pedestal_flatness(&mut self, pedestal_flatness: f64) {
        self.config.pedestal_flatness = pedestal_flatness;
    }

    pub fn set_overflow_value(&mut self, overflow_value: u32) {
        self.config.overflow_value = overflow_value;
    }

    pub fn set_clock_mhz(&mut self, clock_mhz: f64) {
        self.config.clock_mhz = clock_mhz;
    }

    /// Analyze the raw samples of a channel, filling its pedestal and peaks.
    ///
    /// Existing peaks are replaced. A channel without samples is left alone.
    pub fn analyze(&self, data: &mut ChannelData) {
        if data.raw.is_empty() {
            return;
        }
        data.peaks.clear();

        let buffer = smooth_spectrum(&data.raw, self.config.resolution);
        let candidates = self.search_maxima(&buffer, self.config.threshold);
        data.pedestal = self.find_pedestal(&buffer);

        for candidate in candidates {
            if let Some(peak) = self.refine_peak(candidate, &buffer, &data.raw, &data.pedestal) {
                data.peaks.push(peak);
            }
        }
    }

    /// Analyze a bare sample buffer, returning a new channel holding a copy of the samples
    pub fn analyze_samples(&self, samples: &[u32]) -> ChannelData {
        let mut data = ChannelData::from_samples(samples);
        self.analyze(&mut data);
        data
    }

    /// Find the pedestal of a smoothed spectrum, assuming it is a constant.
    ///
    /// Preference goes to the lowest flat window of the spectrum, ignoring flat saturated
    /// plateaus. If there is no flat window the background is estimated by clipping and the
    /// pedestal is taken from its trimmed center.
    pub fn find_pedestal(&self, buffer: &[f64]) -> Pedestal {
        // Too few samples: everything may be signal, so take the lowest sample as the mean
        if buffer.len() < self.config.pedestal_window {
            let (mean, err) = mean_err(buffer);
            let lowest = buffer.iter().copied().fold(mean, f64::min);
            return Pedestal::new(lowest, err);
        }

        let window = self
            .config
            .pedestal_window
            .max(buffer.len() / PEDESTAL_WINDOW_DIVISOR)
            .max(1);
        let max_mean = self.config.overflow_value as f64 * OVERFLOW_PEDESTAL_FRACTION;
        let baseline = buffer
            .windows(window)
            .map(mean_err)
            .filter(|&(mean, err)| err < self.config.pedestal_flatness && mean < max_mean)
            .fold(None, |best: Option<(f64, f64)>, current| match best {
                Some(b) if b.0 <= current.0 => Some(b),
                _ => Some(current),
            });
        if let Some((mean, err)) = baseline {
            return Pedestal::new(mean, err);
        }

        spdlog::debug!(
            "No flat baseline among {} samples, estimating the pedestal from the background",
            buffer.len()
        );
        let n = buffer.len();
        let mut background = buffer.to_vec();
        clip_background(&mut background, n / BACKGROUND_CLIP_DIVISOR);
        // central 60%
        let start = n / 5;
        let len = 3 * n / 5;
        trimmed_pedestal(
            &background[start..start + len],
            BACKGROUND_TRIM_SIGMA,
            BACKGROUND_TRIM_ITERATIONS,
            self.config.pedestal_window,
        )
    }

    /// Search the local extrema of a smoothed spectrum as peak candidates.
    ///
    /// Candidate heights are signed and measured against the straight line between the two
    /// ends of the candidate; candidates with `|height| <= height_thres` are dropped.
    pub fn search_maxima(&self, buffer: &[f64], height_thres: f64) -> Vec<Peak> {
        let n = buffer.len();
        let mut candidates = Vec::new();
        if n < 3 {
            return candidates;
        }

        for i in 1..(n - 1) {
            let to_left = Trend::between(buffer[i], buffer[i - 1]);
            let to_right = Trend::between(buffer[i], buffer[i + 1]);
            // an extremum, or the edge of a plateau
            if to_left == Trend::Flat || to_left.sign() * to_right.sign() < 0 {
                continue;
            }

            let mut left = 1;
            while left < i && Trend::between(buffer[i - left], buffer[i - left - 1]) == to_left {
                left += 1;
            }
            let mut right = 1;
            while i + right < n - 1
                && Trend::between(buffer[i + right], buffer[i + right + 1]).sign() * to_left.sign()
                    >= 0
            {
                right += 1;
            }

            let base = (buffer[i - left] * right as f64 + buffer[i + right] * left as f64)
                / (left + right) as f64;
            let height = buffer[i] - base;
            if height.abs() > height_thres {
                candidates.push(Peak {
                    height,
                    position: i,
                    left: i - left,
                    right: i + right,
                    ..Default::default()
                });
            }
        }
        candidates
    }

    /// Check a candidate against the pedestal and turn it into a final peak
    fn refine_peak(
        &self,
        mut peak: Peak,
        buffer: &[f64],
        raw: &[u32],
        pedestal: &Pedestal,
    ) -> Option<Peak> {
        let height = buffer[peak.position] - pedestal.mean;
        // wrong sign from the rough local baseline, too small, or not significant
        if height * peak.height < 0.0
            || height.abs() < self.config.threshold
            || height.abs() < PEAK_SIGNIFICANCE * pedestal.err
        {
            return None;
        }
        peak.height = height;

        // integrate until the spectrum touches or crosses the pedestal
        let crossed = |value: f64| value.abs() <= pedestal.err || value * height < 0.0;
        peak.integral = height;
        for i in (peak.left..peak.position).rev() {
            let value = buffer[i] - pedestal.mean;
            if crossed(value) {
                peak.left = i;
                break;
            }
            peak.integral += value;
        }
        for i in (peak.position + 1)..=peak.right {
            let value = buffer[i] - pedestal.mean;
            if crossed(value) {
                peak.right = i;
                break;
            }
            peak.integral += value;
        }

        // smoothing blurs the maximum, report the largest raw sample around it
        let smoothed_position = peak.position;
        peak.height = raw[smoothed_position] as f64 - pedestal.mean;
        let reach = self.config.resolution.saturating_sub(1);
        let first = smoothed_position.saturating_sub(reach);
        let last = (smoothed_position + reach).min(raw.len() - 1);
        for i in first..=last {
            let value = raw[i] as f64 - pedestal.mean;
            if value.abs() > peak.height.abs() {
                peak.position = i;
                peak.height = value;
            }
        }
        peak.left = peak.left.min(peak.position);
        peak.right = peak.right.max(peak.position);

        peak.time = peak.position as f64 * 1e3 / self.config.clock_mhz;
        peak.overflow = raw[peak.position] >= self.config.overflow_value;
        Some(peak)
    }
}
