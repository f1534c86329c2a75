// Numerical helpers for waveform spectra. These operate on plain slices and know nothing about
// the digitizer.
use super::event::Pedestal;

/// Smooth a spectrum with a triangular moving average.
///
/// Each output sample is the weighted mean of the sample and up to `resolution - 1` neighbors
/// on each side, the j-th neighbor pair weighted by `1 - j/(resolution + 1)`. Neighbors are
/// only used in symmetric pairs that fit inside the spectrum, so the edges are smoothed less.
/// A resolution of 0 or 1 is the identity.
pub fn smooth_spectrum<T: Copy + Into<f64>>(samples: &[T], resolution: usize) -> Vec<f64> {
    let n = samples.len();
    if resolution <= 1 {
        return samples.iter().map(|&s| s.into()).collect();
    }
    (0..n)
        .map(|i| {
            let mut value: f64 = samples[i].into();
            let mut weights = 1.0;
            for j in (1..resolution).take_while(|&j| j <= i && i + j < n) {
                let weight = 1.0 - j as f64 / (resolution + 1) as f64;
                value += weight * (samples[i - j].into() + samples[i + j].into());
                weights += 2.0 * weight;
            }
            value / weights
        })
        .collect()
}

/// Mean and (population) standard deviation. Both are 0 for an empty slice.
pub fn mean_err(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Estimate the background of a spectrum in place by iterative clipping.
///
/// Decreasing clipping window, second order filter: for window `w` from `iterations` down to 1,
/// every point at least `w` away from the edges is replaced by `min(y[j], (y[j-w] + y[j+w])/2)`.
/// Peaks narrower than the largest window are removed. Spectra too short for the first window
/// are left untouched.
pub fn clip_background(spectrum: &mut [f64], iterations: usize) {
    let n = spectrum.len();
    if iterations == 0 || n < 2 * iterations + 1 {
        return;
    }
    let mut clipped = spectrum.to_vec();
    for width in (1..=iterations).rev() {
        for j in width..(n - width) {
            let average = (spectrum[j - width] + spectrum[j + width]) / 2.0;
            clipped[j] = spectrum[j].min(average);
        }
        spectrum[width..(n - width)].copy_from_slice(&clipped[width..(n - width)]);
    }
}

/// Mean and error of a flat region with outliers iteratively removed.
///
/// At each of up to `max_iterations` passes the points further than `sigma * err` from the
/// current mean are dropped and the mean/err recomputed. Stops early when nothing was dropped
/// or when fewer than `min_points` points would be left.
pub fn trimmed_pedestal(
    values: &[f64],
    sigma: f64,
    max_iterations: usize,
    min_points: usize,
) -> Pedestal {
    let (mut mean, mut err) = mean_err(values);
    let mut kept = values.to_vec();
    for _ in 0..max_iterations {
        let trimmed: Vec<f64> = kept
            .iter()
            .copied()
            .filter(|v| (v - mean).abs() < err * sigma)
            .collect();
        if trimmed.len() == kept.len() || trimmed.len() < min_points {
            break;
        }
        kept = trimmed;
        (mean, err) = mean_err(&kept);
    }
    Pedestal::new(mean, err)
}
