use super::analyzer::Analyzer;
use super::config::Config;
use super::decoder::Decoder;
use super::error::{DecodeError, ProcessorError};
use super::event::Event;

/// Decode one event buffer and analyze every channel that reported raw samples.
///
/// Channels that only carry hardware pulse words keep the peaks built by the decoder.
pub fn process_event(
    decoder: &Decoder,
    analyzer: &Analyzer,
    buffer: &[u32],
    n_channels: usize,
) -> Result<Event, DecodeError> {
    let mut event = decoder.decode(buffer, n_channels)?;
    for channel in event.channels.iter_mut().filter(|ch| !ch.raw.is_empty()) {
        analyzer.analyze(channel);
    }
    Ok(event)
}

/// Process a subset of event buffers, returning each result with its index
fn process_subset(
    config: &Config,
    buffers: &[Vec<u32>],
    subset: &[usize],
) -> Vec<(usize, Result<Event, DecodeError>)> {
    let decoder = config.decoder();
    let analyzer = config.analyzer();
    subset
        .iter()
        .map(|&idx| {
            (
                idx,
                process_event(&decoder, &analyzer, &buffers[idx], config.n_channels),
            )
        })
        .collect()
}

/// Process a batch of event buffers in parallel.
///
/// The buffers are divided amongst `config.n_threads` workers. Only workers that have
/// something to do are spawned. Results come back in the order of the buffers; a malformed
/// event is an `Err` entry that the caller may skip.
pub fn process_events(
    config: &Config,
    buffers: &[Vec<u32>],
) -> Result<Vec<Result<Event, DecodeError>>, ProcessorError> {
    config.validate()?;
    let subsets = create_subsets(buffers.len(), config.n_threads);
    spdlog::info!(
        "Processing {} events with {} worker(s)...",
        buffers.len(),
        subsets.len()
    );

    let mut results: Vec<Option<Result<Event, DecodeError>>> = vec![None; buffers.len()];
    std::thread::scope(|scope| -> Result<(), ProcessorError> {
        let handles: Vec<_> = subsets
            .iter()
            .map(|subset| scope.spawn(move || process_subset(config, buffers, subset)))
            .collect();
        for (worker_id, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(processed) => {
                    for (idx, result) in processed {
                        results[idx] = Some(result);
                    }
                }
                Err(_) => {
                    spdlog::error!("Worker {} failed to join!", worker_id);
                    return Err(ProcessorError::WorkerPanicked(worker_id));
                }
            }
        }
        Ok(())
    })?;

    let n_failed = results
        .iter()
        .filter(|r| matches!(r, Some(Err(_))))
        .count();
    if n_failed > 0 {
        spdlog::warn!("{} of {} events failed to decode", n_failed, buffers.len());
    }
    spdlog::info!("Done processing events.");

    Ok(results.into_iter().flatten().collect())
}

/// Divide a range of work items in to a set of subsets (per thread/worker).
///
/// Empty subsets are dropped, so there are never more subsets than items.
pub fn create_subsets(n_items: usize, n_threads: usize) -> Vec<Vec<usize>> {
    let mut subsets: Vec<Vec<usize>> = vec![Vec::new(); n_threads.max(1)];
    let n_subsets = subsets.len();

    for idx in 0..n_items {
        subsets[idx % n_subsets].push(idx)
    }

    subsets.retain(|subset| !subset.is_empty());
    subsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::build::*;
    use crate::word::WordKind;

    fn pulse_event(number: u32, apex_height: u32) -> Vec<u32> {
        let mut samples = vec![100u32; 48];
        samples[23] = 100 + apex_height / 2;
        samples[24] = 100 + apex_height;
        samples[25] = 100 + apex_height / 2;
        let mut buffer = vec![header(number)];
        buffer.extend(window_block(5, &samples));
        buffer
    }

    #[test]
    fn test_create_subsets() {
        assert_eq!(create_subsets(5, 2), vec![vec![0, 2, 4], vec![1, 3]]);
        assert_eq!(create_subsets(2, 4), vec![vec![0], vec![1]]);
        assert!(create_subsets(0, 3).is_empty());
        assert_eq!(create_subsets(3, 0), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_process_event() {
        let config = Config::default();
        let mut buffer = pulse_event(12, 400);
        buffer.push(pulse_word(WordKind::PulseIntegral, 2, 0, 5000));
        let event = process_event(
            &config.decoder(),
            &config.analyzer(),
            &buffer,
            config.n_channels,
        )
        .unwrap();

        assert_eq!(event.number, 12);
        let channel = &event.channels[5];
        assert!((channel.pedestal.mean - 100.0).abs() < 1.0);
        assert_eq!(channel.peaks.len(), 1);
        assert_eq!(channel.peaks[0].position, 24);
        assert!((channel.peaks[0].height - 400.0).abs() < 1e-6);

        // hardware pulses are kept on channels without samples
        assert_eq!(event.channels[2].peaks.len(), 1);
        assert_eq!(event.channels[2].peaks[0].integral, 5000.0);
    }

    #[test]
    fn test_process_events_keeps_order() {
        let mut config = Config::default();
        config.n_threads = 3;
        let mut buffers: Vec<Vec<u32>> = (0..7).map(|i| pulse_event(i, 100 + 50 * i)).collect();
        buffers[4] = vec![0x0000_0000, 0x0000_0001];

        let results = process_events(&config, &buffers).unwrap();
        assert_eq!(results.len(), 7);
        for (i, result) in results.iter().enumerate() {
            if i == 4 {
                assert!(matches!(result, Err(DecodeError::MalformedHeader(Some(0)))));
                continue;
            }
            let event = result.as_ref().unwrap();
            assert_eq!(event.number, i as u32);
            let expected = 100.0 + 50.0 * i as f64;
            assert!((event.channels[5].peaks[0].height - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_process_events_bad_config() {
        let mut config = Config::default();
        config.n_threads = 0;
        assert!(matches!(
            process_events(&config, &[]),
            Err(ProcessorError::ConfigError(_))
        ));
    }
}
