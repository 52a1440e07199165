//! Live playback on the default output device.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, info, warn};

use super::AudioSink;
use crate::error::{Error, Result};

/// Poll interval while waiting for the queue to drain
const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Slack on top of the queued audio duration before a stalled device is given up on
const DRAIN_MARGIN: Duration = Duration::from_millis(500);

/// Tail kept alive after the queue drains so the device buffer plays out
const DEVICE_TAIL: Duration = Duration::from_millis(150);

fn lock(queue: &Mutex<VecDeque<f32>>) -> MutexGuard<'_, VecDeque<f32>> {
    queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Poll until `queue` is empty or `timeout` elapses; true when drained
fn wait_for_drain(queue: &Mutex<VecDeque<f32>>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if lock(queue).is_empty() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(DRAIN_POLL);
    }
}

/// Live output sink: written samples are queued and drained by the device
/// callback, mono copied to every channel
pub struct LiveAudioSink {
    /// Samples waiting for the device (shared with the callback)
    queue: Arc<Mutex<VecDeque<f32>>>,

    /// Audio output stream (kept alive until close)
    stream: Option<cpal::Stream>,

    /// Rate the stream was opened at (Hz)
    sample_rate_hz: u32,
}

impl LiveAudioSink {
    /// Open the default output device at `sample_rate_hz`
    pub fn new(sample_rate_hz: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("No audio output device found".to_string()))?;

        let default_config = device
            .default_output_config()
            .map_err(|e| Error::Audio(format!("Failed to get audio config: {}", e)))?;

        if default_config.sample_rate().0 != sample_rate_hz {
            warn!(
                "Device default rate is {}Hz, requesting {}Hz",
                default_config.sample_rate().0,
                sample_rate_hz
            );
        }

        let channels = default_config.channels() as usize;
        let config = cpal::StreamConfig {
            channels: default_config.channels(),
            sample_rate: cpal::SampleRate(sample_rate_hz),
            buffer_size: cpal::BufferSize::Default,
        };

        info!(
            "Audio: {} @ {}Hz, {} channel(s)",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate_hz,
            channels
        );

        let queue = Arc::new(Mutex::new(VecDeque::<f32>::new()));
        let queue_clone = Arc::clone(&queue);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut queue = lock(&queue_clone);
                    for frame in data.chunks_mut(channels.max(1)) {
                        let sample = queue.pop_front().unwrap_or(0.0).clamp(-1.0, 1.0);
                        frame.fill(sample);
                    }
                },
                |err| error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| Error::Audio(format!("Failed to build audio stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| Error::Audio(format!("Failed to start audio stream: {}", e)))?;

        Ok(Self {
            queue,
            stream: Some(stream),
            sample_rate_hz,
        })
    }

    /// Samples still waiting for the device
    pub fn pending(&self) -> usize {
        lock(&self.queue).len()
    }
}

impl AudioSink for LiveAudioSink {
    fn write(&mut self, samples: &[f32]) -> Result<()> {
        if self.stream.is_none() {
            return Err(Error::Audio("live output is closed".to_string()));
        }
        lock(&self.queue).extend(samples.iter().copied());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };
        let pending = self.pending();
        let queued = Duration::from_secs_f64(pending as f64 / self.sample_rate_hz.max(1) as f64);
        if wait_for_drain(&self.queue, queued + DRAIN_MARGIN) {
            thread::sleep(DEVICE_TAIL);
        } else {
            warn!(
                "Audio output stalled with {} of {} samples still queued, stopping",
                self.pending(),
                pending
            );
            lock(&self.queue).clear();
        }
        stream
            .pause()
            .map_err(|e| Error::Audio(format!("Failed to stop audio stream: {}", e)))
    }
}

impl Drop for LiveAudioSink {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_wait_gives_up_on_stalled_queue() {
        let queue = Mutex::new(VecDeque::from(vec![0.0f32; 16]));
        let start = Instant::now();
        assert!(!wait_for_drain(&queue, Duration::from_millis(50)));
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(lock(&queue).len(), 16);
    }

    #[test]
    fn test_drain_wait_returns_once_consumed() {
        let queue = Arc::new(Mutex::new(VecDeque::from(vec![0.5f32; 64])));
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                while lock(&queue).pop_front().is_some() {
                    thread::sleep(Duration::from_millis(1));
                }
            })
        };
        assert!(wait_for_drain(&queue, Duration::from_secs(10)));
        consumer.join().unwrap();
        assert!(lock(&queue).is_empty());
    }
}
