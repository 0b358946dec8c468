//! CPAL audio backend
//!
//! ```text
//! ┌──────────────────┐   transport queue   ┌─────────────────────┐
//! │ PlaybackController│───push()──────────►│                     │
//! └──────────────────┘                     │  CPAL Audio Thread  │
//! ┌──────────────────┐     pad queue       │  (owns RenderGraph) │
//! │     PadBank      │───push()──────────►│                     │
//! └──────────────────┘                     └──────────┬──────────┘
//!         ▲                                           │
//!         │ Relaxed atomics (frames, suspended)       │ advance()
//!         └───────────────── ClockAtomics ◄───────────┘
//! ```

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};

use super::backend::{AudioSystemResult, CommandSender};
use super::config::{latency_ms, AudioConfig, MAX_BUFFER_SIZE};
use super::device::resolve_output_device;
use super::error::{AudioError, AudioResult};
use crate::engine::{command_channel, ClockAtomics, GraphCommand, RenderGraph, StreamClock};
use crate::types::StereoBuffer;

/// CPAL audio handle
///
/// Keeps the output stream alive and restarts it when the transport asks a
/// suspended clock to resume. Must stay on the thread that created it.
pub struct CpalAudioHandle {
    stream: Stream,
    clock: Arc<ClockAtomics>,
    device_name: String,
    sample_rate: u32,
    buffer_size: u32,
}

impl CpalAudioHandle {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// One-way output latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        latency_ms(self.buffer_size, self.sample_rate)
    }

    /// Handle pending resume requests; call once per control tick
    ///
    /// Resume failures are logged and leave the clock suspended, so the
    /// transport keeps running silently until the host cooperates.
    pub fn service(&self) {
        if !self.clock.take_resume_request() {
            return;
        }
        match self.stream.play() {
            Ok(()) => {
                self.clock.set_suspended(false);
                log::info!("Audio stream resumed");
            }
            Err(e) => log::warn!("Failed to resume audio stream: {}", e),
        }
    }
}

/// Start the output stream and the render graph behind it
pub fn start_audio_system(config: &AudioConfig) -> AudioResult<AudioSystemResult> {
    let device = resolve_output_device(config.device.as_ref())?;

    let device_name = device.name().unwrap_or_else(|_| "unnamed device".to_string());

    let format = negotiate_format(&device, config)?;
    let sample_rate = format.sample_rate().0;
    let buffer_size = config.buffer_frames();
    let stream_config = StreamConfig {
        channels: format.channels(),
        sample_rate: format.sample_rate(),
        buffer_size: cpal::BufferSize::Fixed(buffer_size),
    };

    let latency_ms = latency_ms(buffer_size, sample_rate);
    log::info!(
        "Output on {}: {} ch at {}Hz, {} frames per block ({:.1}ms)",
        device_name,
        stream_config.channels,
        sample_rate,
        buffer_size,
        latency_ms
    );

    let clock = Arc::new(ClockAtomics::new(sample_rate));
    let graph = RenderGraph::new(sample_rate).with_clock(clock.clone());

    let (command_tx, command_rx) = command_channel();
    let (pad_tx, pad_rx) = command_channel();

    let callback_state = Arc::new(Mutex::new(AudioCallbackState {
        graph,
        command_rx,
        pad_rx,
        buffer: StereoBuffer::silence(MAX_BUFFER_SIZE),
    }));

    let stream = build_output_stream(&device, &stream_config, callback_state, clock.clone())?;
    stream
        .play()
        .map_err(|e| AudioError::StreamStart(e.to_string()))?;

    log::info!("Audio stream started");

    Ok(AudioSystemResult {
        handle: CpalAudioHandle {
            stream,
            clock: clock.clone(),
            device_name,
            sample_rate,
            buffer_size,
        },
        command_sender: CommandSender { producer: command_tx },
        pad_sender: CommandSender { producer: pad_tx },
        clock: StreamClock::new(clock),
        sample_rate,
        buffer_size,
        latency_ms,
    })
}

/// State owned by the output callback
struct AudioCallbackState {
    graph: RenderGraph,
    command_rx: rtrb::Consumer<GraphCommand>,
    pad_rx: rtrb::Consumer<GraphCommand>,
    /// Pre-allocated render buffer
    buffer: StereoBuffer,
}

impl AudioCallbackState {
    fn process(&mut self, n_frames: usize) {
        self.buffer.set_len_from_capacity(n_frames.min(MAX_BUFFER_SIZE));
        self.graph.process_commands(&mut self.command_rx);
        self.graph.process_commands(&mut self.pad_rx);
        self.graph.render(&mut self.buffer);
    }
}

/// Choose the float output format closest to what the config asks for
///
/// Stereo beats wider layouts (fewer channels to zero), and a range that
/// contains the requested rate beats one that doesn't. When no range fits the
/// rate, the device's highest rate is used and stems are resampled to it.
fn negotiate_format(device: &cpal::Device, config: &AudioConfig) -> AudioResult<cpal::SupportedStreamConfig> {
    let wanted_rate = config.sample_rate();
    let fits = |range: &cpal::SupportedStreamConfigRange| {
        (range.min_sample_rate().0..=range.max_sample_rate().0).contains(&wanted_rate)
    };

    let range = device
        .supported_output_configs()
        .map_err(|e| AudioError::FormatQuery(e.to_string()))?
        .filter(|range| range.sample_format() == SampleFormat::F32)
        .min_by_key(|range| (!fits(range), range.channels() < 2, range.channels()))
        .ok_or(AudioError::NoFloatOutput)?;

    if fits(&range) {
        return Ok(range.with_sample_rate(cpal::SampleRate(wanted_rate)));
    }
    let rate = range.max_sample_rate();
    log::warn!("Device can't run at {}Hz, using {}Hz", wanted_rate, rate.0);
    Ok(range.with_sample_rate(rate))
}

fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    state: Arc<Mutex<AudioCallbackState>>,
    clock: Arc<ClockAtomics>,
) -> AudioResult<Stream> {
    let channels = config.channels as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                // The control thread never takes this lock, so it is uncontended
                let Ok(mut state) = state.lock() else {
                    data.fill(0.0);
                    return;
                };
                let n_frames = data.len() / channels;
                state.process(n_frames);

                let interleaved = state.buffer.as_interleaved();
                if channels == 2 && data.len() == interleaved.len() {
                    data.copy_from_slice(interleaved);
                    return;
                }

                let samples = state.buffer.as_slice();
                for (i, frame) in data.chunks_mut(channels).enumerate() {
                    match samples.get(i) {
                        Some(sample) => {
                            frame[0] = sample.left;
                            if channels > 1 {
                                frame[1] = sample.right;
                            }
                            for ch in frame.iter_mut().skip(2) {
                                *ch = 0.0;
                            }
                        }
                        None => frame.fill(0.0),
                    }
                }
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
                if matches!(err, cpal::StreamError::DeviceNotAvailable) {
                    clock.set_suspended(true);
                }
            },
            None,
        )
        .map_err(|e| AudioError::StreamOpen(e.to_string()))
}
