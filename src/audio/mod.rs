use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};

use crate::audio_api::{AudioCommand, EngineEvent};

mod effect;
mod engine;
mod frame;
mod limiter;
pub mod pcm;
mod slices;
pub mod voice;

pub use effect::{EffectStage, build_chain};
pub use frame::StereoFrame;
pub use pcm::{DecodeError, PcmBuffer};
pub use slices::{DEFAULT_MIN_SLICE, SliceMap, detect};
pub use voice::{Voice, VoiceId, VoiceSource, next_voice_id};

use engine::Engine;

// channel depths; generous enough that a burst of pad mashing never drops
const COMMAND_QUEUE: usize = 256;
const EVENT_QUEUE: usize = 256;

pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    events_rx: Receiver<EngineEvent>,
    sample_rate: u32,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    pub fn command_sender(&self) -> Sender<AudioCommand> {
        self.tx.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn poll_event(&self) -> Option<EngineEvent> {
        self.events_rx.try_recv().ok()
    }
}

pub fn start_audio() -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(COMMAND_QUEUE);
    let (events_tx, events_rx) = crossbeam_channel::bounded::<EngineEvent>(EVENT_QUEUE);

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("no default output device")?;
    let config = device
        .default_output_config()
        .context("no default output config")?;

    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let output_stream = build_output_stream_f32(
                &device,
                &config.into(),
                rx,
                events_tx,
                sample_rate,
                channels,
            )?;
            output_stream
                .play()
                .context("failed to play output stream")?;

            Ok(AudioHandle {
                tx,
                events_rx,
                sample_rate,
                _output_stream: output_stream,
            })
        }
        _ => anyhow::bail!("unsupported sample format (only f32 supported for now)"),
    }
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    events_tx: Sender<EngineEvent>,
    sample_rate: u32,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    if channels != 2 {
        anyhow::bail!("expected a stereo output device, got {channels} channels");
    }

    let mut engine = Engine::new(sample_rate, events_tx);

    let err_fn = |err| eprintln!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            while let Ok(cmd) = rx.try_recv() { // drain control commands first
                engine.handle_cmd(cmd);
            }

            let n_frames = data.len() / 2;
            let frames: &mut [StereoFrame] = unsafe { // casting raw floats to StereoFrames
                std::slice::from_raw_parts_mut(data.as_mut_ptr() as *mut StereoFrame, n_frames)
            };
            engine.render_block(frames);
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
