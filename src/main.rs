mod audio;
mod audio_api;
mod params;
mod sampler;

use std::time::Duration;

use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal;
use tracing::{debug, info};

use audio_api::EngineEvent;
use sampler::Sampler;

// pad rows, same shape the pads would have on screen:
//   q w e r   -> slices 0..4
//   a s d f   -> slices 4..8
//   z x c v   -> slices 8..12
const PAD_KEYS: [char; 12] = ['q', 'w', 'e', 'r', 'a', 's', 'd', 'f', 'z', 'x', 'c', 'v'];

const DEFAULT_THRESHOLD: f32 = 0.1;
const THRESHOLD_STEP: f32 = 0.02;
const PITCH_STEP: f32 = 0.1;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let path = std::env::args()
        .nth(1)
        .context("usage: glitchpad <sample.wav>")?;
    let bytes = std::fs::read(&path).with_context(|| format!("could not read {path}"))?;

    let handle = audio::start_audio()?;
    let mut sampler = Sampler::new(handle.command_sender(), handle.sample_rate());

    sampler.load(&bytes)?;
    let duration = sampler.buffer().map(|b| b.duration()).unwrap_or(0.0);
    let mut threshold = DEFAULT_THRESHOLD;
    let slices = sampler.detect_slices(threshold);
    info!(seconds = duration, slices = slices.len(), "ready");
    info!("pads: q-r / a-f / z-v | [ ] threshold | b/l/y fx toggles | o reverse | -/= pitch | space stop | esc quit");

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope

    loop {
        // Drain voice-ended events; this is the authoritative end-of-playback
        // signal, and dropping the event here is also what frees the voice.
        // A real ui would run its own short pad-highlight timer, separately.
        while let Some(EngineEvent::VoiceEnded(voice)) = handle.poll_event() {
            debug!(
                id = voice.id.0,
                pad = voice.slice_index,
                frames = voice.frames_total(),
                "voice ended"
            );
        }

        if !event::poll(Duration::from_millis(10))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind == KeyEventKind::Release {
            continue;
        }

        match key.code {
            KeyCode::Esc => break,
            KeyCode::Char(' ') => sampler.stop_all(),
            KeyCode::Char(c) => {
                if let Some(pad) = PAD_KEYS.iter().position(|&k| k == c) {
                    sampler.trigger(pad);
                } else {
                    handle_param_key(c, &mut sampler, &mut threshold);
                }
            }
            _ => {}
        }
    }

    Ok(())
}

fn handle_param_key(c: char, sampler: &mut Sampler, threshold: &mut f32) {
    match c {
        '[' => {
            *threshold = (*threshold - THRESHOLD_STEP).max(0.01);
            let n = sampler.detect_slices(*threshold).len();
            info!(threshold = *threshold, slices = n, "re-detected");
        }
        ']' => {
            *threshold = (*threshold + THRESHOLD_STEP).min(0.5);
            let n = sampler.detect_slices(*threshold).len();
            info!(threshold = *threshold, slices = n, "re-detected");
        }
        'b' => {
            sampler.params.bit_crusher_enabled = !sampler.params.bit_crusher_enabled;
            info!(on = sampler.params.bit_crusher_enabled, "bit crusher");
        }
        'l' => {
            sampler.params.filter_enabled = !sampler.params.filter_enabled;
            info!(on = sampler.params.filter_enabled, "filter");
        }
        'y' => {
            sampler.params.delay_enabled = !sampler.params.delay_enabled;
            info!(on = sampler.params.delay_enabled, "delay");
        }
        'o' => {
            sampler.params.reverse = !sampler.params.reverse;
            info!(on = sampler.params.reverse, "reverse");
        }
        '-' => {
            sampler.params.pitch = (sampler.params.pitch - PITCH_STEP).max(0.1);
            info!(pitch = sampler.params.pitch, "pitch");
        }
        '=' => {
            sampler.params.pitch = (sampler.params.pitch + PITCH_STEP).min(2.0);
            info!(pitch = sampler.params.pitch, "pitch");
        }
        _ => {}
    }
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
