use crossbeam_channel::Sender;

use super::frame::StereoFrame;
use super::limiter::MasterLimiter;
use super::voice::Voice;
use crate::audio_api::{AudioCommand, EngineEvent};

pub const MAX_VOICES: usize = 16; // hard cap so we wont malloc in audio callback

// Lives inside the output callback. Owns the live voice pool and the master
// limiter; everything else (decoding, detection, voice construction) happens
// on the control side and arrives over the command channel.
pub struct Engine {
    voices: Vec<Box<Voice>>, // capacity reserved up front, never grows past it
    scratch: Vec<StereoFrame>, // per-voice block buffer, sized on first callback
    limiter: MasterLimiter,
    events_tx: Sender<EngineEvent>,
}

impl Engine {
    pub fn new(sample_rate: u32, events_tx: Sender<EngineEvent>) -> Self {
        Self {
            voices: Vec::with_capacity(MAX_VOICES),
            scratch: Vec::new(),
            limiter: MasterLimiter::new(sample_rate),
            events_tx,
        }
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::Spawn(voice) => self.spawn(voice),
            AudioCommand::StopAll => self.stop_all(),
        }
    }

    fn spawn(&mut self, voice: Box<Voice>) {
        if self.voices.len() < MAX_VOICES {
            self.voices.push(voice); // within the reserved capacity
        } else {
            // pool full: steal the oldest slot
            let mut old = std::mem::replace(&mut self.voices[0], voice);
            old.stop();
            let _ = self.events_tx.try_send(EngineEvent::VoiceEnded(old));
        }
    }

    // immediate, no release ramps; voices that already finished on their own
    // just get flushed along with the rest
    fn stop_all(&mut self) {
        for mut v in self.voices.drain(..) {
            if v.active {
                v.stop();
            }
            let _ = self.events_tx.try_send(EngineEvent::VoiceEnded(v));
        }
    }

    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        out.fill(StereoFrame::zero());
        if self.scratch.len() < out.len() {
            // first callback, or the backend grew its block size
            self.scratch.resize(out.len(), StereoFrame::zero());
        }

        for v in &mut self.voices {
            v.render_into(out, &mut self.scratch);
        }

        self.limiter.process(out);

        // hand finished voices back to the control thread, which is where
        // their buffers get freed
        let mut i = 0;
        while i < self.voices.len() {
            if self.voices[i].active {
                i += 1;
            } else {
                let dead = self.voices.swap_remove(i);
                let _ = self.events_tx.try_send(EngineEvent::VoiceEnded(dead));
            }
        }
    }
}
