use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::effect::EffectStage;
use super::frame::StereoFrame;
use super::pcm::PcmBuffer;

pub const ATTACK_SECS: f32 = 0.005;
pub const RELEASE_SECS: f32 = 0.005;
// headroom so a fistful of stacked pads doesn't slam the bus
pub const VOICE_GAIN: f32 = 0.6;

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VoiceId(pub u64);

// fancy atomic counter lets us generate unique ids while in threads
pub fn next_voice_id() -> VoiceId {
    VoiceId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

// Where a voice reads samples from: a window into the shared source buffer,
// or a private reversed copy materialized at trigger time. Reversing per
// trigger costs one slice-sized allocation on the control thread and keeps
// the shared buffer untouched; nobody pays for reverse who doesn't use it.
#[derive(Clone, Debug)]
pub enum VoiceSource {
    Shared {
        buffer: Arc<PcmBuffer>,
        start_frame: usize,
        frames: usize,
    },
    Reversed {
        left: Vec<f32>,
        right: Vec<f32>,
    },
}

impl VoiceSource {
    // out[j] = src[start + (frames - 1 - j)], per channel
    pub fn reversed(buffer: &PcmBuffer, start_frame: usize, frames: usize) -> Self {
        let rev = |ch: &[f32]| -> Vec<f32> {
            (0..frames)
                .map(|j| {
                    ch.get(start_frame + (frames - 1 - j))
                        .copied()
                        .unwrap_or(0.0)
                })
                .collect()
        };
        let left = rev(&buffer.channels[0]);
        let right = rev(&buffer.channels[buffer.channels.len().min(2) - 1]);
        Self::Reversed { left, right }
    }

    pub fn frames(&self) -> usize {
        match self {
            VoiceSource::Shared { frames, .. } => *frames,
            VoiceSource::Reversed { left, .. } => left.len(),
        }
    }

    fn frame_at(&self, i: usize) -> StereoFrame {
        match self {
            VoiceSource::Shared {
                buffer,
                start_frame,
                frames,
            } => {
                if i >= *frames {
                    return StereoFrame::zero();
                }
                buffer.frame_at(start_frame + i)
            }
            VoiceSource::Reversed { left, right } => StereoFrame {
                left: left.get(i).copied().unwrap_or(0.0),
                right: right.get(i).copied().unwrap_or(0.0),
            },
        }
    }
}

// One playback instance of a triggered slice. Fully built on the control
// thread (source view or reverse copy, effect chain, envelope timing) and
// shipped to the audio callback, which only advances it.
#[derive(Clone, Debug)]
pub struct Voice {
    pub id: VoiceId,
    pub slice_index: usize,
    pub active: bool,
    source: VoiceSource,
    stages: Vec<EffectStage>,
    pos: f64, // fractional frame within the source region
    step: f64, // pitch * src_rate / out_rate
    frames_total: u64, // output frames until natural end
    frames_done: u64,
    attack_frames: u64,
    release_frames: u64,
}

impl Voice {
    pub fn new(
        id: VoiceId,
        slice_index: usize,
        source: VoiceSource,
        stages: Vec<EffectStage>,
        pitch: f32,
        src_rate: u32,
        out_rate: u32,
    ) -> Self {
        let step = pitch.max(0.01) as f64 * src_rate as f64 / out_rate as f64;
        // pitching up shortens the wall-clock life of the voice; the full
        // region is still consumed
        let frames_total = (source.frames() as f64 / step).ceil() as u64;
        Self {
            id,
            slice_index,
            active: frames_total > 0,
            source,
            stages,
            pos: 0.0,
            step,
            frames_total,
            frames_done: 0,
            attack_frames: (ATTACK_SECS * out_rate as f32).round() as u64,
            release_frames: (RELEASE_SECS * out_rate as f32).round() as u64,
        }
    }

    pub fn frames_total(&self) -> u64 {
        self.frames_total
    }

    // hard stop, no release ramp; the click is accepted
    pub fn stop(&mut self) {
        self.active = false;
    }

    // One block of this voice mixed additively into `out`. `scratch` is the
    // engine's reusable block buffer; nothing in here allocates.
    pub fn render_into(&mut self, out: &mut [StereoFrame], scratch: &mut [StereoFrame]) {
        if !self.active {
            return;
        }
        let remaining = (self.frames_total - self.frames_done) as usize;
        let n = out.len().min(scratch.len()).min(remaining);

        // dry read at the (fractional) playback rate
        for s in scratch[..n].iter_mut() {
            let i = self.pos as usize;
            let frac = (self.pos - i as f64) as f32;
            let a = self.source.frame_at(i);
            let b = self.source.frame_at(i + 1);
            *s = StereoFrame {
                left: lerp(a.left, b.left, frac),
                right: lerp(a.right, b.right, frac),
            };
            self.pos += self.step;
        }

        // the enabled stages, in their fixed order
        for stage in &mut self.stages {
            stage.process(&mut scratch[..n]);
        }

        // envelope and voice gain go on after the effects, then into the bus
        for (k, s) in scratch[..n].iter().enumerate() {
            let env = self.envelope_at(self.frames_done + k as u64);
            out[k].add_scaled(*s, VOICE_GAIN * env);
        }

        self.frames_done += n as u64;
        if self.frames_done >= self.frames_total {
            self.active = false;
        }
    }

    // 5ms up from zero, 5ms back down before the computed end; min() keeps
    // the ramps from inverting on slices shorter than 10ms
    fn envelope_at(&self, frame: u64) -> f32 {
        let attack = if self.attack_frames == 0 {
            1.0
        } else {
            (frame as f32 / self.attack_frames as f32).min(1.0)
        };
        let remaining = self.frames_total.saturating_sub(frame);
        let release = if self.release_frames == 0 {
            1.0
        } else {
            (remaining as f32 / self.release_frames as f32).min(1.0)
        };
        attack.min(release)
    }
}
