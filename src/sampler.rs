use std::sync::Arc;

use crossbeam_channel::Sender;
use tracing::{debug, info};

use crate::audio::{
    self, DEFAULT_MIN_SLICE, DecodeError, PcmBuffer, SliceMap, Voice, VoiceSource, next_voice_id,
};
use crate::audio_api::AudioCommand;
use crate::params::EffectsParams;

// The control-side face of the engine, what the ui layer talks to: owns the
// loaded buffer, the slice map and the live-tunable params. Everything
// realtime is on the other side of the command channel; triggering here does
// all the allocation (reverse copies, delay lines, effect chains) so the
// audio callback never has to.
pub struct Sampler {
    buffer: Option<Arc<PcmBuffer>>,
    slices: SliceMap,
    pub params: EffectsParams,
    tx: Sender<AudioCommand>,
    out_rate: u32,
}

impl Sampler {
    pub fn new(tx: Sender<AudioCommand>, out_rate: u32) -> Self {
        Self {
            buffer: None,
            slices: SliceMap::default(),
            params: EffectsParams::default(),
            tx,
            out_rate,
        }
    }

    // Decode first, commit after: a bad file surfaces the error and leaves
    // the previous buffer and slices untouched and playable.
    pub fn load(&mut self, bytes: &[u8]) -> Result<Arc<PcmBuffer>, DecodeError> {
        let decoded = Arc::new(PcmBuffer::decode(bytes)?);
        info!(
            frames = decoded.frames(),
            rate = decoded.sample_rate,
            channels = decoded.channels.len(),
            "loaded buffer"
        );
        self.buffer = Some(decoded.clone());
        self.slices = SliceMap::default(); // stale boundaries die with the old buffer
        Ok(decoded)
    }

    pub fn buffer(&self) -> Option<&Arc<PcmBuffer>> {
        self.buffer.as_ref()
    }

    pub fn slices(&self) -> &SliceMap {
        &self.slices
    }

    // Re-scan the loaded buffer; wholesale replaces the map, including any
    // boundaries the caller moved by hand. No-op without a buffer.
    pub fn detect_slices(&mut self, threshold: f32) -> &SliceMap {
        if let Some(buffer) = &self.buffer {
            self.slices = audio::detect(buffer, threshold, DEFAULT_MIN_SLICE);
            debug!(slices = self.slices.len(), threshold, "detection pass");
        }
        &self.slices
    }

    pub fn move_slice(&mut self, index: usize, new_time: f32) {
        self.slices.move_slice(index, new_time);
    }

    // Fire one pad. An invalid index or an empty sampler is a silent no-op;
    // pads get mashed faster than anyone checks bounds.
    pub fn trigger(&mut self, slice_index: usize) {
        let Some(buffer) = &self.buffer else { return };
        let Some((start, end)) = self.slices.region(slice_index, buffer.duration()) else {
            return;
        };
        if end <= start {
            // a hand-moved boundary can invert a region; nothing sane to play
            return;
        }

        let params = self.params.clamped(); // snapshot; later edits miss this voice
        let src_rate = buffer.sample_rate;
        let start_frame = (start.max(0.0) * src_rate as f32).floor() as usize;
        let frames = ((end - start) * src_rate as f32).ceil() as usize;
        let frames = frames.min(buffer.frames().saturating_sub(start_frame));
        if frames == 0 {
            return;
        }

        let source = if params.reverse {
            VoiceSource::reversed(buffer, start_frame, frames)
        } else {
            VoiceSource::Shared {
                buffer: buffer.clone(),
                start_frame,
                frames,
            }
        };
        let stages = audio::build_chain(&params, self.out_rate);
        let voice = Voice::new(
            next_voice_id(),
            slice_index,
            source,
            stages,
            params.pitch,
            src_rate,
            self.out_rate,
        );
        // a full queue just drops the trigger, same as every other command
        let _ = self.tx.try_send(AudioCommand::Spawn(Box::new(voice)));
    }

    pub fn stop_all(&self) {
        let _ = self.tx.try_send(AudioCommand::StopAll);
    }
}
