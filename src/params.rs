// Live-tunable effect settings, owned by the control side. A copy is taken at
// every trigger, so an edit lands on the next voice and never touches one
// that's already playing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectsParams {
    pub bit_crusher_enabled: bool,
    pub bit_depth: u32, // 1-16
    pub filter_enabled: bool,
    pub filter_freq: f32, // 20-20000 hz
    pub filter_res: f32, // 0-20 q
    pub delay_enabled: bool,
    pub delay_time: f32, // 0.01-1.0 s
    pub delay_feedback: f32, // 0-0.9, anything near 1 runs away
    pub pitch: f32, // 0.1-2.0 playback rate
    pub reverse: bool,
}

impl Default for EffectsParams {
    fn default() -> Self {
        Self {
            bit_crusher_enabled: false,
            bit_depth: 8,
            filter_enabled: false,
            filter_freq: 2000.0,
            filter_res: 0.0,
            delay_enabled: false,
            delay_time: 0.3,
            delay_feedback: 0.4,
            pitch: 1.0,
            reverse: false,
        }
    }
}

impl EffectsParams {
    // the ui is expected to stay inside the ranges, but a trigger snapshot
    // clamps anyway so a stray write can't produce a diverging delay or a
    // zero playback rate
    pub fn clamped(mut self) -> Self {
        self.bit_depth = self.bit_depth.clamp(1, 16);
        self.filter_freq = self.filter_freq.clamp(20.0, 20_000.0);
        self.filter_res = self.filter_res.clamp(0.0, 20.0);
        self.delay_time = self.delay_time.clamp(0.01, 1.0);
        self.delay_feedback = self.delay_feedback.clamp(0.0, 0.9);
        self.pitch = self.pitch.clamp(0.1, 2.0);
        self
    }
}
