// The smallest unit of audio; one stereo frame
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    pub fn zero() -> Self { // just giving `default` a better name for clarity
        Self::default()
    }

    pub fn mono(v: f32) -> Self {
        Self { left: v, right: v }
    }

    // additive mix with a gain, the one operation every voice ends in
    pub fn add_scaled(&mut self, other: StereoFrame, gain: f32) {
        self.left += other.left * gain;
        self.right += other.right * gain;
    }

    // louder of the two channels, what the limiter tracks
    pub fn peak(&self) -> f32 {
        self.left.abs().max(self.right.abs())
    }
}
