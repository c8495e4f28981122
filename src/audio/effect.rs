use super::frame::StereoFrame;
use crate::params::EffectsParams;

// The closed set of per-voice stages. A voice builds only the stages whose
// enable flag was set at trigger time; a dry voice carries an empty chain and
// pays for nothing.
#[derive(Clone, Debug)]
pub enum EffectStage {
    Crusher(BitCrusher),
    Filter(LowPass),
    Delay(FeedbackDelay),
}

impl EffectStage {
    pub fn process(&mut self, buf: &mut [StereoFrame]) {
        match self {
            EffectStage::Crusher(c) => c.process(buf),
            EffectStage::Filter(f) => f.process(buf),
            EffectStage::Delay(d) => d.process(buf),
        }
    }
}

// chain order is fixed: crusher -> filter -> delay
pub fn build_chain(params: &EffectsParams, sample_rate: u32) -> Vec<EffectStage> {
    let mut chain = Vec::with_capacity(3);
    if params.bit_crusher_enabled {
        chain.push(EffectStage::Crusher(BitCrusher::new(params.bit_depth)));
    }
    if params.filter_enabled {
        chain.push(EffectStage::Filter(LowPass::new(
            params.filter_freq,
            params.filter_res,
            sample_rate,
        )));
    }
    if params.delay_enabled {
        chain.push(EffectStage::Delay(FeedbackDelay::new(
            params.delay_time,
            params.delay_feedback,
            sample_rate,
        )));
    }
    chain
}

// ── Bit crusher ───────────────────────────────────────────────────

// quantizes amplitude to multiples of 0.5^depth; depth 16 is close to
// transparent, depth 1 is rubble
#[derive(Clone, Copy, Debug)]
pub struct BitCrusher {
    step: f32,
}

impl BitCrusher {
    pub fn new(bit_depth: u32) -> Self {
        Self {
            step: 0.5f32.powi(bit_depth.clamp(1, 16) as i32),
        }
    }

    fn process(&mut self, buf: &mut [StereoFrame]) {
        let inv = 1.0 / self.step;
        for f in buf.iter_mut() {
            f.left = (f.left * inv).round() * self.step;
            f.right = (f.right * inv).round() * self.step;
        }
    }
}

// ── Resonant low-pass ─────────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
struct Coeffs {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

#[derive(Clone, Copy, Debug, Default)]
struct BiquadState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadState {
    #[inline]
    fn tick(&mut self, x: f32, c: &Coeffs) -> f32 {
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

// Single RBJ biquad low-pass with resonance, one state per channel.
// Coefficients are computed once at trigger time from the params snapshot.
#[derive(Clone, Copy, Debug)]
pub struct LowPass {
    coeffs: Coeffs,
    left: BiquadState,
    right: BiquadState,
}

impl LowPass {
    pub fn new(freq: f32, res: f32, sample_rate: u32) -> Self {
        let rate = sample_rate as f32;
        let freq = freq.clamp(20.0, (rate * 0.49).min(20_000.0));
        // a q of 0 would blow the biquad up, so the floor is butterworth
        let q = res.clamp(0.0, 20.0).max(std::f32::consts::FRAC_1_SQRT_2);

        let w0 = std::f32::consts::TAU * freq / rate;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);
        let a0 = 1.0 + alpha;
        let coeffs = Coeffs {
            b0: (1.0 - cos) * 0.5 / a0,
            b1: (1.0 - cos) / a0,
            b2: (1.0 - cos) * 0.5 / a0,
            a1: -2.0 * cos / a0,
            a2: (1.0 - alpha) / a0,
        };

        Self {
            coeffs,
            left: BiquadState::default(),
            right: BiquadState::default(),
        }
    }

    fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            f.left = self.left.tick(f.left, &self.coeffs);
            f.right = self.right.tick(f.right, &self.coeffs);
        }
    }
}

// ── Feedback delay ────────────────────────────────────────────────

// Classic delay-with-feedback-tap wiring: the line hears the dry signal plus
// its own attenuated output, and the stage output is dry + delayed. First
// echo comes back at full scale, then decays geometrically by `feedback`.
#[derive(Clone, Debug)]
pub struct FeedbackDelay {
    line: Vec<StereoFrame>,
    pos: usize,
    feedback: f32,
}

impl FeedbackDelay {
    pub fn new(delay_time: f32, feedback: f32, sample_rate: u32) -> Self {
        let frames = (delay_time.clamp(0.01, 1.0) * sample_rate as f32)
            .round()
            .max(1.0) as usize;
        Self {
            line: vec![StereoFrame::zero(); frames],
            pos: 0,
            feedback: feedback.clamp(0.0, 0.9),
        }
    }

    fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            let dry = *f;
            let delayed = self.line[self.pos];
            self.line[self.pos] = StereoFrame {
                left: dry.left + delayed.left * self.feedback,
                right: dry.right + delayed.right * self.feedback,
            };
            f.left = dry.left + delayed.left;
            f.right = dry.right + delayed.right;
            self.pos = (self.pos + 1) % self.line.len();
        }
    }
}
