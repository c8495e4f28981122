use super::frame::StereoFrame;

// what the master bus runs at: a drum-bus compressor pushed into limiting
const THRESHOLD_DB: f32 = -10.0;
const RATIO: f32 = 12.0;
const RELEASE_SECS: f32 = 0.25;

// Feed-forward dynamics limiter on the shared output bus. Instant attack,
// exponential release, hard knee. Every voice sums into this; it's what keeps
// a fistful of simultaneous pads from clipping the output.
#[derive(Clone, Debug)]
pub struct MasterLimiter {
    threshold: f32, // linear
    release_coeff: f32,
    envelope: f32, // tracked stereo peak
}

impl MasterLimiter {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            threshold: db_to_linear(THRESHOLD_DB),
            release_coeff: (-1.0 / (RELEASE_SECS * sample_rate as f32)).exp(),
            envelope: 0.0,
        }
    }

    pub fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            let peak = f.peak();
            if peak > self.envelope {
                self.envelope = peak; // instant attack
            } else {
                self.envelope *= self.release_coeff;
            }

            if self.envelope > self.threshold {
                // past the threshold the output level only grows at 1/ratio
                let over = self.envelope / self.threshold;
                let gain = over.powf(1.0 / RATIO - 1.0);
                f.left *= gain;
                f.right *= gain;
            }
        }
    }
}

fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_signal_passes_untouched() {
        let mut limiter = MasterLimiter::new(44100);
        // 0.1 sits well under the -10 db threshold (~0.316)
        let mut buf = vec![StereoFrame::mono(0.1); 256];
        limiter.process(&mut buf);
        for f in &buf {
            assert_eq!(f.left, 0.1);
        }
    }

    #[test]
    fn hot_signal_is_pulled_down_hard() {
        let mut limiter = MasterLimiter::new(44100);
        let mut buf = vec![StereoFrame::mono(1.0); 256];
        limiter.process(&mut buf);
        let out = buf[128].left;
        // 12:1 above -10 db lands around -9 db, nowhere near unity
        assert!(out < 0.5, "expected heavy reduction, got {out}");
        assert!(out > db_to_linear(THRESHOLD_DB) * 0.9);
    }

    #[test]
    fn gain_recovers_after_release() {
        let mut limiter = MasterLimiter::new(1000);
        let mut hot = vec![StereoFrame::mono(1.0); 64];
        limiter.process(&mut hot);

        // a second of quiet lets the envelope decay back under the threshold
        let mut quiet = vec![StereoFrame::mono(0.1); 1000];
        limiter.process(&mut quiet);
        let tail = quiet.last().unwrap().left;
        assert!((tail - 0.1).abs() < 1e-3, "gain did not recover: {tail}");
    }
}
