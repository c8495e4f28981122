use super::pcm::PcmBuffer;

// candidates closer than this to the previous accepted onset are debounced away
pub const DEFAULT_MIN_SLICE: f32 = 0.1;

const RMS_WINDOW_SECS: f32 = 0.005;

// Slice boundaries in seconds. Index 0 is always 0.0; a slice ends where the
// next one starts (or at the buffer end for the last).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SliceMap {
    starts: Vec<f32>,
}

impl SliceMap {
    pub fn starts(&self) -> &[f32] {
        &self.starts
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    // [start, end) for a pad index
    pub fn region(&self, index: usize, buffer_duration: f32) -> Option<(f32, f32)> {
        let start = *self.starts.get(index)?;
        let end = self.starts.get(index + 1).copied().unwrap_or(buffer_duration);
        Some((start, end))
    }

    // Index-addressed overwrite, no sort and no clamp on purpose: pads keep
    // their index, so dragging a boundary past its neighbour leaves the map
    // disordered (and that region inverted) until the next detection pass.
    pub fn move_slice(&mut self, index: usize, new_time: f32) {
        if let Some(t) = self.starts.get_mut(index) {
            *t = new_time;
        }
    }
}

// Scan channel 0 in fixed 5ms windows and mark every window whose RMS clears
// the threshold as an onset, debounced by min_slice. Pure function of the
// buffer contents, so re-running it with the same threshold gives the same
// map back.
pub fn detect(buffer: &PcmBuffer, threshold: f32, min_slice: f32) -> SliceMap {
    let data = &buffer.channels[0];
    let rate = buffer.sample_rate as f32;
    let window = (rate * RMS_WINDOW_SECS).round().max(1.0) as usize;

    let mut starts = vec![0.0f32]; // always an implicit boundary at time 0
    let mut last = 0.0f32;

    let mut i = 0usize;
    while i < data.len() {
        let mut sum = 0.0f32;
        for &s in &data[i..(i + window).min(data.len())] {
            sum += s * s;
        }
        // the partial tail window still divides by the full window size
        let rms = (sum / window as f32).sqrt();

        if rms > threshold {
            let t = i as f32 / rate;
            if t - last > min_slice {
                starts.push(t);
                last = t;
            }
        }
        i += window;
    }

    SliceMap { starts }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono_buffer(rate: u32, samples: Vec<f32>) -> PcmBuffer {
        PcmBuffer {
            sample_rate: rate,
            channels: vec![samples],
        }
    }

    // a short loud burst starting at `at`, long enough to fill an rms window
    fn add_burst(data: &mut [f32], at: usize, len: usize, amp: f32) {
        for s in data.iter_mut().skip(at).take(len) {
            *s = amp;
        }
    }

    #[test]
    fn silent_buffer_yields_single_slice_at_zero() {
        let buf = mono_buffer(44100, vec![0.0; 44100]);
        let map = detect(&buf, 0.1, DEFAULT_MIN_SLICE);
        assert_eq!(map.starts(), &[0.0]);
    }

    #[test]
    fn first_boundary_is_always_zero() {
        let mut data = vec![0.0; 44100];
        add_burst(&mut data, 22050, 500, 0.9);
        let buf = mono_buffer(44100, data);
        let map = detect(&buf, 0.1, DEFAULT_MIN_SLICE);
        assert_eq!(map.starts()[0], 0.0);
    }

    #[test]
    fn click_at_one_second_detected_within_a_window() {
        // 2s buffer, silent except one loud 5ms click at 1.0s
        let rate = 44100;
        let mut data = vec![0.0; rate * 2];
        add_burst(&mut data, rate, 300, 0.9);
        let buf = mono_buffer(rate as u32, data);

        let map = detect(&buf, 0.1, DEFAULT_MIN_SLICE);
        assert_eq!(map.len(), 2);
        let window_secs = 0.005 * 1.5; // one window of rounding slack
        assert!((map.starts()[1] - 1.0).abs() <= window_secs);
    }

    #[test]
    fn raising_threshold_never_adds_slices() {
        let rate = 44100usize;
        let mut data = vec![0.0; rate * 3];
        // bursts of varying loudness, spaced clear of the debounce
        for (k, amp) in [0.08, 0.2, 0.35, 0.5, 0.75, 0.9].iter().enumerate() {
            add_burst(&mut data, (k + 1) * rate / 3, 400, *amp);
        }
        let buf = mono_buffer(rate as u32, data);

        let mut prev = usize::MAX;
        for t in [0.01, 0.05, 0.1, 0.2, 0.3, 0.4, 0.5] {
            let n = detect(&buf, t, DEFAULT_MIN_SLICE).len();
            assert!(n <= prev, "threshold {t} produced {n} slices, more than {prev}");
            prev = n;
        }
    }

    #[test]
    fn accepted_boundaries_respect_debounce() {
        let rate = 44100usize;
        let mut data = vec![0.0; rate * 2];
        // bursts every 30ms, much closer than the 100ms debounce
        let mut at = rate / 10;
        while at + 400 < data.len() {
            add_burst(&mut data, at, 400, 0.8);
            at += rate * 3 / 100;
        }
        let buf = mono_buffer(rate as u32, data);

        let map = detect(&buf, 0.1, DEFAULT_MIN_SLICE);
        assert!(map.len() > 2);
        for pair in map.starts().windows(2) {
            assert!(pair[1] - pair[0] > DEFAULT_MIN_SLICE);
        }
    }

    #[test]
    fn detection_is_idempotent() {
        let rate = 44100usize;
        let mut data = vec![0.0; rate];
        add_burst(&mut data, rate / 4, 300, 0.6);
        add_burst(&mut data, rate / 2, 300, 0.6);
        let buf = mono_buffer(rate as u32, data);

        let a = detect(&buf, 0.1, DEFAULT_MIN_SLICE);
        let b = detect(&buf, 0.1, DEFAULT_MIN_SLICE);
        assert_eq!(a, b);
    }

    #[test]
    fn region_end_is_next_start_or_buffer_end() {
        let map = SliceMap {
            starts: vec![0.0, 1.0],
        };
        assert_eq!(map.region(0, 2.0), Some((0.0, 1.0)));
        assert_eq!(map.region(1, 2.0), Some((1.0, 2.0)));
        assert_eq!(map.region(2, 2.0), None);
    }

    #[test]
    fn move_slice_overwrites_in_place_without_sorting() {
        let mut map = SliceMap {
            starts: vec![0.0, 0.5, 1.0],
        };
        // drag boundary 1 past boundary 2; the map goes disordered and stays so
        map.move_slice(1, 1.5);
        assert_eq!(map.starts(), &[0.0, 1.5, 1.0]);
        // out of range edits are ignored
        map.move_slice(9, 0.2);
        assert_eq!(map.starts(), &[0.0, 1.5, 1.0]);
    }
}
