//! Frame-index arithmetic shared by the frame-based materializers.
//!
//! All functions take `hop` and `win_len` in the same unit as the time
//! argument (seconds or samples). Frame indices start at 0 and a frame's
//! timestamp is its centre.

/// Number of whole frames spanned by `dur`, as a float.
pub fn nframes(dur: f64, hop: f64, win_len: f64) -> f64 {
    (dur - win_len) / hop + 1.0
}

/// Central time of frame `frame`.
pub fn frame_to_time(frame: usize, hop: f64, win_len: f64) -> f64 {
    frame as f64 * hop + win_len / 2.0
}

/// Frame that best represents `time`. Ties round to the even frame.
pub fn time_to_frame(time: f64, hop: f64, win_len: f64) -> i64 {
    ((time - win_len / 2.0) / hop).round_ties_even() as i64
}

/// MIDI pitch (fractional) for a frequency in Hz.
pub fn f0_to_midi_pitch(f0: f64) -> f64 {
    12.0 * (f0 / 440.0).log2() + 69.0
}

/// Frequency in Hz for a MIDI pitch.
pub fn midi_pitch_to_f0(pitch: f64) -> f64 {
    440.0 * 2f64.powf((pitch - 69.0) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_times_are_centred() {
        assert_eq!(frame_to_time(0, 0.01, 0.046), 0.023);
        assert!((frame_to_time(10, 0.01, 0.046) - 0.123).abs() < 1e-12);
    }

    #[test]
    fn time_to_frame_rounds_half_to_even() {
        assert_eq!(time_to_frame(0.0, 0.5, 0.5), 0);
        assert_eq!(time_to_frame(1.0, 0.5, 0.5), 2);
        assert_eq!(time_to_frame(0.5, 0.5, 0.5), 0);
        assert_eq!(time_to_frame(1.0, 0.5, 0.0), 2);
    }

    #[test]
    fn nframes_matches_span() {
        assert_eq!(nframes(2.0, 0.5, 0.5), 4.0);
        assert_eq!(nframes(1.0, 0.25, 0.0), 5.0);
    }

    #[test]
    fn pitch_frequency_conversions() {
        assert!((midi_pitch_to_f0(69.0) - 440.0).abs() < 1e-9);
        assert!((f0_to_midi_pitch(261.625_565) - 60.0).abs() < 1e-4);
        assert!((f0_to_midi_pitch(midi_pitch_to_f0(47.5)) - 47.5).abs() < 1e-9);
    }
}
