//! Transport constants and unit conversions.

/// Clock pulses per quarter note.
pub const PPQN: u32 = 24;

/// Sample rate used by the simulator.
pub const SIM_SAMPLE_RATE: u32 = 48_000;

/// Sample rate of the hardware codec.
pub const HARDWARE_SAMPLE_RATE: u32 = 44_100;

/// Fixed advance of the simulated sample clock per tick (~4 ms at 48 kHz).
pub const SIM_SAMPLES_PER_TICK: u32 = 200;

/// Convert milliseconds to whole samples (truncating). Negative input yields 0.
pub fn ms_to_samples(ms: f32, sample_rate: u32) -> u32 {
    let samples = ms * 0.001 * sample_rate as f32;
    if samples <= 0.0 { 0 } else { samples as u32 }
}

/// Samples between two clock pulses at `bpm`.
///
/// Tempo is floored at 1 BPM so a zero tempo never divides by zero.
pub fn samples_per_tick(bpm: f32, sample_rate: u32) -> f64 {
    let bpm = if bpm.is_finite() { bpm.max(1.0) } else { 120.0 };
    (sample_rate as f64 * 60.0) / (bpm as f64 * PPQN as f64)
}

/// Semitone offset to playback-rate multiplier (12-TET).
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    libm::powf(2.0, semitones / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ms_to_samples_truncates() {
        assert_eq!(ms_to_samples(1.0, 48_000), 48);
        assert_eq!(ms_to_samples(10.0, 44_100), 441);
        assert_eq!(ms_to_samples(-3.0, 48_000), 0);
    }

    #[test]
    fn samples_per_tick_at_120_bpm() {
        // 48000 * 60 / (120 * 24) = 1000
        assert!((samples_per_tick(120.0, 48_000) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn samples_per_tick_floors_zero_tempo() {
        assert!(samples_per_tick(0.0, 48_000).is_finite());
    }

    #[test]
    fn octave_doubles_ratio() {
        assert!((semitones_to_ratio(12.0) - 2.0).abs() < 1e-5);
        assert!((semitones_to_ratio(-12.0) - 0.5).abs() < 1e-5);
        assert_eq!(semitones_to_ratio(0.0), 1.0);
    }
}
