//! The seed genome: every engine reads its marching orders from here.

/// Where a genome came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GenomeSource {
    /// Minted by the generation step from a master seed.
    #[default]
    Lfsr,
    /// Tagged with a tapped tempo.
    TapTempo,
    /// Loaded from a stored preset.
    Preset,
    /// Captured from live input.
    LiveInput,
}

/// Source feeding a granular voice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GranularSource {
    #[default]
    LiveInput,
    SdClip,
}

impl GranularSource {
    /// Decode a raw control value. 0 is live input; anything else is a clip.
    pub const fn from_raw(raw: u8) -> Self {
        if raw == 0 { Self::LiveInput } else { Self::SdClip }
    }
}

/// Excitation topology of a resonator voice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResonatorMode {
    #[default]
    KarplusStrong,
    ModalBank,
}

impl ResonatorMode {
    /// Decode a raw control value. 0 is Karplus-Strong; anything else is modal.
    pub const fn from_raw(raw: u8) -> Self {
        if raw == 0 { Self::KarplusStrong } else { Self::ModalBank }
    }
}

/// Granular-engine block of the genome.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GranularParams {
    pub grain_size_ms: f32,
    /// Random start offset range per grain
    pub spray_ms: f32,
    /// Semitones relative to the genome pitch
    pub transpose_semitones: f32,
    /// -1 saw, 0 hann, +1 exponential
    pub window_skew: f32,
    pub stereo_spread: f32,
    pub source: GranularSource,
    /// Clip slot used when `source` is `SdClip`
    pub sd_slot: u8,
}

impl Default for GranularParams {
    fn default() -> Self {
        Self {
            grain_size_ms: 90.0,
            spray_ms: 18.0,
            transpose_semitones: 0.0,
            window_skew: 0.0,
            stereo_spread: 0.5,
            source: GranularSource::LiveInput,
            sd_slot: 0,
        }
    }
}

/// Resonator-engine block of the genome.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResonatorParams {
    /// Length of the excitation burst
    pub excite_ms: f32,
    /// 0 overdamped .. 1 infinite sustain
    pub damping: f32,
    pub brightness: f32,
    pub feedback: f32,
    pub mode: ResonatorMode,
    /// Modal preset index
    pub bank: u8,
}

impl Default for ResonatorParams {
    fn default() -> Self {
        Self {
            excite_ms: 3.5,
            damping: 0.35,
            brightness: 0.6,
            feedback: 0.78,
            mode: ResonatorMode::KarplusStrong,
            bank: 0,
        }
    }
}

/// Upper bound for resonator feedback; 1.0 would never decay.
pub const MAX_FEEDBACK: f32 = 0.99;

/// A seed's full parameter record.
///
/// Plain value type: the scheduler, engines, and persistence layer all hold
/// their own copies.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeedGenome {
    /// Index in the active table
    pub id: u32,
    /// Provenance tag (master seed, preset id, ...)
    pub lineage: u32,
    pub source: GenomeSource,
    /// RNG cursor; advanced by every draw made on behalf of this genome
    pub rng_state: u32,

    pub pitch_semitones: f32,
    /// Envelope times in seconds, sustain as a level
    pub env_attack: f32,
    pub env_decay: f32,
    pub env_sustain: f32,
    pub env_release: f32,
    /// Hits per beat
    pub density: f32,
    pub probability: f32,
    pub jitter_ms: f32,
    pub tone: f32,
    pub spread: f32,
    pub mutate_amount: f32,

    pub engine_id: u8,
    pub sample_slot: u8,

    pub granular: GranularParams,
    pub resonator: ResonatorParams,
}

impl Default for SeedGenome {
    fn default() -> Self {
        Self {
            id: 0,
            lineage: 0,
            source: GenomeSource::Lfsr,
            rng_state: 0,
            pitch_semitones: 0.0,
            env_attack: 0.001,
            env_decay: 0.08,
            env_sustain: 0.6,
            env_release: 0.12,
            density: 1.0,
            probability: 0.85,
            jitter_ms: 7.5,
            tone: 0.35,
            spread: 0.2,
            mutate_amount: 0.1,
            engine_id: 0,
            sample_slot: 0,
            granular: GranularParams::default(),
            resonator: ResonatorParams::default(),
        }
    }
}

/// Clamp into `[0, 1]`.
pub fn clamp01(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

impl SeedGenome {
    /// Create a default genome with the given table index.
    pub fn with_id(id: u32) -> Self {
        Self { id, ..Self::default() }
    }

    /// Clamp every field into its valid range.
    ///
    /// Non-finite values fall back to the field default. Never fails.
    pub fn sanitize(&mut self) {
        let d = Self::default();
        self.pitch_semitones = finite_or(self.pitch_semitones, d.pitch_semitones);
        self.env_attack = finite_or(self.env_attack, d.env_attack).max(0.0);
        self.env_decay = finite_or(self.env_decay, d.env_decay).max(0.0);
        self.env_sustain = clamp01(finite_or(self.env_sustain, d.env_sustain));
        self.env_release = finite_or(self.env_release, d.env_release).max(0.0);
        self.density = finite_or(self.density, d.density).max(0.0);
        self.probability = clamp01(finite_or(self.probability, d.probability));
        self.jitter_ms = finite_or(self.jitter_ms, d.jitter_ms).max(0.0);
        self.tone = clamp01(finite_or(self.tone, d.tone));
        self.spread = clamp01(finite_or(self.spread, d.spread));
        self.mutate_amount = clamp01(finite_or(self.mutate_amount, d.mutate_amount));

        let g = &mut self.granular;
        let gd = d.granular;
        g.grain_size_ms = finite_or(g.grain_size_ms, gd.grain_size_ms).max(0.0);
        g.spray_ms = finite_or(g.spray_ms, gd.spray_ms).max(0.0);
        g.transpose_semitones = finite_or(g.transpose_semitones, gd.transpose_semitones);
        g.window_skew = finite_or(g.window_skew, gd.window_skew).clamp(-1.0, 1.0);
        g.stereo_spread = clamp01(finite_or(g.stereo_spread, gd.stereo_spread));

        let r = &mut self.resonator;
        let rd = d.resonator;
        r.excite_ms = finite_or(r.excite_ms, rd.excite_ms).max(0.0);
        r.damping = clamp01(finite_or(r.damping, rd.damping));
        r.brightness = clamp01(finite_or(r.brightness, rd.brightness));
        r.feedback = finite_or(r.feedback, rd.feedback).clamp(0.0, MAX_FEEDBACK);
    }

    /// Return a sanitized copy.
    pub fn sanitized(mut self) -> Self {
        self.sanitize();
        self
    }
}
