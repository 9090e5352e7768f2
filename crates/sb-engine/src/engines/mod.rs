//! The five voice engines.

mod burst;
mod euclid;
mod granular;
mod resonator;
mod sampler;

pub use burst::{BurstEngine, PendingTriggers, MAX_CLUSTER};
pub use euclid::{euclid_mask, EuclidEngine, EuclidMask, MAX_STEPS};
pub use granular::{
    ClipName, GrainVoice, GranularEngine, GranularStats, GRANULAR_VOICES, HISTOGRAM_BINS,
    MIXER_FAN_IN, MIXER_GROUPS, SD_CLIP_SLOTS,
};
pub use resonator::{
    preset_index, ModalPreset, ResonatorEngine, ResonatorVoice, MODAL_PARTIALS, MODAL_PRESETS,
    RESONATOR_VOICES,
};
pub use sampler::{SamplerEngine, SamplerVoice, RAM_PRELOAD_COUNT, SAMPLER_VOICES};
