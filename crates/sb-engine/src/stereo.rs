//! Constant-power stereo width law shared by the Sampler and Granular engines.

use core::f32::consts::FRAC_PI_4;

use sb_ir::clamp01;

/// Left/right channel gains.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoGains {
    pub left: f32,
    pub right: f32,
}

/// Map a width in `[0, 1]` to constant-power gains.
///
/// 0 is the equal-power centre (both ~0.7071), 1 is hard right. Total power
/// `left^2 + right^2` stays at 1 across the range.
pub fn constant_power_width(spread: f32) -> StereoGains {
    let width = if spread.is_finite() { clamp01(spread) } else { 0.0 };
    let angle = FRAC_PI_4 + FRAC_PI_4 * width;
    StereoGains {
        left: clamp01(libm::cosf(angle)),
        right: clamp01(libm::sinf(angle)),
    }
}
