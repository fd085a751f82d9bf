//! Easing curves for morph-weight tweens.

use serde::{Deserialize, Serialize};

/// Maps linear progress `t ∈ [0, 1]` to eased progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    /// Quadratic ease-out: fast start, slow settle.
    #[default]
    Power1Out,
    /// Cubic ease-out.
    Power2Out,
}

impl Easing {
    /// Eased progress for `t`; input is clamped to `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = if t.is_nan() { 1.0 } else { t.clamp(0.0, 1.0) };
        let inv = 1.0 - t;
        match self {
            Self::Linear => t,
            Self::Power1Out => 1.0 - inv * inv,
            Self::Power2Out => 1.0 - inv * inv * inv,
        }
    }
}
