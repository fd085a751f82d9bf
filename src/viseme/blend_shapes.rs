//! Static viseme → blend-shape table.
//!
//! Morph target names follow the ARKit / Ready Player Me conventions
//! (`viseme_aa`, `jawOpen`, `mouthPucker`, ...). Each viseme class drives a
//! handful of targets, each with its own relative weight; the transition
//! engine scales these by the requested intensity.
//!
//! Row comments name the phoneme class of each ID in the Azure viseme set.

use super::VisemeId;
use std::collections::BTreeSet;

/// Number of viseme classes in the reference mapping.
pub const VISEME_CLASS_COUNT: usize = 22;

/// Blend-shape weights for one viseme class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendShapeWeights(&'static [(&'static str, f32)]);

impl BlendShapeWeights {
    /// Mapping that drives nothing (returned for unknown IDs).
    pub const EMPTY: Self = Self(&[]);

    /// Iterate `(morph target name, relative weight)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        self.0.iter().copied()
    }

    /// Relative weight for a morph target, if this viseme drives it.
    pub fn get(&self, morph_target: &str) -> Option<f32> {
        self.0
            .iter()
            .find(|(name, _)| *name == morph_target)
            .map(|(_, weight)| *weight)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

static VISEME_BLEND_SHAPES: [&[(&str, f32)]; VISEME_CLASS_COUNT] = [
    // 0: silence
    &[("viseme_sil", 0.2), ("jawOpen", 0.1)],
    // 1: ae, ax, ah
    &[("viseme_PP", 0.5), ("mouthPucker", 0.4), ("jawOpen", 0.1)],
    // 2: aa
    &[
        ("viseme_DD", 0.4),
        ("viseme_SS", 0.4),
        ("jawOpen", 0.2),
        ("tongueOut", 0.1),
    ],
    // 3: ao
    &[("viseme_TH", 0.4), ("tongueOut", 0.3), ("jawOpen", 0.2)],
    // 4: ey, eh, uh
    &[("viseme_aa", 0.6), ("jawOpen", 0.6), ("tongueOut", 0.3)],
    // 5: er
    &[("viseme_O", 0.5), ("mouthPucker", 0.5), ("jawOpen", 0.3)],
    // 6: y, iy, ih, ix
    &[("mouthSmile", 0.4), ("jawOpen", 0.2)],
    // 7: w, uw
    &[("viseme_RR", 0.5), ("jawOpen", 0.2), ("mouthPucker", 0.3)],
    // 8: ow
    &[("mouthSmile", 0.5), ("jawOpen", 0.3)],
    // 9: aw
    &[("mouthSmile", 0.4), ("jawOpen", 0.2)],
    // 10: oy
    &[("mouthSmile", 0.5), ("jawOpen", 0.2)],
    // 11: ay
    &[("viseme_U", 0.6), ("mouthFunnel", 0.5), ("jawOpen", 0.2)],
    // 12: h
    &[("viseme_U", 0.6), ("mouthFunnel", 0.5), ("jawOpen", 0.3)],
    // 13: r
    &[("viseme_aa", 0.5), ("mouthSmile", 0.4), ("jawOpen", 0.4)],
    // 14: l
    &[("viseme_O", 0.5), ("mouthPucker", 0.5), ("jawOpen", 0.3)],
    // 15: s, z
    &[("viseme_O", 0.5), ("mouthPucker", 0.5), ("jawOpen", 0.3)],
    // 16: sh, ch, jh, zh
    &[("viseme_aa", 0.5), ("mouthPucker", 0.5), ("jawOpen", 0.4)],
    // 17: th, dh
    &[("viseme_CH", 0.4), ("viseme_SS", 0.4), ("jawOpen", 0.2)],
    // 18: f, v
    &[("viseme_TH", 0.4), ("tongueOut", 0.3), ("jawOpen", 0.2)],
    // 19: d, t, n
    &[("viseme_nn", 0.3), ("jawOpen", 0.2)],
    // 20: k, g, ng
    &[("viseme_CH", 0.4), ("viseme_SS", 0.4), ("jawOpen", 0.2)],
    // 21: p, b, m
    &[("viseme_kk", 0.5), ("jawOpen", 0.3), ("tongueOut", 0.3)],
];

/// Look up the blend shapes driven by a viseme.
///
/// Unknown IDs return [`BlendShapeWeights::EMPTY`]; this keeps newer TTS
/// engines that emit extra classes from breaking playback.
pub fn blend_shapes_for(viseme_id: VisemeId) -> BlendShapeWeights {
    usize::try_from(viseme_id)
        .ok()
        .and_then(|idx| VISEME_BLEND_SHAPES.get(idx))
        .map(|entries| BlendShapeWeights(*entries))
        .unwrap_or(BlendShapeWeights::EMPTY)
}

/// Every morph target name referenced by the table, sorted.
pub fn all_morph_targets() -> Vec<&'static str> {
    let names: BTreeSet<&'static str> = VISEME_BLEND_SHAPES
        .iter()
        .flat_map(|entries| entries.iter().map(|(name, _)| *name))
        .collect();
    names.into_iter().collect()
}
