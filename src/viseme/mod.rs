//! Viseme data for lip-sync animation.
//!
//! A viseme is a visual mouth shape that corresponds to a phoneme (sound).
//! The TTS engine reports one [`VisemeEvent`] per mouth-shape change, and
//! [`blend_shapes`] maps each viseme class to the morph targets it drives.

pub mod blend_shapes;
pub mod event;

pub use blend_shapes::{BlendShapeWeights, VISEME_CLASS_COUNT, all_morph_targets, blend_shapes_for};
pub use event::{VisemeEvent, VisemeTrack};

/// Viseme class identifier as emitted by the TTS engine.
///
/// The reference table covers IDs `0..22`; other values are accepted and
/// simply drive no morph targets.
pub type VisemeId = u32;
