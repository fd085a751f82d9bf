//! Viseme transition engine.
//!
//! A transition drives every morph target a viseme maps to toward
//! `intensity × table weight` over a duration, on every bound mesh that
//! exposes that target. Tweens are keyed by `(mesh, morph target)`: issuing
//! a new transition on a key replaces the tween in flight, starting from the
//! weight the old tween had reached (last writer wins).
//!
//! The engine never touches meshes on its own. [`TransitionEngine::advance`]
//! is called once per frame and writes the interpolated weights.

pub mod easing;

use crate::avatar::{AvatarRig, BindingGeneration, MorphMesh};
use crate::viseme::{VisemeId, blend_shapes_for};
use easing::Easing;
use std::collections::HashMap;
use tracing::{debug, trace};

/// `(mesh index, morph target index)` within one binding.
type TweenKey = (usize, usize);

#[derive(Debug, Clone, Copy)]
struct Tween {
    generation: BindingGeneration,
    from: f32,
    to: f32,
    started_at_ms: f64,
    duration_ms: f64,
}

impl Tween {
    fn progress(&self, now_ms: f64) -> f64 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        (now_ms - self.started_at_ms) / self.duration_ms
    }

    fn value_at(&self, now_ms: f64, easing: Easing) -> f32 {
        let eased = easing.apply(self.progress(now_ms)) as f32;
        self.from + (self.to - self.from) * eased
    }

    fn is_finished(&self, now_ms: f64) -> bool {
        self.progress(now_ms) >= 1.0
    }
}

/// Interpolates avatar morph weights toward viseme targets.
#[derive(Debug, Default)]
pub struct TransitionEngine {
    easing: Easing,
    tweens: HashMap<TweenKey, Tween>,
}

impl TransitionEngine {
    pub fn new(easing: Easing) -> Self {
        Self {
            easing,
            tweens: HashMap::new(),
        }
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    /// Start moving the morph targets of `viseme_id` toward
    /// `intensity × weight` over `duration_ms`, beginning at `now_ms`.
    ///
    /// Unknown visemes and empty bindings are silent no-ops. Intensity is
    /// clamped to `[0, 1]`; a non-positive duration snaps on the next
    /// [`advance`](Self::advance).
    pub fn transition(
        &mut self,
        rig: &AvatarRig,
        viseme_id: VisemeId,
        intensity: f32,
        duration_ms: f64,
        now_ms: f64,
    ) {
        let shapes = blend_shapes_for(viseme_id);
        if shapes.is_empty() {
            trace!(viseme_id, "no blend shapes for viseme, skipping");
            return;
        }
        if rig.is_empty() {
            trace!(viseme_id, "no avatar bound, dropping transition");
            return;
        }

        let intensity = if intensity.is_nan() {
            0.0
        } else {
            intensity.clamp(0.0, 1.0)
        };
        let duration_ms = if duration_ms.is_finite() {
            duration_ms.max(0.0)
        } else {
            0.0
        };

        let binding = rig.binding();
        let generation = binding.generation();
        for (mesh_idx, mesh) in binding.meshes().iter().enumerate() {
            if !mesh.has_morph_targets() {
                continue;
            }
            for (target, weight) in shapes.iter() {
                let Some(morph_idx) = mesh.morph_index(target) else {
                    continue;
                };
                let key = (mesh_idx, morph_idx);
                let from = self.current_value(key, mesh, generation, now_ms);
                self.tweens.insert(
                    key,
                    Tween {
                        generation,
                        from,
                        to: intensity * weight,
                        started_at_ms: now_ms,
                        duration_ms,
                    },
                );
            }
        }
    }

    /// Move every non-neutral morph target of the current binding back to
    /// 0 over `duration_ms`. Returns the number of targets relaxed.
    pub fn relax(&mut self, rig: &AvatarRig, duration_ms: f64, now_ms: f64) -> usize {
        let binding = rig.binding();
        let generation = binding.generation();
        let mut relaxed = 0;
        for (mesh_idx, mesh) in binding.meshes().iter().enumerate() {
            for morph_idx in 0..mesh.influences().len() {
                let key = (mesh_idx, morph_idx);
                let from = self.current_value(key, mesh, generation, now_ms);
                let heading_up = self
                    .tweens
                    .get(&key)
                    .is_some_and(|t| t.generation == generation && t.to > 0.0);
                if from <= 0.0 && !heading_up {
                    continue;
                }
                self.tweens.insert(
                    key,
                    Tween {
                        generation,
                        from,
                        to: 0.0,
                        started_at_ms: now_ms,
                        duration_ms: duration_ms.max(0.0),
                    },
                );
                relaxed += 1;
            }
        }
        relaxed
    }

    /// Write interpolated weights for `now_ms` into the bound meshes.
    ///
    /// Tweens recorded against another binding generation are dropped
    /// without being applied. Finished tweens are removed after their final
    /// write.
    pub fn advance(&mut self, rig: &mut AvatarRig, now_ms: f64) {
        let generation = rig.generation();
        let before = self.tweens.len();
        self.tweens.retain(|_, t| t.generation == generation);
        let stale = before - self.tweens.len();
        if stale > 0 {
            debug!(stale, %generation, "dropped tweens for a detached avatar binding");
        }

        let easing = self.easing;
        let binding = rig.binding_mut();
        self.tweens.retain(|&(mesh_idx, morph_idx), tween| {
            if let Some(mesh) = binding.mesh_mut(mesh_idx) {
                mesh.set_influence(morph_idx, tween.value_at(now_ms, easing));
            }
            !tween.is_finished(now_ms)
        });
    }

    /// Number of tweens in flight.
    pub fn active_count(&self) -> usize {
        self.tweens.len()
    }

    /// Target weight of the tween in flight on a mesh's morph target.
    pub fn target_of(&self, mesh_index: usize, morph_index: usize) -> Option<f32> {
        self.tweens.get(&(mesh_index, morph_index)).map(|t| t.to)
    }

    /// Forget all tweens without writing anything.
    pub fn clear(&mut self) {
        self.tweens.clear();
    }

    fn current_value(
        &self,
        key: TweenKey,
        mesh: &MorphMesh,
        generation: BindingGeneration,
        now_ms: f64,
    ) -> f32 {
        match self.tweens.get(&key) {
            Some(tween) if tween.generation == generation => tween.value_at(now_ms, self.easing),
            _ => mesh.influence_at(key.1).unwrap_or(0.0),
        }
    }
}
