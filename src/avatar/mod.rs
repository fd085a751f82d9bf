//! Avatar meshes and the binding the transition engine acts on.
//!
//! The avatar loader hands over a list of [`MorphMesh`]es once a model has
//! been parsed. [`AvatarRig::bind`] swaps the whole set atomically and bumps
//! the binding generation; tweens recorded against an older generation are
//! dropped instead of being applied to meshes that no longer belong to the
//! scene.

pub mod catalog;

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Identifies one avatar binding. Increases on every [`AvatarRig::bind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct BindingGeneration(u64);

impl BindingGeneration {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BindingGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A mesh with a morph-target dictionary and its influence values.
#[derive(Debug, Clone)]
pub struct MorphMesh {
    name: String,
    dictionary: HashMap<String, usize>,
    influences: Vec<f32>,
    /// Number of influence writes since creation.
    revision: u64,
}

impl MorphMesh {
    /// Create a mesh exposing `targets`, all at weight 0.
    ///
    /// Duplicate names keep their first index.
    pub fn new<I, S>(name: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut dictionary = HashMap::new();
        let mut influences = Vec::new();
        for target in targets {
            let target = target.into();
            if dictionary.contains_key(&target) {
                continue;
            }
            dictionary.insert(target, influences.len());
            influences.push(0.0);
        }
        Self {
            name: name.into(),
            dictionary,
            influences,
            revision: 0,
        }
    }

    /// A mesh with no morph targets (skinned body, hair, ...).
    pub fn without_morph_targets(name: impl Into<String>) -> Self {
        Self::new(name, std::iter::empty::<String>())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_morph_targets(&self) -> bool {
        !self.dictionary.is_empty()
    }

    /// Index of a morph target in this mesh's influence array.
    pub fn morph_index(&self, target: &str) -> Option<usize> {
        self.dictionary.get(target).copied()
    }

    /// Current weight of a named morph target.
    pub fn influence(&self, target: &str) -> Option<f32> {
        self.morph_index(target)
            .and_then(|idx| self.influences.get(idx).copied())
    }

    pub fn influence_at(&self, index: usize) -> Option<f32> {
        self.influences.get(index).copied()
    }

    pub fn influences(&self) -> &[f32] {
        &self.influences
    }

    /// Write a weight, clamped to `[0, 1]`. Out-of-range indices are ignored.
    pub fn set_influence(&mut self, index: usize, value: f32) {
        if let Some(slot) = self.influences.get_mut(index) {
            *slot = value.clamp(0.0, 1.0);
            self.revision += 1;
        }
    }

    /// Number of influence writes so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// The meshes of the currently loaded avatar, tagged with their generation.
#[derive(Debug, Clone, Default)]
pub struct AvatarBinding {
    generation: BindingGeneration,
    meshes: Vec<MorphMesh>,
}

impl AvatarBinding {
    pub fn generation(&self) -> BindingGeneration {
        self.generation
    }

    pub fn meshes(&self) -> &[MorphMesh] {
        &self.meshes
    }

    pub fn mesh(&self, name: &str) -> Option<&MorphMesh> {
        self.meshes.iter().find(|m| m.name() == name)
    }

    /// Whether no mesh exposes a morph-target dictionary.
    pub fn is_empty(&self) -> bool {
        !self.meshes.iter().any(MorphMesh::has_morph_targets)
    }

    /// Sum of influence writes across all meshes.
    pub fn revision(&self) -> u64 {
        self.meshes.iter().map(MorphMesh::revision).sum()
    }

    pub(crate) fn mesh_mut(&mut self, index: usize) -> Option<&mut MorphMesh> {
        self.meshes.get_mut(index)
    }
}

/// Owner of the current [`AvatarBinding`].
#[derive(Debug, Default)]
pub struct AvatarRig {
    binding: AvatarBinding,
    next_generation: u64,
}

impl AvatarRig {
    /// A rig with nothing bound (model still loading).
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the binding wholesale and return the detached previous one.
    pub fn bind(&mut self, meshes: Vec<MorphMesh>) -> AvatarBinding {
        self.next_generation += 1;
        let binding = AvatarBinding {
            generation: BindingGeneration(self.next_generation),
            meshes,
        };
        std::mem::replace(&mut self.binding, binding)
    }

    /// Drop the current meshes, e.g. while a new model is loading.
    pub fn unbind(&mut self) -> AvatarBinding {
        self.bind(Vec::new())
    }

    pub fn binding(&self) -> &AvatarBinding {
        &self.binding
    }

    pub(crate) fn binding_mut(&mut self) -> &mut AvatarBinding {
        &mut self.binding
    }

    pub fn generation(&self) -> BindingGeneration {
        self.binding.generation
    }

    pub fn is_empty(&self) -> bool {
        self.binding.is_empty()
    }
}
