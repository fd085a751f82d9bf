//! Lipsync: audio-synchronized viseme animation for talking 3D avatars.
//!
//! A chat backend answers with synthesized speech plus a list of timestamped
//! viseme events. This crate turns that list into smooth morph-target
//! animation that stays locked to the audio:
//!
//! Reply → VisemeTrack → Scheduler (per frame) → Transition Engine → Avatar meshes
//!
//! # Architecture
//!
//! - **Blend-shape map**: static table from viseme class to weighted morph targets
//! - **Transition engine**: eased, last-writer-wins tweens per mesh and morph target
//! - **Scheduler**: `Idle → Armed → Running` state machine that fires each event once
//! - **Avatar binding**: generation-tagged mesh set, swapped atomically
//! - **Frame loop**: cancellable tokio task ticking at display cadence

pub mod audio;
pub mod avatar;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod runtime;
pub mod scheduler;
pub mod transition;
pub mod viseme;


pub use avatar::{AvatarRig, MorphMesh};
pub use config::LipSyncConfig;
pub use error::{LipSyncError, Result};
pub use pipeline::coordinator::LipSyncCoordinator;
pub use runtime::LipSyncEvent;
pub use scheduler::runner::LipSyncDriver;
pub use scheduler::{SchedulerState, TransitionSink, VisemeScheduler};
pub use viseme::{VisemeEvent, VisemeId, VisemeTrack};
