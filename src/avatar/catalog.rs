//! Built-in avatar models and the TTS voice each one speaks with.

use crate::error::{LipSyncError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Presentation gender of an avatar, used to group the picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl FromStr for Gender {
    type Err = LipSyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            other => Err(LipSyncError::Avatar(format!("unknown gender '{other}'"))),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Male => f.write_str("male"),
            Self::Female => f.write_str("female"),
        }
    }
}

/// One selectable avatar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarProfile {
    /// Model file name (glTF binary).
    pub file: String,
    pub gender: Gender,
    /// Neural TTS voice used for this avatar's replies.
    pub voice: String,
}

/// Ordered set of avatar profiles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarCatalog {
    profiles: Vec<AvatarProfile>,
}

const BUILTIN: &[(&str, Gender, &str)] = &[
    ("avatar1.glb", Gender::Female, "en-US-JennyNeural"),
    ("avatar2.glb", Gender::Male, "en-US-GuyNeural"),
    ("avatar3.glb", Gender::Female, "en-US-AriaNeural"),
    ("avatar4.glb", Gender::Male, "en-US-ChristopherNeural"),
    ("avatar5.glb", Gender::Female, "en-US-SaraNeural"),
    ("avatar6.glb", Gender::Male, "en-US-BrandonNeural"),
    ("avatar7.glb", Gender::Female, "en-US-NancyNeural"),
    ("avatar8.glb", Gender::Male, "en-US-DavisNeural"),
    ("avatar9.glb", Gender::Female, "en-US-MichelleNeural"),
    ("avatar10.glb", Gender::Male, "en-US-TonyNeural"),
    ("avatar11.glb", Gender::Female, "en-US-JaneNeural"),
    ("avatar12.glb", Gender::Male, "en-US-RogerNeural"),
];

impl AvatarCatalog {
    /// The twelve stock avatars.
    pub fn builtin() -> Self {
        Self {
            profiles: BUILTIN
                .iter()
                .map(|(file, gender, voice)| AvatarProfile {
                    file: (*file).to_owned(),
                    gender: *gender,
                    voice: (*voice).to_owned(),
                })
                .collect(),
        }
    }

    /// Build a catalog from custom profiles.
    ///
    /// # Errors
    ///
    /// Returns [`LipSyncError::Avatar`] if two profiles share a file name
    /// or a profile has an empty voice.
    pub fn from_profiles(profiles: Vec<AvatarProfile>) -> Result<Self> {
        for (i, profile) in profiles.iter().enumerate() {
            if profile.voice.trim().is_empty() {
                return Err(LipSyncError::Avatar(format!(
                    "avatar '{}' has no voice",
                    profile.file
                )));
            }
            if profiles[..i].iter().any(|p| p.file == profile.file) {
                return Err(LipSyncError::Avatar(format!(
                    "avatar '{}' is listed twice",
                    profile.file
                )));
            }
        }
        Ok(Self { profiles })
    }

    pub fn profiles(&self) -> &[AvatarProfile] {
        &self.profiles
    }

    pub fn get(&self, file: &str) -> Option<&AvatarProfile> {
        self.profiles.iter().find(|p| p.file == file)
    }

    /// Voice configured for an avatar file.
    pub fn voice_for(&self, file: &str) -> Option<&str> {
        self.get(file).map(|p| p.voice.as_str())
    }

    /// Avatar files of one gender, in catalog order.
    pub fn avatars_for(&self, gender: Gender) -> Vec<&str> {
        self.profiles
            .iter()
            .filter(|p| p.gender == gender)
            .map(|p| p.file.as_str())
            .collect()
    }
}
