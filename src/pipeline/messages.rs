//! Message types exchanged with the chat backend.

use crate::avatar::catalog::AvatarCatalog;
use crate::error::{LipSyncError, Result};
use crate::viseme::{VisemeEvent, VisemeTrack};
use serde::{Deserialize, Serialize};
use url::Url;

/// Body of a `POST /chat` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// What the user said or typed.
    pub text: String,
    /// Neural TTS voice the reply is synthesized with.
    pub voice: String,
}

impl ChatRequest {
    /// Build a request voiced by the given avatar.
    ///
    /// # Errors
    ///
    /// Returns [`LipSyncError::Reply`] for blank text and
    /// [`LipSyncError::Avatar`] if the avatar is not in the catalog.
    pub fn for_avatar(text: &str, catalog: &AvatarCatalog, avatar: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(LipSyncError::Reply("chat text is empty".to_owned()));
        }
        let voice = catalog
            .voice_for(avatar)
            .ok_or_else(|| LipSyncError::Avatar(format!("no voice configured for '{avatar}'")))?;
        Ok(Self {
            text: text.to_owned(),
            voice: voice.to_owned(),
        })
    }
}

/// Body of a successful `/chat` reply: text, synthesized audio, and the
/// viseme events reported while synthesizing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub bot_reply: String,
    /// Audio location, usually a path relative to the backend.
    pub audio_url: String,
    #[serde(default)]
    pub viseme_data: Vec<VisemeEvent>,
}

impl ChatReply {
    /// Parse a reply body.
    ///
    /// # Errors
    ///
    /// Returns [`LipSyncError::Reply`] if the JSON does not match.
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| LipSyncError::Reply(e.to_string()))
    }

    /// Resolve `audio_url` against the backend base URL.
    ///
    /// Absolute URLs are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`LipSyncError::Reply`] if either URL is malformed.
    pub fn resolve_audio_url(&self, base_url: &str) -> Result<Url> {
        if let Ok(absolute) = Url::parse(&self.audio_url) {
            return Ok(absolute);
        }
        let base = Url::parse(base_url)
            .map_err(|e| LipSyncError::Reply(format!("bad base url '{base_url}': {e}")))?;
        base.join(&self.audio_url).map_err(|e| {
            LipSyncError::Reply(format!("bad audio url '{}': {e}", self.audio_url))
        })
    }

    /// Validated event track for the scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`LipSyncError::Track`] if the events are out of order.
    pub fn track(&self) -> Result<VisemeTrack> {
        VisemeTrack::new(self.viseme_data.clone())
    }
}
