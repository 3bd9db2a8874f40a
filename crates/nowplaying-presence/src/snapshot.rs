//! Presence snapshot model and payload shaping.
//!
//! Payloads come from a third party. Every free-text field here (names,
//! activity details, track titles) is untrusted display text and must go
//! through [`crate::render`] before it lands in a document or terminal.

use nowplaying_common::PresenceError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Activity name Discord uses for Spotify listening sessions.
pub const SPOTIFY_ACTIVITY: &str = "Spotify";

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Coarse Discord status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscordStatus {
    Online,
    Idle,
    #[serde(rename = "dnd")]
    DoNotDisturb,
    #[default]
    Offline,
}

impl DiscordStatus {
    /// Map the wire string. Unknown values collapse to `Offline`.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "online" => Self::Online,
            "idle" => Self::Idle,
            "dnd" => Self::DoNotDisturb,
            _ => Self::Offline,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::DoNotDisturb => "dnd",
            Self::Offline => "offline",
        }
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// Identity of the watched Discord user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    /// Avatar hash; animated avatars start with `a_`.
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub avatar_decoration_data: Option<AvatarDecoration>,
}

/// Avatar frame preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarDecoration {
    #[serde(default)]
    pub asset: Option<String>,
}

// ---------------------------------------------------------------------------
// Activities
// ---------------------------------------------------------------------------

/// Start/end of a progress-bearing activity, epoch milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub end: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default)]
    pub name: String,
    /// Discord activity type (0 playing, 2 listening, 4 custom, ...).
    #[serde(default, rename = "type")]
    pub kind: u32,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub timestamps: Option<Timestamps>,
}

impl Activity {
    pub fn is_spotify(&self) -> bool {
        self.name == SPOTIFY_ACTIVITY
    }
}

/// The relay's pre-digested Spotify block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotifyTrack {
    #[serde(default)]
    pub track_id: Option<String>,
    #[serde(default)]
    pub song: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub album_art_url: Option<String>,
    #[serde(default)]
    pub timestamps: Option<Timestamps>,
}

impl SpotifyTrack {
    /// Link to the track on open.spotify.com.
    pub fn url(&self) -> Option<String> {
        self.track_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(|id| format!("https://open.spotify.com/track/{id}"))
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One validated presence state, ready for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PresenceSnapshot {
    pub user: Option<DiscordUser>,
    pub status: DiscordStatus,
    pub activities: Vec<Activity>,
    /// Present only while a track is actually playing.
    pub spotify: Option<SpotifyTrack>,
}

/// Raw payload as the relay sends it; absent and `null` fields are both
/// accepted.
#[derive(Deserialize)]
struct RawPresence {
    #[serde(default)]
    discord_user: Option<DiscordUser>,
    #[serde(default)]
    discord_status: Option<String>,
    #[serde(default)]
    activities: Option<Vec<Activity>>,
    #[serde(default)]
    spotify: Option<SpotifyTrack>,
}

impl PresenceSnapshot {
    /// Validate and shape an `INIT_STATE` / `PRESENCE_UPDATE` payload.
    pub fn from_payload(payload: Value) -> Result<Self, PresenceError> {
        if !payload.is_object() {
            return Err(PresenceError::Payload(format!(
                "expected an object, got {}",
                json_kind(&payload)
            )));
        }

        let raw: RawPresence =
            serde_json::from_value(payload).map_err(|e| PresenceError::Payload(e.to_string()))?;

        Ok(Self {
            user: raw.discord_user,
            status: raw
                .discord_status
                .as_deref()
                .map(DiscordStatus::from_wire)
                .unwrap_or_default(),
            activities: raw.activities.unwrap_or_default(),
            spotify: raw
                .spotify
                .filter(|track| track.track_id.as_deref().is_some_and(|id| !id.is_empty())),
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
