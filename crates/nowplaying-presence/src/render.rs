//! Display helpers for presence snapshots.
//!
//! These turn snapshot data into display-safe strings: HTML fragments with
//! every third-party field escaped, plain lines for terminals with control
//! characters stripped, CDN URLs, and track progress.

use crate::snapshot::{Activity, DiscordStatus, DiscordUser, PresenceSnapshot, Timestamps};

const DISCORD_CDN: &str = "https://cdn.discordapp.com";
const UNKNOWN_TRACK: &str = "Unknown Track";
const UNKNOWN_ARTIST: &str = "Unknown Artist";

// =============================================================================
// ESCAPING
// =============================================================================

/// Neutralize markup-significant characters so `text` can only ever be
/// inserted into a document as data.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Strip control characters (including ESC) so untrusted text cannot drive
/// the terminal.
pub fn sanitize_terminal(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

// =============================================================================
// USER
// =============================================================================

pub fn status_label(status: DiscordStatus) -> &'static str {
    match status {
        DiscordStatus::Online => "Online",
        DiscordStatus::Idle => "Idle",
        DiscordStatus::DoNotDisturb => "Do Not Disturb",
        DiscordStatus::Offline => "Offline",
    }
}

/// Global display name, falling back to the username.
pub fn display_name(user: &DiscordUser) -> &str {
    user.global_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(&user.username)
}

/// Legacy `#1234` tag. Migrated accounts report discriminator `"0"`.
pub fn tag(user: &DiscordUser) -> Option<String> {
    user.discriminator
        .as_deref()
        .filter(|d| !d.is_empty() && *d != "0")
        .map(|d| format!("#{d}"))
}

/// Avatar URL; animated (`a_`) hashes are served as gif.
pub fn avatar_url(user: &DiscordUser) -> Option<String> {
    let hash = user.avatar.as_deref().filter(|h| !h.is_empty())?;
    let ext = if hash.starts_with("a_") { "gif" } else { "png" };
    Some(format!(
        "{DISCORD_CDN}/avatars/{}/{hash}.{ext}?size=256",
        user.id
    ))
}

pub fn decoration_url(user: &DiscordUser) -> Option<String> {
    let asset = user
        .avatar_decoration_data
        .as_ref()?
        .asset
        .as_deref()
        .filter(|a| !a.is_empty())?;
    Some(format!(
        "{DISCORD_CDN}/avatar-decoration-presets/{asset}.png?size=240&passthrough=false"
    ))
}

// =============================================================================
// ACTIVITIES
// =============================================================================

/// HTML fragment for one activity. All text fields are escaped.
pub fn activity_html(activity: &Activity) -> String {
    if activity.is_spotify() {
        let track = non_empty(activity.details.as_deref()).unwrap_or(UNKNOWN_TRACK);
        let artist = non_empty(activity.state.as_deref()).unwrap_or(UNKNOWN_ARTIST);
        return format!(
            "<div class=\"activity spotify\">\
             <div class=\"activity-name\">Listening to Spotify</div>\
             <div class=\"activity-details\"><strong>{}</strong></div>\
             <div class=\"activity-state\">by {}</div>\
             </div>",
            escape_html(track),
            escape_html(artist)
        );
    }

    let mut html = format!(
        "<div class=\"activity\"><div class=\"activity-name\">{}</div>",
        escape_html(&activity.name)
    );
    if let Some(details) = activity.details.as_deref().filter(|d| !d.is_empty()) {
        html.push_str(&format!(
            "<div class=\"activity-details\">{}</div>",
            escape_html(details)
        ));
    }
    if let Some(state) = activity.state.as_deref().filter(|s| !s.is_empty()) {
        html.push_str(&format!(
            "<div class=\"activity-state\">{}</div>",
            escape_html(state)
        ));
    }
    html.push_str("</div>");
    html
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.is_empty())
}

/// Plain-text lines for one activity.
pub fn activity_lines(activity: &Activity) -> Vec<String> {
    if activity.is_spotify() {
        return vec![
            "Listening to Spotify".to_string(),
            sanitize_terminal(non_empty(activity.details.as_deref()).unwrap_or(UNKNOWN_TRACK)),
            format!(
                "by {}",
                sanitize_terminal(non_empty(activity.state.as_deref()).unwrap_or(UNKNOWN_ARTIST))
            ),
        ];
    }

    let mut lines = vec![sanitize_terminal(&activity.name)];
    lines.extend(
        [activity.details.as_deref(), activity.state.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .map(sanitize_terminal),
    );
    lines
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// HTML for the activity list. No activities renders nothing.
pub fn snapshot_html(snapshot: &PresenceSnapshot) -> String {
    snapshot.activities.iter().map(activity_html).collect()
}

/// Terminal rendering of a whole snapshot, evaluated at `now_ms`.
pub fn snapshot_lines(snapshot: &PresenceSnapshot, now_ms: i64) -> Vec<String> {
    let mut lines = Vec::new();

    let status = status_label(snapshot.status);
    match &snapshot.user {
        Some(user) => lines.push(format!(
            "{}{} [{status}]",
            sanitize_terminal(display_name(user)),
            tag(user).map(|t| sanitize_terminal(&t)).unwrap_or_default()
        )),
        None => lines.push(format!("[{status}]")),
    }

    for activity in &snapshot.activities {
        // Spotify gets its own block below when the relay supplies one.
        if activity.is_spotify() && snapshot.spotify.is_some() {
            continue;
        }
        for (i, line) in activity_lines(activity).into_iter().enumerate() {
            let indent = if i == 0 { "  " } else { "    " };
            lines.push(format!("{indent}{line}"));
        }
    }

    if let Some(track) = &snapshot.spotify {
        lines.push(format!(
            "  Now playing: {} by {}",
            sanitize_terminal(non_empty(track.song.as_deref()).unwrap_or(UNKNOWN_TRACK)),
            sanitize_terminal(non_empty(track.artist.as_deref()).unwrap_or(UNKNOWN_ARTIST))
        ));
        if let Some(progress) = track
            .timestamps
            .as_ref()
            .and_then(|ts| track_progress(ts, now_ms))
        {
            lines.push(format!(
                "    {} / {} ({:.0}%)",
                progress.elapsed_label(),
                progress.total_label(),
                progress.percent()
            ));
        }
    }

    lines
}

// =============================================================================
// PROGRESS
// =============================================================================

/// Playback position within a timestamp range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackProgress {
    pub elapsed_ms: i64,
    pub total_ms: i64,
}

impl TrackProgress {
    /// Completion percentage, clamped to `[0, 100]`.
    pub fn percent(&self) -> f64 {
        if self.total_ms <= 0 {
            return 0.0;
        }
        (self.elapsed_ms as f64 / self.total_ms as f64 * 100.0).clamp(0.0, 100.0)
    }

    pub fn elapsed_label(&self) -> String {
        format_duration(self.elapsed_ms.max(0))
    }

    pub fn total_label(&self) -> String {
        format_duration(self.total_ms)
    }
}

/// Progress at `now_ms`; needs both ends of the range. Ranges whose
/// arithmetic overflows yield `None`.
pub fn track_progress(timestamps: &Timestamps, now_ms: i64) -> Option<TrackProgress> {
    let start = timestamps.start?;
    let end = timestamps.end?;
    Some(TrackProgress {
        elapsed_ms: now_ms.checked_sub(start)?,
        total_ms: end.checked_sub(start)?,
    })
}

/// Format milliseconds as `M:SS`. Negative durations format as `0:00`.
pub fn format_duration(ms: i64) -> String {
    let total_seconds = ms.max(0) / 1000;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Wall-clock epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
