//! Client identity profiles
//!
//! Every request carries a synthetic client descriptor in its `context`
//! object; the server tailors responses and stream permissions to it.
//! Which profile yields a playable stream changes over time, so stream
//! resolution falls back across [`STREAM_PROFILES`] in fixed order. The
//! ordering is a resilience mechanism, not a preference.

use serde_json::{json, Value};

/// A synthetic client descriptor sent as request context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientProfile {
    pub name: &'static str,
    pub version: &'static str,
    /// Numeric client id the server associates with `name`
    pub client_id: i32,
    pub user_agent: &'static str,
}

/// Android music app profile.
pub const ANDROID_MUSIC: ClientProfile = ClientProfile {
    name: "ANDROID_MUSIC",
    version: "6.42.52",
    client_id: 21,
    user_agent: "com.google.android.apps.youtube.music/6.42.52 (Linux; U; Android 14) gzip",
};

/// iOS music app profile.
pub const IOS_MUSIC: ClientProfile = ClientProfile {
    name: "IOS_MUSIC",
    version: "6.42",
    client_id: 26,
    user_agent: "com.google.ios.youtubemusic/6.42 (iPhone16,2; U; CPU iOS 17_5 like Mac OS X;)",
};

/// Web player profile. Accepted for the full browse surface, so all
/// non-stream operations use it.
pub const WEB_REMIX: ClientProfile = ClientProfile {
    name: "WEB_REMIX",
    version: "1.20240918.01.00",
    client_id: 67,
    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36",
};

/// Fallback order for stream-URL resolution. Each profile attempt must
/// complete before the next begins; the first playable URL wins.
pub const STREAM_PROFILES: [ClientProfile; 3] = [ANDROID_MUSIC, IOS_MUSIC, WEB_REMIX];

/// Profile used for search/browse requests.
pub const BROWSE_PROFILE: ClientProfile = WEB_REMIX;

/// Build the request `context` object for a profile.
pub fn request_context(profile: &ClientProfile) -> Value {
    json!({
        "client": {
            "clientName": profile.name,
            "clientVersion": profile.version,
            "hl": "en",
            "gl": "US",
        }
    })
}

/// Download/stream quality preference supplied by the settings
/// collaborator. Selects among the audio formats a profile offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamQuality {
    /// Lowest available bitrate
    Low,
    /// Middle of the available bitrate range
    #[default]
    Medium,
    /// Highest available bitrate
    High,
}
